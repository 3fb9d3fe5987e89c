//! Authentication route handlers.
//!
//! Login, registration, logout, and the password-reset flow. Failures
//! bounce back to the form with an error code in the query string; the
//! messages themselves live in the templates.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, warn};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form and query types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Reset-request form data.
#[derive(Debug, Deserialize)]
pub struct RequestResetForm {
    pub email: String,
}

/// New-password form data.
#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub authenticated: bool,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
    pub authenticated: bool,
}

/// Reset-request page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub authenticated: bool,
}

/// New-password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub token: String,
    pub error: Option<String>,
    pub authenticated: bool,
}

// =============================================================================
// Login / logout
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error,
        success: query.success,
        authenticated: false,
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let service = AuthService::new(state.pool());
    match service.login_with_password(&form.email, &form.password).await {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email.clone(),
            };
            if let Err(e) = set_current_user(&session, &current).await {
                error!("Failed to set session: {e}");
                return Redirect::to("/login?error=session").into_response();
            }
            set_sentry_user(&user.id, Some(user.email.as_str()));
            Redirect::to("/").into_response()
        }
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            Redirect::to("/login?error=credentials").into_response()
        }
        Err(e) => {
            error!("Login failed: {e}");
            AppError::from(e).into_response()
        }
    }
}

/// Handle logout.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        warn!("Failed to clear session on logout: {e}");
    }
    clear_sentry_user();
    Redirect::to("/")
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn signup_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    SignupTemplate {
        error: query.error,
        authenticated: false,
    }
}

/// Handle registration form submission.
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Response {
    if form.password != form.confirm_password {
        return Redirect::to("/signup?error=mismatch").into_response();
    }

    let service = AuthService::new(state.pool());
    match service
        .register_with_password(&form.email, &form.password)
        .await
    {
        Ok(_) => Redirect::to("/login?success=registered").into_response(),
        Err(AuthError::UserAlreadyExists) => {
            Redirect::to("/signup?error=exists").into_response()
        }
        Err(AuthError::InvalidEmail(_)) => Redirect::to("/signup?error=email").into_response(),
        Err(AuthError::WeakPassword(_)) => {
            Redirect::to("/signup?error=password").into_response()
        }
        Err(e) => {
            error!("Registration failed: {e}");
            AppError::from(e).into_response()
        }
    }
}

// =============================================================================
// Password reset
// =============================================================================

/// Display the reset-request page.
pub async fn reset_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ResetTemplate {
        error: query.error,
        success: query.success,
        authenticated: false,
    }
}

/// Handle a reset request: issue a token and mail the link.
///
/// Responds identically whether or not the address has an account, so
/// the form cannot be used to probe for registered emails.
pub async fn request_reset(
    State(state): State<AppState>,
    Form(form): Form<RequestResetForm>,
) -> Result<Redirect> {
    let service = AuthService::new(state.pool());
    match service.request_password_reset(&form.email).await {
        Ok(Some((user, token))) => {
            let base_url = state.config().base_url.trim_end_matches('/');
            let reset_url = format!("{base_url}/reset-password/{token}");
            // Mail failures are logged, not surfaced: the response must
            // not reveal whether the address exists.
            if let Err(e) = state
                .mailer()
                .send_password_reset(user.email.as_str(), &reset_url)
                .await
            {
                error!(user_id = %user.id, "Failed to send reset email: {e}");
            }
        }
        Ok(None) => {}
        Err(AuthError::InvalidEmail(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/reset-password?success=sent"))
}

/// Display the new-password form behind a reset link.
pub async fn new_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let service = AuthService::new(state.pool());
    match service.user_for_reset_token(&token).await {
        Ok(_) => Ok(NewPasswordTemplate {
            token,
            error: query.error,
            authenticated: false,
        }
        .into_response()),
        Err(AuthError::InvalidResetToken) => {
            Ok(Redirect::to("/reset-password?error=invalid").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Complete a password reset.
pub async fn new_password(
    State(state): State<AppState>,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response> {
    if form.password != form.confirm_password {
        let target = format!("/reset-password/{}?error=mismatch", form.token);
        return Ok(Redirect::to(&target).into_response());
    }

    let service = AuthService::new(state.pool());
    match service.reset_password(&form.token, &form.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "password reset completed");
            Ok(Redirect::to("/login?success=password_reset").into_response())
        }
        Err(AuthError::InvalidResetToken) => {
            Ok(Redirect::to("/reset-password?error=invalid").into_response())
        }
        Err(AuthError::WeakPassword(_)) => {
            let target = format!("/reset-password/{}?error=password", form.token);
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
