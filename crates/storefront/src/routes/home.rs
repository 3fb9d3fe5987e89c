//! Shop front page.
//!
//! Same paginated catalog as `/products`, framed as the landing page.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

use super::products::{PaginationQuery, listing};

/// Display the shop front page.
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    listing(&state, "Shop", query, user.is_some()).await
}
