use axum::Router;

use crate::state::AppState;

pub mod csv;
mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::lesson_routes())
}
