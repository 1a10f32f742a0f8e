//! HTTP API for the teams domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::{AuthUser, TeamsState};
pub use routes::routes;
