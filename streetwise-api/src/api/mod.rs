//! HTTP route handlers for streetwise-api

pub mod collaborative;
pub mod health;
pub mod land_use;
pub mod street_info;

pub use collaborative::collaborative_routes;
pub use health::health_routes;
pub use land_use::land_use_routes;
pub use street_info::street_info_routes;

use serde::Deserialize;

/// Query parameters shared by the assessment routes.
#[derive(Debug, Deserialize)]
pub struct UsrnQuery {
    pub usrn: String,
}
