//! HTTP API
//!
//! ```text
//! GET    /                    welcome message
//! POST   /countries/refresh   run a refresh
//! GET    /countries           list (?region=&currency=&sort=gdp_desc|gdp_asc)
//! GET    /countries/image     summary PNG
//! GET    /countries/{name}    one country, case-insensitive
//! DELETE /countries/{name}    remove one country
//! GET    /status              count and last refresh timestamp
//! ```

pub mod api;
pub mod app;

pub use api::{create_router, ApiError, ErrorResponse, RefreshResponse};
pub use app::{AppState, CountryServer, ServerError};
