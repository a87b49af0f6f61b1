//! # cart-api
//!
//! HTTP backend for the health store app.
//!
//! The cart itself lives on the device; this server only answers health
//! checks and turns handler errors into a uniform JSON body.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
