pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod source;
pub mod state;

pub use error::PredictError;
pub use format::{BoundingBox, Detection};
pub use routes::router;
pub use state::AppState;
