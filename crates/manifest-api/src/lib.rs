//! Query Service: the HTTP endpoint that routes questions to the fixed
//! histogram or to the dataset agent.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
