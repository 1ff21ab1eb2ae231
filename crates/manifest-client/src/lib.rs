//! Chat Client: sends questions to the query service and keeps the session
//! transcript.

pub mod client;
pub mod error;
pub mod render;
pub mod session;

pub use client::{QueryClient, QueryReply, NO_ANSWER};
pub use error::{ChatError, ClientError};
pub use render::{Render, TerminalRenderer};
pub use session::{ChatSession, IMAGE_CAPTION};
