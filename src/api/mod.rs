pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use extractors::{AppJson, AppQuery};
pub use router::create_router;
pub use types::*;
