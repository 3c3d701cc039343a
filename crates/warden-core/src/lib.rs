pub mod error;
pub mod types;

pub use error::{WardenError, WardenResult};
pub use types::*;
