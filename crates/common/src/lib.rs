//! Common types shared across the Meridian client workspace.

pub mod error;

pub use error::{ApiError, ApiResult};
