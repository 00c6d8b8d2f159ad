//! Sample Validation
//!
//! Rejects malformed motion and location samples before they reach the
//! signal buffer, and provides the median filter used for smoothed
//! acceleration.

mod error;
mod filter;
mod validator;

pub use error::ValidationError;
pub use filter::MedianFilter;
pub use validator::{ValidationConfig, Validator};
