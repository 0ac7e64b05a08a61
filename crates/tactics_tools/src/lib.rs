//! # Tactics Development Tools
//!
//! Command-line tools for development:
//! - Data validators for balancing and scenario files
//! - Reachability and route inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod inspect;
pub mod validate;

pub use error::{Result, ToolError};
