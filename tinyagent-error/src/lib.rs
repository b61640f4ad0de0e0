//! # tinyagent-error
//!
//! Unified error handling for tinyagent.
//!
//! - **ErrorKind**: Know what error occurred (e.g., ToolUnknown, InferenceFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Key-value pairs that help locate the cause
//! - **Error Source**: Underlying errors are wrapped, never leaked as raw types
//!
//! ## Usage
//!
//! ```rust
//! use tinyagent_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ToolUnknown, "Unknown tool: get_time")
//!         .with_operation("tools::execute")
//!         .with_context("tool", "get_time"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, tinyagent_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, callers further up only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the tinyagent Error
pub type Result<T> = std::result::Result<T, Error>;
