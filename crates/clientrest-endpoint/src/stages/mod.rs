//! Built-in middleware stages.
//!
//! The `/v1` API mounts these globally, in this order:
//!
//! 1. [`content_type`] - every response is `application/json`
//! 2. [`recovery`] - a panicking handler becomes a `500`
//! 3. [`logging`] - one span and one record per request
//!
//! Because the first stage wraps outermost, the content type header is
//! staged before recovery runs, and recovery still sees panics raised
//! while the logging stage is active.

pub mod content_type;
pub mod logging;
pub mod recovery;

pub use content_type::ContentTypeJson;
pub use logging::{RequestLogging, REQUEST_ID_HEADER};
pub use recovery::Recovery;
