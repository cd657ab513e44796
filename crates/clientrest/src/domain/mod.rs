//! The application domain: the typed service and the routes serving it.

mod handlers;
mod router;
mod service;

pub use handlers::{health, ready};
pub use router::{ApiRouter, API_V1};
pub use service::{ApiService, AppService};
