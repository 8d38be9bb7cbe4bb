pub mod callback;
pub mod client;
pub mod error;
pub mod http;
pub mod reconcile;
pub mod signal;
pub mod types;
