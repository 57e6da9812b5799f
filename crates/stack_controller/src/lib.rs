pub mod api;
pub mod context;
pub mod discovery;
pub mod materializers;
pub mod reconcilers;

pub use context::{Context, Diagnostics, State};
