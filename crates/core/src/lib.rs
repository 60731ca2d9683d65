pub mod catalog;
pub mod config;
pub mod error;
pub mod flatten;
pub mod model;
pub mod rebase;
pub mod sink;
pub mod time;

pub use error::{BridgeError, Result};
pub use flatten::{flatten_document, flatten_envelope};
pub use rebase::RebaseContext;
pub use sink::PointSink;
