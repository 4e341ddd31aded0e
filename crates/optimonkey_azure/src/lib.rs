mod auth;
mod error;
mod monitor;
mod resource_graph;

pub use auth::*;
pub use error::*;
pub use monitor::*;
pub use resource_graph::*;
