mod confidence;
mod context;
mod error;
mod message;
mod recommendation;
mod session;
mod subscription;
mod tool;
mod validation;

pub use confidence::*;
pub use context::*;
pub use error::*;
pub use message::*;
pub use recommendation::*;
pub use session::*;
pub use subscription::*;
pub use tool::*;
pub use validation::*;
