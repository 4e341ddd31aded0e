mod agents;
mod engine;
mod export;
mod group_chat;
mod session;
mod tools;
mod validator;

pub use agents::*;
pub use engine::*;
pub use export::*;
pub use group_chat::*;
pub use session::*;
pub use tools::*;
pub use validator::*;
