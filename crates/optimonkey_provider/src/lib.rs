mod client;
mod error;
pub mod repair;
mod request;
mod response;
mod structured;

pub use client::*;
pub use error::*;
pub use request::*;
pub use response::*;
pub use structured::*;
