mod message;
mod command;
mod control;
mod data;
pub mod constants;

pub use message::*;
pub use command::*;
pub use control::*;
pub use data::*;
pub use constants::*;
