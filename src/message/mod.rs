mod dispatcher;
mod types;

pub use types::*;
