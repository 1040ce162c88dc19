mod gop_cache;
mod path;

pub use gop_cache::*;
pub use path::*;
