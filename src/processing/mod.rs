mod audio;
mod avc;
mod bits;
mod frame;
mod metadata;
mod video;

pub use audio::*;
pub use avc::*;
pub use bits::*;
pub use frame::*;
pub use metadata::*;
pub use video::*;
