pub mod compose;
pub mod decode;
pub mod layout;

pub use compose::{FitMode, compose};
pub use decode::decode_rgba8;
