mod intent;
mod source;

pub use intent::*;
pub use source::*;
