mod membership;
mod negotiation;
mod table;

pub use membership::*;
pub use negotiation::*;
pub use table::*;
