mod devices;
mod local;
mod remote;

pub use devices::*;
pub use local::*;
pub use remote::*;
