mod rendezvous;
mod ws_channel;

pub use rendezvous::*;
pub use ws_channel::*;
