mod factory;
mod publisher;
mod queue;

pub use factory::*;
pub use publisher::*;
pub use queue::*;
