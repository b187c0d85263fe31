//! Runtime harness to execute services in the context of modules

mod heart;
mod module;
mod scheduler;
mod service;

pub use heart::*;
pub use module::*;
pub use scheduler::*;
pub use service::*;
