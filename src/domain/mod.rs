//! Store specific structures, implementations, and logic
//!
//! The names of the queues and actions defined here are a stable contract between the
//! tiers. They are not configurable per deployment.

mod actions;
mod queues;
mod store;

pub mod analysis;

pub use actions::*;
pub use queues::*;
pub use store::*;
