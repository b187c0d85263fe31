//! This library crate contains everything needed to run the three tiers of a tierlink deployment.
//!
//! Submodules split responsibilities and form a chain of dependencies from the low-level,
//! broker agnostic [`library`], over the store specific [`domain`], through the executable
//! [`harness`], up to the runnable [`modules`](module) that make up the presentation, business
//! and data tiers.

#![deny(missing_docs)]

pub mod domain;
pub mod harness;
pub mod library;
pub mod module;
