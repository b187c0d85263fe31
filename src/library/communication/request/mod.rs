//! Synchronous call/response on top of fire-and-forget queues
//!
//! A caller wraps its arguments into an [`Envelope`] carrying a freshly generated `requestId` and
//! publishes it through the [`Requestor`]. Before doing so, the id is registered with the
//! [`ResponseRegistry`] so that the response, which arrives on an entirely unrelated queue,
//! can be handed to the waiting caller by the [`ResponseCompleter`].
//!
//! On the serving side, the [`Responder`] feeds each incoming envelope through a
//! [`RequestRouter`] which selects a handler by the `action` of the envelope. Whatever the
//! handler does, the router produces a reply envelope echoing the `requestId` and `action`.
//!
//! Every `requestId` concludes exactly once for its caller: either with a reply or with a
//! timeout. Replies arriving after the caller gave up are dropped.

mod envelope;
mod registry;
mod requestor;
mod responder;
mod router;

pub use envelope::*;
pub use registry::*;
pub use requestor::*;
pub use responder::*;
pub use router::*;
