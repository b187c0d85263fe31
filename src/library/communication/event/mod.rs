//! Typed publishing and consumption of durable queues
//!
//! Every tier talks to the others exclusively by putting messages into named queues.
//! A message is published into a [`Queue`](QueueDescriptor) through a [`Publisher`] and
//! picked up by whichever [`Consumer`] currently subscribes to it.
//!
//! Deliveries are at-least-once. Each [`QueueEntry`] remains owned by the broker until it is
//! settled. The [`ConsumerExt`] dispatcher settles every delivery exactly once, deriving the
//! settlement from the explicit [`Outcome`] the consumer returns: terminal outcomes are
//! acknowledged while retryable ones are handled according to the [`RejectPolicy`] of the
//! [`Subscription`].
//!
//! Messages that can not be decoded are dropped after being logged. They would never decode
//! on a later delivery either.

mod consumer;
mod publisher;
mod queue;
mod queue_provider;

pub use consumer::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
