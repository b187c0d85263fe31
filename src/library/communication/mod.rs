//! Structures to communicate between tiers over a message broker
//!
//! The broker only offers asynchronous, unordered, at-least-once delivery on named queues.
//! This module builds a synchronous call/response contract on top of that primitive and
//! is split into layers that each add one concern:
//!
//! 1. [`broker`] owns the physical connection, its supervised recovery and the queue topology.
//!    It talks to a concrete broker exclusively through the [`Connector`](broker::Connector) and
//!    [`BrokerConnection`](broker::BrokerConnection) traits.
//! 2. [`event`] provides typed publishing and consumption of queues. A [`Consumer`](event::Consumer)
//!    returns an explicit [`Outcome`](event::Outcome) from which the dispatcher derives whether a
//!    delivery is acknowledged or rejected.
//! 3. [`request`] turns fire-and-forget messages into awaitable calls by correlating responses
//!    with waiting callers through the [`ResponseRegistry`](request::ResponseRegistry) and routes
//!    incoming requests to handlers by their action name.

mod communication_factory;
mod error;

pub mod broker;
pub mod event;
pub mod implementation;
pub mod request;

pub use communication_factory::CommunicationFactory;
pub use error::BlackboxError;
