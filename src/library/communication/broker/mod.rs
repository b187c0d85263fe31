//! Broker connectivity with supervised recovery
//!
//! All traffic towards the broker is funneled through one [`ConnectionManager`] per process.
//! It owns the physical connection, remembers every queue that has been declared and
//! re-establishes both after the broker or the network failed.
//!
//! Concrete brokers plug in by implementing [`Connector`] and [`BrokerConnection`]. The generic
//! [`BrokerPublisher`] and [`BrokerQueueProvider`] build the [`event`](super::event) traits on top
//! of those so that no code above this module has to care about reconnecting.

mod connection;
mod factory;
mod publisher;
mod queue_provider;

pub use connection::*;
pub use factory::*;
pub use publisher::*;
pub use queue_provider::*;

use super::event::QueueDescriptor;
use crate::library::BoxedError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`BrokerConnection`]
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is unusable and has to be replaced
    #[error("connection to broker lost")]
    ConnectionLost(#[source] BoxedError),
    /// The broker refused or failed a single command, the connection itself is still fine
    #[error("broker command failed")]
    Command(#[source] BoxedError),
    /// The [`ConnectionManager`] has been shut down
    #[error("connection manager has shut down")]
    Shutdown,
}

impl TransportError {
    /// Whether the error indicates that the connection has to be replaced
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// Message handed out by the broker which has not yet been settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDelivery {
    /// Broker assigned identifier used for settlement
    pub id: String,
    /// Opaque message payload
    pub payload: Vec<u8>,
    /// How often the message has been delivered, starting at one
    pub attempt: u32,
}

/// Position from which a consumer reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCursor {
    /// Deliveries previously handed to this consumer that are still unsettled,
    /// starting after the given delivery identifier
    Pending(String),
    /// Deliveries that have not been handed to any consumer yet
    New,
}

impl ReadCursor {
    /// Cursor pointing at the very first unsettled delivery of a consumer
    pub fn pending_head() -> Self {
        Self::Pending("0".into())
    }

    /// Moves the cursor past a batch of deliveries. Once the pending deliveries
    /// are exhausted, the cursor switches to new deliveries.
    pub fn advance(&mut self, batch: &[RawDelivery]) {
        if let Self::Pending(_) = self {
            *self = match batch.last() {
                Some(last) => Self::Pending(last.id.clone()),
                None => Self::New,
            };
        }
    }
}

/// Factory for physical broker connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced
    type Connection: BrokerConnection;

    /// Establishes a new, independent connection
    async fn connect(&self) -> Result<Self::Connection, TransportError>;
}

/// Commands a broker has to support
///
/// Implementations are expected to be cheap to clone with every clone sharing the same
/// underlying connection.
#[async_trait]
pub trait BrokerConnection: Clone + Send + Sync + 'static {
    /// Creates the queue and its consumer group if they do not exist yet. Must be idempotent.
    async fn declare(&mut self, queue: &QueueDescriptor) -> Result<(), TransportError>;

    /// Appends a persistent message to the queue
    async fn push(
        &mut self,
        queue: &QueueDescriptor,
        payload: &[u8],
        attempt: u32,
    ) -> Result<(), TransportError>;

    /// Reads up to `count` deliveries for the named consumer, blocking for at most `block`
    /// when reading new deliveries. An empty batch is not an error.
    async fn fetch(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        cursor: &ReadCursor,
        block: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError>;

    /// Takes over up to `count` deliveries which other consumers received but left unsettled
    /// for at least `min_idle`. Claimed deliveries are pending for `consumer` afterwards.
    async fn claim(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        min_idle: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError>;

    /// Settles a delivery, removing it from the queue permanently. Settling a delivery
    /// twice has no effect.
    async fn ack(&mut self, queue: &str, id: &str) -> Result<(), TransportError>;

    /// Verifies that the connection is still usable
    async fn ping(&mut self) -> Result<(), TransportError>;
}
