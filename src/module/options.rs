//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct. This allows for a unified yet non-cluttered
//! option set.

use crate::library::communication::broker::{
    BrokerCommunicationFactory, ConnectionManager, RecoveryOptions,
};
use crate::library::communication::event::{QueueDescriptor, RejectPolicy, Subscription};
use crate::library::communication::implementation::redis::RedisConnector;
use crate::library::helpers::parse_seconds;
use crate::library::BoxedError;
use std::time::Duration;
use structopt::StructOpt;
use uuid::Uuid;

/// Options for connecting to the message broker
#[derive(Debug, StructOpt)]
pub struct BrokerOptions {
    /// Redis server URL acting as the message broker
    #[structopt(
        short = "b",
        long = "broker",
        env = "BROKER_URL",
        global = true,
        default_value = "redis://127.0.0.1/",
        value_name = "url"
    )]
    pub url: String,

    /// Seconds to wait between two connection attempts
    #[structopt(long, env, global = true, default_value = "5", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub reconnect_interval: Duration,

    /// Seconds after which a single connection attempt is abandoned
    #[structopt(long, env, global = true, default_value = "4", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub connect_timeout: Duration,

    /// Seconds a delivery may stay unsettled before another consumer takes it over.
    /// Has to exceed the time it takes to process a single request.
    #[structopt(long, env, global = true, default_value = "60", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub claim_idle: Duration,
}

impl BrokerOptions {
    /// Timing of connection attempts
    pub fn recovery(&self) -> RecoveryOptions {
        RecoveryOptions::new(self.reconnect_interval, self.connect_timeout)
    }

    /// Starts a supervised connection to the broker and wraps it into a factory
    ///
    /// Returns immediately, the connection is established in the background.
    pub fn connect(&self) -> Result<BrokerCommunicationFactory<RedisConnector>, BoxedError> {
        let connector = RedisConnector::new(self.url.as_str())?;
        let manager = ConnectionManager::new(connector, self.recovery());

        Ok(BrokerCommunicationFactory::new(manager).with_claim_idle(self.claim_idle))
    }
}

/// Options relevant for message queueing
#[derive(Debug, StructOpt)]
pub struct QueueingOptions {
    /// Unique and stable identifier for this instance.
    /// It is used to resume unsettled deliveries right after a crash
    /// or deliberate restart. A random one is generated when omitted,
    /// in which case unsettled deliveries of a previous run are taken over
    /// by any consumer once the claim idle time has passed.
    #[structopt(long, env = "CONSUMER_ID")]
    pub id: Option<String>,

    /// Number of deliveries processed concurrently per queue
    #[structopt(long, env, default_value = "1")]
    pub prefetch: usize,
}

impl QueueingOptions {
    /// Stable consumer name, generated once per process when not configured
    pub fn consumer(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("consumer-{}", Uuid::new_v4()))
    }

    /// Subscription to a queue using these options
    pub fn subscribe(
        &self,
        consumer: &str,
        queue: QueueDescriptor,
        policy: RejectPolicy,
    ) -> Subscription {
        Subscription::new(queue, consumer, policy).with_prefetch(self.prefetch)
    }
}
