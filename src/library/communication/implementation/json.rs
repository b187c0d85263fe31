//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! Implementors of the raw traits which only move opaque bytes gain the strongly typed
//! counterparts by implementing one of the marker traits below. Every message crossing
//! a tier boundary is UTF-8 encoded JSON.

use crate::library::communication::event::{
    Publisher, QueueDescriptor, QueueEntry, RawPublisher, RawQueueEntry,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Marker trait providing a default [`Publisher`] implementation based on [`serde_json`]
pub trait JsonPublisher: RawPublisher + Send + Sync {}

#[async_trait]
impl<P> Publisher for P
where
    P: JsonPublisher,
{
    /// Serializes the message using [`serde_json::to_vec`]
    async fn publish<M: Serialize + Send + Sync>(
        &self,
        queue: &QueueDescriptor,
        message: &M,
    ) -> EmptyResult {
        let data = serde_json::to_vec(message)?;
        self.publish_raw(&data, queue).await
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on [`serde_json`]
pub trait JsonQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: JsonQueueEntry,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>,
    {
        serde_json::from_slice(self.payload()).map_err(Into::into)
    }
}
