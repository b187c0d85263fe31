use super::{
    CONSUMER_GROUP, STREAM_ATTEMPT_KEY, STREAM_ID_ADDITIONS, STREAM_ID_CLAIM_START,
    STREAM_ID_HEAD, STREAM_ID_NEW, STREAM_PAYLOAD_KEY,
};
use crate::library::communication::broker::{
    BrokerConnection, Connector, RawDelivery, ReadCursor, TransportError,
};
use crate::library::communication::event::QueueDescriptor;
use async_trait::async_trait;
use futures::Future;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{
    from_redis_value, AsyncCommands, Client, IntoConnectionInfo, RedisError, RedisResult, Value,
};
use std::collections::HashMap;
use std::convert::TryInto;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum RedisTransportError {
    #[error("request did not complete within {0:?}")]
    RequestTimeout(Duration),
}

fn classify(error: RedisError) -> TransportError {
    if error.is_connection_dropped()
        || error.is_io_error()
        || error.is_connection_refusal()
        || error.is_timeout()
    {
        TransportError::ConnectionLost(error.into())
    } else {
        TransportError::Command(error.into())
    }
}

async fn bounded<T, F>(limit: Duration, request: F) -> Result<T, TransportError>
where
    F: Future<Output = RedisResult<T>>,
{
    match timeout(limit, request).await {
        Ok(result) => result.map_err(classify),
        // A request that never returns leaves the multiplexed pipeline in an unknown state
        Err(_) => Err(TransportError::ConnectionLost(
            RedisTransportError::RequestTimeout(limit).into(),
        )),
    }
}

/// [`Connector`] opening multiplexed connections to a redis server
pub struct RedisConnector {
    client: Client,
}

impl RedisConnector {
    /// Creates a new instance for the given server, no connection is made yet
    pub fn new<T: IntoConnectionInfo>(url: T) -> RedisResult<Self> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = RedisChannel;

    async fn connect(&self) -> Result<Self::Connection, TransportError> {
        let connection = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| TransportError::ConnectionLost(e.into()))?;

        Ok(RedisChannel {
            connection,
            request_timeout: REQUEST_TIMEOUT,
        })
    }
}

/// [`BrokerConnection`] backed by a multiplexed redis connection
#[derive(Clone)]
pub struct RedisChannel {
    connection: MultiplexedConnection,
    request_timeout: Duration,
}

// Entries without a payload are handed out empty so that they fail decoding and get dropped
fn parse_delivery(entry: StreamId) -> RawDelivery {
    let payload = entry.get::<Vec<u8>>(STREAM_PAYLOAD_KEY).unwrap_or_default();
    let attempt = entry.get::<u32>(STREAM_ATTEMPT_KEY).unwrap_or(1);

    RawDelivery {
        id: entry.id,
        payload,
        attempt,
    }
}

// XAUTOCLAIM replies with the next cursor, the claimed entries and (since 7.0) deleted ids.
// Entries deleted in the meantime show up without fields on older servers.
fn parse_claimed(reply: Vec<Value>) -> RedisResult<Vec<RawDelivery>> {
    let entries = match reply.into_iter().nth(1) {
        Some(Value::Bulk(entries)) => entries,
        _ => return Ok(Vec::new()),
    };

    let mut deliveries = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Value::Bulk(parts) = entry {
            if let [id, fields @ Value::Bulk(_)] = parts.as_slice() {
                let id: String = from_redis_value(id)?;
                let map: HashMap<String, Value> = from_redis_value(fields)?;
                deliveries.push(parse_delivery(StreamId { id, map }));
            }
        }
    }

    Ok(deliveries)
}

#[async_trait]
impl BrokerConnection for RedisChannel {
    async fn declare(&mut self, queue: &QueueDescriptor) -> Result<(), TransportError> {
        let result = bounded(
            self.request_timeout,
            self.connection.xgroup_create_mkstream::<_, _, _, ()>(
                queue.key(),
                CONSUMER_GROUP,
                STREAM_ID_HEAD,
            ),
        )
        .await;

        match result {
            Err(TransportError::Command(error))
                if error
                    .downcast_ref::<RedisError>()
                    .and_then(RedisError::code)
                    == Some("BUSYGROUP") =>
            {
                Ok(())
            }
            other => other,
        }
    }

    async fn push(
        &mut self,
        queue: &QueueDescriptor,
        payload: &[u8],
        attempt: u32,
    ) -> Result<(), TransportError> {
        let fields = [
            (STREAM_PAYLOAD_KEY, payload.to_vec()),
            (STREAM_ATTEMPT_KEY, attempt.to_string().into_bytes()),
        ];

        bounded(
            self.request_timeout,
            self.connection
                .xadd::<_, _, _, _, ()>(queue.key(), STREAM_ID_NEW, &fields),
        )
        .await
    }

    async fn fetch(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        cursor: &ReadCursor,
        block: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError> {
        let id = match cursor {
            ReadCursor::Pending(after) => after.as_str(),
            ReadCursor::New => STREAM_ID_ADDITIONS,
        };

        let options = StreamReadOptions::default()
            .group(CONSUMER_GROUP, consumer)
            .count(count)
            .block(block.as_millis().try_into().unwrap_or(usize::MAX));

        let reply: StreamReadReply = bounded(
            block + self.request_timeout,
            self.connection.xread_options(&[queue], &[id], &options),
        )
        .await?;

        let deliveries = reply
            .keys
            .into_iter()
            .flat_map(|stream| stream.ids)
            .map(parse_delivery)
            .collect();

        Ok(deliveries)
    }

    async fn claim(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        min_idle: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError> {
        let mut command = redis::cmd("XAUTOCLAIM");
        command
            .arg(queue)
            .arg(CONSUMER_GROUP)
            .arg(consumer)
            .arg(u64::try_from(min_idle.as_millis()).unwrap_or(u64::MAX))
            .arg(STREAM_ID_CLAIM_START)
            .arg("COUNT")
            .arg(count);

        let reply: Vec<Value> = bounded(
            self.request_timeout,
            command.query_async(&mut self.connection),
        )
        .await?;

        parse_claimed(reply).map_err(classify)
    }

    async fn ack(&mut self, queue: &str, id: &str) -> Result<(), TransportError> {
        // Settled entries are removed so that the stream only holds outstanding work
        let mut pipe = redis::pipe();
        pipe.atomic()
            .xack(queue, CONSUMER_GROUP, &[id])
            .ignore()
            .xdel(queue, &[id])
            .ignore();

        bounded::<(), _>(self.request_timeout, pipe.query_async(&mut self.connection)).await
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        let command = redis::cmd("PING");
        bounded::<String, _>(self.request_timeout, command.query_async(&mut self.connection))
            .await
            .map(drop)
    }
}
