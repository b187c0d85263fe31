//! Trait implementations using [`redis`](::redis)
//!
//! Queues are mapped onto [Redis Streams](https://redis.io/topics/streams-intro). Every queue is
//! a stream with the literal queue name and a single consumer group shared by all consumers.
//! Rejected deliveries which should be redelivered are appended to the stream again with an
//! incremented attempt counter before the original delivery is acknowledged. Acknowledged
//! entries are deleted from the stream, streams are never trimmed by length.
//!
//! Deliveries left unsettled by a consumer that went away are taken over by the remaining
//! consumers with `XAUTOCLAIM`, which requires Redis 6.2 or newer.

mod connector;

pub use connector::*;

const CONSUMER_GROUP: &str = "workers";
const STREAM_PAYLOAD_KEY: &str = "payload";
const STREAM_ATTEMPT_KEY: &str = "attempt";
const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_ADDITIONS: &str = ">";
const STREAM_ID_CLAIM_START: &str = "0-0";
