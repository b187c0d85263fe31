use crate::library::communication::event::{QueueDescriptor, RawPublisher};
use crate::library::communication::implementation::json::JsonPublisher;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("mock publisher has been told to fail")]
pub struct MockPublishError;

/// Publisher which records every message instead of sending it anywhere
#[derive(Clone, Default)]
pub struct MockPublisher {
    published: Arc<Mutex<Vec<(String, Value)>>>,
    failing: Arc<AtomicBool>,
}

impl MockPublisher {
    /// Makes all subsequent publishes fail
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All messages published so far, paired with the queue key
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }

    /// Messages published to a given queue, parsed into the requested type
    pub fn published_to<T: DeserializeOwned>(&self, queue: &str) -> Vec<T> {
        self.published()
            .into_iter()
            .filter(|(key, _)| key == queue)
            .map(|(_, value)| serde_json::from_value(value).unwrap())
            .collect()
    }
}

impl JsonPublisher for MockPublisher {}

#[async_trait]
impl RawPublisher for MockPublisher {
    async fn publish_raw(&self, data: &[u8], queue: &QueueDescriptor) -> EmptyResult {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MockPublishError.into());
        }

        let value = serde_json::from_slice(data)?;
        println!("PUB {} {}", queue.key(), String::from_utf8_lossy(data));

        self.published
            .lock()
            .unwrap()
            .push((queue.key().to_owned(), value));

        Ok(())
    }
}
