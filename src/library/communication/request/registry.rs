use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// Errors when registering a request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another caller is still waiting for a reply with the same id
    #[error("request id {0} is already outstanding")]
    DuplicateRequestId(String),
    /// Too many callers are waiting for replies
    #[error("more than {0} requests are outstanding")]
    CapacityExceeded(usize),
}

/// Errors when waiting for a reply
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    /// No reply arrived in time, any later reply will be dropped
    #[error("no response received within {0:?}")]
    TimedOut(Duration),
}

struct Waiter<T> {
    token: u64,
    sender: oneshot::Sender<T>,
}

struct Inner<T> {
    waiters: Mutex<HashMap<String, Waiter<T>>>,
    tokens: AtomicU64,
    capacity: usize,
}

impl<T> Inner<T> {
    fn waiters(&self) -> MutexGuard<'_, HashMap<String, Waiter<T>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Correlates replies with the callers waiting for them
///
/// Each registered request id is concluded exactly once, either by a reply passed to
/// [`complete`](ResponseRegistry::complete) or by the waiter timing out. The entry is removed in
/// both cases and later replies for the same id are ignored.
pub struct ResponseRegistry<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ResponseRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ResponseRegistry<T> {
    /// Creates a new registry which holds at most `capacity` outstanding requests
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                waiters: Mutex::new(HashMap::new()),
                tokens: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Starts waiting for a reply to the given request
    pub fn register(&self, request_id: impl Into<String>) -> Result<WaitHandle<T>, RegistryError> {
        let request_id = request_id.into();
        let mut waiters = self.inner.waiters();

        if waiters.contains_key(&request_id) {
            return Err(RegistryError::DuplicateRequestId(request_id));
        }

        if waiters.len() >= self.inner.capacity {
            return Err(RegistryError::CapacityExceeded(self.inner.capacity));
        }

        let token = self.inner.tokens.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        waiters.insert(request_id.clone(), Waiter { token, sender });

        Ok(WaitHandle {
            inner: self.inner.clone(),
            request_id,
            token,
            receiver,
        })
    }

    /// Hands the reply to the caller waiting for it
    ///
    /// Returns `false` when nobody is waiting for the request (anymore). In that case, the
    /// reply is dropped.
    pub fn complete(&self, request_id: &str, value: T) -> bool {
        let mut waiters = self.inner.waiters();

        // Delivery happens under the lock so that a timing out waiter sees either
        // its entry or the value, never neither
        match waiters.remove(request_id) {
            Some(waiter) => waiter.sender.send(value).is_ok(),
            None => false,
        }
    }

    /// Number of outstanding requests
    pub fn pending(&self) -> usize {
        self.inner.waiters().len()
    }
}

/// Pending reply of a registered request
///
/// Dropping the handle without waiting removes the registration.
pub struct WaitHandle<T> {
    inner: Arc<Inner<T>>,
    request_id: String,
    token: u64,
    receiver: oneshot::Receiver<T>,
}

impl<T> WaitHandle<T> {
    /// Id of the request this handle waits for
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the reply for at most the given duration
    pub async fn wait(mut self, duration: Duration) -> Result<T, WaitError> {
        match timeout(duration, &mut self.receiver).await {
            Ok(Ok(value)) => Ok(value),
            _ => {
                let removed = self.deregister();

                // The reply won the race if our entry is already gone
                match self.receiver.try_recv() {
                    Ok(value) if !removed => Ok(value),
                    _ => Err(WaitError::TimedOut(duration)),
                }
            }
        }
    }

    fn deregister(&self) -> bool {
        let mut waiters = self.inner.waiters();

        match waiters.get(&self.request_id) {
            Some(waiter) if waiter.token == self.token => {
                waiters.remove(&self.request_id);
                true
            }
            _ => false,
        }
    }
}

impl<T> Drop for WaitHandle<T> {
    fn drop(&mut self) {
        self.deregister();
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn deliver_completed_values() {
        let registry = ResponseRegistry::new(10);
        let handle = registry.register("a").unwrap();

        assert!(registry.complete("a", 42));
        assert_eq!(handle.wait(Duration::from_secs(1)).await, Ok(42));
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn time_out_without_reply() {
        let registry = ResponseRegistry::<usize>::new(10);
        let handle = registry.register("a").unwrap();

        let result = handle.wait(Duration::from_millis(10)).await;

        assert_eq!(result, Err(WaitError::TimedOut(Duration::from_millis(10))));
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn ignore_late_completion() {
        let registry = ResponseRegistry::new(10);
        let handle = registry.register("a").unwrap();
        handle.wait(Duration::from_millis(1)).await.unwrap_err();

        assert!(!registry.complete("a", 1));
        assert!(!registry.complete("a", 2));
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn ignore_repeated_completion() {
        let registry = ResponseRegistry::new(10);
        let handle = registry.register("a").unwrap();

        assert!(registry.complete("a", 1));
        assert!(!registry.complete("a", 2));
        assert_eq!(handle.wait(Duration::from_secs(1)).await, Ok(1));
    }

    #[test]
    fn reject_duplicate_ids() {
        let registry = ResponseRegistry::<()>::new(10);
        let _handle = registry.register("a").unwrap();

        assert_eq!(
            registry.register("a").err(),
            Some(RegistryError::DuplicateRequestId("a".into()))
        );
    }

    #[test]
    fn enforce_capacity() {
        let registry = ResponseRegistry::<()>::new(1);
        let _handle = registry.register("a").unwrap();

        assert_eq!(
            registry.register("b").err(),
            Some(RegistryError::CapacityExceeded(1))
        );
    }

    #[test]
    fn deregister_dropped_handles() {
        let registry = ResponseRegistry::<()>::new(10);
        let handle = registry.register("a").unwrap();
        drop(handle);

        assert_eq!(registry.pending(), 0);
        assert!(registry.register("a").is_ok());
    }

    #[test]
    fn keep_reused_ids_of_newer_registrations() {
        let registry = ResponseRegistry::new(10);
        let first = registry.register("a").unwrap();
        assert!(registry.complete("a", 1));

        let _second = registry.register("a").unwrap();
        drop(first);

        assert_eq!(registry.pending(), 1);
    }

    proptest! {
        #[test]
        fn conclude_exactly_once(completion_delay in 0u64..4, wait_duration in 0u64..4) {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_time()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let registry = ResponseRegistry::new(1);
                let handle = registry.register("race").unwrap();

                let completer = {
                    let registry = registry.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(completion_delay)).await;
                        registry.complete("race", "value")
                    })
                };

                let result = handle.wait(Duration::from_millis(wait_duration)).await;
                let delivered = completer.await.unwrap();

                // A delivered value is received, an undelivered one is a timeout
                prop_assert_eq!(delivered, result.is_ok());
                if let Ok(value) = result {
                    prop_assert_eq!(value, "value");
                }
                prop_assert_eq!(registry.pending(), 0);
                Ok(())
            })?;
        }
    }
}
