use super::{BrokerConnection, Connector, TransportError};
use crate::library::communication::event::QueueDescriptor;
use futures::Future;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Connectivity as observed by the [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been attempted yet
    Disconnected,
    /// Initial connection attempts are in progress
    Connecting,
    /// A healthy connection is available
    Connected,
    /// A previously healthy connection failed and is being replaced
    Recovering,
}

/// Timing of connection attempts and health checks
#[derive(Debug, Clone, Copy)]
pub struct RecoveryOptions {
    reconnect_interval: Duration,
    connect_timeout: Duration,
    heartbeat_interval: Duration,
}

impl RecoveryOptions {
    /// Creates a new instance from raw parts
    pub fn new(reconnect_interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            reconnect_interval,
            connect_timeout,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Overrides how often an established connection is checked for liveness
    pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self
    }
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_INTERVAL, DEFAULT_CONNECT_TIMEOUT)
    }
}

/// Connection handed out by the [`ConnectionManager`] together with the generation it belongs to
///
/// The generation is used to tell apart failure reports concerning the current connection
/// from reports about connections that have long been replaced.
#[derive(Clone)]
pub struct Lease<T> {
    /// Connection to issue commands on
    pub connection: T,
    generation: u64,
}

impl<T> Lease<T> {
    /// Generation of the connection this lease belongs to, starting at one
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Installed<T> {
    connection: T,
    generation: u64,
}

struct Shared<C: Connector> {
    connector: C,
    options: RecoveryOptions,
    slot: RwLock<Option<Installed<C::Connection>>>,
    topology: Mutex<Vec<QueueDescriptor>>,
    state: watch::Sender<ConnectionState>,
    failures: mpsc::UnboundedSender<u64>,
}

struct Supervisor(JoinHandle<()>);

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owner of the broker connection of a process
///
/// Exactly one supervising task per manager establishes the connection, declares the known
/// topology on it and replaces it once it fails. Failures are either
/// [reported](ConnectionManager::report_failure) by users of the connection or detected by the
/// supervisor itself, which pings the connection at a fixed heartbeat interval.
/// Connection attempts are retried at a fixed interval without limit. While no connection is
/// available, [`ensure_connected`](ConnectionManager::ensure_connected) suspends its callers.
///
/// Clones share the same connection. The supervisor stops when the last clone is dropped.
pub struct ConnectionManager<C: Connector> {
    shared: Arc<Shared<C>>,
    _supervisor: Arc<Supervisor>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            _supervisor: self._supervisor.clone(),
        }
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a new manager and starts connecting in the background
    ///
    /// Has to be called from within a tokio runtime.
    pub fn new(connector: C, options: RecoveryOptions) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (failures, failure_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            connector,
            options,
            slot: RwLock::new(None),
            topology: Mutex::new(Vec::new()),
            state,
            failures,
        });

        let supervisor = tokio::spawn(supervise(shared.clone(), failure_rx));

        Self {
            shared,
            _supervisor: Arc::new(Supervisor(supervisor)),
        }
    }

    /// Current connectivity
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver which observes every change in connectivity
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Returns the current connection, waiting for it to be (re-)established if necessary
    pub async fn ensure_connected(&self) -> Result<Lease<C::Connection>, TransportError> {
        let mut state = self.shared.state.subscribe();

        loop {
            if let Some(lease) = self.shared.lease() {
                return Ok(lease);
            }

            state
                .changed()
                .await
                .map_err(|_| TransportError::Shutdown)?;
        }
    }

    /// Reports that the connection of the given lease is unusable
    ///
    /// The connection is withdrawn immediately, subsequent calls to
    /// [`ensure_connected`](ConnectionManager::ensure_connected) wait for its replacement.
    /// Reports for connections that have already been replaced are ignored so that
    /// concurrent users detecting the same failure trigger only one recovery.
    pub fn report_failure<T>(&self, lease: &Lease<T>) {
        if self.shared.withdraw(lease.generation) {
            self.shared.failures.send(lease.generation).ok();
        }
    }

    /// Runs an operation on the current connection
    ///
    /// When the connection turns out to be lost, the failure is reported and the operation is
    /// repeated once on the replacement. Operations therefore have to tolerate being applied
    /// twice.
    pub async fn with_connection<T, F, Fut>(&self, mut operation: F) -> Result<T, TransportError>
    where
        F: FnMut(C::Connection) -> Fut + Send,
        Fut: Future<Output = Result<T, TransportError>> + Send,
        T: Send,
    {
        let lease = self.ensure_connected().await?;

        match operation(lease.connection.clone()).await {
            Err(error) if error.is_connection_lost() => {
                debug!(?error, "Connection lost during operation, retrying on its replacement");
                self.report_failure(&lease);

                let lease = self.ensure_connected().await?;
                let result = operation(lease.connection.clone()).await;

                if let Err(error) = &result {
                    if error.is_connection_lost() {
                        self.report_failure(&lease);
                    }
                }

                result
            }
            result => result,
        }
    }

    /// Opens a dedicated connection for a long-running consumer
    ///
    /// Waits until the shared connection is available so that dedicated connections are never
    /// opened before the topology has been declared.
    pub async fn open_channel(&self) -> Result<Lease<C::Connection>, TransportError> {
        let lease = self.ensure_connected().await?;

        match self.shared.connector.connect().await {
            Ok(connection) => Ok(Lease {
                connection,
                generation: lease.generation,
            }),
            Err(error) => {
                if error.is_connection_lost() {
                    self.report_failure(&lease);
                }
                Err(error)
            }
        }
    }

    /// Adds the queue to the topology and declares it on the current connection
    ///
    /// The topology is declared again on every connection that replaces the current one.
    #[instrument(skip(self), fields(queue = queue.key()))]
    pub async fn declare(&self, queue: &QueueDescriptor) -> Result<(), TransportError> {
        {
            let mut topology = self
                .shared
                .topology
                .lock()
                .map_err(|_| TransportError::Shutdown)?;

            if !topology.contains(queue) {
                topology.push(queue.clone());
            }
        }

        let mut lease = self.ensure_connected().await?;
        match lease.connection.declare(queue).await {
            Ok(()) => Ok(()),
            // The replacement connection will declare it
            Err(error) if error.is_connection_lost() => {
                self.report_failure(&lease);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

impl<C: Connector> Shared<C> {
    fn read_slot(&self) -> RwLockReadGuard<'_, Option<Installed<C::Connection>>> {
        self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Installed<C::Connection>>> {
        self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lease(&self) -> Option<Lease<C::Connection>> {
        self.read_slot().as_ref().map(|installed| Lease {
            connection: installed.connection.clone(),
            generation: installed.generation,
        })
    }

    fn install(&self, connection: C::Connection, generation: u64) {
        *self.write_slot() = Some(Installed {
            connection,
            generation,
        });
        self.set_state(ConnectionState::Connected);
    }

    /// Removes the installed connection if it belongs to the given generation
    fn withdraw(&self, generation: u64) -> bool {
        let mut slot = self.write_slot();

        if slot.as_ref().map(|installed| installed.generation) != Some(generation) {
            return false;
        }

        slot.take();
        drop(slot);

        self.set_state(ConnectionState::Recovering);
        true
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);

        if previous != state {
            debug!(?previous, current = ?state, "Broker connectivity changed");
        }
    }

    fn topology(&self) -> Vec<QueueDescriptor> {
        match self.topology.lock() {
            Ok(topology) => topology.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn connect_and_declare(&self) -> Result<C::Connection, TransportError> {
        let mut connection = self.connector.connect().await?;

        for queue in self.topology() {
            connection.declare(&queue).await?;
        }

        Ok(connection)
    }

    async fn establish(&self) -> C::Connection {
        let mut attempt: usize = 0;

        loop {
            attempt += 1;

            match timeout(self.options.connect_timeout, self.connect_and_declare()).await {
                Ok(Ok(connection)) => return connection,
                Ok(Err(error)) => warn!(?error, attempt, "Unable to connect to broker"),
                Err(_) => warn!(attempt, "Timed out connecting to broker"),
            }

            sleep(self.options.reconnect_interval).await;
        }
    }
}

#[instrument(name = "broker", skip_all)]
async fn supervise<C: Connector>(
    shared: Arc<Shared<C>>,
    mut failures: mpsc::UnboundedReceiver<u64>,
) {
    let mut generation: u64 = 0;

    shared.set_state(ConnectionState::Connecting);

    loop {
        let connection = shared.establish().await;
        generation += 1;

        shared.install(connection.clone(), generation);
        info!(generation, "Connected to broker");

        watch_connection(&shared, connection, generation, &mut failures).await;

        shared.withdraw(generation);
        warn!(generation, "Lost connection to broker, recovering");
    }
}

/// Returns once the connection of the given generation has failed
async fn watch_connection<C: Connector>(
    shared: &Shared<C>,
    mut connection: C::Connection,
    generation: u64,
    failures: &mut mpsc::UnboundedReceiver<u64>,
) {
    loop {
        tokio::select! {
            failure = failures.recv() => match failure {
                Some(failed) if failed == generation => return,
                Some(stale) => debug!(stale, generation, "Ignoring stale connection failure"),
                // Unreachable as long as the shared state holds the sender
                None => return,
            },
            _ = sleep(shared.options.heartbeat_interval) => {
                let probe = timeout(shared.options.connect_timeout, connection.ping()).await;

                match probe {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) if !error.is_connection_lost() => {
                        debug!(?error, "Heartbeat rejected by broker");
                    }
                    Ok(Err(error)) => {
                        warn!(?error, generation, "Heartbeat failed");
                        return;
                    }
                    Err(_) => {
                        warn!(generation, "Heartbeat timed out");
                        return;
                    }
                }
            }
        }
    }
}
