//! TCP listener for simulated endpoint sessions.

use super::auth::Authenticator;
use super::connection::Connection;
use super::ServerError;
use crate::catalog::EventCatalog;
use cr_config::ServerConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

/// Listener statistics
#[derive(Debug, Default)]
pub struct ListenerStats {
    /// Total connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub connections_active: AtomicU64,
    /// Connections rejected due to limit
    pub connections_rejected: AtomicU64,
}

/// Accepts clients and runs one simulated session per connection.
pub struct SimulationServer {
    listener: TcpListener,
    catalog: Arc<EventCatalog>,
    auth: Arc<Authenticator>,
    secondary_credential: String,
    max_connections: usize,
    stats: Arc<ListenerStats>,
    shutdown_rx: broadcast::Receiver<()>,
    /// None = unlimited
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SimulationServer {
    /// Bind to the configured address with an already loaded catalog.
    pub async fn bind(
        config: &ServerConfig,
        catalog: Arc<EventCatalog>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self, ServerError> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        let connection_semaphore = if config.max_connections > 0 {
            info!(
                "Listening on {} (max {} connections)",
                address, config.max_connections
            );
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            info!("Listening on {} (unlimited connections)", address);
            None
        };

        Ok(Self {
            listener,
            catalog,
            auth: Arc::new(Authenticator::from_config(config)),
            secondary_credential: config.secondary_credential.clone(),
            max_connections: config.max_connections,
            stats: Arc::new(ListenerStats::default()),
            shutdown_rx,
            connection_semaphore,
        })
    }

    /// Load the configured catalog, then bind.
    pub async fn from_config(
        config: &ServerConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self, ServerError> {
        let catalog = EventCatalog::load(&config.catalog_path)?;
        Self::bind(config, Arc::new(catalog), shutdown_rx).await
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until shutdown.
    pub async fn run(mut self) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let permit = if let Some(ref semaphore) = self.connection_semaphore {
                                match semaphore.clone().try_acquire_owned() {
                                    Ok(permit) => Some(permit),
                                    Err(_) => {
                                        warn!(
                                            "Connection from {} rejected: max connections ({}) reached",
                                            addr, self.max_connections
                                        );
                                        self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                                        drop(stream);
                                        continue;
                                    }
                                }
                            } else {
                                None
                            };

                            debug!("Accepted connection from {}", addr);
                            self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let connection = Connection::new(
                                stream,
                                addr.to_string(),
                                Arc::clone(&self.catalog),
                                Arc::clone(&self.auth),
                                self.secondary_credential.clone(),
                                self.shutdown_rx.resubscribe(),
                            );
                            let stats = Arc::clone(&self.stats);

                            tokio::spawn(async move {
                                // Held for the connection's lifetime.
                                let _permit = permit;
                                if let Err(e) = connection.handle().await {
                                    warn!("Connection from {} error: {}", addr, e);
                                }
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                debug!("Connection from {} closed", addr);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        info!(
            "Listener stopped. Total: {}, Active: {}, Rejected: {}",
            self.stats.connections_accepted.load(Ordering::Relaxed),
            self.stats.connections_active.load(Ordering::Relaxed),
            self.stats.connections_rejected.load(Ordering::Relaxed)
        );
        Ok(())
    }
}
