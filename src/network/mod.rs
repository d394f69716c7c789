//! TCP front end for the emulator.
//!
//! One listener per configured interface; each accepted socket gets a
//! reader and a writer task, and decoded messages are routed through a
//! per-type handler table.

pub mod connection;
pub mod router;

pub use self::connection::{ConnId, ConnectionHandle};
pub use self::router::{HandlerCx, Router};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::core::{AppConfig, Error, GeneralSettings, Result};
use crate::station::{Interface, Registry};

/// How long shutdown waits for in-flight transmit jobs
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The emulator server: one TCP listener per configured interface
pub struct Server {
    settings: GeneralSettings,
    registry: Arc<Registry>,
    router: Arc<Router>,
    listeners: Vec<(Arc<Interface>, TcpListener)>,
    jobs: TaskTracker,
}

impl Server {
    /// Binds every configured interface. A refused port is fatal.
    pub async fn bind(config: AppConfig) -> Result<Server> {
        let registry = Arc::new(Registry::new(&config.interfaces));
        let mut listeners = Vec::with_capacity(registry.len());

        for iface in registry.iter() {
            let listener = TcpListener::bind(("127.0.0.1", iface.port()))
                .await
                .map_err(|e| {
                    Error::network(format!(
                        "{}: cannot listen on 127.0.0.1:{}: {}",
                        iface.name(),
                        iface.port(),
                        e
                    ))
                })?;
            let addr = listener.local_addr()?;
            info!(
                "{} listening on {} callsign={} dial={} offset={} grid={}",
                iface.name(),
                addr,
                iface.callsign(),
                iface.dial(),
                iface.offset(),
                iface.grid()
            );
            listeners.push((iface.clone(), listener));
        }

        Ok(Server {
            settings: config.general,
            registry,
            router: Arc::new(Router::standard()),
            listeners,
            jobs: TaskTracker::new(),
        })
    }

    /// The interface registry backing this server
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Actual bound address of an interface's listener
    pub fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|(iface, _)| iface.name() == name)
            .and_then(|(_, listener)| listener.local_addr().ok())
    }

    /// Runs until interrupted, then shuts down in an orderly way
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Runs until `shutdown` resolves. Listeners then stop accepting,
    /// in-flight transmit jobs finish under a grace timeout, and
    /// connections are dropped so their write queues drain.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut accept_tasks = Vec::with_capacity(self.listeners.len());
        for (iface, listener) in self.listeners.drain(..) {
            accept_tasks.push(tokio::spawn(accept_loop(
                listener,
                iface,
                self.settings,
                self.registry.clone(),
                self.router.clone(),
                self.jobs.clone(),
            )));
        }

        shutdown.await;
        info!("shutting down");

        for task in &accept_tasks {
            task.abort();
        }

        self.jobs.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.jobs.wait())
            .await
            .is_err()
        {
            warn!(
                "transmit jobs still running after {:?}; closing anyway",
                SHUTDOWN_GRACE
            );
        }

        for iface in self.registry.iter() {
            iface.clear_connections();
        }

        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    interface: Arc<Interface>,
    settings: GeneralSettings,
    registry: Arc<Registry>,
    router: Arc<Router>,
    jobs: TaskTracker,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("{} accepted connection from {}", interface.name(), peer);
                connection::spawn(
                    stream,
                    peer,
                    interface.clone(),
                    settings,
                    registry.clone(),
                    router.clone(),
                    jobs.clone(),
                );
            }
            Err(e) => {
                warn!("{} accept failed: {}", interface.name(), e);
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    }
}
