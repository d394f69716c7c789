//! Emulated station state.
//!
//! Each [`Interface`] impersonates one radio: a callsign, a grid locator,
//! and a tuning made of a mutable dial plus a fixed audio offset. The
//! interface owns the connections accepted on its TCP port; the registry of
//! interfaces is built at boot and read-only afterwards.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::InterfaceConfig;
use crate::network::connection::{ConnId, ConnectionHandle};
use crate::protocol::Message;
use crate::util;

/// Dial and connection set share one lock: a dial update and a connection
/// enumeration are mutually exclusive, so no broadcast ever sees a
/// half-updated interface.
struct Inner {
    dial: u64,
    connections: Vec<ConnectionHandle>,
}

/// One emulated station
pub struct Interface {
    name: String,
    port: u16,
    callsign: String,
    grid: String,
    offset: u64,
    inner: RwLock<Inner>,
}

impl Interface {
    /// Creates an interface from its boot-time configuration
    pub fn new(config: &InterfaceConfig) -> Self {
        Interface {
            name: config.name.clone(),
            port: config.port,
            callsign: config.callsign.clone(),
            grid: config.maidenhead.clone(),
            offset: config.offset,
            inner: RwLock::new(Inner {
                dial: config.frequency,
                connections: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn grid(&self) -> &str {
        &self.grid
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current dial frequency in Hz
    pub fn dial(&self) -> u64 {
        self.inner.read().dial
    }

    /// Emitted signal frequency: dial plus audio offset, always derived
    pub fn freq(&self) -> u64 {
        self.inner.read().dial + self.offset
    }

    /// Updates the dial and pushes a STATION.STATUS to every connection
    /// attached to this interface
    pub fn set_dial(&self, dial: u64) {
        let mut inner = self.inner.write();
        inner.dial = dial;

        let status = Message::station_status(dial, self.offset, util::station_status_id());
        for conn in &inner.connections {
            conn.send(status.clone());
        }
    }

    /// Attaches a newly accepted connection
    pub fn attach(&self, conn: ConnectionHandle) {
        self.inner.write().connections.push(conn);
    }

    /// Removes a connection; enqueued output for it is discarded
    pub fn detach(&self, id: ConnId) {
        self.inner.write().connections.retain(|c| c.id() != id);
    }

    /// Snapshot of the live connections
    pub fn connections(&self) -> Vec<ConnectionHandle> {
        self.inner.read().connections.clone()
    }

    /// Enqueues one message on every attached connection
    pub fn broadcast(&self, message: Message) {
        for conn in &self.inner.read().connections {
            conn.send(message.clone());
        }
    }

    /// Drops all connections, letting their writers drain and exit
    pub fn clear_connections(&self) {
        self.inner.write().connections.clear();
    }
}

/// Boot-built set of interfaces, keyed by configuration order
pub struct Registry {
    interfaces: Vec<Arc<Interface>>,
}

impl Registry {
    /// Builds the registry from validated configuration
    pub fn new(configs: &[InterfaceConfig]) -> Self {
        Registry {
            interfaces: configs.iter().map(|c| Arc::new(Interface::new(c))).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Interface>> {
        self.interfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Interface>> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    /// Broadcast fabric: every *other* interface currently tuned to the
    /// origin's dial frequency, in stable configuration order
    pub fn co_channel(&self, origin: &Arc<Interface>) -> Vec<Arc<Interface>> {
        let dial = origin.dial();
        self.interfaces
            .iter()
            .filter(|i| !Arc::ptr_eq(i, origin) && i.dial() == dial)
            .cloned()
            .collect()
    }
}
