use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::core::GeneralSettings;
use crate::protocol::{kind, Message};
use crate::station::{Interface, Registry};
use crate::transmit::TransmitJob;

use super::connection::ConnectionHandle;

/// Everything a message handler can reach: global settings, the interface
/// registry, the interface the connection is attached to, the connection's
/// own outbound queue, and the transmit-job tracker
#[derive(Clone)]
pub struct HandlerCx {
    pub settings: GeneralSettings,
    pub registry: Arc<Registry>,
    pub interface: Arc<Interface>,
    pub conn: ConnectionHandle,
    pub jobs: TaskTracker,
}

/// A handler for one message type
pub type Handler = fn(&HandlerCx, Message);

/// Registration table mapping `type` strings to handlers.
///
/// New message types are added with [`Router::register`]; the read loop
/// never needs to change.
pub struct Router {
    handlers: HashMap<&'static str, Handler>,
}

impl Router {
    /// Creates an empty router
    pub fn new() -> Router {
        Router {
            handlers: HashMap::new(),
        }
    }

    /// Creates a router with the standard JS8Call service handlers
    pub fn standard() -> Router {
        let mut router = Router::new();
        router.register(kind::STATION_GET_CALLSIGN, on_get_callsign);
        router.register(kind::RIG_GET_FREQ, on_get_freq);
        router.register(kind::RIG_SET_FREQ, on_set_freq);
        router.register(kind::TX_SEND_MESSAGE, on_tx_send_message);
        router
    }

    /// Registers a handler for a message type
    pub fn register(&mut self, message_type: &'static str, handler: Handler) {
        self.handlers.insert(message_type, handler);
    }

    /// Routes one decoded message; unknown types are logged and ignored
    pub fn dispatch(&self, cx: &HandlerCx, message: Message) {
        match self.handlers.get(message.kind.as_str()) {
            Some(handler) => handler(cx, message),
            None => debug!(
                "{}: unknown message type {:?} ignored",
                cx.interface.name(),
                message.kind
            ),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

fn on_get_callsign(cx: &HandlerCx, message: Message) {
    let Some(id) = message.request_id() else {
        warn!(
            "{}: {} without usable _ID ignored",
            cx.interface.name(),
            message.kind
        );
        return;
    };
    cx.conn
        .send(Message::station_callsign(id, cx.interface.callsign()));
}

fn on_get_freq(cx: &HandlerCx, message: Message) {
    let Some(id) = message.request_id() else {
        warn!(
            "{}: {} without usable _ID ignored",
            cx.interface.name(),
            message.kind
        );
        return;
    };
    cx.conn.send(Message::rig_freq(
        id,
        cx.interface.dial(),
        cx.interface.offset(),
    ));
}

fn on_set_freq(cx: &HandlerCx, message: Message) {
    let Some(dial) = message.param_u64("DIAL") else {
        warn!(
            "{}: RIG.SET_FREQ without usable DIAL ignored",
            cx.interface.name()
        );
        return;
    };
    cx.interface.set_dial(dial);
}

fn on_tx_send_message(cx: &HandlerCx, message: Message) {
    let job = TransmitJob::new(
        cx.interface.clone(),
        &cx.registry,
        &cx.settings,
        message.value,
    );
    if let Some(job) = job {
        cx.jobs.spawn(job.run());
    }
}
