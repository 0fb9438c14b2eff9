use crate::{config::BusConfig, error::BusError};
use parking_lot::Mutex;
use redis::Commands;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tradehive_integration::Envelope;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

type Handler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// A `(channel, handler)` pair, replayed against a fresh `PubSub` session whenever the
/// listener reconnects (§4.3.1 — the prototype's unimplemented resubscribe, fixed here).
#[derive(Clone)]
struct Subscription {
    channel: String,
    handler: Handler,
}

/// Pub/sub fabric over the three named channels (§4.3). One listener thread per instance
/// drains messages and dispatches them to registered handlers; handlers run on the listener
/// thread and must not block.
pub struct CommunicationBus {
    client: redis::Client,
    publish_conn: Mutex<Option<redis::Connection>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    stop: Arc<AtomicBool>,
    listener: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CommunicationBus {
    /// Connects to Redis and starts the listener thread. Construction does not fail if the
    /// initial connection attempt fails — the listener retries with backoff, matching the
    /// prototype's lazy-reconnect behaviour.
    pub fn connect(config: BusConfig) -> Result<Self, BusError> {
        let client = redis::Client::open(config.to_redis_url())?;
        let publish_conn = client.get_connection().ok();

        let bus = Self {
            client,
            publish_conn: Mutex::new(publish_conn),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(false)),
            listener: Mutex::new(None),
        };
        bus.start_listener();
        Ok(bus)
    }

    fn start_listener(&self) {
        let client = self.client.clone();
        let subscriptions = Arc::clone(&self.subscriptions);
        let stop = Arc::clone(&self.stop);

        let handle = thread::spawn(move || listener_loop(client, subscriptions, stop));
        *self.listener.lock() = Some(handle);
    }

    /// Whether the publish-side connection is currently usable.
    pub fn is_ready(&self) -> bool {
        self.publish_conn.lock().is_some()
    }

    /// Publishes `envelope` as JSON on `channel`. Returns `false` (never panics) on any
    /// connection failure; callers proceed without coordination per §7's `BusUnavailable`.
    pub fn publish(&self, channel: &str, envelope: &Envelope) -> bool {
        let payload = match serde_json::to_string(envelope) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, channel, "failed to encode envelope for publish");
                return false;
            }
        };

        let mut guard = self.publish_conn.lock();
        if guard.is_none() {
            *guard = self.client.get_connection().ok();
        }

        let Some(conn) = guard.as_mut() else {
            tracing::warn!(channel, "cannot publish, redis connection not ready");
            return false;
        };

        match conn.publish::<_, _, i64>(channel, payload) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(%error, channel, "publish failed, dropping connection for retry");
                *guard = None;
                false
            }
        }
    }

    /// Registers `handler` for `channel`. Subscribing twice to the same `(channel, worker)`
    /// pair within one process is a caller error per §5, but is not itself rejected here.
    pub fn subscribe<F>(&self, channel: impl Into<String>, handler: F)
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        self.subscriptions.lock().push(Subscription {
            channel: channel.into(),
            handler: Arc::new(handler),
        });
    }

    /// Signals the listener thread to stop. Does not join; the thread observes the flag at
    /// its next ~1s poll boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for CommunicationBus {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listener_loop(client: redis::Client, subscriptions: Arc<Mutex<Vec<Subscription>>>, stop: Arc<AtomicBool>) {
    tracing::info!("bus listener thread started");

    'reconnect: loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let mut conn = match client.get_connection() {
            Ok(conn) => conn,
            Err(error) => {
                tracing::warn!(%error, "bus listener failed to connect, retrying");
                thread::sleep(RECONNECT_BACKOFF);
                continue;
            }
        };
        if let Err(error) = conn.set_read_timeout(Some(POLL_TIMEOUT)) {
            tracing::warn!(%error, "failed to set redis read timeout");
            thread::sleep(RECONNECT_BACKOFF);
            continue;
        }

        let mut pubsub = conn.as_pubsub();
        let mut subscribed_channels: HashSet<String> = HashSet::new();
        sync_subscriptions(&mut pubsub, &subscriptions, &mut subscribed_channels);

        loop {
            if stop.load(Ordering::SeqCst) {
                break 'reconnect;
            }

            sync_subscriptions(&mut pubsub, &subscriptions, &mut subscribed_channels);

            match pubsub.get_message() {
                Ok(message) => dispatch(message, &subscriptions),
                Err(error) if error.is_timeout() => continue,
                Err(error) => {
                    tracing::warn!(%error, "bus listener lost connection, reconnecting");
                    break;
                }
            }
        }

        thread::sleep(RECONNECT_BACKOFF);
    }

    tracing::info!("bus listener thread stopped");
}

fn sync_subscriptions(
    pubsub: &mut redis::PubSub<'_>,
    subscriptions: &Arc<Mutex<Vec<Subscription>>>,
    subscribed_channels: &mut HashSet<String>,
) {
    let channels: Vec<String> = subscriptions
        .lock()
        .iter()
        .map(|sub| sub.channel.clone())
        .collect();

    for channel in channels {
        if subscribed_channels.contains(&channel) {
            continue;
        }
        match pubsub.subscribe(&channel) {
            Ok(()) => {
                subscribed_channels.insert(channel.clone());
                tracing::debug!(channel, "bus listener subscribed");
            }
            Err(error) => tracing::warn!(%error, channel, "failed to subscribe"),
        }
    }
}

fn dispatch(message: redis::Msg, subscriptions: &Arc<Mutex<Vec<Subscription>>>) {
    let channel = message.get_channel_name().to_string();
    let payload: String = match message.get_payload() {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, channel, "bus message payload was not a string, dropping");
            return;
        }
    };

    let envelope: Envelope = match serde_json::from_str(&payload) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(%error, channel, payload, "dropping non-JSON bus message");
            return;
        }
    };

    let handlers: Vec<Handler> = subscriptions
        .lock()
        .iter()
        .filter(|sub| sub.channel == channel)
        .map(|sub| Arc::clone(&sub.handler))
        .collect();

    for handler in handlers {
        handler(envelope.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_connection_returns_false() {
        let client = redis::Client::open("redis://127.0.0.1:1/0").unwrap();
        let bus = CommunicationBus {
            client,
            publish_conn: Mutex::new(None),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(true)),
            listener: Mutex::new(None),
        };

        let envelope = Envelope::new(tradehive_integration::CHANNEL_AGENT_EVENTS, serde_json::json!({}));
        assert!(!bus.publish(tradehive_integration::CHANNEL_AGENT_EVENTS, &envelope));
        assert!(!bus.is_ready());
    }

    #[test]
    fn subscribe_registers_without_panicking() {
        let client = redis::Client::open("redis://127.0.0.1:1/0").unwrap();
        let bus = CommunicationBus {
            client,
            publish_conn: Mutex::new(None),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(true)),
            listener: Mutex::new(None),
        };

        bus.subscribe(tradehive_integration::CHANNEL_LEARNING_MODULE, |_| {});
        assert_eq!(bus.subscriptions.lock().len(), 1);
    }
}
