//! Client side of the relay protocol.
//!
//! [`PiineClient`] opens one WebSocket to the relay, sends `send_piine`, and
//! dispatches `receive_piine` / `join` / `leave` to registered handlers.
//! Each registration is held by a [`ListenerGuard`]; dropping the guard
//! removes the handler, and [`PiineClient::close`] removes all of them, so a
//! disposed view is never called back.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::domain::{RelayEvent, SessionId};
use crate::error::RelayError;
use crate::ws::messages::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handler = Arc<dyn Fn(SessionId) + Send + Sync>;

/// Inbound event kinds a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A peer sent a piine.
    ReceivePiine,
    /// A peer connected.
    Join,
    /// A peer disconnected.
    Leave,
}

impl EventKind {
    /// Returns the kind and payload of an inbound event.
    #[must_use]
    pub const fn of(event: RelayEvent) -> (Self, SessionId) {
        match event {
            RelayEvent::Ping(id) => (Self::ReceivePiine, id),
            RelayEvent::Join(id) => (Self::Join, id),
            RelayEvent::Leave(id) => (Self::Leave, id),
        }
    }
}

struct Registration {
    kind: EventKind,
    /// Cleared when the guard drops, so a snapshot taken earlier skips it.
    active: AtomicBool,
    handler: Handler,
}

#[derive(Default)]
struct Listeners {
    next_key: u64,
    entries: HashMap<u64, Arc<Registration>>,
}

impl Listeners {
    fn insert(&mut self, kind: EventKind, handler: Handler) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        let registration = Registration {
            kind,
            active: AtomicBool::new(true),
            handler,
        };
        self.entries.insert(key, Arc::new(registration));
        key
    }

    fn remove(&mut self, key: u64) {
        if let Some(registration) = self.entries.remove(&key) {
            registration.active.store(false, Ordering::Release);
        }
    }

    fn clear(&mut self) {
        for (_, registration) in self.entries.drain() {
            registration.active.store(false, Ordering::Release);
        }
    }

    fn matching(&self, kind: EventKind) -> Vec<Arc<Registration>> {
        self.entries
            .values()
            .filter(|registration| registration.kind == kind)
            .map(Arc::clone)
            .collect()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("next_key", &self.next_key)
            .field("registered", &self.entries.len())
            .finish()
    }
}

type SharedListeners = Arc<RwLock<Listeners>>;

fn register(listeners: &SharedListeners, kind: EventKind, handler: Handler) -> ListenerGuard {
    let key = listeners
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(kind, handler);
    ListenerGuard {
        key,
        listeners: Arc::downgrade(listeners),
    }
}

/// Calls every active handler for `event` and returns how many ran.
///
/// Handlers run after the lock is released, so they may register handlers
/// or drop guards, including their own.
fn dispatch(listeners: &SharedListeners, event: RelayEvent) -> usize {
    let (kind, id) = EventKind::of(event);
    let snapshot = listeners
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .matching(kind);
    let mut called = 0;
    for registration in snapshot {
        if registration.active.load(Ordering::Acquire) {
            (registration.handler)(id);
            called += 1;
        }
    }
    called
}

/// Keeps one handler registered; dropping it deregisters the handler.
#[derive(Debug)]
#[must_use = "dropping the guard deregisters the handler immediately"]
pub struct ListenerGuard {
    key: u64,
    listeners: Weak<RwLock<Listeners>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(self.key);
        }
    }
}

/// One open channel to the relay.
pub struct PiineClient {
    sink: Mutex<SplitSink<WsStream, Message>>,
    listeners: SharedListeners,
    reader: JoinHandle<()>,
}

impl PiineClient {
    /// Opens a WebSocket to `url` (e.g. `ws://127.0.0.1:8888/`) and starts
    /// dispatching inbound events.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, source) = stream.split();
        let listeners = SharedListeners::default();
        let reader = tokio::spawn(read_loop(source, Arc::clone(&listeners)));

        Ok(Self {
            sink: Mutex::new(sink),
            listeners,
            reader,
        })
    }

    /// Registers `handler` for every inbound event of `kind`.
    ///
    /// Handlers run on the client's reader task. A handler may drop its own
    /// guard; it is not called again afterwards.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerGuard
    where
        F: Fn(SessionId) + Send + Sync + 'static,
    {
        register(&self.listeners, kind, Arc::new(handler))
    }

    /// Number of currently registered handlers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Asks the relay to broadcast a piine to every other client.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the frame cannot be written.
    pub async fn send_piine(&self) -> Result<(), RelayError> {
        let json = Frame::send_piine().to_json()?;
        self.sink.lock().await.send(Message::text(json)).await?;
        Ok(())
    }

    /// Deregisters every handler and closes the channel.
    ///
    /// No handler is invoked after this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the close frame cannot be sent.
    pub async fn close(mut self) -> Result<(), RelayError> {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.reader.abort();
        // A dispatch already in progress finishes before the task stops.
        let _ = (&mut self.reader).await;
        self.sink.lock().await.close().await?;
        Ok(())
    }
}

impl fmt::Debug for PiineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiineClient")
            .field("listeners", &self.listener_count())
            .field("reader_finished", &self.reader.is_finished())
            .finish_non_exhaustive()
    }
}

impl Drop for PiineClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut source: SplitStream<WsStream>, listeners: SharedListeners) {
    while let Some(msg) = source.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match Frame::parse(text.as_str()).and_then(RelayEvent::try_from) {
                    Ok(event) => {
                        dispatch(&listeners, event);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "ignored relay frame");
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "relay connection failed");
                break;
            }
        }
    }
    tracing::debug!("relay connection closed");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn registered(listeners: &SharedListeners) -> usize {
        listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[test]
    fn dispatch_only_calls_matching_kind() {
        let joins = Arc::new(AtomicUsize::new(0));
        let pings = Arc::new(AtomicUsize::new(0));
        let listeners = SharedListeners::default();
        let _join = register(&listeners, EventKind::Join, counting_handler(&joins));
        let _ping = register(&listeners, EventKind::ReceivePiine, counting_handler(&pings));

        assert_eq!(dispatch(&listeners, RelayEvent::Join(SessionId::new(1))), 1);
        assert_eq!(dispatch(&listeners, RelayEvent::Leave(SessionId::new(1))), 0);
        assert_eq!(joins.load(Ordering::SeqCst), 1);
        assert_eq!(pings.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_receives_sender_id() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let listeners = SharedListeners::default();
        let _guard = register(
            &listeners,
            EventKind::ReceivePiine,
            Arc::new(move |id| {
                sink.store(usize::try_from(id.get()).unwrap_or(usize::MAX), Ordering::SeqCst);
            }),
        );
        dispatch(&listeners, RelayEvent::Ping(SessionId::new(41)));
        assert_eq!(seen.load(Ordering::SeqCst), 41);
    }

    #[test]
    fn guard_drop_deregisters() {
        let listeners = SharedListeners::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = register(&listeners, EventKind::Leave, counting_handler(&counter));
        drop(guard);

        assert_eq!(registered(&listeners), 0);
        assert_eq!(dispatch(&listeners, RelayEvent::Leave(SessionId::new(0))), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_can_drop_its_own_guard() {
        let listeners = SharedListeners::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<StdMutex<Option<ListenerGuard>>> = Arc::default();

        let handler: Handler = {
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let guard = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                drop(guard);
            })
        };
        let guard = register(&listeners, EventKind::ReceivePiine, handler);
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(guard);

        assert_eq!(dispatch(&listeners, RelayEvent::Ping(SessionId::new(3))), 1);
        assert_eq!(dispatch(&listeners, RelayEvent::Ping(SessionId::new(3))), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registered(&listeners), 0);
    }

    #[test]
    fn handler_dropped_mid_dispatch_is_skipped() {
        let listeners = SharedListeners::default();
        let later = Arc::new(AtomicUsize::new(0));
        let slot: Arc<StdMutex<Vec<ListenerGuard>>> = Arc::default();

        let first: Handler = {
            let slot = Arc::clone(&slot);
            Arc::new(move |_| {
                slot.lock().unwrap_or_else(PoisonError::into_inner).clear();
            })
        };
        let first = register(&listeners, EventKind::Join, first);
        let second = register(&listeners, EventKind::Join, counting_handler(&later));
        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([first, second]);

        // Whichever handler runs first clears both registrations.
        let called = dispatch(&listeners, RelayEvent::Join(SessionId::new(2)));
        assert!(called >= 1);
        assert_eq!(registered(&listeners), 0);
        assert_eq!(dispatch(&listeners, RelayEvent::Join(SessionId::new(2))), 0);
    }

    #[test]
    fn handler_can_register_another_handler() {
        let listeners = SharedListeners::default();
        let nested = Arc::new(AtomicUsize::new(0));
        let kept: Arc<StdMutex<Vec<ListenerGuard>>> = Arc::default();

        let handler: Handler = {
            let registry = Arc::clone(&listeners);
            let nested = Arc::clone(&nested);
            let kept = Arc::clone(&kept);
            Arc::new(move |_| {
                let guard = register(&registry, EventKind::Leave, counting_handler(&nested));
                kept.lock().unwrap_or_else(PoisonError::into_inner).push(guard);
            })
        };
        let _outer = register(&listeners, EventKind::Join, handler);

        assert_eq!(dispatch(&listeners, RelayEvent::Join(SessionId::new(1))), 1);
        assert_eq!(dispatch(&listeners, RelayEvent::Leave(SessionId::new(1))), 1);
        assert_eq!(nested.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_outliving_registry_is_harmless() {
        let listeners = SharedListeners::default();
        let guard = ListenerGuard {
            key: 0,
            listeners: Arc::downgrade(&listeners),
        };
        drop(listeners);
        drop(guard);
    }
}
