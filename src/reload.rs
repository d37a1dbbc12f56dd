//! Browser reload push channel.
//!
//! [`ReloadHub`] is a plain observer registry. The WebSocket server turns
//! every connected browser into one subscriber that forwards `"reload"`.

use crate::log;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    path::PathBuf,
    sync::{
        Arc, mpsc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};
use tungstenite::Message;

/// Output files changed; browsers should reload.
#[derive(Debug, Clone, Default)]
pub struct ReloadEvent {
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&ReloadEvent) + Send + Sync>;

#[derive(Default)]
pub struct ReloadHub {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&ReloadEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Call every subscriber on the current thread.
    ///
    /// Callbacks run without the lock held, so they may subscribe or
    /// unsubscribe.
    pub fn broadcast(&self, event: &ReloadEvent) -> usize {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in &snapshot {
            callback(event);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

// ============================================================================
// WebSocket server
// ============================================================================

/// Accept WebSocket clients on `addr` in the background.
///
/// Returns the bound address (useful with port 0).
pub fn start_reload_server(addr: SocketAddr, hub: Arc<ReloadHub>) -> Result<SocketAddr> {
    let listener =
        TcpListener::bind(addr).with_context(|| format!("Failed to bind reload server on {addr}"))?;
    let local = listener.local_addr()?;

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let hub = Arc::clone(&hub);
                    thread::spawn(move || serve_client(stream, &hub));
                }
                Err(e) => log!("reload"; "accept failed: {e}"),
            }
        }
    });

    Ok(local)
}

/// Forward broadcasts to one client until it goes away.
fn serve_client(stream: TcpStream, hub: &ReloadHub) {
    let mut socket = match tungstenite::accept(stream) {
        Ok(socket) => socket,
        Err(e) => {
            log!("reload"; "handshake failed: {e}");
            return;
        }
    };

    let (tx, rx) = mpsc::channel::<()>();
    let id = hub.subscribe(move |_| {
        let _ = tx.send(());
    });
    log!("reload"; "client connected ({} open)", hub.len());

    while rx.recv().is_ok() {
        if socket.send(Message::text("reload")).is_err() {
            break;
        }
    }
    hub.unsubscribe(id);
}
