//! Observer websocket server and the drain task.

use super::error::NotifierError;
use super::service::Shared;
use crate::config::NotifierSettings;
use async_channel::TrySendError;
use async_tungstenite::tungstenite::Message;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Bind the listener on the caller's thread, then move the server onto a
/// dedicated thread running its own current-thread runtime.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    settings: &NotifierSettings,
) -> Result<SocketAddr, NotifierError> {
    let bind_error = |source: std::io::Error| NotifierError::Bind {
        addr: settings.bind_addr.clone(),
        source,
    };
    let listener = std::net::TcpListener::bind(settings.bind_addr.as_str()).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    let addr = listener.local_addr().map_err(bind_error)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(NotifierError::Runtime)?;

    let drain_interval = settings.drain_interval();
    let capacity = settings.observer_capacity.max(1);
    thread::Builder::new()
        .name("notifier".to_string())
        .spawn(move || runtime.block_on(serve(listener, shared, drain_interval, capacity)))
        .map_err(NotifierError::Thread)?;

    Ok(addr)
}

async fn serve(
    listener: std::net::TcpListener,
    shared: Arc<Shared>,
    drain_interval: Duration,
    capacity: usize,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to register observer listener: {err}");
            return;
        }
    };
    let acceptor = tokio::spawn(accept_loop(listener, Arc::clone(&shared), capacity));

    let mut ticker = tokio::time::interval(drain_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    while shared.is_alive() {
        ticker.tick().await;
        fan_out(&shared);
    }

    acceptor.abort();
    shared.clear_observers();
    info!("Websocket loop exiting.");
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, capacity: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "Observer connecting");
                tokio::spawn(serve_observer(stream, Arc::clone(&shared), capacity));
            }
            Err(err) => warn!("Failed to accept observer connection: {err}"),
        }
    }
}

/// Send every queued event to every registered observer.
///
/// Returns the number of frames handed to observer channels. A full
/// channel drops the frame for that observer only.
pub(crate) fn fan_out(shared: &Shared) -> usize {
    let events = shared.take_queue();
    if events.is_empty() {
        return 0;
    }

    let observers = shared.observers();
    let mut delivered = 0;
    for event in events {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                error!(level = ?event.level, "Failed to serialize status event: {err}");
                continue;
            }
        };
        for (id, outbound) in &observers {
            match outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(observer = %id, "Observer is lagging, dropping status frame")
                }
                Err(TrySendError::Closed(_)) => debug!(observer = %id, "Observer channel closed"),
            }
        }
    }
    delivered
}

async fn serve_observer(stream: TcpStream, shared: Arc<Shared>, capacity: usize) {
    let socket = match async_tungstenite::tokio::accept_async(stream).await {
        Ok(socket) => socket,
        Err(err) => {
            warn!("Observer websocket handshake failed: {err}");
            return;
        }
    };

    let id = Uuid::new_v4();
    let (mut sink, mut inbound) = socket.split();
    let (outbound, frames) = async_channel::bounded::<String>(capacity);
    shared.add_observer(id, outbound);
    info!(observer = %id, "Observer connected");

    let writer = tokio::spawn(async move {
        while let Ok(frame) = frames.recv().await {
            if let Err(err) = sink.send(Message::text(frame)).await {
                debug!(observer = %id, "Failed to send status frame: {err}");
                break;
            }
        }
    });

    // Observers are write-only; inbound frames are read to notice closes.
    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    shared.remove_observer(&id);
    writer.abort();
    info!(observer = %id, "Observer disconnected");
}
