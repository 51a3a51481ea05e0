//! Server network layer: WebSocket connections feeding a single event hub
//!
//! Each accepted socket gets its own task that performs the handshake,
//! decodes inbound frames and forwards them to the hub, plus a writer task
//! draining that connection's outbound queue. The hub is the only place the
//! lifecycle manager (and therefore the registry) is touched, so events are
//! applied one at a time in the order they arrived.

use crate::broadcast::{Dispatch, Outboxes};
use crate::config::{OriginPolicy, ServerConfig};
use crate::error::ServerError;
use crate::lifecycle::LifecycleManager;
use crate::spawn::SpawnPoint;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ActorId, ClientMessage, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

/// Messages sent from connection tasks to the hub
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        id: ActorId,
        addr: SocketAddr,
        outbox: mpsc::Sender<ServerMessage>,
    },
    Message {
        id: ActorId,
        message: ClientMessage,
    },
    Disconnected {
        id: ActorId,
    },
}

/// Single-writer event loop owning all shared server state
pub struct Hub {
    lifecycle: LifecycleManager,
    outboxes: Outboxes,
}

impl Hub {
    pub fn new(spawn: SpawnPoint) -> Self {
        Self {
            lifecycle: LifecycleManager::new(spawn),
            outboxes: Outboxes::new(),
        }
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected { id, addr, outbox } => {
                debug!("Connection {} registered from {}", id, addr);
                self.outboxes.register(id, outbox);
                let dispatches = self.lifecycle.connect(id);
                self.deliver(&dispatches);
            }
            NetworkEvent::Message { id, message } => {
                let dispatches = self.lifecycle.handle_message(id, message);
                self.deliver(&dispatches);
            }
            NetworkEvent::Disconnected { id } => {
                let dispatches = self.lifecycle.disconnect(id);
                self.deliver(&dispatches);
                self.outboxes.unregister(id);
            }
        }
    }

    fn deliver(&self, dispatches: &[Dispatch]) {
        if dispatches.is_empty() {
            return;
        }
        let report = self
            .outboxes
            .deliver_all(dispatches, self.lifecycle.registry());
        if report.dropped > 0 {
            debug!(
                "Delivered {} messages, dropped {}",
                report.queued, report.dropped
            );
        }
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<NetworkEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        info!("Event hub shutting down");
    }
}

/// Listening relay server
pub struct Server {
    listener: TcpListener,
    origins: Arc<OriginPolicy>,
    spawn: SpawnPoint,
    outbound_queue: usize,
    next_id: u64,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            origins: Arc::new(config.origin_policy()),
            spawn: SpawnPoint::resolve(config.map.as_deref()),
            outbound_queue: config.outbound_queue as usize,
            next_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the hub goes away.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(Hub::new(self.spawn).run(event_rx));

        info!("Server started successfully");

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            if event_tx.is_closed() {
                return Err(ServerError::HubClosed);
            }

            let id = ActorId(self.next_id);
            self.next_id += 1;

            let connection = Connection {
                id,
                addr,
                events: event_tx.clone(),
                origins: Arc::clone(&self.origins),
                outbound_queue: self.outbound_queue,
            };

            tokio::spawn(async move {
                if let Err(e) = connection.serve(stream).await {
                    debug!("Connection {} from {} ended: {}", id, addr, e);
                }
            });
        }
    }
}

struct Connection {
    id: ActorId,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<NetworkEvent>,
    origins: Arc<OriginPolicy>,
    outbound_queue: usize,
}

impl Connection {
    async fn serve(self, stream: TcpStream) -> Result<(), ServerError> {
        let origins = Arc::clone(&self.origins);
        let addr = self.addr;
        let check_origin =
            move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                let origin = request
                    .headers()
                    .get(header::ORIGIN)
                    .map(|value| value.to_str().unwrap_or_default());

                if origins.allows(origin) {
                    Ok(response)
                } else {
                    warn!("Rejecting {} with origin {:?}", addr, origin);
                    let mut rejection = ErrorResponse::new(Some("origin not allowed".to_string()));
                    *rejection.status_mut() = StatusCode::FORBIDDEN;
                    Err(rejection)
                }
            };

        let websocket = match tokio_tungstenite::accept_hdr_async(stream, check_origin).await {
            Ok(websocket) => websocket,
            // Refused by the origin check, already logged there
            Err(e @ tungstenite::Error::Http(_)) => return Err(e.into()),
            Err(e) => {
                error!("WebSocket handshake with {} failed: {}", addr, e);
                return Err(e.into());
            }
        };
        let (mut sink, mut inbound) = websocket.split();
        let (outbox, mut outbound) = mpsc::channel::<ServerMessage>(self.outbound_queue);

        self.events
            .send(NetworkEvent::Connected {
                id: self.id,
                addr: self.addr,
                outbox,
            })
            .map_err(|_| ServerError::HubClosed)?;

        let id = self.id;
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound.recv().await {
                let text = match message.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {} for {}: {}", message.event_name(), id, e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!("Write to connection {} failed: {}", id, e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let result = self.read_frames(&mut inbound).await;

        // The hub drops the outbox on disconnect, which ends the writer
        let _ = self.events.send(NetworkEvent::Disconnected { id: self.id });
        let _ = writer.await;

        result
    }

    async fn read_frames(
        &self,
        inbound: &mut SplitStream<WebSocketStream<TcpStream>>,
    ) -> Result<(), ServerError> {
        while let Some(frame) = inbound.next().await {
            let decoded = match frame? {
                Message::Text(text) => ClientMessage::decode(&text),
                Message::Binary(bytes) => ClientMessage::decode_bytes(&bytes),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match decoded {
                Ok(message) => self
                    .events
                    .send(NetworkEvent::Message {
                        id: self.id,
                        message,
                    })
                    .map_err(|_| ServerError::HubClosed)?,
                Err(e) => debug!("Dropping malformed frame from connection {}: {}", self.id, e),
            }
        }

        Ok(())
    }
}
