use crate::reconciler::{Interpolation, RemoteActor, ShadowChange, ShadowTable};
use crate::sampler::{IntentSampler, LocalIntent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{ActorId, ClientMessage, ProtocolError, ServerMessage, MOVEMENT_SEND_INTERVAL_MS};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Read-only picture of every remote actor, published once per render tick
pub type View = HashMap<ActorId, RemoteActor>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Minimum spacing between two `playerMovement` messages
    pub send_interval: Duration,
    /// How often shadows are advanced and the view republished
    pub render_interval: Duration,
    pub interpolation: Interpolation,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(MOVEMENT_SEND_INTERVAL_MS),
            render_interval: Duration::from_millis(16),
            interpolation: Interpolation::default(),
        }
    }
}

pub struct Client {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    sampler: IntentSampler,
    shadows: ShadowTable,
    settings: ClientSettings,
}

impl Client {
    /// Opens the socket and announces readiness.
    pub async fn connect(url: &str, settings: ClientSettings) -> Result<Self, ClientError> {
        info!("Connecting to {}...", url);
        let (socket, response) = tokio_tungstenite::connect_async(url).await?;
        debug!("Handshake completed with status {}", response.status());

        let mut client = Client {
            socket,
            sampler: IntentSampler::new(settings.send_interval),
            shadows: ShadowTable::new(settings.interpolation),
            settings,
        };

        client.send(ClientMessage::ClientReady).await?;
        info!("Connected, waiting for roster");

        Ok(client)
    }

    pub fn shadows(&self) -> &ShadowTable {
        &self.shadows
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), ClientError> {
        let text = message.encode()?;
        self.socket.send(Message::Text(text)).await?;
        Ok(())
    }

    fn handle_message(&mut self, message: ServerMessage) {
        if let ServerMessage::CurrentPlayers(roster) = &message {
            info!("Joined world with {} other actors", roster.len());
        }

        for change in self.shadows.apply(message) {
            match change {
                ShadowChange::Spawned(id) => info!("Actor {} appeared", id),
                ShadowChange::Despawned(id) => info!("Actor {} left", id),
            }
        }
    }

    fn handle_frame(&mut self, decoded: Result<ServerMessage, ProtocolError>) {
        match decoded {
            Ok(message) => self.handle_message(message),
            Err(e) => warn!("Ignoring malformed server frame: {}", e),
        }
    }

    /// Drives the session until the intent channel closes or the server
    /// hangs up, returning the final state of the shadow table.
    pub async fn run(
        mut self,
        mut intents: mpsc::Receiver<LocalIntent>,
        view: watch::Sender<View>,
    ) -> Result<ShadowTable, ClientError> {
        let mut render_interval = interval(self.settings.render_interval);
        render_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_render = Instant::now();

        loop {
            tokio::select! {
                frame = self.socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(ServerMessage::decode(&text));
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            self.handle_frame(ServerMessage::decode_bytes(&bytes));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Server closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                },

                intent = intents.recv() => {
                    match intent {
                        Some(intent) => {
                            if let Some(message) = self.sampler.sample(&intent, Instant::now()) {
                                self.send(message).await?;
                            }
                        }
                        None => {
                            info!("Local input ended, closing connection");
                            self.socket.close(None).await?;
                            break;
                        }
                    }
                },

                _ = render_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_render).as_secs_f32();
                    last_render = now;

                    self.shadows.tick(dt);
                    view.send_replace(self.shadows.snapshot());
                }
            }
        }

        view.send_replace(self.shadows.snapshot());
        Ok(self.shadows)
    }
}
