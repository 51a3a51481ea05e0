//! Fan-out of registry changes to connected clients
//!
//! The lifecycle manager describes what should be sent as a list of
//! [`Dispatch`] records. This module turns a dispatch into concrete
//! recipients using the registry's current key set, then pushes the message
//! into each recipient's own outbound queue.
//!
//! Queues are independent and bounded. Pushing never waits: a recipient whose
//! queue is full loses that message, which the next update supersedes, and
//! nobody else is held up by it.

use crate::registry::Registry;
use log::{debug, warn};
use shared::{ActorId, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Who a message is addressed to, relative to the connection that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    Only(ActorId),
    AllExcept(ActorId),
    All,
}

impl Recipients {
    /// Resolves the set against the active actors in `registry`.
    pub fn resolve(&self, registry: &Registry) -> Vec<ActorId> {
        match *self {
            Recipients::Only(id) => {
                if registry.contains(id) {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
            Recipients::AllExcept(excluded) => registry
                .ids()
                .into_iter()
                .filter(|id| *id != excluded)
                .collect(),
            Recipients::All => registry.ids(),
        }
    }
}

/// One outbound message and the audience it is meant for
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub recipients: Recipients,
    pub message: ServerMessage,
}

impl Dispatch {
    pub fn to_sender(sender: ActorId, message: ServerMessage) -> Self {
        Self {
            recipients: Recipients::Only(sender),
            message,
        }
    }

    pub fn to_others(sender: ActorId, message: ServerMessage) -> Self {
        Self {
            recipients: Recipients::AllExcept(sender),
            message,
        }
    }

    pub fn to_all(message: ServerMessage) -> Self {
        Self {
            recipients: Recipients::All,
            message,
        }
    }
}

/// Outcome of delivering one dispatch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub queued: usize,
    pub dropped: usize,
}

/// Per-connection outbound queues
#[derive(Debug, Default)]
pub struct Outboxes {
    queues: HashMap<ActorId, mpsc::Sender<ServerMessage>>,
}

impl Outboxes {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: ActorId, queue: mpsc::Sender<ServerMessage>) {
        if self.queues.insert(id, queue).is_some() {
            warn!("Outbox for connection {} replaced", id);
        }
    }

    /// Drops the queue handle, which lets the connection's writer finish.
    pub fn unregister(&mut self, id: ActorId) -> bool {
        self.queues.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues `dispatch` for every recipient it resolves to.
    pub fn deliver(&self, dispatch: &Dispatch, registry: &Registry) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for recipient in dispatch.recipients.resolve(registry) {
            let Some(queue) = self.queues.get(&recipient) else {
                debug!(
                    "No outbox for connection {}, skipping {}",
                    recipient,
                    dispatch.message.event_name()
                );
                report.dropped += 1;
                continue;
            };

            match queue.try_send(dispatch.message.clone()) {
                Ok(()) => report.queued += 1,
                Err(TrySendError::Full(message)) => {
                    warn!(
                        "Outbox for connection {} is full, dropping {}",
                        recipient,
                        message.event_name()
                    );
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(message)) => {
                    debug!(
                        "Connection {} is closing, dropping {}",
                        recipient,
                        message.event_name()
                    );
                    report.dropped += 1;
                }
            }
        }

        report
    }

    pub fn deliver_all(&self, dispatches: &[Dispatch], registry: &Registry) -> DeliveryReport {
        dispatches
            .iter()
            .fold(DeliveryReport::default(), |mut total, dispatch| {
                let report = self.deliver(dispatch, registry);
                total.queued += report.queued;
                total.dropped += report.dropped;
                total
            })
    }
}
