//! Connection hub.
//!
//! A single task owns the membership table and processes register,
//! unregister and broadcast commands one at a time, so membership changes
//! never race with delivery. Producers talk to it through a cloneable
//! [`HubHandle`].
//!
//! Every member owns a bounded outbound queue. Broadcast never blocks: a
//! member whose queue is full is disconnected on the spot. Removing a member
//! fires its session's disconnect signal so the connection is torn down too.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::DropGuard;

use super::message::ChatMessage;
use super::session::{Session, SessionId};
use crate::config::RelayConfig;
use crate::{RelayError, Result};

/// Sending half of a session's outbound queue.
pub type Outbound = mpsc::Sender<ChatMessage>;

enum HubCommand {
    Register { session: Session, outbound: Outbound },
    Unregister(SessionId),
    Broadcast {
        origin: Option<SessionId>,
        message: ChatMessage,
    },
    Stats(oneshot::Sender<HubStats>),
}

struct Member {
    session: Session,
    outbound: Outbound,
    _disconnect: DropGuard,
}

/// Snapshot of hub membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Number of registered sessions.
    pub members: usize,
    /// Registered sessions per room.
    pub rooms: BTreeMap<String, usize>,
}

/// Handle for submitting commands to a running [`Hub`].
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Add a session to the hub.
    ///
    /// The hub takes the only sender of the session's outbound queue; the
    /// queue closes when the session is removed.
    pub async fn register(&self, session: Session, outbound: Outbound) -> Result<()> {
        self.submit(HubCommand::Register { session, outbound }).await
    }

    /// Remove a session, close its outbound queue and fire its disconnect
    /// signal. Unknown ids are ignored.
    pub async fn unregister(&self, id: SessionId) -> Result<()> {
        self.submit(HubCommand::Unregister(id)).await
    }

    /// Deliver a message to every member of `message.room`.
    ///
    /// `origin` identifies the sending session, if any. It drives the loopback
    /// policy, and a message from a session that is no longer a member is
    /// dropped.
    pub async fn broadcast(&self, origin: Option<SessionId>, message: ChatMessage) -> Result<()> {
        self.submit(HubCommand::Broadcast { origin, message }).await
    }

    /// Get a membership snapshot.
    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Stats(reply)).await?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    async fn submit(&self, command: HubCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| RelayError::HubClosed)
    }
}

/// The hub task state.
pub struct Hub {
    members: HashMap<SessionId, Member>,
    rx: mpsc::Receiver<HubCommand>,
    loopback: bool,
}

impl Hub {
    /// Create a hub and its handle without starting it.
    pub fn new(config: &RelayConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.hub_capacity.max(1));
        let hub = Self {
            members: HashMap::new(),
            rx,
            loopback: config.loopback,
        };
        (hub, HubHandle { tx })
    }

    /// Create a hub and run it on a new task.
    pub fn spawn(config: &RelayConfig) -> HubHandle {
        let (hub, handle) = Self::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process commands until every handle has been dropped.
    ///
    /// Remaining members are dropped on exit, closing their queues and
    /// disconnecting their sessions.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        tracing::debug!("Hub stopped with {} members", self.members.len());
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { session, outbound } => self.register(session, outbound),
            HubCommand::Unregister(id) => {
                self.unregister(id);
            }
            HubCommand::Broadcast { origin, message } => {
                let delivered = self.broadcast(origin, &message);
                tracing::debug!("Queued message for {} members of {}", delivered, message.room);
            }
            HubCommand::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn register(&mut self, session: Session, outbound: Outbound) {
        let id = session.id();
        if self.members.contains_key(&id) {
            tracing::warn!("Ignoring duplicate registration of {}", id);
            return;
        }

        tracing::info!(
            "[{}] {} joined (total {})",
            session.room(),
            session.username(),
            self.members.len() + 1
        );
        let disconnect = session.disconnect_guard();
        self.members.insert(
            id,
            Member {
                session,
                outbound,
                _disconnect: disconnect,
            },
        );
    }

    /// Returns true if the session was a member.
    fn unregister(&mut self, id: SessionId) -> bool {
        match self.members.remove(&id) {
            Some(member) => {
                tracing::info!(
                    "[{}] {} left (total {})",
                    member.session.room(),
                    member.session.username(),
                    self.members.len()
                );
                // Dropping `member` closes the queue and fires the disconnect signal.
                true
            }
            None => false,
        }
    }

    /// Returns the number of members the message was queued for.
    fn broadcast(&mut self, origin: Option<SessionId>, message: &ChatMessage) -> usize {
        if let Some(origin) = origin {
            if !self.members.contains_key(&origin) {
                tracing::debug!("Dropping message from departed {}", origin);
                return 0;
            }
        }

        tracing::info!(
            "[{}] {}: {}",
            message.room,
            message.username,
            message.content
        );

        let mut delivered = 0;
        let mut dropped = Vec::new();

        for (id, member) in &self.members {
            if member.session.room() != message.room {
                continue;
            }
            if !self.loopback && Some(*id) == origin {
                continue;
            }

            match member.outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        "[{}] {} is not keeping up, disconnecting {}",
                        member.session.room(),
                        member.session.username(),
                        id
                    );
                    dropped.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("Outbound queue of {} already closed", id);
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            self.unregister(id);
        }

        delivered
    }

    fn stats(&self) -> HubStats {
        let mut rooms = BTreeMap::new();
        for member in self.members.values() {
            *rooms.entry(member.session.room().to_string()).or_insert(0) += 1;
        }
        HubStats {
            members: self.members.len(),
            rooms,
        }
    }
}
