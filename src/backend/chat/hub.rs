/**
 * Chat Hub
 *
 * The hub is the only owner of the set of live sessions. It runs as a single
 * task that drains one intake channel and handles three kinds of events in
 * arrival order:
 *
 * - `Register` - add a session's outbound queue to the member set
 * - `Unregister` - remove a session and close its outbound queue
 * - `Broadcast` - offer one serialized frame to every member
 *
 * Every other component talks to the hub through a cloneable [`Hub`] handle
 * that only sends events; no one else ever sees the member map, so the map
 * needs no lock.
 *
 * # Backpressure
 *
 * Broadcast uses `try_send` on each member's bounded queue. A member whose
 * queue is full is dropped from the set on the spot. Dropping the hub's
 * sender closes the queue, so the member's writer loop drains what is left,
 * sends a close frame and exits. A slow consumer therefore never delays
 * delivery to anyone else.
 *
 * # Ordering
 *
 * Because a single task processes all events, every member sees broadcasts
 * in the same global order.
 */

use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One serialized outbound text frame
///
/// Cloning is a reference-count bump, so one encoded broadcast is shared by
/// all members.
pub type Frame = Utf8Bytes;

/// Identifier of a connection session
pub type SessionId = Uuid;

/// Capacity of each session's outbound queue, in frames
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Capacity of the hub intake channel
const HUB_INTAKE_CAPACITY: usize = 1024;

/// Returned when the hub task is no longer running
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("chat hub is not running")]
pub struct HubClosed;

enum HubCommand {
    Register {
        id: SessionId,
        outbound: mpsc::Sender<Frame>,
    },
    Unregister {
        id: SessionId,
    },
    Broadcast {
        frame: Frame,
    },
    MemberCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle used to send events to the hub task
#[derive(Clone, Debug)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register { id, .. } => write!(f, "Register({})", id),
            Self::Unregister { id } => write!(f, "Unregister({})", id),
            Self::Broadcast { frame } => write!(f, "Broadcast({} bytes)", frame.as_str().len()),
            Self::MemberCount { .. } => write!(f, "MemberCount"),
        }
    }
}

impl Hub {
    /// Create a hub handle and the control loop that backs it
    ///
    /// The loop does nothing until it is run; see [`Hub::spawn`].
    pub fn new() -> (Self, HubLoop) {
        let (commands, intake) = mpsc::channel(HUB_INTAKE_CAPACITY);
        let hub_loop = HubLoop {
            intake,
            members: HashMap::new(),
        };
        (Self { commands }, hub_loop)
    }

    /// Create a hub and spawn its control loop on the current runtime
    ///
    /// The loop ends once every `Hub` handle has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (hub, hub_loop) = Self::new();
        let handle = tokio::spawn(hub_loop.run());
        (hub, handle)
    }

    /// Add a session to the member set
    ///
    /// The hub takes ownership of the only strong sender of the session's
    /// outbound queue. Each session must be registered exactly once.
    pub async fn register(&self, id: SessionId, outbound: mpsc::Sender<Frame>) -> Result<(), HubClosed> {
        self.send(HubCommand::Register { id, outbound }).await
    }

    /// Remove a session and close its outbound queue
    ///
    /// Unknown or already removed sessions are ignored.
    pub async fn unregister(&self, id: SessionId) -> Result<(), HubClosed> {
        self.send(HubCommand::Unregister { id }).await
    }

    /// Offer a frame to every current member without waiting on any of them
    pub async fn broadcast(&self, frame: Frame) -> Result<(), HubClosed> {
        self.send(HubCommand::Broadcast { frame }).await
    }

    /// Number of members once every previously sent event has been processed
    pub async fn member_count(&self) -> Result<usize, HubClosed> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::MemberCount { reply }).await?;
        response.await.map_err(|_| HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubClosed> {
        self.commands.send(command).await.map_err(|_| HubClosed)
    }
}

/// The hub's control loop and the member set it owns
pub struct HubLoop {
    intake: mpsc::Receiver<HubCommand>,
    members: HashMap<SessionId, mpsc::Sender<Frame>>,
}

impl HubLoop {
    /// Process events until every `Hub` handle is gone
    pub async fn run(mut self) {
        tracing::info!("[Hub] Control loop started");
        while let Some(command) = self.intake.recv().await {
            self.handle(command);
        }
        tracing::info!("[Hub] Control loop stopped with {} members", self.members.len());
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, outbound } => {
                if self.members.insert(id, outbound).is_some() {
                    tracing::warn!("[Hub] Session {} registered twice, keeping the newer queue", id);
                }
                tracing::debug!("[Hub] Registered session {} ({} online)", id, self.members.len());
            }
            HubCommand::Unregister { id } => {
                // dropping the sender closes the session's queue
                if self.members.remove(&id).is_some() {
                    tracing::debug!("[Hub] Unregistered session {} ({} online)", id, self.members.len());
                }
            }
            HubCommand::Broadcast { frame } => self.broadcast(frame),
            HubCommand::MemberCount { reply } => {
                let _ = reply.send(self.members.len());
            }
        }
    }

    fn broadcast(&mut self, frame: Frame) {
        let before = self.members.len();
        self.members.retain(|id, outbound| match outbound.try_send(frame.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("[Hub] Outbound queue of session {} is full, disconnecting it", id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("[Hub] Session {} queue already closed, removing it", id);
                false
            }
        });
        tracing::debug!(
            "[Hub] Broadcast delivered to {} of {} members",
            self.members.len(),
            before
        );
    }
}
