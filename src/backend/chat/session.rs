/**
 * Connection Session
 *
 * A session wraps one WebSocket connection. It is created after the
 * identity check, sends exactly one greeting envelope, registers with the
 * hub and then runs two loops until either of them stops:
 *
 * - the reader loop decodes client frames, persists authenticated posts and
 *   asks the hub to broadcast them
 * - the writer loop drains the session's bounded outbound queue onto the
 *   socket, one text frame per item
 *
 * # Lifecycle
 *
 * ```text
 * Connecting -> Authenticated | Anonymous -> Active -> Closing -> Closed
 * ```
 *
 * Whichever loop exits first raises the session's cancellation token, which
 * stops the other one. The session then unregisters from the hub (a no-op
 * if the hub already dropped it) and releases the socket.
 *
 * # Outbound queue ownership
 *
 * The hub holds the only strong sender of the outbound queue. The session
 * keeps a weak sender for connection-local envelopes (errors), so when the
 * hub drops a member the queue really closes and the writer loop ends.
 */

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::chat::hub::{Frame, Hub, HubClosed, SessionId, OUTBOUND_QUEUE_CAPACITY};
use crate::backend::chat::store::{MessageStore, StoreError};
use crate::shared::envelope::{ANONYMOUS_NOTICE, ANONYMOUS_POST_REJECTED, PROCESSING_FAILED};
use crate::shared::{ChatMessage, ClientFrame, Envelope, Identity, NewMessage};

/// Lifecycle state of a connection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrade in progress, identity not yet known
    Connecting,
    /// Verified identity; may post
    Authenticated,
    /// No verified identity; receive-only
    Anonymous,
    /// Registered with the hub, loops running
    Active,
    /// One loop has stopped, tearing down
    Closing,
    /// Both loops stopped and socket released
    Closed,
}

/// Shared services a session needs
#[derive(Clone)]
pub struct SessionContext {
    pub hub: Hub,
    pub store: Arc<dyn MessageStore>,
    /// Budget for a single store append
    pub store_timeout: Duration,
    /// Budget for writing one frame to the peer
    pub write_timeout: Duration,
}

/// One live chat connection
pub struct Session {
    id: SessionId,
    identity: Option<Identity>,
    state: SessionState,
    outbound: mpsc::WeakSender<Frame>,
    cancel: CancellationToken,
    ctx: SessionContext,
}

impl Session {
    /// Greet the peer and register with the hub
    ///
    /// `identity` is the result of the verifier call: `Some` for a verified
    /// peer, `None` for an anonymous one. The greeting is queued before the
    /// session becomes visible to broadcasts, so it is always the first
    /// frame the peer receives.
    ///
    /// # Returns
    ///
    /// The active session and the receiving end of its outbound queue, which
    /// must be handed to [`Session::run`].
    pub async fn connect(
        identity: Option<Identity>,
        ctx: SessionContext,
    ) -> Result<(Self, mpsc::Receiver<Frame>), HubClosed> {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        let mut session = Self {
            id: Uuid::new_v4(),
            identity,
            state: SessionState::Connecting,
            outbound: outbound_tx.downgrade(),
            cancel: CancellationToken::new(),
            ctx,
        };

        let greeting = match session.identity.as_ref().map(Envelope::auth_success) {
            Some(greeting) => {
                session.transition(SessionState::Authenticated);
                greeting
            }
            None => {
                session.transition(SessionState::Anonymous);
                Envelope::connection_info(ANONYMOUS_NOTICE)
            }
        };
        match greeting.encode() {
            Ok(text) => {
                // the queue is empty, so this cannot be full
                let _ = outbound_tx.try_send(Frame::from(text));
            }
            Err(e) => tracing::error!("[Session] Failed to encode greeting: {}", e),
        }

        session.transition(SessionState::Active);
        session.ctx.hub.register(session.id, outbound_tx).await?;

        Ok((session, outbound_rx))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the reader and writer loops over `transport` until the connection ends
    pub async fn run<T, E>(mut self, transport: T, outbound: mpsc::Receiver<Frame>)
    where
        T: Stream<Item = Result<Message, E>> + Sink<Message> + Send + 'static,
        <T as Sink<Message>>::Error: Display,
        E: Display,
    {
        let (sink, stream) = transport.split::<Message>();

        let writer = tokio::spawn(write_loop(
            sink,
            outbound,
            self.cancel.clone(),
            self.id,
            self.ctx.write_timeout,
        ));
        self.read_loop(stream).await;

        self.close().await;
        if let Err(e) = writer.await {
            tracing::error!("[Session] Writer task of {} failed: {}", self.id, e);
        }
        // both halves of the socket are dropped here
        self.transition(SessionState::Closed);
    }

    /// Raise the cancellation signal and leave the hub
    async fn close(&mut self) {
        self.transition(SessionState::Closing);
        self.cancel.cancel();
        if self.ctx.hub.unregister(self.id).await.is_err() {
            tracing::debug!("[Session] Hub already stopped while closing {}", self.id);
        }
    }

    async fn read_loop<S, E>(&self, mut stream: S)
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("[Session] {} sent close frame {:?}", self.id, frame);
                    break;
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!("[Session] Ignoring binary frame from {}", self.id);
                }
                // ping/pong are answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("[Session] Read error on {}: {}", self.id, e);
                    break;
                }
                None => break,
            }
        }
    }

    /// Handle one inbound text frame
    ///
    /// Decode failures, authorization failures and persistence failures are
    /// all reported to this peer only and never end the session.
    pub async fn handle_text(&self, text: &str) {
        let frame = match ClientFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("[Session] Undecodable frame from {}: {}", self.id, e);
                self.send_local(Envelope::error(e.client_reason()));
                return;
            }
        };

        match frame {
            ClientFrame::Message { content, temp_id } => self.handle_post(content, temp_id).await,
        }
    }

    async fn handle_post(&self, content: String, temp_id: Option<String>) {
        let Some(author) = self.identity.clone() else {
            tracing::info!("[Session] Anonymous session {} tried to post", self.id);
            self.send_local(Envelope::error(ANONYMOUS_POST_REJECTED));
            return;
        };

        let draft = match NewMessage::new(content, author) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::debug!("[Session] Rejected post from {}: {}", self.id, e);
                self.send_local(Envelope::error(e.client_reason()));
                return;
            }
        };

        let stored = match self.append(draft).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("[Session] Failed to save message from {}: {}", self.id, e);
                self.send_local(Envelope::error(PROCESSING_FAILED));
                return;
            }
        };

        let text = match Envelope::broadcast(&stored, temp_id).encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("[Session] Failed to encode broadcast {}: {}", stored.id, e);
                return;
            }
        };
        if self.ctx.hub.broadcast(Frame::from(text)).await.is_err() {
            tracing::warn!("[Session] Hub stopped, message {} was not broadcast", stored.id);
        }
    }

    async fn append(&self, draft: NewMessage) -> Result<ChatMessage, StoreError> {
        let budget = self.ctx.store_timeout;
        tokio::time::timeout(budget, self.ctx.store.append(draft))
            .await
            .map_err(|_| StoreError::Timeout(budget))?
    }

    /// Queue an envelope for this peer only, never waiting on the queue
    fn send_local(&self, envelope: Envelope) {
        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("[Session] Failed to encode local envelope: {}", e);
                return;
            }
        };
        let Some(outbound) = self.outbound.upgrade() else {
            tracing::debug!("[Session] Outbound queue of {} already closed", self.id);
            return;
        };
        if let Err(e) = outbound.try_send(Frame::from(text)) {
            tracing::warn!("[Session] Dropping local envelope for {}: {}", self.id, e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("[Session] {} {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Drain the outbound queue onto the socket
///
/// Every write races the cancellation token and is bounded by
/// `write_timeout`, so a peer that stops reading cannot hold the session
/// open. When the queue closes a close frame is sent under the same bounds.
async fn write_loop<W>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Frame>,
    cancel: CancellationToken,
    id: SessionId,
    write_timeout: Duration,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbound.recv() => next,
        };

        let (message, last) = match next {
            Some(frame) => (Message::Text(frame), false),
            None => {
                tracing::debug!("[Session] Outbound queue of {} closed, sending close frame", id);
                (Message::Close(None), true)
            }
        };

        let written = tokio::select! {
            _ = cancel.cancelled() => break,
            written = tokio::time::timeout(write_timeout, sink.send(message)) => written,
        };
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!("[Session] Write to {} failed: {}", id, e);
                break;
            }
            Err(_) => {
                tracing::warn!("[Session] Write to {} stalled for {:?}, disconnecting", id, write_timeout);
                break;
            }
        }

        if last {
            break;
        }
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::chat::store::{HistoryQuery, InMemoryMessageStore};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn append(&self, _message: NewMessage) -> Result<ChatMessage, StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }

        async fn recent(&self, _query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn context(store: Arc<dyn MessageStore>) -> SessionContext {
        let (hub, _handle) = Hub::spawn();
        SessionContext {
            hub,
            store,
            store_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(60),
        }
    }

    /// In-memory socket: frames pushed on `incoming` are read by the session,
    /// frames the session writes land on `written`. A stalled peer never
    /// accepts a write.
    struct TestPeer {
        incoming: mpsc::UnboundedReceiver<Message>,
        written: mpsc::UnboundedSender<Message>,
        stalled: bool,
    }

    impl TestPeer {
        fn new(stalled: bool) -> (Self, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
            let (incoming_tx, incoming) = mpsc::unbounded_channel();
            let (written, written_rx) = mpsc::unbounded_channel();
            let peer = Self {
                incoming,
                written,
                stalled,
            };
            (peer, incoming_tx, written_rx)
        }
    }

    impl Stream for TestPeer {
        type Item = Result<Message, Infallible>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.incoming.poll_recv(cx).map(|next| next.map(Ok))
        }
    }

    impl Sink<Message> for TestPeer {
        type Error = Infallible;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            if self.stalled {
                Poll::Pending
            } else {
                Poll::Ready(Ok(()))
            }
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            let _ = self.written.send(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    fn decode(frame: Frame) -> Value {
        serde_json::from_str(frame.as_str()).unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_greeting_is_first_frame() {
        let ctx = context(Arc::new(InMemoryMessageStore::new()));
        let (session, mut rx) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Active);
        let greeting = decode(rx.recv().await.unwrap());
        assert_eq!(greeting["type"], "auth_success");
        assert_eq!(greeting["user_id"], 1);
        assert_eq!(greeting["username"], "alice");
        assert_eq!(ctx.hub.member_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_greeting_is_connection_info() {
        let ctx = context(Arc::new(InMemoryMessageStore::new()));
        let (session, mut rx) = Session::connect(None, ctx).await.unwrap();

        assert!(session.identity().is_none());
        let greeting = decode(rx.recv().await.unwrap());
        assert_eq!(greeting["type"], "connection_info");
        assert_eq!(greeting["error"], ANONYMOUS_NOTICE);
    }

    #[tokio::test]
    async fn test_post_is_stored_and_broadcast_to_everyone() {
        let store = Arc::new(InMemoryMessageStore::new());
        let ctx = context(store.clone());
        let (alice, mut alice_rx) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();
        let (_bob, mut bob_rx) = Session::connect(None, ctx.clone()).await.unwrap();
        alice_rx.recv().await.unwrap();
        bob_rx.recv().await.unwrap();

        alice
            .handle_text(r#"{"type":"message","content":"hi","tempId":"t1"}"#)
            .await;
        ctx.hub.member_count().await.unwrap();

        for rx in [&mut alice_rx, &mut bob_rx] {
            let message = decode(rx.recv().await.unwrap());
            assert_eq!(message["type"], "message");
            assert_eq!(message["content"], "hi");
            assert_eq!(message["tempId"], "t1");
            assert_eq!(message["user_id"], 1);
            assert_eq!(message["username"], "alice");
            assert_eq!(message["id"], "1");
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_anonymous_post_is_rejected_locally() {
        let store = Arc::new(InMemoryMessageStore::new());
        let ctx = context(store.clone());
        let (_alice, mut alice_rx) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();
        let (bob, mut bob_rx) = Session::connect(None, ctx.clone()).await.unwrap();
        alice_rx.recv().await.unwrap();
        bob_rx.recv().await.unwrap();

        bob.handle_text(r#"{"type":"message","content":"hi","tempId":"t1"}"#)
            .await;
        ctx.hub.member_count().await.unwrap();

        let error = decode(bob_rx.recv().await.unwrap());
        assert_eq!(error["type"], "error");
        assert_eq!(error["error"], ANONYMOUS_POST_REJECTED);
        assert!(bob_rx.try_recv().is_err());
        assert!(alice_rx.try_recv().is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_reports_error_and_skips_broadcast() {
        let ctx = context(Arc::new(FailingStore));
        let (alice, mut alice_rx) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();
        let (_bob, mut bob_rx) = Session::connect(None, ctx.clone()).await.unwrap();
        alice_rx.recv().await.unwrap();
        bob_rx.recv().await.unwrap();

        alice.handle_text(r#"{"type":"message","content":"hi"}"#).await;
        ctx.hub.member_count().await.unwrap();

        let error = decode(alice_rx.recv().await.unwrap());
        assert_eq!(error["error"], PROCESSING_FAILED);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_and_blank_frames_keep_session_usable() {
        let store = Arc::new(InMemoryMessageStore::new());
        let ctx = context(store.clone());
        let (alice, mut rx) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();
        rx.recv().await.unwrap();

        alice.handle_text("{not json").await;
        alice.handle_text(r#"{"type":"message","content":"   "}"#).await;
        alice.handle_text(r#"{"type":"message","content":"ok"}"#).await;
        ctx.hub.member_count().await.unwrap();

        assert_eq!(decode(rx.recv().await.unwrap())["error"], PROCESSING_FAILED);
        assert_eq!(decode(rx.recv().await.unwrap())["type"], "error");
        assert_eq!(decode(rx.recv().await.unwrap())["content"], "ok");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_writer_sends_close_frame_after_hub_drops_member() {
        let ctx = context(Arc::new(InMemoryMessageStore::new()));
        let (session, outbound) = Session::connect(None, ctx.clone()).await.unwrap();
        let id = session.id();
        let (peer, _incoming, mut written) = TestPeer::new(false);
        let running = tokio::spawn(session.run(peer, outbound));

        assert!(matches!(written.recv().await, Some(Message::Text(_))));

        ctx.hub.unregister(id).await.unwrap();
        assert!(matches!(written.recv().await, Some(Message::Close(None))));

        // the writer's exit cancels the reader even though the peer is still open
        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("session did not close after its queue closed")
            .unwrap();
        assert_eq!(ctx.hub.member_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stalled_write_does_not_block_close_when_reader_ends() {
        let ctx = context(Arc::new(InMemoryMessageStore::new()));
        let (session, outbound) = Session::connect(Some(Identity::new(1, "alice")), ctx.clone())
            .await
            .unwrap();
        let (peer, incoming, _written) = TestPeer::new(true);
        let running = tokio::spawn(session.run(peer, outbound));

        // let the writer pick up the greeting and block on it
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(incoming);

        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("writer ignored cancellation during a pending write")
            .unwrap();
        assert_eq!(ctx.hub.member_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stalled_peer_is_disconnected_without_affecting_others() {
        let ctx = SessionContext {
            write_timeout: Duration::from_millis(200),
            ..context(Arc::new(InMemoryMessageStore::new()))
        };
        let (stalled, stalled_outbound) = Session::connect(None, ctx.clone()).await.unwrap();
        let (_healthy, mut healthy_rx) = Session::connect(None, ctx.clone()).await.unwrap();
        healthy_rx.recv().await.unwrap();

        // the peer keeps its read side open and never accepts a write
        let (peer, _incoming, _written) = TestPeer::new(true);
        let running = tokio::spawn(stalled.run(peer, stalled_outbound));

        let total = OUTBOUND_QUEUE_CAPACITY + 10;
        for i in 0..total {
            ctx.hub.broadcast(Frame::from(i.to_string())).await.unwrap();
            assert_eq!(healthy_rx.recv().await.unwrap().as_str(), i.to_string());
        }

        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("stalled peer was never disconnected")
            .unwrap();
        assert_eq!(ctx.hub.member_count().await.unwrap(), 1);
    }
}
