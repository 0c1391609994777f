//! Origin-validated, handshake-gated channels between windows
//!
//! A [`Channel`] is one logical connection between this context and exactly
//! one other window at exactly one origin. Application traffic flows only
//! after a three-message handshake has proven that the other side is
//! listening and speaks the same protocol version.
//!
//! # Architecture
//!
//! - [`config`] - [`ChannelConfig`] and [`HandshakeOptions`]
//! - [`handshake`] - the control frames exchanged before trust
//! - [`action`] - request/response helpers layered on `send` and `on`
//!
//! Inbound frames are pulled from an [`Inbox`] by [`Channel::listen`] (or by
//! the host's own loop through [`Channel::dispatch_pending`]) and pass these
//! filters, in order, before any handler runs:
//!
//! 1. the channel is not closed
//! 2. the frame carries an `event` tag
//! 3. the frame's source window is the channel's target window, when known
//! 4. the frame's origin equals the target origin (a child also accepts a
//!    `handshakeRequest` from a bootstrap origin, but only one speaking its
//!    protocol version)
//! 5. control frames go to the running handshake, if any
//! 6. application frames need a trusted channel, a registered name, a valid
//!    payload and a registered handler
//!
//! A frame that fails any filter is dropped without surfacing an error.
//!
//! # Examples
//!
//! ```
//! use secure_frame::channel::{Channel, ChannelConfig};
//! use secure_frame::types::{EventMap, Origin};
//! use secure_frame::window::memory::window_pair;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(tag = "event", content = "data")]
//! enum Ping {
//!     #[serde(rename = "ping")]
//!     Ping { n: u32 },
//! }
//!
//! impl EventMap for Ping {
//!     const EVENTS: &'static [&'static str] = &["ping"];
//!     fn event_name(&self) -> &'static str {
//!         "ping"
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> secure_frame::Result<()> {
//! let host = Origin::parse("https://shop.example")?;
//! let signer = Origin::parse("https://signer.example")?;
//! let (host_window, signer_window) = window_pair(host.clone(), signer.clone());
//!
//! let parent: Channel<Ping, Ping> =
//!     Channel::parent(ChannelConfig::from_origin(signer), Box::new(host_window.transport))?;
//! let child: Channel<Ping, Ping> =
//!     Channel::child(ChannelConfig::from_origin(host), Box::new(signer_window.transport))?;
//!
//! tokio::spawn(parent.clone().listen(host_window.inbox));
//! tokio::spawn(child.clone().listen(signer_window.inbox));
//!
//! let (a, b) = tokio::join!(parent.handshake(), child.handshake());
//! a?;
//! b?;
//!
//! parent.send(Ping::Ping { n: 1 })?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod handshake;


pub use action::ActionOptions;
pub use config::{ChannelConfig, HandshakeOptions};
pub use handshake::HandshakeMessage;

use crate::types::{
    handshake_events, ChannelState, EventMap, EventSchema, InboundMessage, Origin, Role, WindowId,
};
use crate::window::{Inbox, WindowTransport};
use crate::{FrameError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;

/// An application event handler
pub type Handler<I> = Arc<dyn Fn(I) + Send + Sync>;

/// A running handshake attempt
struct HandshakeSession {
    generation: u64,
    /// Parent: the id it is waiting to see echoed
    expected_id: Option<String>,
    /// Child: every request id it has answered
    answered: HashSet<String>,
    outcome: Option<oneshot::Sender<Result<()>>>,
    /// Other `handshake()` callers waiting on this attempt
    followers: Vec<oneshot::Sender<Result<()>>>,
}

impl HandshakeSession {
    fn report(&mut self, result: Result<()>) {
        self.notify_followers(&result);
        if let Some(outcome) = self.outcome.take() {
            let _ = outcome.send(result);
        }
    }

    fn notify_followers(&mut self, result: &Result<()>) {
        for follower in self.followers.drain(..) {
            let _ = follower.send(match result {
                Ok(()) => Ok(()),
                Err(e) => Err(follower_error(e)),
            });
        }
    }
}

/// Copy of a handshake failure for callers that followed the attempt
fn follower_error(error: &FrameError) -> FrameError {
    match error {
        FrameError::HandshakeTimeout { timeout } => FrameError::HandshakeTimeout { timeout: *timeout },
        FrameError::HandshakeVersionMismatch { expected, actual } => {
            FrameError::HandshakeVersionMismatch {
                expected: *expected,
                actual: *actual,
            }
        }
        FrameError::ChannelClosed => FrameError::ChannelClosed,
        other => FrameError::transport(other.to_string()),
    }
}

struct Inner<I, O> {
    role: Role,
    config: ChannelConfig,
    target_id: WindowId,
    transport: Mutex<Option<Box<dyn WindowTransport>>>,
    state: watch::Sender<ChannelState>,
    handlers: Mutex<HashMap<&'static str, Handler<I>>>,
    incoming: EventSchema<I>,
    outgoing: EventSchema<O>,
    session: Mutex<Option<HandshakeSession>>,
    generations: AtomicU64,
}

impl<I, O> Inner<I, O> {
    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ChannelState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(role = self.role.as_str(), from = ?previous, to = ?state, "Channel state changed");
        }
    }

    fn post(&self, frame: &Value) -> Result<()> {
        let transport = self.transport.lock();
        match transport.as_ref() {
            Some(transport) => transport.post(frame, &self.config.target_origin),
            None => Err(FrameError::ChannelClosed),
        }
    }

    fn post_control(&self, message: &HandshakeMessage) -> Result<()> {
        tracing::debug!(
            role = self.role.as_str(),
            event = message.event_name(),
            id = message.verification_id(),
            "Posting handshake frame"
        );
        self.post(&serde_json::to_value(message)?)
    }
}

/// Ends a handshake attempt when its future completes or is dropped
struct SessionGuard<'a, I, O> {
    inner: &'a Inner<I, O>,
    generation: u64,
}

impl<I, O> Drop for SessionGuard<'_, I, O> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        if session.as_ref().map(|s| s.generation) == Some(self.generation) {
            *session = None;
            if self.inner.state() == ChannelState::HandshakePending {
                self.inner.set_state(ChannelState::Uninitialized);
            }
        }
    }
}

/// A typed channel to one window at one origin
///
/// `I` is the event map this side receives, `O` the one it sends. Cloning is
/// cheap and every clone drives the same connection.
pub struct Channel<I, O> {
    inner: Arc<Inner<I, O>>,
}

impl<I, O> Clone for Channel<I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, O> std::fmt::Debug for Channel<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("role", &self.inner.role)
            .field("target_origin", &self.inner.config.target_origin)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl<I: EventMap, O: EventMap> Channel<I, O> {
    /// Create a channel playing `role`
    ///
    /// Fails if the configuration is invalid or either event map lists a name
    /// twice or uses a reserved handshake name.
    pub fn new(role: Role, config: ChannelConfig, transport: Box<dyn WindowTransport>) -> Result<Self> {
        config.validate()?;
        let incoming = EventSchema::<I>::new()?;
        let outgoing = EventSchema::<O>::new()?;
        let target_id = transport.window_id();

        tracing::debug!(
            role = role.as_str(),
            window = %target_id,
            origin = %config.target_origin,
            "Channel created"
        );

        let (state, _) = watch::channel(ChannelState::Uninitialized);

        Ok(Self {
            inner: Arc::new(Inner {
                role,
                config,
                target_id,
                transport: Mutex::new(Some(transport)),
                state,
                handlers: Mutex::new(HashMap::new()),
                incoming,
                outgoing,
                session: Mutex::new(None),
                generations: AtomicU64::new(1),
            }),
        })
    }

    /// Create the host side of a channel to an iframe or popup
    pub fn parent(config: ChannelConfig, transport: Box<dyn WindowTransport>) -> Result<Self> {
        Self::new(Role::Parent, config, transport)
    }

    /// Create the embedded side of a channel to the host page
    pub fn child(config: ChannelConfig, transport: Box<dyn WindowTransport>) -> Result<Self> {
        Self::new(Role::Child, config, transport)
    }

    /// Which half of the handshake this side plays
    pub fn role(&self) -> Role {
        self.inner.role
    }

    /// The channel's configuration
    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// The only origin this channel talks to
    pub fn target_origin(&self) -> &Origin {
        &self.inner.config.target_origin
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChannelState {
        self.inner.state()
    }

    /// Watch lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    /// Wait until the channel is trusted
    ///
    /// Fails with [`FrameError::ChannelClosed`] if the channel closes first.
    pub async fn wait_until_trusted(&self) -> Result<()> {
        let mut states = self.subscribe_state();
        let state = states
            .wait_for(|s| s.is_trusted() || s.is_closed())
            .await
            .map_err(|_| FrameError::ChannelClosed)?;

        if state.is_trusted() {
            Ok(())
        } else {
            Err(FrameError::ChannelClosed)
        }
    }

    /// Run the handshake for this channel's role
    ///
    /// Returns immediately on a trusted channel. On timeout or version
    /// mismatch the channel goes back to `Uninitialized` and may be
    /// handshaked again. Dropping the future aborts the attempt the same way.
    ///
    /// A call made while another attempt runs gets that attempt's result.
    pub async fn handshake(&self) -> Result<()> {
        loop {
            match self.state() {
                ChannelState::Trusted => return Ok(()),
                ChannelState::Closed => return Err(FrameError::ChannelClosed),
                ChannelState::HandshakePending => {
                    // another caller is running an attempt; share its outcome,
                    // or start over if that caller dropped its future
                    if let Some(outcome) = self.follow_session() {
                        if let Ok(result) = outcome.await {
                            return result;
                        }
                    }
                }
                ChannelState::Uninitialized => {
                    if let Some((guard, outcome)) = self.begin_session() {
                        return self.run_session(guard, outcome).await;
                    }
                }
            }
        }
    }

    fn begin_session(&self) -> Option<(SessionGuard<'_, I, O>, oneshot::Receiver<Result<()>>)> {
        let mut session = self.inner.session.lock();
        if session.is_some() || self.state() != ChannelState::Uninitialized {
            return None;
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let expected_id = match self.inner.role {
            Role::Parent => Some(handshake::new_verification_id()),
            Role::Child => None,
        };

        *session = Some(HandshakeSession {
            generation,
            expected_id,
            answered: HashSet::new(),
            outcome: Some(tx),
            followers: Vec::new(),
        });
        self.inner.set_state(ChannelState::HandshakePending);

        Some((
            SessionGuard {
                inner: &self.inner,
                generation,
            },
            rx,
        ))
    }

    fn follow_session(&self) -> Option<oneshot::Receiver<Result<()>>> {
        let mut session = self.inner.session.lock();
        let session = session.as_mut()?;
        let (tx, rx) = oneshot::channel();
        session.followers.push(tx);
        Some(rx)
    }

    async fn run_session(
        &self,
        guard: SessionGuard<'_, I, O>,
        mut outcome: oneshot::Receiver<Result<()>>,
    ) -> Result<()> {
        let options = &self.inner.config.handshake;
        let role = self.inner.role.as_str();
        tracing::debug!(role, version = options.protocol_version, "Starting handshake");

        let request = {
            let session = self.inner.session.lock();
            session
                .as_ref()
                .and_then(|s| s.expected_id.clone())
                .map(|id| HandshakeMessage::Request {
                    request_verification_id: id,
                    protocol_version: options.protocol_version,
                })
        };

        let deadline = tokio::time::sleep(options.timeout);
        tokio::pin!(deadline);

        let mut retry = tokio::time::interval(options.interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                biased;

                result = &mut outcome => {
                    break result.unwrap_or(Err(FrameError::ChannelClosed));
                }
                _ = &mut deadline => {
                    break Err(FrameError::HandshakeTimeout { timeout: options.timeout });
                }
                _ = retry.tick(), if request.is_some() => {
                    if let Some(request) = &request {
                        if let Err(e) = self.inner.post_control(request) {
                            break Err(e);
                        }
                    }
                }
            }
        };

        {
            let mut session = self.inner.session.lock();
            if let Some(session) = session.as_mut().filter(|s| s.generation == guard.generation) {
                session.notify_followers(&result);
            }
        }
        drop(guard);

        match &result {
            Ok(()) => tracing::debug!(role, "Handshake complete"),
            Err(e) => tracing::warn!(role, "Handshake failed: {}", e),
        }
        result
    }

    /// Send an application event
    ///
    /// Rejected with [`FrameError::ChannelNotTrusted`] before the handshake
    /// completes; nothing is queued.
    pub fn send(&self, event: O) -> Result<()> {
        match self.state() {
            ChannelState::Trusted => {}
            ChannelState::Closed => return Err(FrameError::ChannelClosed),
            state => return Err(FrameError::ChannelNotTrusted { state }),
        }

        let frame = self.inner.outgoing.encode(&event)?;
        tracing::debug!(role = self.inner.role.as_str(), event = event.event_name(), "Sending event");
        self.inner.post(&frame)
    }

    /// Register the handler for an incoming event, replacing any previous one
    pub fn on<F>(&self, event: &str, handler: F) -> Result<()>
    where
        F: Fn(I) + Send + Sync + 'static,
    {
        self.install_handler(event, Arc::new(handler)).map(|_| ())
    }

    /// Remove the handler for an event; returns whether one was registered
    ///
    /// Safe to call from inside a handler. Frames already queued for this
    /// event are dropped from then on.
    pub fn off(&self, event: &str) -> bool {
        self.inner.handlers.lock().remove(event).is_some()
    }

    /// Install a handler and return the resolved name with the handler it replaced
    pub(crate) fn install_handler(
        &self,
        event: &str,
        handler: Handler<I>,
    ) -> Result<(&'static str, Option<Handler<I>>)> {
        if self.state().is_closed() {
            return Err(FrameError::ChannelClosed);
        }

        let name = self
            .inner
            .incoming
            .resolve(event)
            .ok_or_else(|| FrameError::UnknownEvent {
                event: event.to_string(),
            })?;

        let previous = self.inner.handlers.lock().insert(name, handler);
        if previous.is_some() {
            tracing::debug!(event = name, "Replaced existing handler");
        }
        Ok((name, previous))
    }

    /// Process one inbound frame; returns whether it was accepted
    ///
    /// Rejected frames are dropped silently, with a trace-level log line.
    pub fn handle_message(&self, message: InboundMessage) -> bool {
        let inner = &self.inner;

        if inner.state().is_closed() {
            return false;
        }

        let Some(event) = message.event().map(str::to_owned) else {
            tracing::trace!(origin = %message.origin, "Dropped frame without event tag");
            return false;
        };

        if let Some(source) = message.source {
            if source != inner.target_id {
                tracing::trace!(%event, %source, expected = %inner.target_id, "Dropped frame from another window");
                return false;
            }
        }

        let from_target = inner.config.target_origin.matches(&message.origin);
        if !from_target {
            let bootstrap = inner.role == Role::Child
                && event == handshake_events::REQUEST
                && inner.config.is_bootstrap_origin(&message.origin);
            if !bootstrap {
                tracing::trace!(%event, origin = %message.origin, "Dropped frame from untrusted origin");
                return false;
            }
        }

        if handshake_events::is_reserved(&event) {
            return match HandshakeMessage::from_frame(&message.data) {
                Some(control) => self.handle_control(control, from_target),
                None => {
                    tracing::trace!(%event, "Dropped malformed handshake frame");
                    false
                }
            };
        }

        if !inner.state().is_trusted() {
            tracing::trace!(%event, state = ?inner.state(), "Dropped event before trust");
            return false;
        }

        let Some(name) = inner.incoming.resolve(&event) else {
            tracing::trace!(%event, "Dropped unregistered event");
            return false;
        };

        let decoded = match inner.incoming.decode(message.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::trace!(%event, "Dropped invalid payload: {}", e);
                return false;
            }
        };

        // clone out of the lock so the handler may call on/off
        let handler = inner.handlers.lock().get(name).cloned();
        match handler {
            Some(handler) => {
                handler(decoded);
                true
            }
            None => {
                tracing::trace!(%event, "No handler registered");
                false
            }
        }
    }

    fn handle_control(&self, message: HandshakeMessage, from_target: bool) -> bool {
        let inner = &self.inner;
        let own_version = inner.config.handshake.protocol_version;
        let mut slot = inner.session.lock();

        let Some(session) = slot.as_mut() else {
            tracing::trace!(event = message.event_name(), "Dropped handshake frame: no handshake running");
            return false;
        };

        match (inner.role, message) {
            (
                Role::Parent,
                HandshakeMessage::Response {
                    request_verification_id,
                    protocol_version,
                },
            ) => {
                if session.expected_id.as_deref() != Some(request_verification_id.as_str()) {
                    tracing::trace!(id = %request_verification_id, "Dropped response for another request");
                    return false;
                }

                if protocol_version != own_version {
                    session.report(Err(FrameError::HandshakeVersionMismatch {
                        expected: own_version,
                        actual: protocol_version,
                    }));
                    *slot = None;
                    inner.set_state(ChannelState::Uninitialized);
                    return true;
                }

                inner.set_state(ChannelState::Trusted);
                let complete = HandshakeMessage::Complete {
                    request_verification_id,
                };
                match inner.post_control(&complete) {
                    Ok(()) => session.report(Ok(())),
                    Err(e) => {
                        inner.set_state(ChannelState::Uninitialized);
                        session.report(Err(e));
                    }
                }
                *slot = None;
                true
            }
            (
                Role::Child,
                HandshakeMessage::Request {
                    request_verification_id,
                    protocol_version,
                },
            ) => {
                if protocol_version != own_version && !from_target {
                    tracing::trace!(
                        id = %request_verification_id,
                        version = protocol_version,
                        "Dropped bootstrap handshake request with another protocol version"
                    );
                    return false;
                }

                let response = HandshakeMessage::Response {
                    request_verification_id: request_verification_id.clone(),
                    protocol_version: own_version,
                };
                if let Err(e) = inner.post_control(&response) {
                    tracing::warn!("Failed to answer handshake request: {}", e);
                }

                if protocol_version != own_version {
                    session.report(Err(FrameError::HandshakeVersionMismatch {
                        expected: own_version,
                        actual: protocol_version,
                    }));
                    *slot = None;
                    inner.set_state(ChannelState::Uninitialized);
                    return true;
                }

                session.answered.insert(request_verification_id);
                true
            }
            (Role::Child, HandshakeMessage::Complete { request_verification_id }) => {
                if !session.answered.contains(&request_verification_id) {
                    tracing::trace!(id = %request_verification_id, "Dropped completion for unanswered request");
                    return false;
                }

                inner.set_state(ChannelState::Trusted);
                session.report(Ok(()));
                *slot = None;
                true
            }
            (role, message) => {
                tracing::trace!(
                    role = role.as_str(),
                    event = message.event_name(),
                    "Dropped handshake frame meant for the other role"
                );
                false
            }
        }
    }

    /// Dispatch every frame currently queued in `inbox`; returns how many were accepted
    ///
    /// For hosts that run their own event loop instead of [`listen`](Self::listen).
    pub fn dispatch_pending(&self, inbox: &mut Inbox) -> usize {
        let mut accepted = 0;
        while let Ok(message) = inbox.try_recv() {
            if self.state().is_closed() {
                break;
            }
            if self.handle_message(message) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Dispatch frames from `inbox` until the channel closes or the inbox ends
    pub async fn listen(self, mut inbox: Inbox) {
        let mut states = self.subscribe_state();
        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => {
                        self.handle_message(message);
                    }
                    None => break,
                },
                _ = states.wait_for(|s| s.is_closed()) => break,
            }
        }
        tracing::debug!(role = self.inner.role.as_str(), "Channel listener stopped");
    }

    /// Close the channel
    ///
    /// Handlers are cleared, the transport is dropped and a running handshake
    /// fails with [`FrameError::ChannelClosed`]. Closing twice is a no-op.
    pub fn close(&self) {
        if self.state().is_closed() {
            return;
        }

        self.inner.set_state(ChannelState::Closed);
        self.inner.handlers.lock().clear();
        self.inner.transport.lock().take();
        if let Some(mut session) = self.inner.session.lock().take() {
            session.report(Err(FrameError::ChannelClosed));
        }
        tracing::debug!(role = self.inner.role.as_str(), "Channel closed");
    }
}
