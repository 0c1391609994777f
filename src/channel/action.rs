//! Request/response actions over a channel
//!
//! The channel itself is plain pub/sub. Actions correlate a sent event with
//! the first matching incoming event, using a temporary handler that is
//! removed again when the action finishes, times out or is dropped.

use super::{Channel, Handler, Inner};
use crate::types::constants::{DEFAULT_ACTION_TIMEOUT, SIGNER_ACTION_INTERVAL, SIGNER_ACTION_TIMEOUT};
use crate::types::EventMap;
use crate::{FrameError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Predicate an incoming event must satisfy to complete an action
pub type Condition<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// Timing and matching options for an action
pub struct ActionOptions<I> {
    /// Fail with [`FrameError::ActionTimeout`] after this long
    pub timeout: Duration,
    /// Re-send the request this often while waiting
    pub interval: Option<Duration>,
    condition: Option<Condition<I>>,
}

impl<I> Default for ActionOptions<I> {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ACTION_TIMEOUT,
            interval: None,
            condition: None,
        }
    }
}

impl<I> Clone for ActionOptions<I> {
    fn clone(&self) -> Self {
        Self {
            timeout: self.timeout,
            interval: self.interval,
            condition: self.condition.clone(),
        }
    }
}

impl<I> fmt::Debug for ActionOptions<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOptions")
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .field("condition", &self.condition.is_some())
            .finish()
    }
}

impl<I> ActionOptions<I> {
    /// 7 second timeout, no re-send
    pub fn new() -> Self {
        Self::default()
    }

    /// Timings used when talking to a signer iframe: 10 second timeout, re-send every 5 seconds
    pub fn signer() -> Self {
        Self {
            timeout: SIGNER_ACTION_TIMEOUT,
            interval: Some(SIGNER_ACTION_INTERVAL),
            condition: None,
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-send the request every `interval`
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Only complete on events satisfying `condition`
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(FrameError::config("Action timeout must be greater than zero"));
        }
        if self.interval.is_some_and(|i| i.is_zero()) {
            return Err(FrameError::config("Action interval must be greater than zero"));
        }
        Ok(())
    }

    fn accepts(&self, event: &I) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition(event))
    }
}

/// Puts the previous handler back when an action ends
struct HandlerRestore<'a, I, O> {
    inner: &'a Inner<I, O>,
    name: &'static str,
    installed: Handler<I>,
    previous: Option<Handler<I>>,
}

impl<I, O> Drop for HandlerRestore<'_, I, O> {
    fn drop(&mut self) {
        let mut handlers = self.inner.handlers.lock();
        // leave the slot alone if someone registered a new handler meanwhile
        let ours = handlers
            .get(self.name)
            .is_some_and(|current| Arc::ptr_eq(current, &self.installed));
        if ours {
            match self.previous.take() {
                Some(previous) => {
                    handlers.insert(self.name, previous);
                }
                None => {
                    handlers.remove(self.name);
                }
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl<I: EventMap, O: EventMap> Channel<I, O> {
    fn subscribe_once(
        &self,
        event: &str,
    ) -> Result<(HandlerRestore<'_, I, O>, mpsc::UnboundedReceiver<I>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let installed: Handler<I> = Arc::new(move |event: I| {
            let _ = tx.send(event);
        });

        let (name, previous) = self.install_handler(event, Arc::clone(&installed))?;

        Ok((
            HandlerRestore {
                inner: &self.inner,
                name,
                installed,
                previous,
            },
            rx,
        ))
    }

    /// Send `event` and wait for the first matching `response_event`
    ///
    /// With an interval the request is re-sent until a response arrives.
    /// While the action runs its handler occupies the `response_event` slot;
    /// the previous handler is restored afterwards.
    pub async fn send_action(&self, event: O, response_event: &str, options: ActionOptions<I>) -> Result<I>
    where
        O: Clone,
    {
        options.validate()?;
        let (_restore, mut responses) = self.subscribe_once(response_event)?;

        self.send(event.clone())?;

        let mut resend = options.interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let deadline = tokio::time::sleep(options.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                received = responses.recv() => match received {
                    Some(response) if options.accepts(&response) => return Ok(response),
                    Some(_) => continue,
                    None => return Err(FrameError::ChannelClosed),
                },
                _ = tick(&mut resend) => {
                    tracing::debug!(event = event.event_name(), "Re-sending action");
                    self.send(event.clone())?;
                }
                _ = &mut deadline => {
                    tracing::debug!(event = response_event, "Action timed out");
                    return Err(FrameError::ActionTimeout {
                        event: response_event.to_string(),
                        timeout: options.timeout,
                    });
                }
            }
        }
    }

    /// Wait for an incoming `event` and optionally answer it
    ///
    /// `responder` sees the first event satisfying the condition; when it
    /// returns an outgoing event, that event is sent back before this
    /// resolves with the incoming one.
    pub async fn on_action<F>(&self, event: &str, options: ActionOptions<I>, responder: F) -> Result<I>
    where
        F: FnOnce(&I) -> Option<O>,
    {
        options.validate()?;
        let (_restore, mut requests) = self.subscribe_once(event)?;

        let deadline = tokio::time::sleep(options.timeout);
        tokio::pin!(deadline);

        let request = loop {
            tokio::select! {
                received = requests.recv() => match received {
                    Some(request) if options.accepts(&request) => break request,
                    Some(_) => continue,
                    None => return Err(FrameError::ChannelClosed),
                },
                _ = &mut deadline => {
                    return Err(FrameError::ActionTimeout {
                        event: event.to_string(),
                        timeout: options.timeout,
                    });
                }
            }
        };

        if let Some(response) = responder(&request) {
            self.send(response)?;
        }
        Ok(request)
    }

    /// Wait for an incoming `event` without answering it
    pub async fn wait_for_event(&self, event: &str, options: ActionOptions<I>) -> Result<I> {
        self.on_action(event, options, |_| None).await
    }
}
