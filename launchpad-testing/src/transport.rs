// Scripted delivery transport

use async_trait::async_trait;
use launchpad_mail::{Message, MessageId, ProviderError, Transport};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What the transport answers to one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Accept with a generated id.
    Accept,
    /// Accept with the given id.
    AcceptWith(String),
    /// Fail with the given error.
    Fail(ProviderError),
}

/// One `send` call as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Recipient address, lowercased.
    pub recipient: String,
    /// Subject of the message.
    pub subject: String,
    /// Time the call started.
    pub at: Instant,
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<Reply>>,
    always: HashMap<String, Reply>,
    calls: Vec<RecordedCall>,
    next_id: u64,
}

/// Transport whose answers are scripted per recipient.
///
/// Each recipient has a queue of replies consumed one per call; once the queue
/// is empty the recipient's permanent reply applies, and without one the call
/// is accepted. Clones share state, so a test can keep a handle after moving
/// the transport into an `Arc<dyn Transport>`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Transport that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for a recipient.
    pub fn script(self, recipient: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.state
            .lock()
            .scripts
            .entry(recipient.to_lowercase())
            .or_default()
            .extend(replies);
        self
    }

    /// Answer every call for a recipient with the same reply once its queue is drained.
    pub fn always(self, recipient: &str, reply: Reply) -> Self {
        self.state
            .lock()
            .always
            .insert(recipient.to_lowercase(), reply);
        self
    }

    /// Simulated provider round trip, applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every call in the order it was made.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Total number of calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Calls made for one recipient.
    pub fn calls_for(&self, recipient: &str) -> Vec<RecordedCall> {
        let recipient = recipient.to_lowercase();
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Recipients in call order, one entry per call.
    pub fn recipients(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .map(|call| call.recipient.clone())
            .collect()
    }

    /// Gaps between consecutive calls for one recipient.
    pub fn gaps_for(&self, recipient: &str) -> Vec<Duration> {
        self.calls_for(recipient)
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    fn next_reply(&self, message: &Message) -> Result<MessageId, ProviderError> {
        let mut state = self.state.lock();
        let recipient = message.to().email().to_lowercase();

        state.calls.push(RecordedCall {
            recipient: recipient.clone(),
            subject: message.subject().to_string(),
            at: Instant::now(),
        });

        let scripted = state
            .scripts
            .get_mut(&recipient)
            .and_then(VecDeque::pop_front);

        let reply = scripted
            .or_else(|| state.always.get(&recipient).cloned())
            .unwrap_or(Reply::Accept);

        match reply {
            Reply::Accept => {
                state.next_id += 1;
                Ok(MessageId::new(format!("msg-{}", state.next_id)))
            }
            Reply::AcceptWith(id) => Ok(MessageId::new(id)),
            Reply::Fail(err) => Err(err),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, message: &Message) -> Result<MessageId, ProviderError> {
        let reply = self.next_reply(message);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        reply
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Provider errors commonly used in scripts.
pub mod errors {
    use launchpad_mail::ProviderError;
    use std::time::Duration;

    /// HTTP 429 from the provider.
    pub fn rate_limited() -> ProviderError {
        ProviderError::http(429, "Too many requests (rate_limit_exceeded)")
    }

    /// HTTP 429 carrying a retry-after hint.
    pub fn rate_limited_for(wait: Duration) -> ProviderError {
        rate_limited().with_retry_after(wait)
    }

    /// HTTP 503 from the provider.
    pub fn unavailable() -> ProviderError {
        ProviderError::http(503, "Service Unavailable")
    }

    /// Request deadline exceeded.
    pub fn timeout() -> ProviderError {
        ProviderError::timeout("request timed out")
    }

    /// HTTP 422 rejecting the recipient.
    pub fn invalid_recipient() -> ProviderError {
        ProviderError::http(422, "Invalid `to` field (validation_error)")
    }

    /// HTTP 401 for a bad API key.
    pub fn unauthorized() -> ProviderError {
        ProviderError::http(401, "API key is invalid (validation_error)")
    }
}
