//! Client-side JSON-RPC 2.0 message correlation.
//!
//! A [`Client`] pairs outbound calls with their asynchronous responses,
//! dispatches inbound requests and notifications to a [`Methods`] table, and
//! reports malformed or unexpected traffic through two replaceable error
//! listeners. The transport is an external collaborator: anything
//! implementing [`FrameRead`] and [`FrameWrite`] carries the raw text
//! frames, and the crate never opens or manages connections itself.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::{spawn, sync::oneshot, task::JoinHandle};

mod client_builder;
mod error;
mod frame_read;
mod frame_write;
mod message;
mod methods;

pub use error::*;
pub use frame_read::*;
pub use frame_write::*;
pub use message::*;
pub use methods::*;

use message::{ErrorMessage, Message, RequestMessage, ResponseMessage};

/// Params placeholder for calls and notifications that send no `params`
/// field.
pub const NO_PARAMS: Option<&()> = None;

type PendingSender = oneshot::Sender<Result<Value>>;
type ErrorCallback = Arc<dyn Fn(Error) + Send + Sync>;
type ResponseErrorCallback = Arc<dyn Fn(ErrorResponse) + Send + Sync>;

/// Acquire a mutex guard, ignoring poisoning. The guarded state has no
/// invariants spanning multiple fields that a panicking task could leave
/// half-applied.
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A connected JSON-RPC peer.
///
/// Cheap to clone; clones share one pending-call registry, one id counter,
/// and one transport.
#[derive(Clone)]
pub struct Client(Arc<RawClient>);

struct RawClient {
    state: Mutex<ClientState>,
    writer: tokio::sync::Mutex<BoxFrameWriter>,
    methods: Methods,
    on_error: Mutex<Option<ErrorCallback>>,
    on_response_error: Mutex<Option<ResponseErrorCallback>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

struct ClientState {
    pending: HashMap<u64, PendingSender>,
    next_id: u64,
}

impl ClientState {
    fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Allocates the next call id and registers its completion sender, under
    /// one lock so no response can observe the id before the entry exists.
    fn insert_pending(&mut self) -> Result<(u64, oneshot::Receiver<Result<Value>>)> {
        if self.next_id == u64::MAX {
            return Err(Error::RequestIdOverflow);
        }
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        Ok((id, rx))
    }
}

/// Removes a pending entry whose call future was dropped before completion.
/// Ids are never reused, so removing an already completed id is a no-op.
struct PendingGuard<'a> {
    client: &'a RawClient,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_ignore_poison(&self.client.state).pending.remove(&self.id);
    }
}

impl Client {
    /// Connects a client with no local methods over `reader`/`writer`.
    pub fn new(
        reader: impl FrameRead + Send + Sync + 'static,
        writer: impl FrameWrite + Send + Sync + 'static,
    ) -> Self {
        Self::with_methods(Methods::new(), reader, writer)
    }

    /// Connects a client that serves `methods` to the remote peer.
    pub fn with_methods(
        methods: Methods,
        reader: impl FrameRead + Send + Sync + 'static,
        writer: impl FrameWrite + Send + Sync + 'static,
    ) -> Self {
        let raw = Arc::new(RawClient {
            state: Mutex::new(ClientState::new()),
            writer: tokio::sync::Mutex::new(writer.boxed()),
            methods,
            on_error: Mutex::new(None),
            on_response_error: Mutex::new(None),
            dispatch: Mutex::new(None),
        });
        let task = spawn(Dispatcher::run(Arc::downgrade(&raw), reader));
        *lock_ignore_poison(&raw.dispatch) = Some(task);
        Client(raw)
    }

    /// Invokes `method` on the remote peer and waits for its response.
    ///
    /// The call is registered in the pending-call registry before the
    /// request frame is handed to the transport, so a response can never
    /// arrive unmatched. Out-of-order responses complete the right call:
    /// matching is by id, not arrival order. Dropping the returned future
    /// withdraws the registration.
    pub async fn call<P, R>(&self, method: &str, params: Option<&P>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = encode_params(params)?;
        let (id, rx) = lock_ignore_poison(&self.0.state).insert_pending()?;
        let _guard = PendingGuard {
            client: &self.0,
            id,
        };
        let m = RawMessage {
            id: Some(RequestId::from(id)),
            method: Some(method.to_owned()),
            params,
            ..RawMessage::default()
        };
        self.0.send(&m).await?;
        match rx.await {
            Ok(Ok(result)) => match serde_json::from_value(result) {
                Ok(result) => Ok(result),
                Err(e) => Err(Error::ResultParse(e)),
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Shutdown),
        }
    }

    /// Sends a notification: no id, no registry entry, no response.
    pub async fn notify<P>(&self, method: &str, params: Option<&P>) -> Result<()>
    where
        P: Serialize,
    {
        let m = RawMessage {
            method: Some(method.to_owned()),
            params: encode_params(params)?,
            ..RawMessage::default()
        };
        self.0.send(&m).await
    }

    /// Replaces the general error listener.
    ///
    /// The listener receives parse failures, malformed messages, unknown
    /// response ids, unknown methods, and handler failures. While no
    /// listener is set such events are dropped.
    pub fn set_on_error(&self, f: impl Fn(Error) + Send + Sync + 'static) {
        *lock_ignore_poison(&self.0.on_error) = Some(Arc::new(f));
    }

    /// Replaces the response-error listener.
    ///
    /// The listener receives every inbound error response, whether or not
    /// its id matches a pending call.
    pub fn set_on_response_error(&self, f: impl Fn(ErrorResponse) + Send + Sync + 'static) {
        *lock_ignore_poison(&self.0.on_response_error) = Some(Arc::new(f));
    }

    /// Waits until the dispatch loop ends, which happens when the peer
    /// closes the inbound half of the transport.
    pub async fn wait(&self) -> Result<()> {
        let task = lock_ignore_poison(&self.0.dispatch).take();
        if let Some(task) = task {
            if task.await.is_err() {
                return Err(Error::Shutdown);
            }
        }
        Ok(())
    }
}

fn encode_params<P: Serialize>(params: Option<&P>) -> Result<Option<Value>> {
    match params {
        Some(p) => match serde_json::to_value(p) {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(Error::Serialize(e)),
        },
        None => Ok(None),
    }
}

impl RawClient {
    async fn send(&self, m: &RawMessage) -> Result<()> {
        let frame = match serde_json::to_string(m) {
            Ok(frame) => frame,
            Err(e) => return Err(Error::Serialize(e)),
        };
        self.writer.lock().await.write(&frame).await
    }

    /// One raw inbound frame: decode, split batches, route each message.
    /// A frame that is not valid JSON is reported whole; inside a batch,
    /// elements fail independently.
    async fn handle_frame(&self, frame: &str) {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(e) => {
                return self.report(Error::Parse {
                    raw: frame.to_owned(),
                    source: e,
                });
            }
        };
        match value {
            Value::Array(items) => {
                for item in items {
                    self.handle_message(item).await;
                }
            }
            value => self.handle_message(value).await,
        }
    }

    async fn handle_message(&self, value: Value) {
        match Message::classify(value) {
            Ok(Message::Response(m)) => self.resolve(m),
            Ok(Message::Request(m)) => self.invoke(m).await,
            Ok(Message::Error(m)) => self.reject(m),
            Err(e) => self.report(e),
        }
    }

    /// Completes the pending call matching a success response.
    fn resolve(&self, m: ResponseMessage) {
        let sender = m
            .id
            .as_ref()
            .and_then(RequestId::as_key)
            .and_then(|id| lock_ignore_poison(&self.state).pending.remove(&id));
        match sender {
            // A closed receiver means the caller abandoned the call.
            Some(tx) => {
                let _ = tx.send(Ok(m.result));
            }
            None => self.report(Error::UnknownResponseId(m.into_value())),
        }
    }

    /// Error responses reach the response-error listener unconditionally,
    /// and additionally reject the matching pending call when the id is
    /// known.
    fn reject(&self, m: ErrorMessage) {
        let sender = m
            .id
            .as_ref()
            .and_then(RequestId::as_key)
            .and_then(|id| lock_ignore_poison(&self.state).pending.remove(&id));
        let callback = lock_ignore_poison(&self.on_response_error).clone();
        match callback {
            Some(callback) => callback(ErrorResponse {
                id: m.id,
                error: m.error.clone(),
            }),
            None => tracing::debug!("unobserved error response: {}", m.error),
        }
        if let Some(tx) = sender {
            let _ = tx.send(Err(Error::Remote(m.error)));
        }
    }

    /// Runs the local method named by an inbound request or notification,
    /// answering with an enveloped result when the message carried an id.
    async fn invoke(&self, m: RequestMessage) {
        let Some(handler) = self.methods.get(&m.method) else {
            let method = m.method.clone();
            return self.report(Error::MethodNotFound {
                method,
                message: m.into_value(),
            });
        };
        match handler(Params(m.params.as_ref())) {
            Ok(result) => {
                if let Some(id) = m.id {
                    let response = RawMessage {
                        id: Some(id),
                        result: Some(result),
                        ..RawMessage::default()
                    };
                    if let Err(e) = self.send(&response).await {
                        self.report(e);
                    }
                }
            }
            Err(e) => self.report(Error::Handler {
                method: m.method,
                source: Box::new(e),
            }),
        }
    }

    /// Hands a protocol anomaly to the general error listener, if any.
    fn report(&self, e: Error) {
        let callback = lock_ignore_poison(&self.on_error).clone();
        match callback {
            Some(callback) => callback(e),
            None => tracing::debug!("unobserved protocol error: {e}"),
        }
    }

    /// Rejects every outstanding call; the transport is gone.
    fn shutdown_pending(&self) {
        let senders: Vec<PendingSender> = {
            let mut state = lock_ignore_poison(&self.state);
            state.pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in senders {
            let _ = tx.send(Err(Error::Shutdown));
        }
    }
}

impl Drop for RawClient {
    fn drop(&mut self) {
        if let Some(task) = lock_ignore_poison(&self.dispatch).take() {
            task.abort();
        }
    }
}

struct Dispatcher<R> {
    client: Weak<RawClient>,
    reader: R,
}

impl<R> Dispatcher<R>
where
    R: FrameRead + Send + Sync,
{
    async fn run(client: Weak<RawClient>, reader: R) {
        let mut dispatcher = Dispatcher { client, reader };
        let result = dispatcher.run_inner().await;
        if let Some(client) = dispatcher.client.upgrade() {
            if let Err(e) = result {
                client.report(e);
            }
            client.shutdown_pending();
        }
        tracing::debug!("dispatch loop ended");
    }

    async fn run_inner(&mut self) -> Result<()> {
        while let Some(frame) = self.reader.read().await? {
            let Some(client) = self.client.upgrade() else {
                break;
            };
            client.handle_frame(&frame).await;
        }
        Ok(())
    }
}
