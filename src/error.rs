use serde_json::Value;

/// Errors produced by the correlation and dispatch layers.
///
/// Protocol anomalies (`Parse`, `InvalidMessage`, `UnknownResponseId`,
/// `MethodNotFound`, `Handler`) never escape the dispatch loop; they reach
/// the general error listener instead. The remaining variants are returned
/// to callers of [`call`](crate::Client::call) and
/// [`notify`](crate::Client::notify) or to handlers reading their params.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error declared by the remote peer in an error response.
    #[error("remote error: {0}")]
    Remote(Value),
    /// An inbound frame that is not valid JSON; `raw` is the frame text.
    #[error("could not parse inbound frame: {source}")]
    Parse {
        raw: String,
        source: serde_json::Error,
    },
    /// An inbound message matching none of the known shapes.
    #[error("message matches no JSON-RPC shape: {0}")]
    InvalidMessage(Value),
    /// A response whose id matches no pending call; carries the full
    /// response object.
    #[error("response matches no pending call: {0}")]
    UnknownResponseId(Value),
    /// An inbound request or notification naming an unregistered method;
    /// carries the full message.
    #[error("method not found: {method}")]
    MethodNotFound { method: String, message: Value },
    /// A local handler that returned an error.
    #[error("handler for method {method} failed: {source}")]
    Handler { method: String, source: Box<Error> },
    #[error("params missing")]
    ParamsMissing,
    #[error("could not parse params: {0}")]
    ParamsParse(#[source] serde_json::Error),
    #[error("could not parse result: {0}")]
    ResultParse(#[source] serde_json::Error),
    #[error("could not serialize message: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("transport failed: {0}")]
    Transport(#[from] std::io::Error),
    #[error("request id space exhausted")]
    RequestIdOverflow,
    /// The client or its transport is gone; outstanding calls cannot
    /// complete.
    #[error("shutdown")]
    Shutdown,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
