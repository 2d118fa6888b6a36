//! Error type returned by every cache operation.

use std::sync::Arc;

use thiserror::Error;

use crate::codec::CodecError;
use crate::hooks::HookError;
use crate::transport::TransportError;

/// Errors produced by [`RequestCache`](crate::RequestCache).
///
/// The type is `Clone` because callers coalesced onto the same in-flight
/// computation all receive the same outcome. None of these are ever cached.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("body codec failed: {0}")]
    Codec(#[from] CodecError),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("failed to serialize request body: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    #[error("before-hook aborted the request: {0}")]
    Hook(#[from] HookError),

    #[error("in-flight computation ended without a result")]
    Interrupted,
}

impl Error {
    pub(crate) fn decode(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }

    pub(crate) fn encode(err: serde_json::Error) -> Self {
        Self::Encode(Arc::new(err))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
