//! Network seam behind the offline worker.

use super::http::{Request, Response};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Transport failure. An HTTP error status is a response, not this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    Unreachable(String),
    Io(String),
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(url) => write!(f, "network unreachable for `{url}`"),
            Self::Io(message) => write!(f, "network io error: {message}"),
        }
    }
}

impl Error for NetworkError {}

/// Fetches requests that the worker does not answer from cache.
pub trait Network: Send + Sync {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

impl<N: Network + ?Sized> Network for Arc<N> {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request)
    }
}

/// Network that is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnreachableNetwork;

impl Network for UnreachableNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        Err(NetworkError::Unreachable(request.url.clone()))
    }
}
