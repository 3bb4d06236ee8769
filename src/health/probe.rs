//! Health probes.
//!
//! A probe answers one question about one server: healthy or not. The
//! monitor bounds every call with the backend's timeout, so implementations
//! need not enforce one themselves.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::load_balancer::server::Server;

/// Errors raised while executing a probe. Counted as a failed check.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe error: {0}")]
    Other(String),
}

/// A health check against a single server.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// `Ok(true)` when the server is healthy.
    async fn check(&self, server: &Server) -> Result<bool, ProbeError>;
}

/// Healthy when a TCP connection to the server's address can be opened.
/// The connection is dropped straight away.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectProbe;

#[async_trait]
impl Probe for TcpConnectProbe {
    async fn check(&self, server: &Server) -> Result<bool, ProbeError> {
        let address = server.address();
        match TcpStream::connect(&address).await {
            Ok(_) => Ok(true),
            Err(source) => Err(ProbeError::Connect { address, source }),
        }
    }
}

/// Wraps a plain boolean function as a probe.
pub struct FnProbe<F> {
    f: F,
}

impl<F> FnProbe<F>
where
    F: Fn(&Server) -> bool + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Probe for FnProbe<F>
where
    F: Fn(&Server) -> bool + Send + Sync + 'static,
{
    async fn check(&self, server: &Server) -> Result<bool, ProbeError> {
        Ok((self.f)(server))
    }
}
