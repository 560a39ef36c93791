use std::net::SocketAddr;

use thiserror::Error;

/// Start-up and serve-loop failures of the HTTP host.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tool registry: {0}")]
    Registry(#[from] jobtread_mcp_runtime::RegistryError),
    #[error("server stopped: {0}")]
    Serve(#[source] std::io::Error),
}
