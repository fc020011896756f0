//! Dual HTTP/HTTPS listener startup.
//!
//! One application is served on two listeners:
//! - Plaintext: first free port in `[base_port, base_port + 10]`
//! - TLS: first free port in `[plain_port + 1, plain_port + 11]`
//!
//! The plaintext scan always completes before the TLS scan starts, because the
//! TLS range depends on the port the plaintext listener actually got. Both
//! sockets are bound before either accept loop starts, so a failure at any
//! step drops whatever was bound and no half-started server is left behind.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::time::Duration;

use axum::{Extension, Router};
use axum_server::Handle;
use tokio::task::JoinHandle;

use crate::config::{TlsConfig, PORT_SCAN_SPAN};
use crate::state::RuntimeStatus;

use super::endpoint::{advertised_ip, display_address, Endpoint, Scheme};
use super::identity::IdentityError;
use super::probe::{bind_addr, is_port_available};
use super::ready::{notify_ready, CallbackError, ReadyListener};
use super::tls::{select_tls_config, IdentitySource};

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Ports {first} to {last} are all in use ({scheme} listener)")]
    PortsExhausted { scheme: Scheme, first: u16, last: u16 },

    #[error("No port left for the secure listener above plaintext port {plain_port}")]
    NoSecurePort { plain_port: u16 },

    #[error("Invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind {scheme} listener on {addr}: {source}")]
    Bind {
        scheme: Scheme,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to provision TLS identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("Failed to load TLS configuration from {cert}: {source}")]
    Tls {
        cert: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Ready callback failed: {0}")]
    Callback(#[from] CallbackError),

    #[error("TLS support unavailable: {0}")]
    DependencyMissing(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Brings up the plaintext and TLS listeners for one application.
pub struct Bootstrapper {
    tls: TlsConfig,
    status: RuntimeStatus,
}

impl Bootstrapper {
    pub fn new(tls: TlsConfig) -> Self {
        Self {
            tls,
            status: RuntimeStatus::default(),
        }
    }

    /// Publish the external URL into `status` once both listeners are up.
    pub fn with_status(mut self, status: RuntimeStatus) -> Self {
        self.status = status;
        self
    }

    /// Start serving `app` over HTTP and HTTPS.
    ///
    /// Returns once both listeners accept connections. `on_ready` is told
    /// about the TLS endpoint (or the plaintext one through the reduced
    /// signature, see [`ReadyListener`]).
    pub async fn start(
        &self,
        app: Router,
        address: &str,
        base_port: u16,
        verbose: bool,
        on_ready: Option<&mut dyn ReadyListener>,
    ) -> Result<ServerRuntime, BootstrapError> {
        let (plain_listener, plain) = bind_first_available(Scheme::Plain, address, base_port).await?;
        tracing::debug!(port = plain.port(), "Plaintext listener bound");

        let (rustls_config, identity) = select_tls_config(&self.tls).await?;

        let secure_start = secure_scan_start(plain.port())?;
        let (secure_listener, secure) =
            bind_first_available(Scheme::Secure, address, secure_start).await?;
        tracing::debug!(port = secure.port(), "TLS listener bound");

        if verbose {
            log_banner(&plain, &secure).await;
        }

        if !self.status.publish(secure.url()) {
            tracing::debug!("Runtime status already published, keeping the first URL");
        }

        let plain_handle = Handle::new();
        let secure_handle = Handle::new();

        let plain_app = app.clone().layer(Extension(Scheme::Plain));
        let plain_task = tokio::spawn(
            axum_server::from_tcp(plain_listener)
                .handle(plain_handle.clone())
                .serve(plain_app.into_make_service()),
        );

        let secure_app = app.layer(Extension(Scheme::Secure));
        let secure_task = tokio::spawn(
            axum_server::tls_rustls::from_tcp_rustls(secure_listener, rustls_config)
                .handle(secure_handle.clone())
                .serve(secure_app.into_make_service()),
        );

        let runtime = ServerRuntime {
            plain,
            secure,
            identity,
            handles: vec![plain_handle, secure_handle],
            tasks: vec![plain_task, secure_task],
        };

        if let Some(listener) = on_ready {
            if let Err(e) = notify_ready(listener, &runtime.secure, &runtime.plain) {
                runtime.shutdown(None);
                return Err(BootstrapError::Callback(e));
            }
        }

        Ok(runtime)
    }
}

/// Live listeners of a started server.
///
/// Dropping the runtime leaves both accept loops running on the tokio
/// runtime; use [`ServerRuntime::shutdown`] to stop them.
pub struct ServerRuntime {
    plain: Endpoint,
    secure: Endpoint,
    identity: IdentitySource,
    handles: Vec<Handle>,
    tasks: Vec<JoinHandle<io::Result<()>>>,
}

impl ServerRuntime {
    pub fn plain(&self) -> &Endpoint {
        &self.plain
    }

    pub fn secure(&self) -> &Endpoint {
        &self.secure
    }

    /// Certificate the TLS listener presents
    pub fn identity(&self) -> &IdentitySource {
        &self.identity
    }

    /// URL reported by the status route
    pub fn external_url(&self) -> String {
        self.secure.url()
    }

    /// Handles of both listeners, for signal-driven shutdown
    pub fn handles(&self) -> Vec<Handle> {
        self.handles.clone()
    }

    /// Stop both listeners. With a grace period, in-flight connections may
    /// finish; without one they are closed immediately.
    pub fn shutdown(&self, grace: Option<Duration>) {
        for handle in &self.handles {
            match grace {
                Some(duration) => handle.graceful_shutdown(Some(duration)),
                None => handle.shutdown(),
            }
        }
    }

    /// Wait until both accept loops have exited.
    pub async fn wait(self) -> Result<(), BootstrapError> {
        let results = futures::future::join_all(self.tasks).await;

        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(BootstrapError::Server(e.to_string())),
                Err(e) => return Err(BootstrapError::Server(e.to_string())),
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Scan `[first_port, first_port + PORT_SCAN_SPAN]` and bind the first free port.
///
/// A port that probes free but then refuses the real bind is reported as a
/// bind error rather than skipped.
async fn bind_first_available(
    scheme: Scheme,
    address: &str,
    first_port: u16,
) -> Result<(TcpListener, Endpoint), BootstrapError> {
    let last_port = first_port.saturating_add(PORT_SCAN_SPAN);
    let ip = bind_addr(address, first_port)
        .map_err(|source| BootstrapError::Address {
            address: address.to_string(),
            source,
        })?
        .ip();

    for offset in 0..=PORT_SCAN_SPAN {
        let Some(port) = first_port.checked_add(offset) else {
            break;
        };

        if !is_port_available(address, port).await {
            tracing::debug!(%scheme, port, "Port in use, trying next");
            continue;
        }

        let addr = SocketAddr::new(ip, port);
        let listener =
            bind_listener(addr).map_err(|source| BootstrapError::Bind { scheme, addr, source })?;

        return Ok((listener, Endpoint::new(address, port, scheme)));
    }

    tracing::error!(%scheme, first = first_port, last = last_port, "No free port in range");
    Err(BootstrapError::PortsExhausted {
        scheme,
        first: first_port,
        last: last_port,
    })
}

/// First TLS candidate, directly above the plaintext port.
fn secure_scan_start(plain_port: u16) -> Result<u16, BootstrapError> {
    plain_port.checked_add(1).ok_or_else(|| {
        tracing::error!(plain_port, "No port left above the plaintext listener");
        BootstrapError::NoSecurePort { plain_port }
    })
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

async fn log_banner(plain: &Endpoint, secure: &Endpoint) {
    let ip = advertised_ip().await;
    let host = display_address(plain.address());

    tracing::info!("Starting server");
    tracing::info!(
        "To see the GUI go to: http://{}:{} or http://{}:{}",
        ip,
        plain.port(),
        host,
        plain.port()
    );
    tracing::info!(
        "To see the GUI go to: https://{}:{} or https://{}:{}",
        ip,
        secure.port(),
        host,
        secure.port()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn test_scan_skips_taken_port() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        match bind_first_available(Scheme::Plain, "127.0.0.1", port).await {
            Ok((_listener, endpoint)) => {
                assert!(endpoint.port() > port);
                assert!(endpoint.port() <= port.saturating_add(PORT_SCAN_SPAN));
            }
            // Every neighbour may be taken on a busy host
            Err(BootstrapError::PortsExhausted { first, .. }) => assert_eq!(first, port),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_scan_binds_requested_port_when_free() {
        let port = free_port();
        let (listener, endpoint) = bind_first_available(Scheme::Secure, "127.0.0.1", port)
            .await
            .unwrap();

        assert_eq!(endpoint.port(), port);
        assert_eq!(endpoint.scheme(), Scheme::Secure);
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[test]
    fn test_secure_scan_starts_above_plain_port() {
        assert_eq!(secure_scan_start(8189).unwrap(), 8190);
        assert_eq!(secure_scan_start(65534).unwrap(), 65535);
    }

    #[test]
    fn test_no_secure_port_above_last_port() {
        let err = secure_scan_start(u16::MAX).unwrap_err();
        assert!(matches!(err, BootstrapError::NoSecurePort { plain_port: 65535 }));
        assert_eq!(
            err.to_string(),
            "No port left for the secure listener above plaintext port 65535"
        );
    }

    #[test]
    fn test_exhaustion_message_names_range() {
        let err = BootstrapError::PortsExhausted {
            scheme: Scheme::Secure,
            first: 8190,
            last: 8200,
        };
        assert_eq!(
            err.to_string(),
            "Ports 8190 to 8200 are all in use (secure listener)"
        );
    }
}
