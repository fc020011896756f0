//! HTTP server module with dual-protocol startup.
//!
//! One application is served over plaintext HTTP and HTTPS at the same time:
//! - **Port fallback**: each listener scans forward from its requested port
//! - **TLS identity**: operator-supplied certificate, or a self-signed one
//!   generated on first start
//! - **Ready notification**: the host learns the bound endpoints through a
//!   callback
//! - Graceful shutdown on SIGTERM/SIGINT

mod endpoint;
mod identity;
mod probe;
mod ready;
mod server;
mod shutdown;
mod static_files;
mod tls;

pub use endpoint::{advertised_ip, display_address, Endpoint, Scheme};
pub use identity::{ensure_identity, ensure_identity_blocking, generate_self_signed, Identity, IdentityError};
pub use probe::{bind_addr, is_port_available};
pub use ready::{CallbackError, OnReady, OnReadyAddress, ReadyListener};
pub use server::{BootstrapError, Bootstrapper, ServerRuntime};
pub use shutdown::{setup_shutdown_handler, SHUTDOWN_GRACE};
pub use static_files::{asset, create_entry_service, APP_ROUTE};
pub use tls::{install_crypto_provider, select_tls_config, IdentitySource};
