//! TLS context selection.
//!
//! The operator's certificate pair wins when both files are configured and
//! load cleanly. Any problem with it (missing file, malformed PEM, key that
//! does not match the certificate) falls back to the self-signed identity,
//! which is provisioned on demand.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::CryptoProvider;

use crate::config::TlsConfig;

use super::identity::{ensure_identity_blocking, Identity};
use super::server::BootstrapError;

/// Where the TLS listener's certificate came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Pair supplied through `tls.cert_path` / `tls.key_path`
    Operator { cert: PathBuf, key: PathBuf },
    /// Generated (or reused) self-signed pair
    SelfSigned(Identity),
}

impl IdentitySource {
    pub fn is_self_signed(&self) -> bool {
        matches!(self, IdentitySource::SelfSigned(_))
    }

    pub fn certificate_path(&self) -> &Path {
        match self {
            IdentitySource::Operator { cert, .. } => cert,
            IdentitySource::SelfSigned(identity) => &identity.certificate_path,
        }
    }
}

/// Make sure rustls has a process-wide crypto provider.
///
/// Several providers are compiled in, so rustls cannot pick one on its own.
/// This has to succeed before any listener is bound.
pub fn install_crypto_provider() -> Result<(), BootstrapError> {
    if CryptoProvider::get_default().is_some() {
        return Ok(());
    }

    // Losing the race to another installer is fine
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    match CryptoProvider::get_default() {
        Some(_) => Ok(()),
        None => Err(BootstrapError::DependencyMissing(
            "no rustls crypto provider could be installed".to_string(),
        )),
    }
}

/// Build the TLS configuration for the secure listener.
pub async fn select_tls_config(
    tls: &TlsConfig,
) -> Result<(RustlsConfig, IdentitySource), BootstrapError> {
    if let Some((cert, key)) = tls.operator_pair() {
        match load_operator_pair(cert, key).await {
            Ok(config) => {
                tracing::info!(
                    cert = %cert.display(),
                    key = %key.display(),
                    "Using operator-supplied TLS certificate"
                );
                return Ok((
                    config,
                    IdentitySource::Operator {
                        cert: cert.to_path_buf(),
                        key: key.to_path_buf(),
                    },
                ));
            }
            Err(e) => {
                tracing::warn!(
                    cert = %cert.display(),
                    key = %key.display(),
                    error = %e,
                    "Operator TLS certificate unusable, falling back to self-signed identity"
                );
            }
        }
    }

    let identity = ensure_identity_blocking(tls.identity_dir()).await?;

    let config = RustlsConfig::from_pem_file(&identity.certificate_path, &identity.key_path)
        .await
        .map_err(|source| BootstrapError::Tls {
            cert: identity.certificate_path.clone(),
            source,
        })?;

    Ok((config, IdentitySource::SelfSigned(identity)))
}

async fn load_operator_pair(cert: &Path, key: &Path) -> std::io::Result<RustlsConfig> {
    for path in [cert, key] {
        if !path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
    }

    RustlsConfig::from_pem_file(cert, key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::identity::ensure_identity;

    fn tls_config(install_dir: &Path, pair: Option<(PathBuf, PathBuf)>) -> TlsConfig {
        let (cert_path, key_path) = match pair {
            Some((cert, key)) => (Some(cert), Some(key)),
            None => (None, None),
        };
        TlsConfig {
            install_dir: install_dir.to_path_buf(),
            cert_path,
            key_path,
        }
    }

    #[test]
    fn test_install_crypto_provider_is_repeatable() {
        install_crypto_provider().unwrap();
        install_crypto_provider().unwrap();
        assert!(CryptoProvider::get_default().is_some());
    }

    #[tokio::test]
    async fn test_no_operator_pair_provisions_self_signed() {
        install_crypto_provider().unwrap();
        let tmp = tempfile::tempdir().unwrap();

        let (_, source) = select_tls_config(&tls_config(tmp.path(), None))
            .await
            .unwrap();

        assert!(source.is_self_signed());
        assert_eq!(
            source.certificate_path(),
            tmp.path().join("https").join("certificate.crt")
        );
    }

    #[tokio::test]
    async fn test_valid_operator_pair_is_used() {
        install_crypto_provider().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let operator = ensure_identity(&tmp.path().join("operator")).unwrap();

        let config = tls_config(
            tmp.path(),
            Some((operator.certificate_path.clone(), operator.key_path.clone())),
        );
        let (_, source) = select_tls_config(&config).await.unwrap();

        assert_eq!(
            source,
            IdentitySource::Operator {
                cert: operator.certificate_path,
                key: operator.key_path,
            }
        );
        assert!(!tmp.path().join("https").exists());
    }

    #[tokio::test]
    async fn test_missing_operator_files_fall_back() {
        install_crypto_provider().unwrap();
        let tmp = tempfile::tempdir().unwrap();

        let config = tls_config(
            tmp.path(),
            Some((tmp.path().join("absent.crt"), tmp.path().join("absent.key"))),
        );
        let (_, source) = select_tls_config(&config).await.unwrap();

        assert!(source.is_self_signed());
    }

    #[tokio::test]
    async fn test_malformed_operator_pem_falls_back() {
        install_crypto_provider().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let cert = tmp.path().join("broken.crt");
        let key = tmp.path().join("broken.key");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let (_, source) = select_tls_config(&tls_config(tmp.path(), Some((cert, key))))
            .await
            .unwrap();

        assert!(source.is_self_signed());
    }
}
