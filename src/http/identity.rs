//! Self-signed TLS identity provisioning.
//!
//! Makes sure `<dir>/certificate.crt` and `<dir>/private.key` exist. A missing
//! certificate triggers generation of a fresh 2048-bit RSA key and a
//! self-signed X.509 certificate valid for one year. An existing certificate
//! is reused as-is; its content is never inspected.
//!
//! Both files are written through a staging file and renamed into place, key
//! first, so a crash never leaves a certificate without its key.

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair, SanType,
    SerialNumber, PKCS_RSA_SHA256,
};
use time::{Duration, OffsetDateTime};

use crate::config::{
    CERTIFICATE_COMMON_NAME, CERTIFICATE_FILE, CERTIFICATE_SERIAL, CERTIFICATE_VALIDITY_DAYS,
    PRIVATE_KEY_FILE,
};

/// Location of a certificate/key pair on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub certificate_path: PathBuf,
    pub key_path: PathBuf,
}

impl Identity {
    /// The fixed file layout inside an identity directory.
    pub fn in_dir(directory: &Path) -> Self {
        Self {
            certificate_path: directory.join(CERTIFICATE_FILE),
            key_path: directory.join(PRIVATE_KEY_FILE),
        }
    }
}

/// Identity provisioning error
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Failed to write TLS identity file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to generate self-signed certificate: {0}")]
    Crypto(#[from] rcgen::Error),

    #[error("Identity provisioning task failed: {0}")]
    Worker(String),
}

/// Ensure a certificate/key pair exists in `directory`, generating one if needed.
pub fn ensure_identity(directory: &Path) -> Result<Identity, IdentityError> {
    let identity = Identity::in_dir(directory);

    if !directory.exists() {
        fs::create_dir_all(directory).map_err(|source| IdentityError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
    }

    if identity.certificate_path.exists() {
        tracing::debug!(
            cert = %identity.certificate_path.display(),
            "Reusing existing TLS identity"
        );
        return Ok(identity);
    }

    tracing::info!(
        dir = %directory.display(),
        common_name = CERTIFICATE_COMMON_NAME,
        "Generating self-signed TLS identity"
    );

    let (cert_pem, key_pem) = generate_self_signed()?;

    write_staged(&identity.key_path, key_pem.as_bytes())?;
    write_staged(&identity.certificate_path, cert_pem.as_bytes())?;

    tracing::info!(
        cert = %identity.certificate_path.display(),
        key = %identity.key_path.display(),
        "Self-signed TLS identity written"
    );

    Ok(identity)
}

/// Run [`ensure_identity`] on the blocking pool.
///
/// RSA key generation takes long enough to stall the runtime, so async
/// callers go through here.
pub async fn ensure_identity_blocking(directory: PathBuf) -> Result<Identity, IdentityError> {
    tokio::task::spawn_blocking(move || ensure_identity(&directory))
        .await
        .map_err(|e| IdentityError::Worker(e.to_string()))?
}

/// Generate a self-signed certificate and its RSA key, both PEM-encoded.
///
/// Returns `(certificate_pem, private_key_pem)`.
pub fn generate_self_signed() -> Result<(String, String), IdentityError> {
    let key_pair = KeyPair::generate_for(&PKCS_RSA_SHA256)?;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, CERTIFICATE_COMMON_NAME);

    let now = OffsetDateTime::now_utc();

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.serial_number = Some(SerialNumber::from_slice(&[CERTIFICATE_SERIAL]));
    params.not_before = now;
    params.not_after = now + Duration::days(CERTIFICATE_VALIDITY_DAYS);
    params.subject_alt_names = vec![
        SanType::DnsName("localhost".try_into()?),
        SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let certificate = params.self_signed(&key_pair)?;

    Ok((certificate.pem(), key_pair.serialize_pem()))
}

fn write_staged(path: &Path, contents: &[u8]) -> Result<(), IdentityError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    fs::write(&staging, contents).map_err(|source| IdentityError::Io {
        path: staging.clone(),
        source,
    })?;

    fs::rename(&staging, path).map_err(|source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    })
}
