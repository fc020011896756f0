//! Ready notification sent once both listeners are up.
//!
//! Listeners get `(scheme, address, port)` for the preferred endpoint. Older
//! hosts only understand `(address, port)`; when the full call is rejected,
//! the reduced call is made once with the plaintext endpoint.

use super::endpoint::{Endpoint, Scheme};

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("callback does not accept this signature")]
    Unsupported,

    #[error("callback failed: {0}")]
    Failed(String),
}

/// Receiver of the ready notification.
///
/// Implement whichever form the host understands; the other one reports
/// [`CallbackError::Unsupported`].
pub trait ReadyListener: Send {
    fn on_ready(&mut self, scheme: Scheme, address: &str, port: u16) -> Result<(), CallbackError> {
        let _ = (scheme, address, port);
        Err(CallbackError::Unsupported)
    }

    fn on_ready_address(&mut self, address: &str, port: u16) -> Result<(), CallbackError> {
        let _ = (address, port);
        Err(CallbackError::Unsupported)
    }
}

/// Adapts a `(scheme, address, port)` closure.
pub struct OnReady<F>(F);

impl<F> OnReady<F>
where
    F: FnMut(Scheme, &str, u16) -> Result<(), CallbackError> + Send,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> ReadyListener for OnReady<F>
where
    F: FnMut(Scheme, &str, u16) -> Result<(), CallbackError> + Send,
{
    fn on_ready(&mut self, scheme: Scheme, address: &str, port: u16) -> Result<(), CallbackError> {
        (self.0)(scheme, address, port)
    }
}

/// Adapts an `(address, port)` closure.
pub struct OnReadyAddress<F>(F);

impl<F> OnReadyAddress<F>
where
    F: FnMut(&str, u16) -> Result<(), CallbackError> + Send,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> ReadyListener for OnReadyAddress<F>
where
    F: FnMut(&str, u16) -> Result<(), CallbackError> + Send,
{
    fn on_ready_address(&mut self, address: &str, port: u16) -> Result<(), CallbackError> {
        (self.0)(address, port)
    }
}

/// Notify `listener`, retrying once with the reduced signature.
///
/// An `Unsupported` answer from one form yields the other form's error; two
/// real failures are reported together.
pub(crate) fn notify_ready(
    listener: &mut dyn ReadyListener,
    preferred: &Endpoint,
    plain: &Endpoint,
) -> Result<(), CallbackError> {
    match listener.on_ready(preferred.scheme(), preferred.address(), preferred.port()) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                error = %e,
                "Ready callback rejected (scheme, address, port), retrying with (address, port)"
            );
            match listener.on_ready_address(plain.address(), plain.port()) {
                Ok(()) => Ok(()),
                Err(CallbackError::Unsupported) => Err(e),
                Err(retry) if matches!(e, CallbackError::Unsupported) => Err(retry),
                Err(retry) => Err(CallbackError::Failed(format!("{}; retry: {}", e, retry))),
            }
        }
    }
}
