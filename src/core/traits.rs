//! Core traits for the band protocol engine.
//!
//! The transport is an external collaborator: the engine only needs to write
//! characteristics and switch notifications on. Inbound values arrive as
//! [`Notification`]s through whatever channel the adapter feeds.

use std::future::Future;

use super::characteristic::CharacteristicRole;
use super::error::TransportError;

/// GATT link to a single band.
///
/// Writes complete before the returned future resolves; the engine relies on
/// this to keep chunk frames strictly ordered.
///
/// # Example
///
/// ```ignore
/// struct Loopback;
///
/// impl Transport for Loopback {
///     async fn write(&self, role: CharacteristicRole, value: &[u8]) -> Result<(), TransportError> {
///         println!("{role}: {value:02x?}");
///         Ok(())
///     }
///
///     async fn enable_notifications(&self, _role: CharacteristicRole) -> Result<bool, TransportError> {
///         Ok(true)
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Write a value to the characteristic with the given role.
    fn write(
        &self,
        role: CharacteristicRole,
        value: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Enable notifications on a characteristic.
    ///
    /// Returns `false` if the device declined without a transport failure.
    fn enable_notifications(
        &self,
        role: CharacteristicRole,
    ) -> impl Future<Output = Result<bool, TransportError>> + Send;
}

/// A value notified by the band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Characteristic that notified.
    pub role: CharacteristicRole,
    /// Raw value.
    pub value: Vec<u8>,
}

impl Notification {
    /// Create a notification.
    pub fn new(role: CharacteristicRole, value: impl Into<Vec<u8>>) -> Self {
        Self {
            role,
            value: value.into(),
        }
    }
}
