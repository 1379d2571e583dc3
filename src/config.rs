//! Device and session configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::{
    AUTH_KEY_SIZE, ConfigError, DEFAULT_MTU, INITIAL_SAMPLE_CAPACITY, KEEPALIVE_INTERVAL,
};

/// Supported band models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandType {
    /// Mi Band 6.
    MiBand6,
    /// Mi Band 7.
    MiBand7,
}

impl FromStr for BandType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "6" => Ok(BandType::MiBand6),
            "7" => Ok(BandType::MiBand7),
            other => Err(ConfigError::InvalidBandType(other.to_string())),
        }
    }
}

impl fmt::Display for BandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandType::MiBand6 => f.write_str("Mi Band 6"),
            BandType::MiBand7 => f.write_str("Mi Band 7"),
        }
    }
}

/// Static 16-byte key provisioned on the band. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthKey([u8; AUTH_KEY_SIZE]);

impl AuthKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; AUTH_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse 32 hex characters. Surrounding whitespace is ignored.
    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        if text.len() != 2 * AUTH_KEY_SIZE {
            return Err(ConfigError::InvalidAuthKey(format!(
                "expected {} hex characters, got {}",
                2 * AUTH_KEY_SIZE,
                text.len()
            )));
        }
        let mut bytes = [0u8; AUTH_KEY_SIZE];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|e| ConfigError::InvalidAuthKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Read the key from the first line of a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let result = Self::from_hex(contents.lines().next().unwrap_or_default());
        contents.zeroize();
        result
    }

    /// Get the raw key.
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthKey(..)")
    }
}

/// Which band to talk to and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandConfig {
    /// Bluetooth address, `AA:BB:CC:DD:EE:FF`.
    pub address: String,
    /// Band model.
    pub band_type: BandType,
    /// File holding the hex auth key.
    pub auth_key_path: PathBuf,
}

impl BandConfig {
    /// Build a config, validating the address.
    pub fn new(
        address: impl Into<String>,
        band_type: BandType,
        auth_key_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let address = address.into();
        if !is_mac_address(&address) {
            return Err(ConfigError::InvalidAddress(address));
        }
        Ok(Self {
            address: address.to_ascii_uppercase(),
            band_type,
            auth_key_path: auth_key_path.into(),
        })
    }

    /// Load the auth key from [`BandConfig::auth_key_path`].
    pub fn load_auth_key(&self) -> Result<AuthKey, ConfigError> {
        AuthKey::from_file(&self.auth_key_path)
    }
}

fn is_mac_address(text: &str) -> bool {
    let octets: Vec<&str> = text.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Tunables for a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// ATT MTU used to size outbound chunks.
    pub mtu: usize,
    /// Sample capacity the telemetry buffer starts with and resets to.
    pub initial_capacity: usize,
    /// Hard ceiling on buffer capacity. `None` grows until allocation fails.
    pub max_capacity: Option<usize>,
    /// Period of the keep-alive tick.
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            initial_capacity: INITIAL_SAMPLE_CAPACITY,
            max_capacity: None,
            tick_interval: KEEPALIVE_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("miband-link-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_band_type_parse() {
        assert_eq!("6".parse::<BandType>().unwrap(), BandType::MiBand6);
        assert_eq!(" 7\n".parse::<BandType>().unwrap(), BandType::MiBand7);
        assert!(matches!(
            "5".parse::<BandType>(),
            Err(ConfigError::InvalidBandType(s)) if s == "5"
        ));
    }

    #[test]
    fn test_auth_key_from_hex() {
        let key = AuthKey::from_hex("00112233445566778899aabbccddeeff").unwrap();
        assert_eq!(key.as_bytes()[0], 0x00);
        assert_eq!(key.as_bytes()[15], 0xff);

        assert!(AuthKey::from_hex("0011").is_err());
        assert!(AuthKey::from_hex("zz112233445566778899aabbccddeeff").is_err());
    }

    #[test]
    fn test_auth_key_debug_is_redacted() {
        let key = AuthKey::new([0xAB; AUTH_KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "AuthKey(..)");
    }

    #[test]
    fn test_auth_key_from_file() {
        let path = temp_path("auth-key");
        std::fs::write(&path, "0f0e0d0c0b0a09080706050403020100\n").unwrap();
        let key = AuthKey::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(key.as_bytes()[0], 0x0f);
        assert_eq!(key.as_bytes()[15], 0x00);
    }

    #[test]
    fn test_auth_key_missing_file() {
        let path = temp_path("does-not-exist");
        assert!(matches!(
            AuthKey::from_file(&path),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_band_config_address() {
        let config = BandConfig::new("aa:bb:cc:dd:ee:ff", BandType::MiBand6, "key.txt").unwrap();
        assert_eq!(config.address, "AA:BB:CC:DD:EE:FF");

        assert!(matches!(
            BandConfig::new("aa:bb:cc:dd:ee", BandType::MiBand6, "key.txt"),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert!(BandConfig::new("aa:bb:cc:dd:ee:fg", BandType::MiBand7, "key.txt").is_err());
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.mtu, 23);
        assert_eq!(config.initial_capacity, 1000);
        assert_eq!(config.max_capacity, None);
        assert_eq!(config.tick_interval, Duration::from_secs(10));
    }
}
