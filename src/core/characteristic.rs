//! GATT characteristic roles.
//!
//! Characteristics are resolved to a role once, when the device is set up;
//! everything past that point dispatches on [`CharacteristicRole`].

use std::fmt;

use uuid::Uuid;

/// Builds a full UUID from a Bluetooth SIG 16-bit short UUID.
const fn sig_uuid(short: u16) -> Uuid {
    Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5f9b_34fb | ((short as u128) << 96))
}

/// Builds a Huami vendor UUID (`0000XXXX-0000-3512-2118-0009af100700`).
const fn huami_uuid(short: u16) -> Uuid {
    Uuid::from_u128(0x0000_0000_0000_3512_2118_0009_af10_0700 | ((short as u128) << 96))
}

/// Role a characteristic plays in the band protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicRole {
    /// Chunked transfer, host → band.
    ChunkedWrite,
    /// Chunked transfer, band → host (notify).
    ChunkedRead,
    /// Activity fetch control.
    Fetch,
    /// Activity data stream.
    ActivityData,
    /// Current time.
    CurrentTime,
    /// Heart-rate control point.
    HeartRateControl,
    /// Heart-rate measurement (notify).
    HeartRateMeasure,
    /// Alert level / new alert.
    Alert,
}

impl CharacteristicRole {
    /// Every role, in discovery order.
    pub const ALL: [CharacteristicRole; 8] = [
        CharacteristicRole::ChunkedWrite,
        CharacteristicRole::ChunkedRead,
        CharacteristicRole::Fetch,
        CharacteristicRole::ActivityData,
        CharacteristicRole::CurrentTime,
        CharacteristicRole::HeartRateControl,
        CharacteristicRole::HeartRateMeasure,
        CharacteristicRole::Alert,
    ];

    /// Roles a session cannot run without.
    pub const REQUIRED: [CharacteristicRole; 5] = [
        CharacteristicRole::ChunkedWrite,
        CharacteristicRole::ChunkedRead,
        CharacteristicRole::HeartRateControl,
        CharacteristicRole::HeartRateMeasure,
        CharacteristicRole::Alert,
    ];

    /// UUID the band exposes for this role.
    pub const fn uuid(self) -> Uuid {
        match self {
            CharacteristicRole::ChunkedWrite => huami_uuid(0x0016),
            CharacteristicRole::ChunkedRead => huami_uuid(0x0017),
            CharacteristicRole::Fetch => huami_uuid(0x0004),
            CharacteristicRole::ActivityData => huami_uuid(0x0005),
            CharacteristicRole::CurrentTime => sig_uuid(0x2a2b),
            CharacteristicRole::HeartRateControl => sig_uuid(0x2a39),
            CharacteristicRole::HeartRateMeasure => sig_uuid(0x2a37),
            CharacteristicRole::Alert => sig_uuid(0x2a46),
        }
    }

    /// Resolve a discovered UUID to its role.
    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.uuid() == *uuid)
    }
}

impl fmt::Display for CharacteristicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharacteristicRole::ChunkedWrite => "chunked-write",
            CharacteristicRole::ChunkedRead => "chunked-read",
            CharacteristicRole::Fetch => "fetch",
            CharacteristicRole::ActivityData => "activity-data",
            CharacteristicRole::CurrentTime => "current-time",
            CharacteristicRole::HeartRateControl => "hr-control",
            CharacteristicRole::HeartRateMeasure => "hr-measure",
            CharacteristicRole::Alert => "alert",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_uuids() {
        assert_eq!(
            CharacteristicRole::ChunkedWrite.uuid().to_string(),
            "00000016-0000-3512-2118-0009af100700"
        );
        assert_eq!(
            CharacteristicRole::ChunkedRead.uuid().to_string(),
            "00000017-0000-3512-2118-0009af100700"
        );
        assert_eq!(
            CharacteristicRole::HeartRateMeasure.uuid().to_string(),
            "00002a37-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            CharacteristicRole::Alert.uuid().to_string(),
            "00002a46-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_from_uuid() {
        for role in CharacteristicRole::ALL {
            assert_eq!(CharacteristicRole::from_uuid(&role.uuid()), Some(role));
        }
        let unknown = Uuid::from_u128(0x0000_2a19_0000_1000_8000_0080_5f9b_34fb);
        assert_eq!(CharacteristicRole::from_uuid(&unknown), None);
    }
}
