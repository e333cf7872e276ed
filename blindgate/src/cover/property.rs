use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Logical property a message concerns.
///
/// Names match the controller's window-covering characteristics on the
/// wire (`currentPosition`, `targetPosition`, `batteryLevel`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Property {
    CurrentPosition,
    TargetPosition,
    BatteryLevel,
}

impl Property {
    /// Decode order for a device state message.
    ///
    /// Current position goes first so a target adopted from an external
    /// move is read back by the same message.
    pub const STATE_ORDER: [Property; 3] = [
        Property::CurrentPosition,
        Property::TargetPosition,
        Property::BatteryLevel,
    ];

    pub fn is_writable(self) -> bool {
        matches!(self, Property::TargetPosition)
    }
}
