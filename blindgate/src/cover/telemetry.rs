//! Device state payload.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Position;

/// The fields of a Zigbee2MQTT cover state message this crate cares about.
///
/// Zigbee2MQTT publishes many more (`linkquality`, `state`, ...); they are
/// ignored. `position` stays a raw integer until asked for, so a bad
/// position doesn't cost the battery reading that came with it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Telemetry {
    pub position: Option<i64>,
    pub battery: Option<u8>,
}

impl Telemetry {
    pub fn parse(message: &str) -> Result<Self> {
        Ok(serde_json::from_str(message)?)
    }

    pub fn position(&self) -> Result<Position> {
        let raw = self.position.ok_or(Error::MissingField("position"))?;
        u8::try_from(raw)
            .ok()
            .and_then(Position::new)
            .ok_or_else(|| Error::InvalidPosition(raw.to_string()))
    }

    pub fn battery(&self) -> Result<u8> {
        self.battery.ok_or(Error::MissingField("battery"))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn parses_zigbee2mqtt_state() {
        let msg = r#"{"battery":87,"linkquality":120,"position":35,"update":{"state":"idle"}}"#;
        let telemetry = Telemetry::parse(msg).unwrap();

        assert_eq!(telemetry.position().unwrap(), Position::new(35).unwrap());
        assert_eq!(telemetry.battery().unwrap(), 87);
    }

    #[test]
    fn missing_fields_are_reported() {
        let telemetry = Telemetry::parse(r#"{"linkquality":99}"#).unwrap();

        assert!(matches!(
            telemetry.position(),
            Err(Error::MissingField("position"))
        ));
        assert!(matches!(
            telemetry.battery(),
            Err(Error::MissingField("battery"))
        ));
    }

    #[test_case(140; "above open")]
    #[test_case(-5; "below closed")]
    fn out_of_range_position_keeps_battery(position: i64) {
        let msg = format!(r#"{{"position":{position},"battery":64}}"#);
        let telemetry = Telemetry::parse(&msg).unwrap();

        assert!(matches!(
            telemetry.position(),
            Err(Error::InvalidPosition(_))
        ));
        assert_eq!(telemetry.battery().unwrap(), 64);
    }
}
