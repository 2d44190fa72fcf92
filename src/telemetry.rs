//! Wire codec for planter telemetry and commands.
//!
//! Inbound frames are JSON objects of the form
//! `{"temp":25,"hum":50,"lux":300,"control":{"fan":"ON","led":"OFF","spray":"AUTO"}}`.
//! Fields the device adds later are ignored. Outbound commands are the bare
//! `control` object; the periodic poll is [`POLL_REQUEST`].

use crate::error::DecodeError;
use crate::model::{ControlState, DeviceStatus, RawDeviceData};

/// Request the device to push a fresh telemetry frame.
pub const POLL_REQUEST: &str = r#"{"read":true}"#;

/// Decode one inbound frame into a device snapshot.
pub fn decode(bytes: &[u8]) -> Result<DeviceStatus, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::MalformedPayload(format!("invalid UTF-8: {e}")))?;

    if text.trim().is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let raw: RawDeviceData =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    Ok(raw.into())
}

/// Encode a control command for transmission.
pub fn encode_command(command: &ControlState) -> Result<String, serde_json::Error> {
    serde_json::to_string(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DashboardState;

    const SAMPLE: &str =
        r#"{"temp":25,"hum":50,"lux":300,"control":{"fan":"ON","led":"OFF","spray":"AUTO"}}"#;

    #[test]
    fn decodes_well_formed_frame() {
        let status = decode(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            status.dashboard,
            DashboardState {
                temperature: 25,
                humidity: 50,
                light: 300
            }
        );
        assert_eq!(status.control, ControlState::new("ON", "OFF", "AUTO"));
    }

    #[test]
    fn ignores_unknown_fields() {
        let frame = r#"{"temp":21,"hum":44,"lux":120,"battery":87,
            "control":{"fan":"OFF","led":"ON","spray":"OFF","pump_rpm":0}}"#;
        let status = decode(frame.as_bytes()).unwrap();
        assert_eq!(status.dashboard.temperature, 21);
        assert_eq!(status.control.led, "ON");
    }

    #[test]
    fn blank_payloads_are_empty() {
        assert_eq!(decode(b""), Err(DecodeError::EmptyPayload));
        assert_eq!(decode(b"  \n\t "), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn structural_mismatches_are_malformed() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"{\"temp\":25",
            b"[]",
            b"{\"temp\":25,\"hum\":50,\"lux\":300}",
            b"{\"temp\":\"hot\",\"hum\":50,\"lux\":300,\"control\":{\"fan\":\"ON\",\"led\":\"OFF\",\"spray\":\"AUTO\"}}",
            b"{\"temp\":25,\"hum\":50,\"lux\":300,\"control\":{\"fan\":1,\"led\":\"OFF\",\"spray\":\"AUTO\"}}",
            &[0xff, 0xfe, 0x7b],
        ];
        for case in cases {
            assert!(
                matches!(decode(case), Err(DecodeError::MalformedPayload(_))),
                "expected malformed for {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn encoded_command_embedded_in_telemetry_decodes_to_same_control() {
        let command = ControlState::new("OFF", "ON", "AUTO");
        let encoded = encode_command(&command).unwrap();
        let frame = format!(r#"{{"temp":22,"hum":41,"lux":250,"control":{encoded}}}"#);

        assert_eq!(decode(frame.as_bytes()).unwrap().control, command);
    }

    #[test]
    fn command_and_poll_wire_shapes() {
        let encoded = encode_command(&ControlState::new("ON", "OFF", "AUTO")).unwrap();
        assert_eq!(encoded, r#"{"fan":"ON","led":"OFF","spray":"AUTO"}"#);

        let poll: serde_json::Value = serde_json::from_str(POLL_REQUEST).unwrap();
        assert_eq!(poll, serde_json::json!({ "read": true }));
    }
}
