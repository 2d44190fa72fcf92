use serde::{Deserialize, Serialize};

/// Wi-Fi credentials for joining the planter's access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

/// Identity and connection target of a planter, supplied by the caller at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNetworkInfo {
    /// Display name shown to the user.
    pub name: String,
    pub device_id: String,
    /// Host the socket transport dials.
    pub address: String,
    pub wifi: Option<WifiCredentials>,
}

/// Actuator configuration. Always sent to the device as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub fan: String,
    pub led: String,
    pub spray: String,
}

pub const MODE_ON: &str = "ON";
pub const MODE_OFF: &str = "OFF";
pub const MODE_AUTO: &str = "AUTO";

impl ControlState {
    pub fn new(fan: impl Into<String>, led: impl Into<String>, spray: impl Into<String>) -> Self {
        Self {
            fan: fan.into(),
            led: led.into(),
            spray: spray.into(),
        }
    }

    /// Copy with the fan flipped between ON and OFF.
    pub fn with_fan_toggled(&self) -> Self {
        Self {
            fan: toggle_on_off(&self.fan).to_string(),
            ..self.clone()
        }
    }

    /// Copy with the LED flipped between ON and OFF.
    pub fn with_led_toggled(&self) -> Self {
        Self {
            led: toggle_on_off(&self.led).to_string(),
            ..self.clone()
        }
    }

    /// Copy with the water pump advanced through AUTO → ON → OFF → AUTO.
    pub fn with_spray_cycled(&self) -> Self {
        let spray = match self.spray.as_str() {
            MODE_AUTO => MODE_ON,
            MODE_ON => MODE_OFF,
            _ => MODE_AUTO,
        };
        Self {
            spray: spray.to_string(),
            ..self.clone()
        }
    }
}

fn toggle_on_off(mode: &str) -> &'static str {
    if mode == MODE_ON { MODE_OFF } else { MODE_ON }
}

/// Latest sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardState {
    pub temperature: i32,
    pub humidity: i32,
    pub light: i32,
}

/// Full last-known snapshot of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub dashboard: DashboardState,
    pub control: ControlState,
}

/// Telemetry frame as it appears on the wire. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDeviceData {
    pub temp: i32,
    pub hum: i32,
    pub lux: i32,
    pub control: ControlState,
}

impl From<RawDeviceData> for DeviceStatus {
    fn from(raw: RawDeviceData) -> Self {
        Self {
            dashboard: DashboardState {
                temperature: raw.temp,
                humidity: raw.hum,
                light: raw.lux,
            },
            control: raw.control,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_and_led_toggle_between_on_and_off() {
        let state = ControlState::new("ON", "OFF", "AUTO");
        assert_eq!(state.with_fan_toggled().fan, "OFF");
        assert_eq!(state.with_led_toggled().led, "ON");
        // Untouched actuators carry over
        assert_eq!(state.with_fan_toggled().spray, "AUTO");
    }

    #[test]
    fn unknown_mode_toggles_to_on() {
        let state = ControlState::new("AUTO", "", "AUTO");
        assert_eq!(state.with_fan_toggled().fan, "ON");
        assert_eq!(state.with_led_toggled().led, "ON");
    }

    #[test]
    fn spray_cycles_through_modes() {
        let auto = ControlState::new("OFF", "OFF", "AUTO");
        let on = auto.with_spray_cycled();
        let off = on.with_spray_cycled();
        assert_eq!(on.spray, "ON");
        assert_eq!(off.spray, "OFF");
        assert_eq!(off.with_spray_cycled().spray, "AUTO");
        assert_eq!(ControlState::new("OFF", "OFF", "weird").with_spray_cycled().spray, "AUTO");
    }
}
