use std::env;
use std::time::Duration;

use crate::model::{DeviceNetworkInfo, WifiCredentials};
use crate::session::SessionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportKind,
    pub device: DeviceNetworkInfo,
    pub session: SessionConfig,
    /// Push interval of the simulated planter.
    pub fake_telemetry_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Simulated planter, no hardware needed.
    Fake,
    /// Real socket to the device's address.
    Tcp,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fake" => Ok(Self::Fake),
            "tcp" => Ok(Self::Tcp),
            other => Err(format!(
                "PLANTER_TRANSPORT must be 'fake' or 'tcp', got '{other}'"
            )),
        }
    }
}

/// Reads settings by key. `from_env` backs this with the process environment.
struct Settings<F> {
    lookup: F,
}

impl<F> Settings<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, String>
    where
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| format!("{key} has invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings { lookup };

        let transport = match settings.optional("PLANTER_TRANSPORT") {
            Some(raw) => raw.parse()?,
            None => TransportKind::Fake,
        };

        // An empty SSID means the device ships without Wi-Fi credentials
        let wifi = match (settings.lookup)("PLANTER_WIFI_SSID") {
            Some(ssid) if ssid.is_empty() => None,
            ssid => Some(WifiCredentials {
                ssid: ssid.unwrap_or_else(|| "fake_ssid".to_string()),
                password: settings.or_default("PLANTER_WIFI_PASSWORD", "fake_pw"),
            }),
        };

        let device = DeviceNetworkInfo {
            name: settings.or_default("PLANTER_DEVICE_NAME", "Demo Smart Planter"),
            device_id: settings.or_default("PLANTER_DEVICE_ID", "demo_device_01"),
            address: settings.or_default("PLANTER_DEVICE_ADDR", "192.168.0.1"),
            wifi,
        };

        let connect_timeout_secs: u64 = settings.parsed_or("PLANTER_CONNECT_TIMEOUT_SECS", 30)?;
        let session = SessionConfig {
            poll_interval: Duration::from_millis(
                settings.parsed_or("PLANTER_POLL_INTERVAL_MS", 5_000)?,
            ),
            device_port: settings.parsed_or("PLANTER_DEVICE_PORT", 8888)?,
            connect_timeout: (connect_timeout_secs > 0)
                .then(|| Duration::from_secs(connect_timeout_secs)),
        };

        let config = Self {
            transport,
            device,
            session,
            fake_telemetry_interval: Duration::from_millis(
                settings.parsed_or("PLANTER_FAKE_TELEMETRY_MS", 1_000)?,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.device.address.trim().is_empty() {
            return Err("PLANTER_DEVICE_ADDR must not be empty".into());
        }
        if self.session.poll_interval.is_zero() {
            return Err("PLANTER_POLL_INTERVAL_MS must be > 0".into());
        }
        if self.session.device_port == 0 {
            return Err("PLANTER_DEVICE_PORT must be > 0".into());
        }
        if self.fake_telemetry_interval.is_zero() {
            return Err("PLANTER_FAKE_TELEMETRY_MS must be > 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_describe_the_demo_planter() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.transport, TransportKind::Fake);
        assert_eq!(config.device.name, "Demo Smart Planter");
        assert_eq!(config.device.device_id, "demo_device_01");
        assert_eq!(config.device.address, "192.168.0.1");
        assert_eq!(
            config.device.wifi,
            Some(WifiCredentials {
                ssid: "fake_ssid".into(),
                password: "fake_pw".into(),
            })
        );
        assert_eq!(config.session.poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.session.device_port, 8888);
        assert_eq!(config.session.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.fake_telemetry_interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PLANTER_TRANSPORT", "TCP"),
            ("PLANTER_DEVICE_ADDR", "10.0.0.7"),
            ("PLANTER_DEVICE_PORT", "9000"),
            ("PLANTER_WIFI_SSID", "planter-ap"),
            ("PLANTER_WIFI_PASSWORD", "hunter2"),
            ("PLANTER_POLL_INTERVAL_MS", "250"),
            ("PLANTER_CONNECT_TIMEOUT_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.device.address, "10.0.0.7");
        assert_eq!(config.session.device_port, 9000);
        assert_eq!(config.device.wifi.unwrap().password, "hunter2");
        assert_eq!(config.session.poll_interval, Duration::from_millis(250));
        assert_eq!(config.session.connect_timeout, None);
    }

    #[test]
    fn empty_ssid_disables_credentials() {
        let config = config_from(&[("PLANTER_WIFI_SSID", "")]).unwrap();
        assert_eq!(config.device.wifi, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("PLANTER_TRANSPORT", "bluetooth")]).is_err());
        assert!(config_from(&[("PLANTER_POLL_INTERVAL_MS", "0")]).is_err());
        assert!(config_from(&[("PLANTER_FAKE_TELEMETRY_MS", "0")]).is_err());
        assert!(config_from(&[("PLANTER_DEVICE_PORT", "0")]).is_err());

        let err = config_from(&[("PLANTER_DEVICE_PORT", "eighty")]).unwrap_err();
        assert!(err.contains("PLANTER_DEVICE_PORT"), "{err}");
    }
}
