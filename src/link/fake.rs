//! Simulated planter for demos and manual testing without hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use super::{FRAME_CHANNEL_CAPACITY, FrameReceiver, NetworkAttach, Transport, TransportTarget};

const CONNECT_DELAY: Duration = Duration::from_millis(800);
const ATTACH_DELAY: Duration = Duration::from_millis(500);

/// Socket stand-in that pushes random telemetry until closed.
#[derive(Debug, Clone)]
pub struct FakeTransport {
    telemetry_interval: Duration,
    connected: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new(telemetry_interval: Duration) -> Self {
        Self {
            telemetry_interval,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, target: &TransportTarget) -> bool {
        tokio::time::sleep(CONNECT_DELAY).await;
        self.connected.store(true, Ordering::SeqCst);
        info!("[fake] socket connected to {}", target);
        true
    }

    async fn send_message(&self, message: &str) -> bool {
        info!("[fake] device received: {}", message);
        true
    }

    fn start_listening(&self) -> FrameReceiver {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let connected = Arc::clone(&self.connected);
        let interval = self.telemetry_interval;

        tokio::spawn(async move {
            while connected.load(Ordering::SeqCst) {
                tokio::time::sleep(interval).await;
                if !connected.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(Ok(random_telemetry().into_bytes())).await.is_err() {
                    break;
                }
            }
        });

        rx
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

fn random_telemetry() -> String {
    let mut rng = rand::thread_rng();
    let fan = if rng.gen_bool(0.5) { "ON" } else { "OFF" };
    json!({
        "temp": rng.gen_range(20..=30),
        "hum": rng.gen_range(40..=60),
        "lux": rng.gen_range(100..=500),
        "control": {
            "fan": fan,
            "led": "OFF",
            "spray": "AUTO"
        }
    })
    .to_string()
}

/// Wi-Fi stand-in with a fixed outcome.
#[derive(Debug, Clone, Copy)]
pub struct FakeNetwork {
    accept: bool,
}

impl FakeNetwork {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn refusing() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl NetworkAttach for FakeNetwork {
    async fn attach(&self, ssid: &str, _password: &str) -> bool {
        tokio::time::sleep(ATTACH_DELAY).await;
        info!("[fake] Wi-Fi attach to {}: {}", ssid, self.accept);
        self.accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry;

    fn target() -> TransportTarget {
        TransportTarget {
            host: "dummy".into(),
            port: 8888,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_decodable_telemetry_until_closed() {
        let transport = FakeTransport::new(Duration::from_secs(1));
        assert!(transport.connect(&target()).await);

        let mut frames = transport.start_listening();
        for _ in 0..3 {
            let frame = frames.recv().await.unwrap().unwrap();
            let status = telemetry::decode(&frame).unwrap();
            assert!((20..=30).contains(&status.dashboard.temperature));
            assert!((40..=60).contains(&status.dashboard.humidity));
            assert!((100..=500).contains(&status.dashboard.light));
            assert!(status.control.fan == "ON" || status.control.fan == "OFF");
            assert_eq!(status.control.spray, "AUTO");
        }

        transport.close().await;
        assert!(frames.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn listening_before_connect_ends_immediately() {
        let transport = FakeTransport::new(Duration::from_secs(1));
        let mut frames = transport.start_listening();
        assert!(frames.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn network_outcome_is_fixed() {
        assert!(FakeNetwork::accepting().attach("ap", "pw").await);
        assert!(!FakeNetwork::refusing().attach("ap", "pw").await);
    }
}
