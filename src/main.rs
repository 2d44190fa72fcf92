use std::sync::Arc;
use std::time::Duration;

use planter_link::config::{Config, TransportKind};
use planter_link::link::fake::{FakeNetwork, FakeTransport};
use planter_link::link::tcp::TcpTransport;
use planter_link::link::{NetworkAttach, PreAttachedNetwork, Transport};
use planter_link::model::ControlState;
use planter_link::session::SessionController;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

/// How often the demo flips the fan to exercise on-demand commands.
const FAN_TOGGLE_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting planter-link (transport={:?}, device={} ({}) at {}:{}, poll={:?})",
        config.transport,
        config.device.name,
        config.device.device_id,
        config.device.address,
        config.session.device_port,
        config.session.poll_interval,
    );

    let (transport, network): (Arc<dyn Transport>, Arc<dyn NetworkAttach>) =
        match config.transport {
            TransportKind::Fake => (
                Arc::new(FakeTransport::new(config.fake_telemetry_interval)),
                Arc::new(FakeNetwork::accepting()),
            ),
            TransportKind::Tcp => (Arc::new(TcpTransport::new()), Arc::new(PreAttachedNetwork)),
        };

    let controller = SessionController::new(transport, network, config.session.clone());

    if let Err(e) = controller.connect(&config.device).await {
        error!("Connection failed: {}", e);
        std::process::exit(1);
    }
    info!("Device connection complete");

    let mut statuses = controller.state().device_status.stream();
    let mut connected = controller.state().is_connected.subscribe();
    let mut fan_timer = tokio::time::interval(FAN_TOGGLE_INTERVAL);
    // Skip first tick, wait for telemetry before commanding anything
    fan_timer.tick().await;
    let mut last_control: Option<ControlState> = None;

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            None
        }
    };

    loop {
        tokio::select! {
            Some(status) = statuses.next() => {
                if let Some(status) = status {
                    info!(
                        "temp={} hum={} lux={} | fan={} led={} spray={}",
                        status.dashboard.temperature,
                        status.dashboard.humidity,
                        status.dashboard.light,
                        status.control.fan,
                        status.control.led,
                        status.control.spray,
                    );
                    last_control = Some(status.control);
                }
            }
            _ = fan_timer.tick() => {
                let Some(control) = &last_control else {
                    continue;
                };
                let next = control.with_fan_toggled();
                if controller.send_command(&next).await {
                    info!("Fan set to {}", next.fan);
                } else {
                    warn!("Control command failed");
                }
            }
            Ok(()) = connected.changed() => {
                if !*connected.borrow_and_update() {
                    warn!("Device session ended");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = terminate(&mut sigterm) => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    controller.shutdown().await;
    info!("planter-link stopped");
}

async fn terminate(sigterm: &mut Option<Signal>) {
    match sigterm {
        Some(sigterm) => {
            sigterm.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}
