//! Device session lifecycle.
//!
//! [`SessionController`] joins the planter's network, opens the transport and
//! then runs two tasks for as long as the session lives: a listener that
//! decodes inbound telemetry into [`SessionState::device_status`], and a poller
//! that asks the device for fresh readings on a fixed interval.
//!
//! A corrupt frame is logged and skipped. A dead stream ends the session.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ConnectError;
use crate::link::{FrameReceiver, NetworkAttach, Transport, TransportTarget};
use crate::model::{ControlState, DeviceNetworkInfo, DeviceStatus};
use crate::state::SessionState;
use crate::telemetry::{self, POLL_REQUEST};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the poller sends [`POLL_REQUEST`].
    pub poll_interval: Duration,
    /// Port dialled on the device's address.
    pub device_port: u16,
    /// Upper bound for each of the network-attach and transport-connect steps.
    /// `None` waits as long as the collaborator does.
    pub connect_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            device_port: 8888,
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Owns one device session at a time and publishes its state.
///
/// Dropping the controller cancels every task it spawned.
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    network: Arc<dyn NetworkAttach>,
    config: SessionConfig,
    state: SessionState,
    /// Parent of every per-session token.
    scope: CancellationToken,
    slots: Mutex<TaskSlots>,
}

#[derive(Default)]
struct TaskSlots {
    generation: u64,
    active: Option<ActiveSession>,
}

/// Listener and poller of the current session share one token.
struct ActiveSession {
    generation: u64,
    cancel: CancellationToken,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkAttach>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                network,
                config,
                state: SessionState::new(),
                scope: CancellationToken::new(),
                slots: Mutex::new(TaskSlots::default()),
            }),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.inner.state
    }

    /// Join the device network, open the transport and start the session tasks.
    ///
    /// On error nothing observable has changed, except when this call replaces
    /// a live session: its tasks are retired before the transport is reopened,
    /// so a failed reopen leaves the session disconnected.
    pub async fn connect(&self, info: &DeviceNetworkInfo) -> Result<(), ConnectError> {
        let inner = &self.inner;
        let wifi = info.wifi.as_ref().ok_or(ConnectError::MissingCredentials)?;

        info!("Joining Wi-Fi {} for device {}", wifi.ssid, info.name);
        let attached = inner
            .bounded("Wi-Fi attach", inner.network.attach(&wifi.ssid, &wifi.password))
            .await;
        if !attached {
            return Err(ConnectError::NetworkAttachFailed {
                ssid: wifi.ssid.clone(),
            });
        }

        let target = TransportTarget {
            host: info.address.clone(),
            port: inner.config.device_port,
        };
        // Reopening the transport kills the old stream; its listener must
        // already be retired or it would tear down the new socket
        let replaced = inner.retire_tasks();

        info!("Opening socket to {} ({})", info.name, target);
        if !inner.bounded("Socket connect", inner.transport.connect(&target)).await {
            if replaced {
                warn!("Previous session lost while reconnecting");
                inner.state.reset();
            }
            return Err(ConnectError::TransportConnectFailed {
                target: target.to_string(),
            });
        }

        let (generation, cancel) = inner.begin_session(info);
        info!(
            "Connected to device {} ({}), session {}",
            info.name, info.device_id, generation
        );

        let frames = inner.transport.start_listening();
        tokio::spawn(run_listener(
            Arc::clone(inner),
            generation,
            cancel.clone(),
            frames,
        ));
        tokio::spawn(run_poller(Arc::clone(inner), cancel));

        Ok(())
    }

    /// Stop the session tasks, close the transport and clear all state.
    /// Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        self.inner.end_session(None).await;
    }

    /// Send a full control state to the device. Returns whether the transport
    /// accepted it. Local state is left to the next telemetry frame.
    pub async fn send_command(&self, command: &ControlState) -> bool {
        let message = match telemetry::encode_command(command) {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to encode command {:?}: {}", command, e);
                return false;
            }
        };

        let sent = self.inner.transport.send_message(&message).await;
        if sent {
            info!("Command sent: {}", message);
        } else {
            warn!("Command not delivered: {}", message);
        }
        sent
    }

    /// Tear the controller down: cancel everything it spawned and disconnect.
    pub async fn shutdown(self) {
        self.inner.scope.cancel();
        self.inner.end_session(None).await;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.inner.scope.cancel();
    }
}

impl Inner {
    fn lock_slots(&self) -> MutexGuard<'_, TaskSlots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn bounded(&self, step: &str, attempt: impl Future<Output = bool>) -> bool {
        let Some(limit) = self.config.connect_timeout else {
            return attempt.await;
        };
        match tokio::time::timeout(limit, attempt).await {
            Ok(ok) => ok,
            Err(_) => {
                warn!("{} timed out after {:?}", step, limit);
                false
            }
        }
    }

    /// Cancel the live session's tasks without touching state or transport.
    /// Returns whether there was a live session.
    fn retire_tasks(&self) -> bool {
        let previous = self.lock_slots().active.take();
        match previous {
            Some(previous) => {
                debug!("Superseding tasks of session {}", previous.generation);
                previous.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Retire any previous session and publish the new identity.
    fn begin_session(&self, info: &DeviceNetworkInfo) -> (u64, CancellationToken) {
        let mut slots = self.lock_slots();
        if let Some(previous) = slots.active.take() {
            debug!("Superseding tasks of session {}", previous.generation);
            previous.cancel.cancel();
        }

        slots.generation += 1;
        let generation = slots.generation;
        let cancel = self.scope.child_token();
        slots.active = Some(ActiveSession {
            generation,
            cancel: cancel.clone(),
        });

        // Status from a superseded session must not leak into this one
        self.state.device_status.set(None);
        self.state.mark_connected(&info.name, &info.device_id);

        (generation, cancel)
    }

    /// Publish decoded telemetry if `generation` is still the live session.
    fn publish_status(&self, generation: u64, status: DeviceStatus) -> bool {
        let slots = self.lock_slots();
        let live = slots
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if live {
            self.state.device_status.set(Some(status));
        }
        live
    }

    /// End the live session. With `Some(generation)` only that session may be
    /// ended; a stale caller is ignored.
    async fn end_session(&self, generation: Option<u64>) {
        let ended = {
            let mut slots = self.lock_slots();
            let current = slots.active.as_ref().map(|active| active.generation);
            match (generation, current) {
                (Some(requested), Some(live)) if requested != live => return,
                (Some(_), None) => return,
                _ => slots.active.take(),
            }
        };

        if let Some(session) = &ended {
            debug!("Cancelling tasks of session {}", session.generation);
            session.cancel.cancel();
        }

        self.transport.close().await;
        self.state.reset();

        if ended.is_some() {
            info!("Device disconnected");
        }
    }
}

async fn run_listener(
    inner: Arc<Inner>,
    generation: u64,
    cancel: CancellationToken,
    mut frames: FrameReceiver,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Listener for session {} cancelled", generation);
                return;
            }
            frame = frames.recv() => frame,
        };

        match frame {
            Some(Ok(bytes)) => match telemetry::decode(&bytes) {
                Ok(status) => {
                    debug!("Telemetry received: {:?}", status);
                    inner.publish_status(generation, status);
                }
                Err(e) => {
                    // One bad packet is noise, keep the session
                    warn!(
                        "Dropping telemetry frame: {}. Raw: {}",
                        e,
                        String::from_utf8_lossy(&bytes)
                    );
                }
            },
            Some(Err(e)) => {
                warn!("Telemetry stream failed: {}", e);
                break;
            }
            None => {
                info!("Telemetry stream completed");
                break;
            }
        }
    }

    if !cancel.is_cancelled() && inner.state.is_connected.get() {
        inner.end_session(Some(generation)).await;
    }
}

async fn run_poller(inner: Arc<Inner>, cancel: CancellationToken) {
    let mut connected = inner.state.is_connected.subscribe();
    let mut ticker = tokio::time::interval(inner.config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while *connected.borrow_and_update() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = connected.changed() => {}
            _ = ticker.tick() => {
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = inner.transport.send_message(POLL_REQUEST) => sent,
                };
                if !sent {
                    warn!("'read' request failed");
                }
            }
        }
    }
    debug!("Poller stopped");
}
