use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::DeviceStatus;

/// Last-write-wins value cell with any number of subscribers.
///
/// Writing a value equal to the current one does not wake subscribers.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Store `value`, returning whether subscribers were notified.
    pub(crate) fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Stream that yields the current value first, then every change.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.tx.subscribe())
    }
}

/// Observable view of one device session.
///
/// Only the session controller writes these; everyone else reads or subscribes.
#[derive(Debug)]
pub struct SessionState {
    pub is_connected: Observable<bool>,
    pub connected_device_name: Observable<Option<String>>,
    pub connected_device_id: Observable<Option<String>>,
    pub device_status: Observable<Option<DeviceStatus>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            is_connected: Observable::new(false),
            connected_device_name: Observable::new(None),
            connected_device_id: Observable::new(None),
            device_status: Observable::new(None),
        }
    }

    /// Identity lands before the connected flag so anyone reacting to
    /// `is_connected == true` already sees who we are connected to.
    pub(crate) fn mark_connected(&self, name: &str, device_id: &str) {
        self.connected_device_name.set(Some(name.to_string()));
        self.connected_device_id.set(Some(device_id.to_string()));
        self.is_connected.set(true);
    }

    /// Inverse of `mark_connected`: data is cleared before the flag drops.
    pub(crate) fn reset(&self) {
        self.device_status.set(None);
        self.connected_device_name.set(None);
        self.connected_device_id.set(None);
        self.is_connected.set(false);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
