//! DongleDriver: owns one adapter device and runs the frame transport.
//!
//! The driver binds to an opened [`UsbDongle`], pushes the configuration
//! batch, then keeps three background tasks alive: the read loop, the 2 s
//! heartbeat, and the one-shot wifiConnect nudge.  Decoded frames flow out
//! over an event channel; the only fatal signal is [`DriverEvent::Failure`],
//! emitted after five consecutive read cycle errors.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use carlink_core::protocol::codec::{decode_header, decode_payload, HeaderError};
use carlink_core::protocol::messages::{Message, HEADER_SIZE};
use carlink_core::protocol::sendable::FileAddress;
use carlink_core::{CommandMapping, DongleConfig, MicType, SendableMessage, WifiType};

use crate::usb::{
    ConfigurationInfo, EndpointDirection, TransferStatus, UsbDongle, UsbError,
};

/// Configuration index the adapter exposes its bulk interface on.
const CONFIG_NUMBER: u8 = 1;

/// Consecutive read cycle failures tolerated before the driver gives up.
pub const MAX_ERROR_COUNT: u32 = 5;

/// Heartbeat cadence.  The adapter drops the link after a few missed beats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Delay before the wifiConnect command that follows the configuration batch.
const WIFI_CONNECT_DELAY: Duration = Duration::from_secs(1);

/// Error type for driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// `initialise` was handed a device that is not open.
    #[error("device handle is not open")]
    NotOpen,

    /// The device reported no active configuration after selection.
    #[error("device has no active configuration")]
    NoConfiguration,

    /// The claimed interface lacks a bulk endpoint in the given direction.
    #[error("no {0:?} endpoint on interface")]
    MissingEndpoint(EndpointDirection),

    /// `start` was called before `initialise` bound a device.
    #[error("no device bound, call initialise first")]
    NotInitialised,

    #[error(transparent)]
    Usb(#[from] UsbError),
}

/// Read cycle failures, each worth one tick of the error budget.
#[derive(Debug, Error)]
enum ReadError {
    #[error(transparent)]
    Usb(#[from] UsbError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("IN transfer completed with status {0:?}")]
    BadStatus(TransferStatus),

    #[error("payload transfer returned {received} of {expected} bytes")]
    ShortPayload { received: usize, expected: usize },
}

/// Events emitted by the driver to the session layer.
#[derive(Debug)]
pub enum DriverEvent {
    /// A decoded device→host frame.
    Message(Message),
    /// The error budget is exhausted and the device has been closed.
    Failure,
}

#[derive(Clone, Copy)]
struct Endpoints {
    input: u8,
    output: u8,
}

/// Mutable driver state behind one lock.
#[derive(Default)]
struct DriverState {
    device: Option<Arc<dyn UsbDongle>>,
    endpoints: Option<Endpoints>,
    /// Heartbeat and delayed-command tasks, aborted on close.
    timer_tasks: Vec<JoinHandle<()>>,
    read_task: Option<JoinHandle<()>>,
}

struct DriverInner {
    state: Mutex<DriverState>,
    /// Serialises OUT transfers so concurrent sends cannot interleave frames.
    send_lock: Mutex<()>,
    error_count: AtomicU32,
    event_tx: mpsc::Sender<DriverEvent>,
}

/// The dongle transport driver.  Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct DongleDriver {
    inner: Arc<DriverInner>,
}

impl DongleDriver {
    /// Creates a driver and returns it together with the event receiver.
    pub fn new() -> (Self, mpsc::Receiver<DriverEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let driver = DongleDriver {
            inner: Arc::new(DriverInner {
                state: Mutex::new(DriverState::default()),
                send_lock: Mutex::new(()),
                error_count: AtomicU32::new(0),
                event_tx: tx,
            }),
        };
        (driver, rx)
    }

    /// Binds the driver to an opened device: selects configuration 1, finds
    /// the bulk endpoints, and claims the interface.
    ///
    /// A second call while a device is bound is a no-op.  On any failure the
    /// device is closed before the error is returned.
    ///
    /// Note: reset the device before handing it in.  Resetting through the
    /// bound handle makes subsequent transfers fail while the device
    /// re-enumerates.
    pub async fn initialise(&self, device: Arc<dyn UsbDongle>) -> Result<(), DriverError> {
        let mut state = self.inner.state.lock().await;
        if state.device.is_some() {
            debug!("driver already has a device, ignoring initialise");
            return Ok(());
        }

        match Self::bind(&device).await {
            Ok(endpoints) => {
                state.device = Some(device);
                state.endpoints = Some(endpoints);
                info!("dongle initialised");
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = device.close().await {
                    warn!(error = %close_err, "close after failed initialise");
                }
                Err(e)
            }
        }
    }

    async fn bind(device: &Arc<dyn UsbDongle>) -> Result<Endpoints, DriverError> {
        if !device.is_open() {
            return Err(DriverError::NotOpen);
        }

        device.select_configuration(CONFIG_NUMBER).await?;
        let configuration: ConfigurationInfo = device
            .active_configuration()
            .ok_or(DriverError::NoConfiguration)?;

        let input = configuration
            .endpoint(EndpointDirection::In)
            .ok_or(DriverError::MissingEndpoint(EndpointDirection::In))?;
        let output = configuration
            .endpoint(EndpointDirection::Out)
            .ok_or(DriverError::MissingEndpoint(EndpointDirection::Out))?;

        device.claim_interface(configuration.interface_number).await?;

        Ok(Endpoints {
            input: input.number,
            output: output.number,
        })
    }

    /// Sends one frame to the dongle.
    ///
    /// Returns `None` when no open device is bound, `Some(true)` when the
    /// transfer completed with OK status, and `Some(false)` on a non-OK
    /// status or a transport error.  Errors are logged, never propagated;
    /// a failed send is not worth tearing the session down over.
    pub async fn send(&self, message: &SendableMessage) -> Option<bool> {
        let (device, endpoint) = {
            let state = self.inner.state.lock().await;
            let device = state.device.as_ref()?.clone();
            let endpoint = state.endpoints.as_ref()?.output;
            (device, endpoint)
        };
        if !device.is_open() {
            return None;
        }

        let frame = message.serialise();
        let _guard = self.inner.send_lock.lock().await;
        match device.transfer_out(endpoint, &frame).await {
            Ok(TransferStatus::Ok) => Some(true),
            Ok(status) => {
                error!(?status, kind = ?message.message_type(), "OUT transfer not ok");
                Some(false)
            }
            Err(e) => {
                error!(error = %e, kind = ?message.message_type(), "failed sending message to dongle");
                Some(false)
            }
        }
    }

    /// Pushes the configuration batch and starts the background tasks.
    ///
    /// Returns `DriverError::NotInitialised` without a bound device and
    /// silently does nothing if the device has closed since `initialise`.
    pub async fn start(&self, config: &DongleConfig) -> Result<(), DriverError> {
        let device = {
            let state = self.inner.state.lock().await;
            state.device.clone().ok_or(DriverError::NotInitialised)?
        };
        if !device.is_open() {
            return Ok(());
        }

        self.inner.error_count.store(0, Ordering::SeqCst);

        let mut batch = vec![
            SendableMessage::number_file(config.dpi, FileAddress::Dpi),
            SendableMessage::Open(config.clone()),
            SendableMessage::boolean_file(config.night_mode, FileAddress::NightMode),
            SendableMessage::number_file(config.hand as u32, FileAddress::HandDriveMode),
            SendableMessage::boolean_file(true, FileAddress::ChargeMode),
            SendableMessage::string_file(&config.box_name, FileAddress::BoxName),
            SendableMessage::box_settings(config, unix_time_secs()),
            SendableMessage::Command(CommandMapping::WifiEnable),
            SendableMessage::Command(match config.wifi_type {
                WifiType::Band5 => CommandMapping::Wifi5g,
                WifiType::Band24 => CommandMapping::Wifi24g,
            }),
            SendableMessage::Command(match config.mic_type {
                MicType::Box => CommandMapping::BoxMic,
                MicType::Os => CommandMapping::Mic,
            }),
            SendableMessage::Command(if config.audio_transfer_mode {
                CommandMapping::AudioTransferOn
            } else {
                CommandMapping::AudioTransferOff
            }),
        ];
        if let Some(android_work_mode) = config.android_work_mode {
            batch.push(SendableMessage::boolean_file(
                android_work_mode,
                FileAddress::AndroidWorkMode,
            ));
        }

        join_all(batch.iter().map(|message| self.send(message))).await;
        info!("configuration batch sent");

        let wifi_connect = {
            let driver = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(WIFI_CONNECT_DELAY).await;
                driver.send(&SendableMessage::Command(CommandMapping::WifiConnect)).await;
            })
        };

        let read_task = {
            let driver = self.clone();
            let device = device.clone();
            tokio::spawn(async move {
                driver.read_loop(device).await;
            })
        };

        let heartbeat = {
            let driver = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // First tick fires immediately; the batch already went out.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    driver.send(&SendableMessage::HeartBeat).await;
                }
            })
        };

        let mut state = self.inner.state.lock().await;
        state.timer_tasks.push(wifi_connect);
        state.timer_tasks.push(heartbeat);
        state.read_task = Some(read_task);
        Ok(())
    }

    /// Closes the device and clears all driver state so `initialise` can
    /// bind a fresh handle.  Idempotent.
    pub async fn close(&self) {
        self.teardown(true).await;
    }

    /// Stops background tasks and closes the device.
    ///
    /// `abort_read` is false when called from inside the read loop, which
    /// must not abort its own task.
    async fn teardown(&self, abort_read: bool) {
        let mut state = self.inner.state.lock().await;
        for task in state.timer_tasks.drain(..) {
            task.abort();
        }
        if let Some(read_task) = state.read_task.take() {
            if abort_read {
                read_task.abort();
            }
        }
        if let Some(device) = state.device.take() {
            if let Err(e) = device.close().await {
                warn!(error = %e, "error closing device");
            }
        }
        state.endpoints = None;
    }

    // ── Read loop ─────────────────────────────────────────────────────────────

    async fn read_loop(&self, device: Arc<dyn UsbDongle>) {
        let endpoint = {
            let state = self.inner.state.lock().await;
            match state.endpoints {
                Some(endpoints) => endpoints.input,
                None => return,
            }
        };

        while device.is_open() {
            if self.inner.error_count.load(Ordering::SeqCst) >= MAX_ERROR_COUNT {
                error!("read error budget exhausted, closing dongle");
                self.teardown(false).await;
                if self.inner.event_tx.send(DriverEvent::Failure).await.is_err() {
                    debug!("event receiver dropped, failure not delivered");
                }
                return;
            }

            match Self::read_cycle(&device, endpoint).await {
                Ok(message) => {
                    self.inner.error_count.store(0, Ordering::SeqCst);
                    if let Some(message) = message {
                        if self.inner.event_tx.send(DriverEvent::Message(message)).await.is_err() {
                            debug!("event receiver dropped, stopping read loop");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "read cycle failed");
                    self.inner.error_count.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    /// One header (+ optional payload) read.  `Ok(None)` is a successful
    /// cycle that produced nothing to deliver (unknown or malformed payload).
    async fn read_cycle(
        device: &Arc<dyn UsbDongle>,
        endpoint: u8,
    ) -> Result<Option<Message>, ReadError> {
        let header_in = device.transfer_in(endpoint, HEADER_SIZE).await?;
        if header_in.status != TransferStatus::Ok {
            return Err(ReadError::BadStatus(header_in.status));
        }
        let header = decode_header(&header_in.data)?;

        let payload = if header.length > 0 {
            let expected = header.length as usize;
            let payload_in = device.transfer_in(endpoint, expected).await?;
            if payload_in.status != TransferStatus::Ok {
                return Err(ReadError::BadStatus(payload_in.status));
            }
            if payload_in.data.len() != expected {
                return Err(ReadError::ShortPayload {
                    received: payload_in.data.len(),
                    expected,
                });
            }
            payload_in.data
        } else {
            Vec::new()
        };

        Ok(decode_payload(&header, &payload))
    }
}

/// Unix time in whole seconds; the dongle's clock sync expects seconds.
fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
