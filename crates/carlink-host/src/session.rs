//! CarlinkSession: device acquisition, watchdogs, and message dispatch.
//!
//! The session sits between a [`UsbBackend`] and the consumer.  It finds the
//! adapter, performs the reset/rediscover dance the hardware needs, drives
//! the [`DongleDriver`] through initialise/start, and turns driver events
//! into [`SessionEvent`]s.  It also owns the pairing and frame watchdogs and
//! routes microphone audio to the phone on demand.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use carlink_core::{
    AudioCommand, AudioContent, AudioData, CommandMapping, CommandValue, DongleConfig,
    MediaPayload, Message, PhoneTypeValue, SendableMessage, VideoData,
};

use crate::driver::{DongleDriver, DriverError, DriverEvent};
use crate::microphone::Microphone;
use crate::usb::{UsbBackend, UsbDongle, UsbError};

/// Poll cadence while waiting for the adapter to appear on the bus.
const FIND_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wait after a port reset.  The device drops off the bus for 1-3 s.
const RESET_REENUMERATE_WAIT: Duration = Duration::from_secs(3);

/// Delay before retrying the whole acquisition sequence after a failure.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// If no phone activity arrives within this window after start, nudge the
/// dongle into wireless pairing mode.
const PAIR_TIMEOUT: Duration = Duration::from_secs(15);

/// Events emitted by the session to the consumer.
#[derive(Debug)]
pub enum SessionEvent {
    /// A phone connected.  Unknown phone type codes are passed through.
    Plugged {
        phone_type: PhoneTypeValue,
        wifi: Option<u32>,
    },
    /// The phone disconnected; the dongle stays up and keeps listening.
    Unplugged,
    Video(VideoData),
    Audio(AudioData),
    Media(MediaPayload),
    /// A control command from the dongle (link state, media keys).
    Command(CommandValue),
    /// The transport died.  Consumers typically tear down on this.
    Failure,
}

struct SessionTasks {
    acquisition: Option<JoinHandle<()>>,
    dispatch: Option<JoinHandle<()>>,
    mic_pump: Option<JoinHandle<()>>,
    pair_watchdog: Option<JoinHandle<()>>,
    frame_watchdog: Option<JoinHandle<()>>,
}

struct SessionInner {
    config: DongleConfig,
    backend: Arc<dyn UsbBackend>,
    microphone: Arc<dyn Microphone>,
    driver: DongleDriver,
    event_tx: mpsc::Sender<SessionEvent>,
    mic_tx: mpsc::Sender<Vec<i16>>,
    tasks: Mutex<SessionTasks>,
    driver_rx: Mutex<Option<mpsc::Receiver<DriverEvent>>>,
    mic_rx: Mutex<Option<mpsc::Receiver<Vec<i16>>>>,
}

/// One adapter session.  Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct CarlinkSession {
    inner: Arc<SessionInner>,
}

impl CarlinkSession {
    /// Creates a session and returns it together with the event receiver.
    pub fn new(
        config: DongleConfig,
        backend: Arc<dyn UsbBackend>,
        microphone: Arc<dyn Microphone>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (driver, driver_rx) = DongleDriver::new();
        let (mic_tx, mic_rx) = mpsc::channel(64);

        let session = CarlinkSession {
            inner: Arc::new(SessionInner {
                config,
                backend,
                microphone,
                driver,
                event_tx,
                mic_tx,
                tasks: Mutex::new(SessionTasks {
                    acquisition: None,
                    dispatch: None,
                    mic_pump: None,
                    pair_watchdog: None,
                    frame_watchdog: None,
                }),
                driver_rx: Mutex::new(Some(driver_rx)),
                mic_rx: Mutex::new(Some(mic_rx)),
            }),
        };
        (session, event_rx)
    }

    /// Touch and command passthrough for consumers driving a display.
    pub fn driver(&self) -> &DongleDriver {
        &self.inner.driver
    }

    /// Starts the session: spawns the dispatch pump and the acquisition
    /// task, then returns immediately.  Acquisition retries forever until
    /// the adapter comes up.  A second `start` is a no-op.
    pub async fn start(&self) {
        let Some(driver_rx) = self.inner.driver_rx.lock().await.take() else {
            debug!("session already started");
            return;
        };

        let dispatch = {
            let session = self.clone();
            tokio::spawn(async move {
                session.dispatch_loop(driver_rx).await;
            })
        };

        let mic_pump = self.inner.mic_rx.lock().await.take().map(|rx| {
            let session = self.clone();
            tokio::spawn(async move {
                session.mic_pump(rx).await;
            })
        });

        let acquisition = {
            let session = self.clone();
            tokio::spawn(async move {
                session.acquisition_loop().await;
            })
        };

        let mut tasks = self.inner.tasks.lock().await;
        tasks.dispatch = Some(dispatch);
        tasks.mic_pump = mic_pump;
        tasks.acquisition = Some(acquisition);
    }

    /// Stops every background task, then closes the driver.
    pub async fn stop(&self) {
        {
            let mut tasks = self.inner.tasks.lock().await;
            for task in [
                tasks.acquisition.take(),
                tasks.pair_watchdog.take(),
                tasks.frame_watchdog.take(),
                tasks.mic_pump.take(),
                tasks.dispatch.take(),
            ]
            .into_iter()
            .flatten()
            {
                task.abort();
            }
        }
        self.inner.microphone.stop().await;
        self.inner.driver.close().await;
        info!("session stopped");
    }

    // ── Acquisition ───────────────────────────────────────────────────────────

    async fn acquisition_loop(&self) {
        loop {
            match self.acquire_once().await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        error = %e,
                        "session start failed, retrying in {}s",
                        RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// One full acquisition attempt: find, reset, rediscover, initialise,
    /// start, arm the pairing watchdog.
    async fn acquire_once(&self) -> Result<(), AcquireError> {
        // Reset first. A dongle left over from a previous run ignores the
        // Open frame until it is power cycled.
        let device = self.wait_for_dongle().await;
        device.open().await?;
        device.reset().await?;
        device.close().await?;
        info!("dongle reset, waiting for it to re-enumerate");
        tokio::time::sleep(RESET_REENUMERATE_WAIT).await;

        let device = self.wait_for_dongle().await;
        device.open().await?;
        info!("dongle found and opened");

        self.inner.driver.initialise(device).await?;
        self.inner.driver.start(&self.inner.config).await?;
        self.arm_pair_watchdog().await;
        Ok(())
    }

    async fn wait_for_dongle(&self) -> Arc<dyn UsbDongle> {
        loop {
            if let Some(device) = self.inner.backend.find_dongle().await {
                return device;
            }
            debug!("no dongle found, retrying");
            tokio::time::sleep(FIND_POLL_INTERVAL).await;
        }
    }

    // ── Watchdogs ─────────────────────────────────────────────────────────────

    async fn arm_pair_watchdog(&self) {
        let handle = {
            let session = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(PAIR_TIMEOUT).await;
                debug!("no phone activity, requesting wireless pairing");
                session
                    .inner
                    .driver
                    .send(&SendableMessage::Command(CommandMapping::WifiPair))
                    .await;
            })
        };

        let mut tasks = self.inner.tasks.lock().await;
        if let Some(old) = tasks.pair_watchdog.replace(handle) {
            old.abort();
        }
    }

    async fn cancel_pair_watchdog(&self) {
        if let Some(handle) = self.inner.tasks.lock().await.pair_watchdog.take() {
            handle.abort();
        }
    }

    /// Restarts the frame-request nudge for the phone type that just plugged
    /// in.  Phone types without a configured interval, including codes not in
    /// the table, get none.
    async fn restart_frame_watchdog(&self, phone_type: PhoneTypeValue) {
        let interval = phone_type
            .known()
            .and_then(|phone_type| self.inner.config.frame_interval(phone_type));
        let handle = interval.map(|interval_ms| {
            let session = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    session
                        .inner
                        .driver
                        .send(&SendableMessage::Command(CommandMapping::Frame))
                        .await;
                }
            })
        });

        let mut tasks = self.inner.tasks.lock().await;
        let old = match handle {
            Some(handle) => tasks.frame_watchdog.replace(handle),
            None => tasks.frame_watchdog.take(),
        };
        if let Some(old) = old {
            old.abort();
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    async fn dispatch_loop(&self, mut rx: mpsc::Receiver<DriverEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                DriverEvent::Message(message) => self.dispatch(message).await,
                DriverEvent::Failure => {
                    warn!("driver reported transport failure");
                    self.emit(SessionEvent::Failure).await;
                }
            }
        }
    }

    async fn dispatch(&self, message: Message) {
        match message {
            Message::Plugged { phone_type, wifi } => {
                info!(?phone_type, ?wifi, "phone plugged");
                self.cancel_pair_watchdog().await;
                self.restart_frame_watchdog(phone_type).await;
                self.emit(SessionEvent::Plugged { phone_type, wifi }).await;
            }
            Message::Unplugged => {
                info!("phone unplugged");
                self.emit(SessionEvent::Unplugged).await;
            }
            Message::Video(video) => {
                self.cancel_pair_watchdog().await;
                self.emit(SessionEvent::Video(video)).await;
            }
            Message::Audio(audio) => {
                self.cancel_pair_watchdog().await;
                self.route_audio_command(&audio).await;
                self.emit(SessionEvent::Audio(audio)).await;
            }
            Message::Media(media) => {
                self.cancel_pair_watchdog().await;
                self.emit(SessionEvent::Media(media)).await;
            }
            Message::Command(command) => {
                debug!(?command, "dongle command");
                self.emit(SessionEvent::Command(command)).await;
            }
            Message::SoftwareVersion(version) => info!(%version, "dongle software version"),
            Message::BluetoothAddress(address) => info!(%address, "bluetooth address"),
            Message::BluetoothPin(pin) => info!(%pin, "bluetooth pairing pin"),
            Message::BluetoothDeviceName(name) => info!(%name, "bluetooth device name"),
            Message::WifiDeviceName(name) => info!(%name, "wifi device name"),
            Message::HiCarLink(link) => info!(%link, "hicar link"),
            Message::BluetoothPairedList(list) => debug!(%list, "bluetooth paired list"),
            Message::ManufacturerInfo { a, b } => debug!(a, b, "manufacturer info"),
            Message::Opened(opened) => debug!(?opened, "dongle opened"),
            Message::BoxInfo(settings) => debug!(%settings, "box info"),
            Message::Phase(phase) => debug!(phase, "phase"),
        }
    }

    /// Starts or stops microphone capture on voice-session boundaries.
    async fn route_audio_command(&self, audio: &AudioData) {
        let AudioContent::Command(command) = &audio.content else {
            return;
        };
        match command {
            AudioCommand::AudioSiriStart | AudioCommand::AudioPhonecallStart => {
                info!(?command, "starting microphone capture");
                self.inner.microphone.start(self.inner.mic_tx.clone()).await;
            }
            AudioCommand::AudioSiriStop | AudioCommand::AudioPhonecallStop => {
                info!(?command, "stopping microphone capture");
                self.inner.microphone.stop().await;
            }
            _ => {}
        }
    }

    async fn mic_pump(&self, mut rx: mpsc::Receiver<Vec<i16>>) {
        while let Some(samples) = rx.recv().await {
            self.inner.driver.send(&SendableMessage::Audio(samples)).await;
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.inner.event_tx.send(event).await.is_err() {
            debug!("session event receiver dropped");
        }
    }
}

/// Errors inside one acquisition attempt; all retryable.
#[derive(Debug, thiserror::Error)]
enum AcquireError {
    #[error(transparent)]
    Usb(#[from] UsbError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
