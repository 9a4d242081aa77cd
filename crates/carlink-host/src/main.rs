//! CarLink host entry point.
//!
//! Headless bridge: loads settings, starts a session against the platform
//! USB backend, and logs session events until Ctrl-C.  Rendering and audio
//! playback are left to consumers embedding [`CarlinkSession`]; this binary
//! exists to exercise the full session lifecycle from a terminal.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use carlink_host::microphone::SilentMicrophone;
use carlink_host::session::{CarlinkSession, SessionEvent};
use carlink_host::settings::{load_settings, DEFAULT_SETTINGS_PATH};
use carlink_host::usb::{UsbBackend, UsbDongle};

/// Placeholder backend for platforms without a wired-up USB stack.  Reports
/// no device forever; the session keeps polling.
struct NoopBackend;

#[async_trait]
impl UsbBackend for NoopBackend {
    async fn find_dongle(&self) -> Option<Arc<dyn UsbDongle>> {
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("CarLink host starting");

    let settings_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let config = load_settings(Path::new(&settings_path))?;

    let backend = Arc::new(NoopBackend);
    let microphone = Arc::new(SilentMicrophone);
    let (session, mut events) = CarlinkSession::new(config, backend, microphone);
    session.start().await;

    info!("CarLink host ready.  Press Ctrl-C to exit.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Plugged { phone_type, wifi }) => {
                    info!(?phone_type, ?wifi, "phone session started");
                }
                Some(SessionEvent::Unplugged) => info!("phone session ended"),
                Some(SessionEvent::Video(video)) => {
                    info!(width = video.width, height = video.height, bytes = video.data.len(), "video chunk");
                }
                Some(SessionEvent::Audio(audio)) => {
                    info!(decode_type = audio.decode_type, audio_type = audio.audio_type, "audio frame");
                }
                Some(SessionEvent::Media(media)) => info!(?media, "media update"),
                Some(SessionEvent::Command(command)) => info!(?command, "command"),
                Some(SessionEvent::Failure) => {
                    warn!("transport failure, shutting down");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    session.stop().await;
    info!("CarLink host stopped");
    Ok(())
}
