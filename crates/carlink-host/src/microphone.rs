//! Microphone capture seam.
//!
//! Voice capture (Siri, phone calls) starts and stops on commands from the
//! phone.  The session owns a `Microphone` and forwards its PCM chunks to
//! the dongle; platforms plug in a real capture implementation, tests and
//! the headless binary use [`SilentMicrophone`].

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A capture source producing signed 16-bit mono PCM at 16 kHz, the format
/// the dongle expects on the microphone channel.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Begins capture.  Chunks are delivered on `samples` until `stop`.
    /// Starting an already-started microphone is a no-op.
    async fn start(&self, samples: mpsc::Sender<Vec<i16>>);

    /// Ends capture.  Idempotent.
    async fn stop(&self);
}

/// A microphone that never produces samples.
///
/// Keeps the session wiring intact on platforms without capture support;
/// the phone simply hears silence.
#[derive(Debug, Default)]
pub struct SilentMicrophone;

#[async_trait]
impl Microphone for SilentMicrophone {
    async fn start(&self, _samples: mpsc::Sender<Vec<i16>>) {}

    async fn stop(&self) {}
}
