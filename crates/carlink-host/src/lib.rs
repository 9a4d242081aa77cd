//! carlink-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod driver;
pub mod microphone;
pub mod session;
pub mod settings;
pub mod usb;

pub use driver::{DongleDriver, DriverError, DriverEvent};
pub use microphone::{Microphone, SilentMicrophone};
pub use session::{CarlinkSession, SessionEvent};
pub use settings::{load_settings, SettingsError};
pub use usb::{UsbBackend, UsbDongle, UsbError};
