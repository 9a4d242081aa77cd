//! USB device abstraction.
//!
//! The driver and session layers talk to the adapter through these traits so
//! they can be exercised against scripted fakes.  A production backend wraps
//! libusb (or WebUSB via a bridge); none is bundled here.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Vendor/product pairs of known CarLink adapters.
pub const KNOWN_DEVICES: [(u16, u16); 2] = [(0x1314, 0x1520), (0x1314, 0x1521)];

/// Returns true if `vendor_id`/`product_id` matches a known adapter.
pub fn is_carlink_dongle(vendor_id: u16, product_id: u16) -> bool {
    KNOWN_DEVICES
        .iter()
        .any(|&(vid, pid)| vid == vendor_id && pid == product_id)
}

/// Error type for USB transport operations.
#[derive(Debug, Error)]
pub enum UsbError {
    #[error("device is not open")]
    NotOpen,

    #[error("device disconnected")]
    Disconnected,

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("control request failed: {0}")]
    Control(String),
}

/// Completion status of a bulk transfer, distinct from transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Ok,
    Stall,
    Babble,
}

/// Result of an IN transfer: completion status plus whatever bytes arrived.
#[derive(Debug, Clone)]
pub struct TransferIn {
    pub status: TransferStatus,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo {
    pub direction: EndpointDirection,
    pub number: u8,
}

/// The active configuration's first interface, which carries the two bulk
/// endpoints the protocol runs over.
#[derive(Debug, Clone)]
pub struct ConfigurationInfo {
    pub interface_number: u8,
    pub endpoints: Vec<EndpointInfo>,
}

impl ConfigurationInfo {
    pub fn endpoint(&self, direction: EndpointDirection) -> Option<EndpointInfo> {
        self.endpoints
            .iter()
            .copied()
            .find(|ep| ep.direction == direction)
    }
}

/// Handle to one adapter device.
///
/// `is_open` and `active_configuration` are synchronous snapshots; everything
/// that touches the bus is async.
#[async_trait]
pub trait UsbDongle: Send + Sync {
    fn is_open(&self) -> bool;

    async fn open(&self) -> Result<(), UsbError>;

    async fn close(&self) -> Result<(), UsbError>;

    /// Port reset.  The device drops off the bus for a few seconds afterwards
    /// and must be rediscovered; callers handle that dance.
    async fn reset(&self) -> Result<(), UsbError>;

    async fn select_configuration(&self, number: u8) -> Result<(), UsbError>;

    async fn claim_interface(&self, number: u8) -> Result<(), UsbError>;

    fn active_configuration(&self) -> Option<ConfigurationInfo>;

    /// Reads up to `length` bytes from the IN endpoint.
    async fn transfer_in(&self, endpoint: u8, length: usize) -> Result<TransferIn, UsbError>;

    /// Writes `data` to the OUT endpoint.
    async fn transfer_out(&self, endpoint: u8, data: &[u8]) -> Result<TransferStatus, UsbError>;
}

/// Device discovery seam.
#[async_trait]
pub trait UsbBackend: Send + Sync {
    /// Returns a handle to a connected known adapter, or `None` when no
    /// adapter is present right now.
    async fn find_dongle(&self) -> Option<Arc<dyn UsbDongle>>;
}
