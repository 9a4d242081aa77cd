//! Shared fakes for the carlink-host integration tests: a scripted USB
//! dongle, a backend serving it, and a recording microphone.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use carlink_core::protocol::codec::{decode_header, encode_header};
use carlink_core::protocol::messages::{MessageType, HEADER_SIZE};
use carlink_host::microphone::Microphone;
use carlink_host::usb::{
    ConfigurationInfo, EndpointDirection, EndpointInfo, TransferIn, TransferStatus, UsbBackend,
    UsbDongle, UsbError,
};

/// A scripted adapter device.
///
/// IN transfers pop from a queue; once the queue runs dry the next read
/// parks forever, holding the driver's read loop quiet.  OUT transfers are
/// recorded for assertion.
pub struct FakeDongle {
    open: AtomicBool,
    /// Number of upcoming `open` calls that should fail.
    pub fail_opens: AtomicU32,
    pub resets: AtomicU32,
    pub claimed: AtomicBool,
    configuration: Mutex<Option<ConfigurationInfo>>,
    reads: Mutex<VecDeque<Result<TransferIn, UsbError>>>,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl FakeDongle {
    pub fn new(open: bool) -> Arc<FakeDongle> {
        Arc::new(FakeDongle {
            open: AtomicBool::new(open),
            fail_opens: AtomicU32::new(0),
            resets: AtomicU32::new(0),
            claimed: AtomicBool::new(false),
            configuration: Mutex::new(Some(default_configuration())),
            reads: Mutex::new(VecDeque::new()),
            writes: Mutex::new(Vec::new()),
        })
    }

    /// A dongle whose interface has no IN endpoint.
    pub fn without_in_endpoint() -> Arc<FakeDongle> {
        let dongle = FakeDongle::new(true);
        *dongle.configuration.lock().unwrap() = Some(ConfigurationInfo {
            interface_number: 0,
            endpoints: vec![EndpointInfo {
                direction: EndpointDirection::Out,
                number: 0x01,
            }],
        });
        dongle
    }

    /// Queues a successful IN transfer delivering `bytes`.
    pub fn push_read(&self, bytes: Vec<u8>) {
        self.reads.lock().unwrap().push_back(Ok(TransferIn {
            status: TransferStatus::Ok,
            data: bytes,
        }));
    }

    /// Queues a failed IN transfer.
    pub fn push_read_error(&self) {
        self.reads
            .lock()
            .unwrap()
            .push_back(Err(UsbError::Transfer("scripted failure".to_string())));
    }

    /// Queues a complete device→host frame as the driver reads it: one
    /// header transfer, then one payload transfer when non-empty.
    pub fn push_message(&self, kind: MessageType, payload: &[u8]) {
        self.push_read(encode_header(kind, payload.len() as u32).to_vec());
        if !payload.is_empty() {
            self.push_read(payload.to_vec());
        }
    }

    /// All frames written to the OUT endpoint so far.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// Type codes of all written frames, in order.
    pub fn written_kinds(&self) -> Vec<u32> {
        self.written_frames()
            .iter()
            .map(|frame| decode_header(&frame[..HEADER_SIZE]).expect("valid header").kind)
            .collect()
    }

    /// Payloads of written `Command` frames, as u32 command values.
    pub fn written_commands(&self) -> Vec<u32> {
        self.written_frames()
            .iter()
            .filter(|frame| {
                decode_header(&frame[..HEADER_SIZE]).expect("valid header").kind
                    == MessageType::Command as u32
            })
            .map(|frame| {
                u32::from_le_bytes([frame[16], frame[17], frame[18], frame[19]])
            })
            .collect()
    }
}

fn default_configuration() -> ConfigurationInfo {
    ConfigurationInfo {
        interface_number: 0,
        endpoints: vec![
            EndpointInfo { direction: EndpointDirection::In, number: 0x81 },
            EndpointInfo { direction: EndpointDirection::Out, number: 0x01 },
        ],
    }
}

#[async_trait]
impl UsbDongle for FakeDongle {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<(), UsbError> {
        if self.fail_opens.load(Ordering::SeqCst) > 0 {
            self.fail_opens.fetch_sub(1, Ordering::SeqCst);
            return Err(UsbError::Transfer("scripted open failure".to_string()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), UsbError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn reset(&self) -> Result<(), UsbError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn select_configuration(&self, _number: u8) -> Result<(), UsbError> {
        Ok(())
    }

    async fn claim_interface(&self, _number: u8) -> Result<(), UsbError> {
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn active_configuration(&self) -> Option<ConfigurationInfo> {
        self.configuration.lock().unwrap().clone()
    }

    async fn transfer_in(&self, _endpoint: u8, _length: usize) -> Result<TransferIn, UsbError> {
        let next = self.reads.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            // Script exhausted: park so the read loop stays quiet.
            None => std::future::pending().await,
        }
    }

    async fn transfer_out(&self, _endpoint: u8, data: &[u8]) -> Result<TransferStatus, UsbError> {
        if !self.is_open() {
            return Err(UsbError::NotOpen);
        }
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(TransferStatus::Ok)
    }
}

/// Backend serving one fake dongle, or none.
pub struct FakeBackend {
    device: Mutex<Option<Arc<FakeDongle>>>,
}

impl FakeBackend {
    pub fn with_device(device: Arc<FakeDongle>) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            device: Mutex::new(Some(device)),
        })
    }

    pub fn empty() -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            device: Mutex::new(None),
        })
    }

    pub fn attach(&self, device: Arc<FakeDongle>) {
        *self.device.lock().unwrap() = Some(device);
    }
}

#[async_trait]
impl UsbBackend for FakeBackend {
    async fn find_dongle(&self) -> Option<Arc<dyn UsbDongle>> {
        self.device
            .lock()
            .unwrap()
            .clone()
            .map(|device| device as Arc<dyn UsbDongle>)
    }
}

/// Microphone recording start/stop calls and exposing the sample sender.
#[derive(Default)]
pub struct FakeMicrophone {
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    sender: Mutex<Option<mpsc::Sender<Vec<i16>>>>,
}

impl FakeMicrophone {
    pub fn new() -> Arc<FakeMicrophone> {
        Arc::new(FakeMicrophone::default())
    }

    /// The sample sender handed to the last `start` call.
    pub fn sample_sender(&self) -> Option<mpsc::Sender<Vec<i16>>> {
        self.sender.lock().unwrap().clone()
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn start(&self, samples: mpsc::Sender<Vec<i16>>) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sender.lock().unwrap() = Some(samples);
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lets spawned tasks run until they block again.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
