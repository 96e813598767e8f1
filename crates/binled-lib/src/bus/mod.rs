//! LED bus — transport trait, the serialized bus owner, and test doubles.
//!
//! [`LedBus`] is the only thing allowed to touch the hardware. It owns one
//! [`FrameTransport`] behind a mutex, so frames from the request path, the
//! auto-off worker, and the self-test sweep never interleave on the wire.

mod detect;
mod linux;
mod shift;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::grid::DeviceIndex;
use crate::mask::{BusFrame, FrameLayout, Mask};

pub use detect::{open_bus, open_transport};
pub use linux::{HwError, SpidevPort, SysfsPin};
pub use shift::{DirectLines, NoLatch, ShiftChain};

// ── Error type ──

/// Bus errors.
///
/// String payloads follow the convention **"context: details"**, where
/// *context* names the device node or step (e.g. `"/dev/spidev0.0"`,
/// `"latch low"`) and *details* says what went wrong.
#[derive(Debug)]
pub enum BusError {
    /// Driver or device node missing. Only produced during detection.
    Unavailable(String),
    /// Transfer failed after the transport was acquired.
    Io(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Unavailable(e) => write!(f, "LED bus unavailable: {e}"),
            BusError::Io(e) => write!(f, "LED bus transfer failed: {e}"),
        }
    }
}

impl std::error::Error for BusError {}

pub type Result<T> = std::result::Result<T, BusError>;

// ── Trait ──

/// Something that can put a wire-order frame onto the LED hardware.
pub trait FrameTransport: Send {
    /// Short human-readable description, e.g. `"spi /dev/spidev0.0 (separate latch)"`.
    fn describe(&self) -> String;

    /// Transmit one frame. Must leave any control lines released on return.
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;

    /// False for the no-op transport.
    fn is_live(&self) -> bool {
        true
    }
}

/// Transport used when no hardware is present. Every write succeeds and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl FrameTransport for NullTransport {
    fn describe(&self) -> String {
        "none (dry run)".into()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        log::trace!("null transport: dropping {} byte frame", frame.len());
        Ok(())
    }

    fn is_live(&self) -> bool {
        false
    }
}

// ── Bus owner ──

struct Inner {
    transport: Box<dyn FrameTransport>,
    current: Mask,
}

/// Exclusive owner of the LED transport.
///
/// Construct once at startup (see [`open_bus`]) and share behind an `Arc`.
pub struct LedBus {
    inner: Mutex<Inner>,
    layout: FrameLayout,
}

impl LedBus {
    pub fn new(transport: Box<dyn FrameTransport>, layout: FrameLayout) -> Self {
        LedBus {
            inner: Mutex::new(Inner {
                transport,
                current: Mask::OFF,
            }),
            layout,
        }
    }

    /// Bus with the no-op transport.
    pub fn null(layout: FrameLayout) -> Self {
        Self::new(Box::new(NullTransport), layout)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-transfer leaves nothing to repair; keep using the transport.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn is_live(&self) -> bool {
        self.lock().transport.is_live()
    }

    pub fn describe(&self) -> String {
        self.lock().transport.describe()
    }

    /// Transmit a frame under the bus lock.
    ///
    /// The recorded mask only advances when the transfer succeeds.
    pub fn apply(&self, frame: &BusFrame) -> Result<()> {
        let mut inner = self.lock();
        log::debug!("bus: mask {} -> [{}]", frame.mask(), frame.to_hex());
        inner.transport.transmit(frame.bytes())?;
        inner.current = frame.mask();
        Ok(())
    }

    /// Encode and apply an arbitrary mask.
    pub fn set_mask(&self, mask: Mask) -> crate::error::Result<()> {
        let frame = self.layout.encode(mask)?;
        self.apply(&frame)?;
        Ok(())
    }

    /// Light exactly one LED, clearing all others.
    pub fn light(&self, index: DeviceIndex) -> crate::error::Result<Mask> {
        let mask = self.layout.one_hot(index)?;
        self.set_mask(mask)?;
        Ok(mask)
    }

    pub fn all_off(&self) -> Result<()> {
        // The all-off mask always fits; encoding only fails on a layout that
        // config validation rejects.
        let frame = self
            .layout
            .encode(Mask::OFF)
            .map_err(|e| BusError::Io(format!("encode all-off: {e}")))?;
        self.apply(&frame)
    }

    /// Last mask successfully transmitted. Bookkeeping only, not read back from hardware.
    pub fn current_mask(&self) -> Mask {
        self.lock().current
    }
}

impl fmt::Debug for LedBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedBus")
            .field("layout", &self.layout)
            .field("current", &self.current_mask())
            .finish_non_exhaustive()
    }
}

// ── Mock transports for testing ──

/// In-memory doubles for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    use embedded_hal::digital::{self, OutputPin};
    use embedded_hal::spi::{self, SpiBus};

    /// Frame-level mock. Clones share the same log, so a test can keep one
    /// handle and give another to [`LedBus`].
    #[derive(Clone, Default)]
    pub struct MockTransport {
        /// Recorded frames with the time they were written.
        pub frames: Arc<Mutex<Vec<(Instant, Vec<u8>)>>>,
        /// If true, `transmit` returns an error.
        pub fail: Arc<AtomicBool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of the recorded frames, without timestamps.
        pub fn written(&self) -> Vec<Vec<u8>> {
            self.lock().iter().map(|(_, f)| f.clone()).collect()
        }

        pub fn timestamps(&self) -> Vec<Instant> {
            self.lock().iter().map(|(t, _)| *t).collect()
        }

        pub fn clear(&self) {
            self.lock().clear();
        }

        fn lock(&self) -> MutexGuard<'_, Vec<(Instant, Vec<u8>)>> {
            self.frames.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl FrameTransport for MockTransport {
        fn describe(&self) -> String {
            "mock".into()
        }

        fn transmit(&mut self, frame: &[u8]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BusError::Io("mock: transmit failure injected".into()));
            }
            self.lock().push((Instant::now(), frame.to_vec()));
            Ok(())
        }
    }

    /// One observable event on the mock wire.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum WireEvent {
        Write(Vec<u8>),
        Flush,
        Pin(usize, bool),
    }

    /// Shared, ordered event log for [`MockSpi`] and [`MockPin`].
    pub type WireLog = Arc<Mutex<Vec<WireEvent>>>;

    fn record(log: &WireLog, event: WireEvent) {
        log.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    #[derive(Debug)]
    pub struct MockSpiError;

    impl spi::Error for MockSpiError {
        fn kind(&self) -> spi::ErrorKind {
            spi::ErrorKind::Other
        }
    }

    /// `SpiBus` double: records writes, optionally fails them.
    pub struct MockSpi {
        pub log: WireLog,
        pub fail_writes: Arc<AtomicBool>,
    }

    impl MockSpi {
        pub fn new(log: WireLog) -> Self {
            MockSpi {
                log,
                fail_writes: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl spi::ErrorType for MockSpi {
        type Error = MockSpiError;
    }

    impl SpiBus<u8> for MockSpi {
        fn read(&mut self, words: &mut [u8]) -> std::result::Result<(), MockSpiError> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> std::result::Result<(), MockSpiError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(MockSpiError);
            }
            record(&self.log, WireEvent::Write(words.to_vec()));
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> std::result::Result<(), MockSpiError> {
            read.fill(0);
            self.write(write)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> std::result::Result<(), MockSpiError> {
            let out = words.to_vec();
            words.fill(0);
            self.write(&out)
        }

        fn flush(&mut self) -> std::result::Result<(), MockSpiError> {
            record(&self.log, WireEvent::Flush);
            Ok(())
        }
    }

    /// `OutputPin` double identified by a line number.
    pub struct MockPin {
        pub line: usize,
        pub log: WireLog,
    }

    impl MockPin {
        pub fn new(line: usize, log: WireLog) -> Self {
            MockPin { line, log }
        }
    }

    impl digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> std::result::Result<(), Infallible> {
            record(&self.log, WireEvent::Pin(self.line, false));
            Ok(())
        }

        fn set_high(&mut self) -> std::result::Result<(), Infallible> {
            record(&self.log, WireEvent::Pin(self.line, true));
            Ok(())
        }
    }
}
