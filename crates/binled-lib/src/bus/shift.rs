//! Hardware transports built on `embedded-hal` traits.
//!
//! - [`ShiftChain`]: frame clocked out over SPI into daisy-chained shift
//!   registers. Boards that latch on chip-select need nothing else; boards
//!   with a separate storage-clock line get it pulsed low→high around the
//!   transfer.
//! - [`DirectLines`]: one GPIO output per LED, no registers.

use std::convert::Infallible;

use embedded_hal::digital::{self, OutputPin, PinState};
use embedded_hal::spi::SpiBus;

use super::{BusError, FrameTransport, Result};
use crate::mask::FrameLayout;

/// Placeholder latch for chains that commit on chip-select.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLatch;

impl digital::ErrorType for NoLatch {
    type Error = Infallible;
}

impl OutputPin for NoLatch {
    fn set_low(&mut self) -> std::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Infallible> {
        Ok(())
    }
}

/// Shift-register chain on an SPI bus, with an optional latch line.
pub struct ShiftChain<S, L = NoLatch> {
    spi: S,
    latch: Option<L>,
    name: String,
}

impl<S: SpiBus<u8>> ShiftChain<S, NoLatch> {
    /// Chain latched by the bus's own chip-select.
    pub fn new(spi: S, name: impl Into<String>) -> Self {
        ShiftChain {
            spi,
            latch: None,
            name: name.into(),
        }
    }
}

impl<S: SpiBus<u8>, L: OutputPin> ShiftChain<S, L> {
    /// Chain with a dedicated latch line.
    pub fn with_latch(spi: S, latch: L, name: impl Into<String>) -> Self {
        ShiftChain {
            spi,
            latch: Some(latch),
            name: name.into(),
        }
    }

    fn shift_out(&mut self, frame: &[u8]) -> Result<()> {
        self.spi
            .write(frame)
            .and_then(|()| self.spi.flush())
            .map_err(|e| BusError::Io(format!("{}: spi write: {e:?}", self.name)))
    }
}

impl<S, L> FrameTransport for ShiftChain<S, L>
where
    S: SpiBus<u8> + Send,
    L: OutputPin + Send,
{
    fn describe(&self) -> String {
        if self.latch.is_some() {
            format!("spi {} (separate latch)", self.name)
        } else {
            format!("spi {}", self.name)
        }
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        let Some(latch) = self.latch.as_mut() else {
            return self.shift_out(frame);
        };
        latch
            .set_low()
            .map_err(|e| BusError::Io(format!("{}: latch low: {e:?}", self.name)))?;
        let shifted = self.shift_out(frame);
        // Raise the latch even when the write failed so the line is never left held.
        let released = match self.latch.as_mut() {
            Some(latch) => latch
                .set_high()
                .map_err(|e| BusError::Io(format!("{}: latch high: {e:?}", self.name))),
            None => Ok(()),
        };
        shifted.and(released)
    }
}

/// One GPIO line per LED; line `i` drives device index `i`.
///
/// The frame is unpacked with the chain's byte order but without inversion,
/// so each line sees the same electrical level a register output would.
pub struct DirectLines<P> {
    lines: Vec<P>,
    layout: FrameLayout,
}

impl<P: OutputPin> DirectLines<P> {
    pub fn new(lines: Vec<P>, layout: FrameLayout) -> Self {
        DirectLines {
            lines,
            layout: FrameLayout {
                invert: false,
                ..layout
            },
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl<P: OutputPin + Send> FrameTransport for DirectLines<P> {
    fn describe(&self) -> String {
        format!("gpio ({} lines)", self.lines.len())
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        let levels = self
            .layout
            .decode(frame)
            .map_err(|e| BusError::Io(format!("gpio: {e}")))?;
        for (i, line) in self.lines.iter_mut().enumerate() {
            let state = PinState::from((levels.bits() >> i) & 1 == 1);
            line.set_state(state)
                .map_err(|e| BusError::Io(format!("gpio line {i}: {e:?}")))?;
        }
        Ok(())
    }
}
