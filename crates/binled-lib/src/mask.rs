//! Mask codec — packs an LED bitmask into the byte frame shifted down the register chain.
//!
//! Bit `k` of a [`Mask`] is device index `k`. Frames are `ceil(led_count / 8)`
//! bytes; byte `i` of the little-end view holds bits `[8i, 8i + 8)`. With
//! [`ByteOrder::MsbFirst`] the byte covering the highest indices goes out on
//! the wire first, so it ends up in the far register of the chain.
//!
//! Inversion (active-low outputs) complements only the low `led_count` bits;
//! padding bits in the top byte are always zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BinledError, Result};
use crate::grid::DeviceIndex;

/// Largest array a [`Mask`] can describe.
pub const MAX_LEDS: usize = 64;

/// Default array size (6 categories × 4 stores + overflow bin).
pub const DEFAULT_LED_COUNT: usize = 25;

/// Bitmask over device indices. All-zero means everything off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u64);

impl Mask {
    pub const OFF: Mask = Mask(0);

    pub const fn from_bits(bits: u64) -> Self {
        Mask(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn is_off(self) -> bool {
        self.0 == 0
    }

    /// Position of the highest set bit, if any.
    pub fn highest_bit(self) -> Option<u32> {
        (self.0 != 0).then(|| 63 - self.0.leading_zeros())
    }

    /// Set device indices, lowest first.
    pub fn lit(self) -> impl Iterator<Item = DeviceIndex> {
        (0..MAX_LEDS).filter(move |&i| (self.0 >> i) & 1 == 1)
    }

    /// Eight upper-case hex digits (wider if bits above 32 are set).
    pub fn hex(self) -> String {
        format!("{:08X}", self.0)
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

/// All-ones over the low `led_count` bits.
fn full_bits(led_count: usize) -> u64 {
    if led_count >= MAX_LEDS {
        u64::MAX
    } else {
        (1u64 << led_count) - 1
    }
}

/// Wire order of the frame bytes. This is a property of how the chain is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    /// Byte covering the highest indices is transmitted first.
    #[default]
    MsbFirst,
    /// Byte covering indices 0..8 is transmitted first.
    LsbFirst,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::MsbFirst => write!(f, "msb-first"),
            ByteOrder::LsbFirst => write!(f, "lsb-first"),
        }
    }
}

// ── Frames ──

/// Encoded frame plus the logical mask it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFrame {
    bytes: Vec<u8>,
    mask: Mask,
}

impl BusFrame {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Space-separated hex bytes in wire order, e.g. `"00 10 00 00"`.
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AsRef<[u8]> for BusFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Array geometry and electrical conventions needed to build a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub led_count: usize,
    pub invert: bool,
    pub byte_order: ByteOrder,
}

impl Default for FrameLayout {
    fn default() -> Self {
        FrameLayout {
            led_count: DEFAULT_LED_COUNT,
            invert: false,
            byte_order: ByteOrder::MsbFirst,
        }
    }
}

impl FrameLayout {
    pub fn new(led_count: usize, invert: bool, byte_order: ByteOrder) -> Self {
        FrameLayout {
            led_count,
            invert,
            byte_order,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.led_count.div_ceil(8)
    }

    fn check_geometry(&self) -> Result<()> {
        if self.led_count == 0 || self.led_count > MAX_LEDS {
            return Err(BinledError::Config(format!(
                "led_count must be 1..={MAX_LEDS}, got {}",
                self.led_count
            )));
        }
        Ok(())
    }

    /// Fail unless every set bit of `mask` addresses a real LED.
    pub fn check(&self, mask: Mask) -> Result<()> {
        self.check_geometry()?;
        if mask.bits() & !full_bits(self.led_count) != 0 {
            let index = mask.highest_bit().map(u64::from).unwrap_or_default();
            return Err(BinledError::IndexOutOfRange {
                index,
                led_count: self.led_count,
            });
        }
        Ok(())
    }

    /// One-hot mask for `index`.
    pub fn one_hot(&self, index: DeviceIndex) -> Result<Mask> {
        self.check_geometry()?;
        if index >= self.led_count {
            return Err(BinledError::IndexOutOfRange {
                index: index as u64,
                led_count: self.led_count,
            });
        }
        Ok(Mask(1u64 << index))
    }

    /// Mask with every LED lit.
    pub fn all_on(&self) -> Mask {
        Mask(full_bits(self.led_count.min(MAX_LEDS)))
    }

    /// Pack `mask` into wire-order bytes.
    pub fn encode(&self, mask: Mask) -> Result<BusFrame> {
        self.check(mask)?;
        let electrical = if self.invert {
            mask.bits() ^ full_bits(self.led_count)
        } else {
            mask.bits()
        };
        let mut bytes: Vec<u8> = (0..self.frame_len())
            .map(|i| (electrical >> (8 * i)) as u8)
            .collect();
        if self.byte_order == ByteOrder::MsbFirst {
            bytes.reverse();
        }
        Ok(BusFrame { bytes, mask })
    }

    /// Unpack wire-order bytes back into the logical mask.
    pub fn decode(&self, frame: &[u8]) -> Result<Mask> {
        self.check_geometry()?;
        if frame.len() != self.frame_len() {
            return Err(BinledError::Frame(format!(
                "expected {} bytes for {} LEDs, got {}",
                self.frame_len(),
                self.led_count,
                frame.len()
            )));
        }
        let fold = |acc: u64, (i, &b): (usize, &u8)| acc | u64::from(b) << (8 * i);
        let electrical = match self.byte_order {
            ByteOrder::MsbFirst => frame.iter().rev().enumerate().fold(0, fold),
            ByteOrder::LsbFirst => frame.iter().enumerate().fold(0, fold),
        };
        let full = full_bits(self.led_count);
        if electrical & !full != 0 {
            return Err(BinledError::Frame(format!(
                "padding bits set above LED {}",
                self.led_count - 1
            )));
        }
        let bits = if self.invert {
            electrical ^ full
        } else {
            electrical
        };
        Ok(Mask(bits))
    }
}

/// Encode with the default (MSB-first) wire order.
pub fn encode(mask: u64, led_count: usize, invert: bool) -> Result<BusFrame> {
    FrameLayout::new(led_count, invert, ByteOrder::MsbFirst).encode(Mask::from_bits(mask))
}
