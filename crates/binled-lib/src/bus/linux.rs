//! Linux userspace backends: spidev character device and sysfs GPIO.
//!
//! Both implement the `embedded-hal` traits so they plug into
//! [`ShiftChain`](super::ShiftChain) and [`DirectLines`](super::DirectLines).
//! Neither needs a platform crate: spidev accepts plain `write(2)` for
//! half-duplex transfers, and sysfs GPIO is file I/O.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, SpiBus};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// I/O error from a Linux device node, tagged with the node path.
#[derive(Debug)]
pub struct HwError {
    pub context: String,
    pub source: std::io::Error,
}

impl HwError {
    fn new(context: impl Into<String>, source: std::io::Error) -> Self {
        HwError {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.source)
    }
}

impl std::error::Error for HwError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl spi::Error for HwError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for HwError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

// ── spidev ──

/// Write-only SPI port on `/dev/spidevB.C`.
///
/// Mode and clock come from the device-tree defaults; the frame is a single
/// `write(2)`, so chip-select stays asserted for the whole chain.
#[derive(Debug)]
pub struct SpidevPort {
    file: File,
    path: PathBuf,
}

impl SpidevPort {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HwError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| HwError::new(path.display().to_string(), e))?;
        Ok(SpidevPort { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn err(&self, e: std::io::Error) -> HwError {
        HwError::new(self.path.display().to_string(), e)
    }

    fn unsupported(&self, what: &str) -> HwError {
        self.err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("{what} needs the SPI_IOC_MESSAGE ioctl"),
        ))
    }
}

impl spi::ErrorType for SpidevPort {
    type Error = HwError;
}

impl SpiBus<u8> for SpidevPort {
    fn read(&mut self, words: &mut [u8]) -> Result<(), HwError> {
        self.file.read_exact(words).map_err(|e| self.err(e))
    }

    fn write(&mut self, words: &[u8]) -> Result<(), HwError> {
        let written = self.file.write(words).map_err(|e| self.err(e))?;
        if written != words.len() {
            // A short write would split the frame across two chip-select cycles.
            return Err(self.err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write ({written} of {} bytes)", words.len()),
            )));
        }
        Ok(())
    }

    fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), HwError> {
        Err(self.unsupported("full-duplex transfer"))
    }

    fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), HwError> {
        Err(self.unsupported("in-place transfer"))
    }

    fn flush(&mut self) -> Result<(), HwError> {
        self.file.flush().map_err(|e| self.err(e))
    }
}

// ── sysfs GPIO ──

/// Output line driven through `/sys/class/gpio/gpioN/value`.
///
/// Exports the line on open if it is not already exported, and unexports it
/// again on drop, so the line is released on every exit path.
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    root: PathBuf,
    value: File,
    exported_here: bool,
}

impl SysfsPin {
    /// Open line `number` under the default sysfs root.
    pub fn open(number: u32) -> Result<Self, HwError> {
        Self::open_at(SYSFS_GPIO_ROOT, number)
    }

    /// Open line `number` under an arbitrary root (tests point this at a temp dir).
    pub fn open_at(root: impl AsRef<Path>, number: u32) -> Result<Self, HwError> {
        let root = root.as_ref().to_path_buf();
        let line_dir = root.join(format!("gpio{number}"));
        let context = format!("gpio {number}");

        let mut exported_here = false;
        if !line_dir.exists() {
            std::fs::write(root.join("export"), number.to_string())
                .map_err(|e| HwError::new(format!("{context}: export"), e))?;
            exported_here = true;
        }

        let setup = std::fs::write(line_dir.join("direction"), "out").and_then(|()| {
            OpenOptions::new()
                .write(true)
                .open(line_dir.join("value"))
        });
        match setup {
            Ok(value) => Ok(SysfsPin {
                number,
                root,
                value,
                exported_here,
            }),
            Err(e) => {
                if exported_here {
                    let _ = std::fs::write(root.join("unexport"), number.to_string());
                }
                Err(HwError::new(format!("{context}: configure"), e))
            }
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn write_level(&mut self, high: bool) -> Result<(), HwError> {
        let level: &[u8] = if high { b"1" } else { b"0" };
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.write_all(level))
            .and_then(|()| self.value.flush())
            .map_err(|e| HwError::new(format!("gpio {}", self.number), e))
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if self.exported_here
            && let Err(e) = std::fs::write(self.root.join("unexport"), self.number.to_string())
        {
            log::warn!("gpio {}: unexport failed: {e}", self.number);
        }
    }
}

impl digital::ErrorType for SysfsPin {
    type Error = HwError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), HwError> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), HwError> {
        self.write_level(true)
    }
}
