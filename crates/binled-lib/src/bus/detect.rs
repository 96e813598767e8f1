//! Startup capability detection — pick a transport once, fall back to the no-op bus.

use std::path::Path;

use super::linux::{SYSFS_GPIO_ROOT, SpidevPort, SysfsPin};
use super::shift::{DirectLines, ShiftChain};
use super::{BusError, FrameTransport, LedBus, NullTransport, Result};
use crate::config::{Config, TransportKind};

/// Open the transport named by `config`.
///
/// Returns `Err(Unavailable)` when the device node or GPIO lines can't be
/// opened. `TransportKind::None` always succeeds with [`NullTransport`].
pub fn open_transport(config: &Config) -> Result<Box<dyn FrameTransport>> {
    open_transport_at(config, Path::new(SYSFS_GPIO_ROOT))
}

/// [`open_transport`] with GPIO lines looked up under `gpio_root`.
fn open_transport_at(config: &Config, gpio_root: &Path) -> Result<Box<dyn FrameTransport>> {
    match config.transport {
        TransportKind::None => Ok(Box::new(NullTransport)),
        TransportKind::Spi => open_spi(config, gpio_root),
        TransportKind::Gpio => open_gpio(config, gpio_root),
        TransportKind::Auto => {
            if Path::new(&config.spi_device).exists() {
                open_spi(config, gpio_root)
            } else if !config.gpio_lines.is_empty() {
                open_gpio(config, gpio_root)
            } else {
                Err(BusError::Unavailable(format!(
                    "{}: not found and no gpio_lines configured",
                    config.spi_device
                )))
            }
        }
    }
}

fn open_spi(config: &Config, gpio_root: &Path) -> Result<Box<dyn FrameTransport>> {
    let port = SpidevPort::open(&config.spi_device)
        .map_err(|e| BusError::Unavailable(e.to_string()))?;
    let name = config.spi_device.clone();
    match config.latch_gpio {
        Some(line) => {
            let latch = SysfsPin::open_at(gpio_root, line)
                .map_err(|e| BusError::Unavailable(e.to_string()))?;
            Ok(Box::new(ShiftChain::with_latch(port, latch, name)))
        }
        None => Ok(Box::new(ShiftChain::new(port, name))),
    }
}

fn open_gpio(config: &Config, gpio_root: &Path) -> Result<Box<dyn FrameTransport>> {
    if config.gpio_lines.is_empty() {
        return Err(BusError::Unavailable("gpio: no gpio_lines configured".into()));
    }
    // Lines opened so far are dropped (and unexported) if a later one fails.
    let lines = config
        .gpio_lines
        .iter()
        .map(|&n| SysfsPin::open_at(gpio_root, n))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BusError::Unavailable(e.to_string()))?;
    Ok(Box::new(DirectLines::new(lines, config.layout())))
}

/// Build the process-wide bus from config.
///
/// Missing hardware is not an error here: the bus degrades to the no-op
/// transport so the rest of the pipeline keeps working.
pub fn open_bus(config: &Config) -> LedBus {
    let layout = config.layout();
    match open_transport(config) {
        Ok(transport) => {
            log::info!("LED bus: {}", transport.describe());
            LedBus::new(transport, layout)
        }
        Err(e) => {
            log::warn!("{e}; LED writes will be skipped");
            LedBus::null(layout)
        }
    }
}
