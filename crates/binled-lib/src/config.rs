//! Application configuration — TOML-based, platform-aware paths.
//!
//! Read once at startup. Array size, inversion, and wiring are fixed for the
//! life of the process.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::grid::OVERFLOW_INDEX;
use crate::mask::{ByteOrder, DEFAULT_LED_COUNT, FrameLayout, MAX_LEDS};

/// First lines of a file written by `config --init`.
const INIT_PREAMBLE: &str = "# binled LED controller settings.\n\
# Read once at startup; restart the process after editing.\n\n";

/// Which hardware transport to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// spidev if `spi_device` exists, else direct GPIO if lines are configured, else none.
    #[default]
    Auto,
    /// Shift-register chain on `spi_device`.
    Spi,
    /// One sysfs GPIO line per LED (`gpio_lines`).
    Gpio,
    /// No hardware; every write is a no-op.
    None,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Auto => "auto",
            TransportKind::Spi => "spi",
            TransportKind::Gpio => "gpio",
            TransportKind::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of addressable outputs. Default: 25.
    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// Logical "on" drives the output low (active-low LEDs).
    #[serde(default)]
    pub invert: bool,

    /// Wire order of frame bytes: "msb-first" (default) or "lsb-first".
    #[serde(default)]
    pub byte_order: ByteOrder,

    /// Hardware transport: "auto", "spi", "gpio", or "none".
    #[serde(default)]
    pub transport: TransportKind,

    /// spidev node for the shift-register chain.
    #[serde(default = "default_spi_device")]
    pub spi_device: String,

    /// sysfs GPIO number of a separate latch line. Unset = chain latches on chip-select.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latch_gpio: Option<u32>,

    /// sysfs GPIO numbers for direct drive, one per device index.
    #[serde(default)]
    pub gpio_lines: Vec<u32>,

    /// Auto-off delay for timed activations, in milliseconds. Default: 10000.
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,

    /// Delay between steps of the self-test sweep, in milliseconds. Default: 150.
    #[serde(default = "default_sweep_step_ms")]
    pub sweep_step_ms: u64,
}

fn default_led_count() -> usize {
    DEFAULT_LED_COUNT
}
fn default_spi_device() -> String {
    "/dev/spidev0.0".into()
}
fn default_hold_ms() -> u64 {
    10_000
}
fn default_sweep_step_ms() -> u64 {
    150
}

impl Default for Config {
    fn default() -> Self {
        Config {
            led_count: default_led_count(),
            invert: false,
            byte_order: ByteOrder::default(),
            transport: TransportKind::default(),
            spi_device: default_spi_device(),
            latch_gpio: None,
            gpio_lines: Vec::new(),
            hold_ms: default_hold_ms(),
            sweep_step_ms: default_sweep_step_ms(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `led_count` is zero or larger than a mask can hold.
    LedCount(usize),
    /// `transport = "spi"` with an empty `spi_device`.
    EmptySpiDevice,
    /// `transport = "gpio"` with a line list that doesn't match `led_count`.
    GpioLineCount { lines: usize, led_count: usize },
    /// The same GPIO number is used twice (including the latch line).
    DuplicateGpio(u32),
    /// `sweep_step_ms` is zero.
    ZeroSweepStep,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::LedCount(n) => {
                write!(f, "led_count must be 1..={MAX_LEDS}, got {n}")
            }
            ValidationError::EmptySpiDevice => write!(f, "spi_device cannot be empty"),
            ValidationError::GpioLineCount { lines, led_count } => write!(
                f,
                "gpio_lines has {lines} entr{} but led_count is {led_count}",
                if *lines == 1 { "y" } else { "ies" }
            ),
            ValidationError::DuplicateGpio(n) => write!(f, "gpio {n} is used more than once"),
            ValidationError::ZeroSweepStep => write!(f, "sweep_step_ms must be greater than 0"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("binled"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Render as a commented TOML document.
    pub fn to_toml(&self) -> crate::error::Result<String> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| crate::BinledError::Config(format!("cannot serialize: {e}")))?;
        Ok(format!("{INIT_PREAMBLE}{body}"))
    }

    /// Write to `path`, creating parent directories.
    ///
    /// The document goes to a sibling `.tmp` file first and is renamed into
    /// place, so a reader never sees a half-written config. Returns the
    /// number of bytes written.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<usize> {
        let doc = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("toml.tmp");
        std::fs::write(&staging, doc.as_bytes())?;
        if let Err(e) = std::fs::rename(&staging, path) {
            log::debug!("rename {} failed ({e}), writing in place", staging.display());
            let direct = std::fs::write(path, doc.as_bytes());
            let _ = std::fs::remove_file(&staging);
            direct?;
        }
        Ok(doc.len())
    }

    /// Non-fatal problem: an array too short for the full bin grid.
    ///
    /// Smaller arrays still work for `index` and `test`, but bins at or past
    /// `led_count` (always including the overflow bin) will be rejected.
    pub fn grid_warning(&self) -> Option<String> {
        (self.led_count <= OVERFLOW_INDEX).then(|| {
            format!(
                "led_count is {} but the bin grid needs {}; bins from index {} up cannot light",
                self.led_count,
                OVERFLOW_INDEX + 1,
                self.led_count
            )
        })
    }

    /// Frame geometry for the configured array.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.led_count, self.invert, self.byte_order)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.led_count == 0 || self.led_count > MAX_LEDS {
            errors.push(ValidationError::LedCount(self.led_count));
        }

        if self.transport == TransportKind::Spi && self.spi_device.trim().is_empty() {
            errors.push(ValidationError::EmptySpiDevice);
        }

        if self.transport == TransportKind::Gpio && self.gpio_lines.len() != self.led_count {
            errors.push(ValidationError::GpioLineCount {
                lines: self.gpio_lines.len(),
                led_count: self.led_count,
            });
        }

        let mut seen: Vec<u32> = Vec::new();
        for &n in self.gpio_lines.iter().chain(self.latch_gpio.iter()) {
            if seen.contains(&n) {
                if !errors.contains(&ValidationError::DuplicateGpio(n)) {
                    errors.push(ValidationError::DuplicateGpio(n));
                }
            } else {
                seen.push(n);
            }
        }

        if self.sweep_step_ms == 0 {
            errors.push(ValidationError::ZeroSweepStep);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate), folded into a single crate error.
    pub fn check(&self) -> crate::error::Result<()> {
        self.validate().map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            crate::BinledError::Config(joined.join("; "))
        })
    }
}
