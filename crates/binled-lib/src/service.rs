//! Controller — turns bin requests into bus writes and auto-off deadlines.
//!
//! Request and response shapes match the JSON the scanner front end already
//! speaks (`storeName`, `deviceId`, `maskHex`, `hold_ms`).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bus::{self, LedBus};
use crate::config::Config;
use crate::error::Result;
use crate::grid::{BinAddress, DeviceIndex};
use crate::mask::Mask;
use crate::sweep;
use crate::timer::AutoOff;

/// How long an activation stays lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Turn off after `hold_ms`.
    #[default]
    Timed,
    /// Stay lit until the next activation or an explicit off.
    Sticky,
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMode::Timed => write!(f, "timed"),
            RouteMode::Sticky => write!(f, "sticky"),
        }
    }
}

/// Light the bin for a (category, store) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub category: String,
    #[serde(rename = "storeName")]
    pub store: String,
    #[serde(default)]
    pub mode: RouteMode,
    /// Auto-off delay; the controller's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,
    /// Resolve and report without touching the bus or the timer.
    #[serde(default)]
    pub dry_run: bool,
}

impl RouteRequest {
    pub fn new(category: impl Into<String>, store: impl Into<String>) -> Self {
        RouteRequest {
            category: category.into(),
            store: store.into(),
            mode: RouteMode::Timed,
            hold_ms: None,
            dry_run: false,
        }
    }
}

/// Outcome of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub ok: bool,
    #[serde(rename = "deviceId")]
    pub device_id: DeviceIndex,
    #[serde(rename = "maskHex")]
    pub mask_hex: String,
    pub mode: RouteMode,
    pub hold_ms: u64,
}

/// Owns the shared bus and its auto-off timer.
pub struct Controller {
    bus: Arc<LedBus>,
    auto_off: AutoOff,
    default_hold: Duration,
}

impl Controller {
    pub fn new(bus: Arc<LedBus>, default_hold: Duration) -> Result<Self> {
        let auto_off = AutoOff::new(Arc::clone(&bus))?;
        Ok(Controller {
            bus,
            auto_off,
            default_hold,
        })
    }

    /// Validate config, detect hardware, and start the timer.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.check()?;
        if let Some(w) = config.grid_warning() {
            log::warn!("{w}");
        }
        let bus = Arc::new(bus::open_bus(config));
        Self::new(bus, Duration::from_millis(config.hold_ms))
    }

    pub fn bus(&self) -> &LedBus {
        &self.bus
    }

    pub fn auto_off(&self) -> &AutoOff {
        &self.auto_off
    }

    /// Resolve a bin request and light it.
    pub fn route(&self, req: &RouteRequest) -> Result<RouteResponse> {
        let index = BinAddress::parse(&req.category, &req.store)?.index();
        self.activate(index, req.mode, req.hold_ms, req.dry_run)
    }

    /// Light a raw device index.
    pub fn light_index(
        &self,
        index: DeviceIndex,
        mode: RouteMode,
        hold_ms: Option<u64>,
    ) -> Result<RouteResponse> {
        self.activate(index, mode, hold_ms, false)
    }

    fn activate(
        &self,
        index: DeviceIndex,
        mode: RouteMode,
        hold_ms: Option<u64>,
        dry_run: bool,
    ) -> Result<RouteResponse> {
        let mask: Mask = self.bus.layout().one_hot(index)?;
        let hold = hold_ms.map_or(self.default_hold, Duration::from_millis);

        if dry_run {
            log::info!("dry run: index {index} mask {mask}");
        } else {
            self.bus.set_mask(mask)?;
            match mode {
                RouteMode::Timed => self.auto_off.schedule_off(hold),
                RouteMode::Sticky => self.auto_off.cancel(),
            }
            log::info!("lit index {index} ({mode})");
        }

        Ok(RouteResponse {
            ok: true,
            device_id: index,
            mask_hex: mask.hex(),
            mode,
            hold_ms: hold.as_millis() as u64,
        })
    }

    /// Cancel any pending auto-off and turn everything off.
    pub fn off(&self) -> bus::Result<()> {
        self.auto_off.cancel();
        self.bus.all_off()
    }

    /// Run the self-test sweep. Cancels any pending auto-off first.
    pub fn test_sweep(&self, count: usize, step: Duration, running: &AtomicBool) -> Result<usize> {
        self.auto_off.cancel();
        sweep::self_test_sweep(&self.bus, count, step, running)
    }
}
