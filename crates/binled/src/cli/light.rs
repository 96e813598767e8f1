//! `light` / `index` / `off` subcommands — one activation per process.
//!
//! The bus is opened for this process only. A timed activation keeps the
//! process alive until the auto-off fires; Ctrl+C turns everything off early.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::{
    Controller, DeviceIndex, OffOutput, RUNNING, Result, RouteMode, RouteRequest, load_config,
    print_json, print_response,
};

const POLL: Duration = Duration::from_millis(50);

fn open_controller(config_path: Option<&Path>) -> Result<Controller> {
    Controller::from_config(&load_config(config_path))
}

pub(super) fn cmd_light(req: RouteRequest, config_path: Option<&Path>, json: bool) -> Result<()> {
    let ctl = open_controller(config_path)?;
    let resp = ctl.route(&req)?;
    print_response(&resp, json)?;
    if req.dry_run {
        return Ok(());
    }
    wait_for_auto_off(&ctl, resp.mode)
}

pub(super) fn cmd_index(
    index: DeviceIndex,
    mode: RouteMode,
    hold_ms: Option<u64>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let ctl = open_controller(config_path)?;
    let resp = ctl.light_index(index, mode, hold_ms)?;
    print_response(&resp, json)?;
    wait_for_auto_off(&ctl, resp.mode)
}

pub(super) fn cmd_off(config_path: Option<&Path>, json: bool) -> Result<()> {
    let ctl = open_controller(config_path)?;
    ctl.off()?;
    if json {
        return print_json(&OffOutput { ok: true });
    }
    println!("All LEDs off");
    Ok(())
}

/// Block until the pending auto-off has fired, or Ctrl+C.
///
/// Sticky activations return immediately; the shift registers hold the
/// pattern after the process exits.
fn wait_for_auto_off(ctl: &Controller, mode: RouteMode) -> Result<()> {
    if mode == RouteMode::Sticky {
        return Ok(());
    }
    while RUNNING.load(Ordering::SeqCst) && ctl.auto_off().pending().is_some() {
        std::thread::sleep(POLL);
    }
    if !RUNNING.load(Ordering::SeqCst) {
        log::info!("interrupted, turning LEDs off");
        ctl.off()?;
    }
    Ok(())
}
