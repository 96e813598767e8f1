//! CLI subcommands — address lookup, frame inspection, LED control.

mod config_cmd;
mod frame;
mod grid;
mod light;
mod listen;
mod resolve;
mod test_cmd;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use binled_lib::config::Config;
pub(super) use binled_lib::error::{BinledError, Result};
pub(super) use binled_lib::grid::{BinAddress, DeviceIndex};
pub(super) use binled_lib::mask::Mask;
pub(super) use binled_lib::service::{Controller, RouteMode, RouteRequest, RouteResponse};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// At least PADDING spaces follow the longest key at either level, and
/// indented values line up with top-level ones.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w.saturating_sub(2));
}

/// Pretty-print a JSON value to stdout.
pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BinledError::Io(std::io::Error::other(e)))?;
    println!("{text}");
    Ok(())
}

/// Load config from `custom_path` (or the default path), logging parse warnings.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// Print an activation result, as JSON or one line of text.
pub(super) fn print_response(resp: &RouteResponse, json: bool) -> Result<()> {
    if json {
        return print_json(resp);
    }
    match resp.mode {
        RouteMode::Timed => println!(
            "LED {} on (mask 0x{}), off in {} ms",
            resp.device_id, resp.mask_hex, resp.hold_ms
        ),
        RouteMode::Sticky => println!(
            "LED {} on (mask 0x{}), sticky",
            resp.device_id, resp.mask_hex
        ),
    }
    Ok(())
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ResolveOutput {
    pub category: String,
    pub store: String,
    #[serde(rename = "deviceId")]
    pub device_id: DeviceIndex,
    #[serde(rename = "maskHex")]
    pub mask_hex: String,
}

#[derive(Serialize)]
pub(super) struct FrameOutput {
    #[serde(rename = "maskHex")]
    pub mask_hex: String,
    pub led_count: usize,
    pub invert: bool,
    pub byte_order: String,
    pub bytes: Vec<u8>,
    pub hex: String,
}

#[derive(Serialize)]
pub(super) struct GridEntryJson {
    #[serde(rename = "deviceId")]
    pub device_id: DeviceIndex,
    pub category: String,
    pub store: String,
}

#[derive(Serialize)]
pub(super) struct GridOutput {
    pub count: usize,
    pub bins: Vec<GridEntryJson>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigInitOutput {
    pub ok: bool,
    pub config_file: String,
    pub bytes: usize,
}

#[derive(Serialize)]
pub(super) struct OffOutput {
    pub ok: bool,
}

#[derive(Serialize)]
pub(super) struct TestOutput {
    pub ok: bool,
    pub count: usize,
    pub lit: usize,
    pub step_ms: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a bin to its device index and mask (no hardware)
    Resolve {
        /// Product category, e.g. "Drinks"
        category: String,
        /// Store name, e.g. "Wyoming"
        store: String,
    },

    /// Show the bytes that would be shifted out for an index or mask (no hardware)
    Frame {
        /// Device index to light
        #[arg(required_unless_present = "mask", conflicts_with = "mask")]
        index: Option<DeviceIndex>,
        /// Raw logical mask in hex, e.g. 00100000 or 0x1F
        #[arg(long)]
        mask: Option<String>,
    },

    /// Light the bin for a category and store
    Light {
        category: String,
        store: String,
        /// Stay lit until the next request or `off`
        #[arg(long)]
        sticky: bool,
        /// Auto-off delay in milliseconds (default: hold_ms from config)
        #[arg(long)]
        hold_ms: Option<u64>,
        /// Resolve and report without touching the hardware
        #[arg(long)]
        dry_run: bool,
    },

    /// Light a raw device index
    Index {
        index: DeviceIndex,
        /// Stay lit until the next request or `off`
        #[arg(long)]
        sticky: bool,
        /// Auto-off delay in milliseconds (default: hold_ms from config)
        #[arg(long)]
        hold_ms: Option<u64>,
    },

    /// Turn every LED off
    Off,

    /// Light each LED in turn to check wiring
    Test {
        /// Number of LEDs to sweep (default: led_count from config)
        #[arg(long)]
        count: Option<usize>,
        /// Delay between LEDs in milliseconds (default: sweep_step_ms from config)
        #[arg(long)]
        step_ms: Option<u64>,
    },

    /// Read commands from stdin, one per line, and keep the bus open
    Listen,

    /// Show current configuration and file path
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
        /// With --init, replace an existing file
        #[arg(long, requires = "init")]
        force: bool,
    },

    /// List every bin with its device index
    Grid,
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

fn mode_for(sticky: bool) -> RouteMode {
    if sticky {
        RouteMode::Sticky
    } else {
        RouteMode::Timed
    }
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Resolve { category, store } => {
            resolve::cmd_resolve(&category, &store, config_path, json)
        }
        Command::Frame { index, mask } => frame::cmd_frame(index, mask.as_deref(), config_path, json),
        Command::Light {
            category,
            store,
            sticky,
            hold_ms,
            dry_run,
        } => {
            let req = RouteRequest {
                mode: mode_for(sticky),
                hold_ms,
                dry_run,
                ..RouteRequest::new(category, store)
            };
            light::cmd_light(req, config_path, json)
        }
        Command::Index {
            index,
            sticky,
            hold_ms,
        } => light::cmd_index(index, mode_for(sticky), hold_ms, config_path, json),
        Command::Off => light::cmd_off(config_path, json),
        Command::Test { count, step_ms } => test_cmd::cmd_test(count, step_ms, config_path, json),
        Command::Listen => {
            if json {
                warn_json_unsupported("listen");
            }
            listen::cmd_listen(config_path)
        }
        Command::Config { init: false, .. } => config_cmd::cmd_config(json, config_path),
        Command::Config { init: true, force } => {
            config_cmd::cmd_config_init(force, json, config_path)
        }
        Command::Grid => grid::cmd_grid(json),
    }
}
