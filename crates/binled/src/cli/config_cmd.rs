//! `config` subcommand — show effective configuration and file path, or
//! write it out with `--init`.

use std::path::Path;

use super::{
    BinledError, Config, ConfigInitOutput, ConfigOutput, Result, kv, kv_indent, kv_width,
    print_json,
};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => vec![],
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };
    let warnings: Vec<String> = config.grid_warning().into_iter().collect();

    if json {
        return print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            problems,
            warnings,
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "led_count:",
            "invert:",
            "byte_order:",
            "transport:",
            "spi_device:",
            "latch_gpio:",
            "gpio_lines:",
            "hold_ms:",
            "sweep_step_ms:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("led_count:", config.led_count, w);
    kv_indent("invert:", config.invert, w);
    kv_indent("byte_order:", config.byte_order, w);
    kv_indent("transport:", config.transport, w);
    kv_indent("spi_device:", &config.spi_device, w);
    match config.latch_gpio {
        Some(n) => kv_indent("latch_gpio:", n, w),
        None => kv_indent("latch_gpio:", "(none, latch on chip-select)", w),
    }
    if config.gpio_lines.is_empty() {
        kv_indent("gpio_lines:", "(none)", w);
    } else {
        let lines: Vec<String> = config.gpio_lines.iter().map(u32::to_string).collect();
        kv_indent("gpio_lines:", lines.join(", "), w);
    }
    kv_indent("hold_ms:", config.hold_ms, w);
    kv_indent("sweep_step_ms:", config.sweep_step_ms, w);

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &warnings {
            println!("  {w}");
        }
    }
    Ok(())
}

/// Write the effective config (file contents or defaults) to the config path.
///
/// Refuses to replace an existing file unless `force` is set, and never
/// writes a config that fails validation.
pub(super) fn cmd_config_init(force: bool, json: bool, custom_path: Option<&Path>) -> Result<()> {
    let path = custom_path
        .map(Path::to_path_buf)
        .or_else(Config::path)
        .ok_or_else(|| BinledError::Config("no config directory on this platform".into()))?;
    if path.exists() && !force {
        return Err(BinledError::Config(format!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        )));
    }

    let config = super::load_config(Some(&path));
    config.check()?;
    let bytes = config.save_to(&path)?;
    log::info!("wrote {} ({bytes} bytes)", path.display());

    if json {
        return print_json(&ConfigInitOutput {
            ok: true,
            config_file: path.display().to_string(),
            bytes,
        });
    }
    println!("Wrote {}", path.display());
    Ok(())
}
