//! `frame` subcommand — show the encoded bus frame for an index or mask.

use std::path::Path;

use super::{
    BinledError, DeviceIndex, FrameOutput, Mask, Result, kv, kv_width, load_config, print_json,
};

/// Parse a hex mask with or without a `0x` prefix.
fn parse_mask(text: &str) -> Result<Mask> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u64::from_str_radix(digits, 16)
        .map(Mask::from_bits)
        .map_err(|e| BinledError::Frame(format!("invalid mask {text:?}: {e}")))
}

pub(super) fn cmd_frame(
    index: Option<DeviceIndex>,
    mask: Option<&str>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let layout = load_config(config_path).layout();
    let mask = match (index, mask) {
        (_, Some(text)) => parse_mask(text)?,
        (Some(i), None) => layout.one_hot(i)?,
        (None, None) => Mask::OFF,
    };
    let frame = layout.encode(mask)?;

    if json {
        return print_json(&FrameOutput {
            mask_hex: mask.hex(),
            led_count: layout.led_count,
            invert: layout.invert,
            byte_order: layout.byte_order.to_string(),
            bytes: frame.bytes().to_vec(),
            hex: frame.to_hex(),
        });
    }

    let w = kv_width(&["Mask:", "Layout:", "Frame:"], &[]);
    kv("Mask:", mask, w);
    kv(
        "Layout:",
        format_args!(
            "{} LEDs, {}{}",
            layout.led_count,
            layout.byte_order,
            if layout.invert { ", inverted" } else { "" }
        ),
        w,
    );
    kv("Frame:", frame.to_hex(), w);
    Ok(())
}
