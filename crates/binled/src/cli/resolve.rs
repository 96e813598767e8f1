//! `resolve` subcommand — bin address to device index, no hardware.

use std::path::Path;

use super::{BinAddress, Result, ResolveOutput, kv, kv_width, load_config, print_json};

pub(super) fn cmd_resolve(
    category: &str,
    store: &str,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path);
    let addr = BinAddress::parse(category, store)?;
    let index = addr.index();
    let mask = config.layout().one_hot(index)?;
    let (category, store) = addr.labels();

    if json {
        return print_json(&ResolveOutput {
            category: category.into(),
            store: store.into(),
            device_id: index,
            mask_hex: mask.hex(),
        });
    }

    let w = kv_width(&["Category:", "Store:", "Index:", "Mask:"], &[]);
    kv("Category:", category, w);
    kv("Store:", store, w);
    kv("Index:", index, w);
    kv("Mask:", mask, w);
    Ok(())
}
