//! `grid` subcommand — the category × store table.

use binled_lib::grid::{Category, OVERFLOW_CATEGORY, OVERFLOW_INDEX, OVERFLOW_STORE, Store};

use super::{BinAddress, GridEntryJson, GridOutput, Result, print_json};

pub(super) fn cmd_grid(json: bool) -> Result<()> {
    let bins = BinAddress::all();

    if json {
        let bins: Vec<GridEntryJson> = bins
            .iter()
            .map(|b| {
                let (category, store) = b.labels();
                GridEntryJson {
                    device_id: b.index(),
                    category: category.into(),
                    store: store.into(),
                }
            })
            .collect();
        return print_json(&GridOutput {
            count: bins.len(),
            bins,
        });
    }

    let cat_w = Category::ALL
        .iter()
        .map(|c| c.label().len())
        .max()
        .unwrap_or(0)
        + 2;
    let col_w = Store::ALL
        .iter()
        .map(|s| s.label().len())
        .max()
        .unwrap_or(0)
        + 2;

    print!("{:<cat_w$}", "");
    for store in Store::ALL {
        print!("{:>col_w$}", store.label());
    }
    println!();
    for category in Category::ALL {
        print!("{:<cat_w$}", category.label());
        for store in Store::ALL {
            let index = BinAddress::Grid { category, store }.index();
            print!("{index:>col_w$}");
        }
        println!();
    }
    println!();
    println!(
        "{} / {} -> {}",
        OVERFLOW_CATEGORY,
        OVERFLOW_STORE,
        OVERFLOW_INDEX
    );
    Ok(())
}
