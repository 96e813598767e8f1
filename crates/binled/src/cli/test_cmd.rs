//! `test` subcommand — self-test sweep across the array.

use std::path::Path;
use std::time::Duration;

use super::{Controller, RUNNING, Result, TestOutput, load_config, print_json};

pub(super) fn cmd_test(
    count: Option<usize>,
    step_ms: Option<u64>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path);
    let count = count.unwrap_or(config.led_count);
    let step_ms = step_ms.unwrap_or(config.sweep_step_ms);
    let ctl = Controller::from_config(&config)?;

    if !json {
        println!(
            "Sweeping {count} LED{} on {}, {step_ms} ms each (Ctrl+C to stop)",
            if count == 1 { "" } else { "s" },
            ctl.bus().describe()
        );
    }

    let lit = ctl.test_sweep(count, Duration::from_millis(step_ms), &RUNNING)?;

    if json {
        return print_json(&TestOutput {
            ok: true,
            count,
            lit,
            step_ms,
        });
    }
    if lit < count {
        println!("Stopped after {lit} of {count}; all off");
    } else {
        println!("Done; all off");
    }
    Ok(())
}
