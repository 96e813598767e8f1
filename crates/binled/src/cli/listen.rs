//! `listen` subcommand — long-running control loop fed line by line from stdin.
//!
//! Commands, one per line:
//!
//! ```text
//! light <category>|<store>    timed activation (hold_ms from config)
//! sticky <category>|<store>   stays lit until the next activation or `off`
//! index <n>                   timed activation of a raw device index
//! off                         cancel the timer and turn everything off
//! test                        self-test sweep
//! quit                        turn everything off and exit
//! ```
//!
//! Every command gets one compact JSON reply on stdout. At end of input the
//! loop waits for a pending auto-off before exiting.

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use serde::Serialize;

use super::{
    Controller, DeviceIndex, OffOutput, RUNNING, Result, RouteMode, RouteRequest, TestOutput,
    load_config,
};

const POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenCommand {
    Route {
        category: String,
        store: String,
        mode: RouteMode,
    },
    Index(DeviceIndex),
    Off,
    Test,
    Quit,
}

#[derive(Serialize)]
struct ErrorReply {
    ok: bool,
    error: String,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<std::result::Result<ListenCommand, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(v, r)| (v, r.trim()));

    let route = |mode| match rest.split_once('|') {
        Some((category, store)) if !category.trim().is_empty() && !store.trim().is_empty() => {
            Ok(ListenCommand::Route {
                category: category.trim().to_string(),
                store: store.trim().to_string(),
                mode,
            })
        }
        _ => Err(format!("usage: {verb} <category>|<store>")),
    };

    let parsed = match verb.to_ascii_lowercase().as_str() {
        "light" => route(RouteMode::Timed),
        "sticky" => route(RouteMode::Sticky),
        "index" => rest
            .parse()
            .map(ListenCommand::Index)
            .map_err(|_| format!("usage: index <n>, got {rest:?}")),
        "off" => Ok(ListenCommand::Off),
        "test" => Ok(ListenCommand::Test),
        "quit" | "exit" => Ok(ListenCommand::Quit),
        other => Err(format!("unknown command: {other}")),
    };
    Some(parsed)
}

fn reply(value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(text) => println!("{text}"),
        Err(e) => log::warn!("could not encode reply: {e}"),
    }
}

fn reply_error(error: impl ToString) {
    reply(&ErrorReply {
        ok: false,
        error: error.to_string(),
    });
}

/// Run one command. Returns `false` when the loop should stop.
fn dispatch(ctl: &Controller, cmd: ListenCommand, sweep_step: Duration) -> bool {
    match cmd {
        ListenCommand::Route {
            category,
            store,
            mode,
        } => {
            let req = RouteRequest {
                mode,
                ..RouteRequest::new(category, store)
            };
            match ctl.route(&req) {
                Ok(resp) => reply(&resp),
                Err(e) => reply_error(e),
            }
        }
        ListenCommand::Index(index) => match ctl.light_index(index, RouteMode::Timed, None) {
            Ok(resp) => reply(&resp),
            Err(e) => reply_error(e),
        },
        ListenCommand::Off => match ctl.off() {
            Ok(()) => reply(&OffOutput { ok: true }),
            Err(e) => reply_error(e),
        },
        ListenCommand::Test => {
            let count = ctl.bus().layout().led_count;
            match ctl.test_sweep(count, sweep_step, &RUNNING) {
                Ok(lit) => reply(&TestOutput {
                    ok: true,
                    count,
                    lit,
                    step_ms: sweep_step.as_millis() as u64,
                }),
                Err(e) => reply_error(e),
            }
        }
        ListenCommand::Quit => return false,
    }
    true
}

pub(super) fn cmd_listen(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let sweep_step = Duration::from_millis(config.sweep_step_ms);
    let ctl = Controller::from_config(&config)?;
    eprintln!(
        "Listening on stdin ({}); Ctrl+C or `quit` to stop",
        ctl.bus().describe()
    );

    let (tx, rx) = mpsc::channel::<String>();
    std::thread::Builder::new()
        .name("binled-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    let mut eof = false;
    while RUNNING.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL) {
            Ok(line) => match parse_line(&line) {
                Some(Ok(cmd)) => {
                    if !dispatch(&ctl, cmd, sweep_step) {
                        break;
                    }
                }
                Some(Err(msg)) => reply_error(msg),
                None => {}
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                eof = true;
                break;
            }
        }
    }

    if eof {
        log::debug!("end of input, waiting for pending auto-off");
        while RUNNING.load(Ordering::SeqCst) && ctl.auto_off().pending().is_some() {
            std::thread::sleep(Duration::from_millis(50));
        }
        if !RUNNING.load(Ordering::SeqCst) {
            ctl.off()?;
        }
    } else {
        ctl.off()?;
    }
    Ok(())
}
