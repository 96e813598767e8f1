//! Self-test sweep — light each LED in turn to check wiring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::bus::LedBus;
use crate::error::{BinledError, Result};

/// Light indices `0..count` one at a time, `step` apart, then turn everything off.
///
/// Blocks for roughly `count * step`. Clearing `running` stops the sweep
/// early; the final all-off is written either way. Returns how many LEDs
/// were lit.
pub fn self_test_sweep(
    bus: &LedBus,
    count: usize,
    step: Duration,
    running: &AtomicBool,
) -> Result<usize> {
    let led_count = bus.layout().led_count;
    if count > led_count {
        return Err(BinledError::IndexOutOfRange {
            index: (count - 1) as u64,
            led_count,
        });
    }

    let mut lit = 0;
    for index in 0..count {
        if !running.load(Ordering::SeqCst) {
            log::info!("sweep: stopped after {lit} of {count}");
            break;
        }
        if let Err(e) = bus.light(index) {
            // Best effort: don't leave a half-finished sweep lit.
            let _ = bus.all_off();
            return Err(e);
        }
        lit += 1;
        std::thread::sleep(step);
    }
    bus.all_off()?;
    Ok(lit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockTransport;
    use crate::mask::{FrameLayout, Mask};

    fn mock_bus() -> (LedBus, MockTransport) {
        let mock = MockTransport::new();
        (
            LedBus::new(Box::new(mock.clone()), FrameLayout::default()),
            mock,
        )
    }

    #[test]
    fn sweep_lights_each_index_in_order_then_off() {
        let (bus, mock) = mock_bus();
        let running = AtomicBool::new(true);
        let lit = self_test_sweep(&bus, 25, Duration::from_millis(2), &running).unwrap();
        assert_eq!(lit, 25);

        let layout = FrameLayout::default();
        let masks: Vec<Mask> = mock
            .written()
            .iter()
            .map(|f| layout.decode(f).unwrap())
            .collect();
        assert_eq!(masks.len(), 26);
        for (i, m) in masks[..25].iter().enumerate() {
            assert_eq!(*m, Mask::from_bits(1 << i));
        }
        assert!(masks[25].is_off());
    }

    #[test]
    fn sweep_steps_are_spaced() {
        let (bus, mock) = mock_bus();
        let running = AtomicBool::new(true);
        self_test_sweep(&bus, 4, Duration::from_millis(30), &running).unwrap();
        let stamps = mock.timestamps();
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(30));
        }
    }

    #[test]
    fn sweep_count_past_array_is_rejected() {
        let (bus, mock) = mock_bus();
        let running = AtomicBool::new(true);
        let err = self_test_sweep(&bus, 26, Duration::ZERO, &running).unwrap_err();
        assert!(err.is_out_of_range());
        assert!(mock.written().is_empty());
    }

    #[test]
    fn stopped_sweep_still_turns_off() {
        let (bus, mock) = mock_bus();
        let running = AtomicBool::new(false);
        let lit = self_test_sweep(&bus, 25, Duration::ZERO, &running).unwrap();
        assert_eq!(lit, 0);
        assert_eq!(mock.written(), vec![vec![0, 0, 0, 0]]);
    }

    #[test]
    fn zero_count_is_just_all_off() {
        let (bus, mock) = mock_bus();
        let running = AtomicBool::new(true);
        assert_eq!(self_test_sweep(&bus, 0, Duration::ZERO, &running).unwrap(), 0);
        assert_eq!(mock.written().len(), 1);
    }
}
