//! Integration tests: bin requests through the controller down to the wire.
//!
//! These drive the public API end to end with the in-memory transports and
//! check what actually reaches the bus, and when.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use binled_lib::bus::mock::{MockPin, MockSpi, MockTransport, WireEvent, WireLog};
use binled_lib::bus::{FrameTransport, LedBus, ShiftChain};
use binled_lib::grid::{BinAddress, OVERFLOW_INDEX, resolve_address};
use binled_lib::mask::{ByteOrder, FrameLayout, Mask};
use binled_lib::service::{Controller, RouteMode, RouteRequest};

fn mock_controller(layout: FrameLayout, hold: Duration) -> (Controller, MockTransport) {
    let mock = MockTransport::new();
    let bus = Arc::new(LedBus::new(Box::new(mock.clone()), layout));
    (Controller::new(bus, hold).unwrap(), mock)
}

// ── Addressing ──

#[test]
fn every_grid_bin_has_a_distinct_index() {
    let mut seen = vec![false; 25];
    for addr in BinAddress::all() {
        let idx = addr.index();
        assert!(!seen[idx], "index {idx} assigned twice");
        seen[idx] = true;
        let (category, store) = addr.labels();
        assert_eq!(resolve_address(category, store).unwrap(), idx);
    }
    assert!(seen.iter().all(|&s| s));
    assert_eq!(
        resolve_address("BACKSTOCK", "SOUTH GR").unwrap(),
        OVERFLOW_INDEX
    );
}

// ── Timed activations ──

#[test]
fn second_request_supersedes_first_auto_off() {
    // Scaled-down version of: light at t=0 with hold 1000, light again at
    // t=500 with hold 1000, expect exactly one off near t=1500.
    let (ctl, mock) = mock_controller(FrameLayout::default(), Duration::from_millis(200));
    let start = Instant::now();

    ctl.route(&RouteRequest::new("Drinks", "Wyoming")).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    ctl.route(&RouteRequest::new("Pantry & Breakfast", "South GR"))
        .unwrap();

    // Past the first deadline: only the two activations are on the wire.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(mock.written().len(), 2);

    std::thread::sleep(Duration::from_millis(300));
    let frames = mock.written();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2], vec![0, 0, 0, 0]);
    assert_eq!(ctl.auto_off().fired(), 1);

    let stamps = mock.timestamps();
    assert!(stamps[2].duration_since(start) >= Duration::from_millis(300));
}

#[test]
fn sticky_request_outlives_earlier_timer() {
    let (ctl, mock) = mock_controller(FrameLayout::default(), Duration::from_millis(50));
    ctl.route(&RouteRequest::new("Drinks", "Wyoming")).unwrap();
    let sticky = RouteRequest {
        mode: RouteMode::Sticky,
        ..RouteRequest::new("HBA & Household", "Muskegon")
    };
    ctl.route(&sticky).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(mock.written().len(), 2);
    assert_eq!(ctl.bus().current_mask(), Mask::from_bits(1 << 7));
}

// ── Wire format ──

#[test]
fn inverted_lsb_first_frame_reaches_wire() {
    let layout = FrameLayout::new(25, true, ByteOrder::LsbFirst);
    let (ctl, mock) = mock_controller(layout, Duration::from_secs(60));
    ctl.light_index(20, RouteMode::Sticky, None).unwrap();
    // Logical 0x00100000 inverted over 25 bits, low byte first.
    assert_eq!(mock.written(), vec![vec![0xFF, 0xFF, 0xEF, 0x01]]);
}

#[test]
fn latch_wraps_spi_transfer() {
    let log: WireLog = Default::default();
    let mut chain = ShiftChain::with_latch(
        MockSpi::new(log.clone()),
        MockPin::new(7, log.clone()),
        "mock",
    );
    let frame = FrameLayout::default().encode(Mask::from_bits(1 << 24)).unwrap();
    chain.transmit(frame.bytes()).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            WireEvent::Pin(7, false),
            WireEvent::Write(vec![0x01, 0x00, 0x00, 0x00]),
            WireEvent::Flush,
            WireEvent::Pin(7, true),
        ]
    );
}

#[test]
fn latch_released_when_spi_write_fails() {
    let log: WireLog = Default::default();
    let spi = MockSpi::new(log.clone());
    spi.fail_writes.store(true, Ordering::SeqCst);
    let mut chain = ShiftChain::with_latch(spi, MockPin::new(7, log.clone()), "mock");
    assert!(chain.transmit(&[0, 0, 0, 0]).is_err());
    assert_eq!(
        log.lock().unwrap().last(),
        Some(&WireEvent::Pin(7, true))
    );
}

// ── Self-test ──

#[test]
fn sweep_cancels_pending_auto_off_and_walks_all_leds() {
    let (ctl, mock) = mock_controller(FrameLayout::default(), Duration::from_millis(30));
    ctl.route(&RouteRequest::new("Drinks", "Wyoming")).unwrap();
    let running = AtomicBool::new(true);
    let lit = ctl
        .test_sweep(25, Duration::from_millis(5), &running)
        .unwrap();
    assert_eq!(lit, 25);
    assert_eq!(ctl.auto_off().fired(), 0);

    let layout = FrameLayout::default();
    let lit_order: Vec<usize> = mock.written()[1..26]
        .iter()
        .map(|f| layout.decode(f).unwrap().highest_bit().unwrap() as usize)
        .collect();
    assert_eq!(lit_order, (0..25).collect::<Vec<_>>());
    assert!(ctl.bus().current_mask().is_off());
}
