//! Bus-level behaviour: which control lines appear on which T-state.

mod common;

use common::Bench;
use emu_core::Pins;

const FETCH: u64 = Pins::M1 | Pins::MREQ | Pins::RD;

#[test]
fn nop_fetches_on_first_tick_only() {
    let mut bench = Bench::new(&[0x00, 0x00]);
    let fetches: Vec<bool> = (0..8).map(|_| bench.tick().is_set(FETCH)).collect();
    assert_eq!(fetches, [true, false, false, false, true, false, false, false]);
    assert_eq!(bench.cpu.regs().pc, 0x0002);
}

#[test]
fn res_restarts_fetch_at_zero() {
    // LD A,0x42; JP 0x1234
    let mut bench = Bench::new(&[0x3E, 0x42, 0xC3, 0x34, 0x12]);
    bench.run(2);
    assert_eq!(bench.cpu.regs().a, 0x42);
    assert_eq!(bench.cpu.regs().pc, 0x1234);

    bench.pins = bench.pins.with_control(Pins::RES, true);
    let held = bench.tick();
    assert!(!held.is_set(Pins::M1));
    assert!(!held.is_set(Pins::MREQ));

    bench.pins = bench.pins.without(Pins::RES);
    let first = bench.tick();
    assert!(first.is_set(FETCH));
    assert_eq!(first.address(), 0x0000);
    assert_eq!(bench.cpu.regs().a, 0xFF);
}
