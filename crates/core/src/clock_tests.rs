// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_millis(500));
    assert_eq!(clock.now(), t0 + chrono::Duration::milliseconds(500));
}

#[test]
fn fake_clock_set_is_absolute() {
    let clock = FakeClock::new();
    let target = Utc::now() + chrono::Duration::days(1);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn epoch_ms_matches_now() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms(), clock.now().timestamp_millis() as u64);
}
