// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn admits_up_to_max_within_window() {
    let limiter = FixedWindowLimiter::new(2, 1000);
    let mut state = LimiterState::default();
    assert!(limiter.try_acquire(0, &mut state));
    assert!(limiter.try_acquire(100, &mut state));
    assert!(!limiter.try_acquire(200, &mut state));
}

#[test]
fn resets_once_window_elapses() {
    let limiter = FixedWindowLimiter::new(1, 1000);
    let mut state = LimiterState::default();
    assert!(limiter.try_acquire(0, &mut state));
    assert!(!limiter.try_acquire(500, &mut state));
    assert!(limiter.try_acquire(1000, &mut state));
}
