// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fixed_is_constant() {
    let p = BackoffPolicy::Fixed { delay_ms: 250 };
    assert_eq!(p.delay_ms(1), 250);
    assert_eq!(p.delay_ms(5), 250);
}

#[test]
fn exponential_grows_and_caps() {
    let p = BackoffPolicy::Exponential { base_ms: 100, factor: 2.0, max_ms: 1000 };
    assert_eq!(p.delay_ms(1), 100);
    assert_eq!(p.delay_ms(2), 200);
    assert_eq!(p.delay_ms(3), 400);
    assert_eq!(p.delay_ms(10), 1000);
}
