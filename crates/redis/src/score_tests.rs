// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn higher_priority_sorts_first() {
    let high = waiting_score(10, 1_700_000_000_000);
    let low = waiting_score(0, 1_700_000_000_000);
    assert!(high < low, "higher priority must produce a lower (earlier) score");
}

#[test]
fn equal_priority_orders_by_creation_time() {
    let earlier = waiting_score(5, 1_700_000_000_000);
    let later = waiting_score(5, 1_700_000_000_500);
    assert!(earlier < later);
}

#[test]
fn priority_dominates_creation_time_within_the_documented_bound() {
    // A priority-10 job created a full day later must still sort before a
    // priority-0 job, as long as priority stays within +/-100000.
    let high_priority_later = waiting_score(10, 1_700_086_400_000);
    let low_priority_earlier = waiting_score(0, 1_700_000_000_000);
    assert!(high_priority_later < low_priority_earlier);
}
