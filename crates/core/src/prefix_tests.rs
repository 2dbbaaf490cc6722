// SPDX-License-Identifier: MIT

use super::*;
use crate::scope::Scope;

#[test]
fn queue_name_has_exactly_two_colons_beyond_base() {
    let name = queue_name("email");
    let extra = name.trim_start_matches(BASE_PREFIX);
    assert_eq!(extra.matches(':').count(), 1);
    assert_eq!(name, "igniter:jobs:email");
}

#[test]
fn events_channel_has_no_scope_suffix() {
    let ch = events_channel("prod", "api");
    assert!(!ch.contains(":scope:"));
    assert_eq!(ch, "igniter:jobs:events:prod:api");
}

#[test]
fn scoped_channel_ends_in_scope_suffix() {
    let scope = Scope::new("organization", "org_1");
    let ch = scoped_events_channel("prod", "api", &scope);
    assert!(ch.ends_with(":scope:organization:org_1"));
}

#[test]
fn channel_for_selects_scoped_variant_iff_scope_present() {
    let scope = Scope::new("organization", "org_1");
    assert!(channel_for("prod", "api", None).matches(":scope:").count() == 0);
    assert!(channel_for("prod", "api", Some(&scope)).contains(":scope:"));
}
