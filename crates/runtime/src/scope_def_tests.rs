// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn defaults_to_not_required() {
    let def = ScopeDef::new("tenant");
    assert!(!def.required);
}

#[test]
fn required_sets_the_flag() {
    let def = ScopeDef::new("tenant").required(true);
    assert!(def.required);
    assert_eq!(def.kind, "tenant");
}
