// SPDX-License-Identifier: MIT

use super::*;

fn handler() -> UserJobHandler<()> {
    Arc::new(|_ctx, _app, input| Box::pin(async move { Ok(input) }))
}

#[test]
fn apply_defaults_only_fills_unset_fields() {
    let defaults = QueueDefaults { attempts: Some(5), priority: Some(10), ..QueueDefaults::default() };
    let mut spec = JobSpec::new("sendWelcome", handler()).priority(2);
    spec.apply_defaults(&defaults);
    assert_eq!(spec.attempts, Some(5));
    assert_eq!(spec.priority, Some(2));
}

#[test]
fn validate_cron_expr_accepts_six_field_expression() {
    assert!(validate_cron_expr("0 0 9 * * *").is_ok());
}

#[test]
fn validate_cron_expr_rejects_garbage() {
    assert!(validate_cron_expr("not a cron").is_err());
}
