// SPDX-License-Identifier: MIT

use super::*;

fn noop_handler() -> JobHandler {
    Arc::new(|_ctx, input| Box::pin(async move { Ok(input) }))
}

#[test]
fn builder_chain_sets_fields() {
    let def = JobDefinition::new("sendWelcome", noop_handler())
        .attempts(5)
        .priority(10)
        .delay_ms(1000)
        .remove_on_complete(true)
        .remove_on_fail(3u32);

    assert_eq!(def.attempts, 5);
    assert_eq!(def.priority, 10);
    assert_eq!(def.delay_ms, 1000);
    assert_eq!(def.remove_on_complete, RemovePolicy::Always);
    assert_eq!(def.remove_on_fail, RemovePolicy::KeepLast(3));
}

#[test]
fn remove_policy_defaults_to_keep() {
    let def = JobDefinition::new("x", noop_handler());
    assert_eq!(def.remove_on_complete, RemovePolicy::Keep);
}

#[test]
fn cron_definition_accumulates_filters() {
    let cron = CronDefinition::new("nightly", "0 9 * * *", Arc::new(|_ctx| Box::pin(async { Ok(()) })))
        .max_executions(10)
        .filters(CronFilters { skip_weekends: true, ..Default::default() });
    assert_eq!(cron.max_executions, Some(10));
    assert!(cron.filters.skip_weekends);
}
