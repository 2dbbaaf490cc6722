// SPDX-License-Identifier: MIT

//! Compiled Lua scripts, grouped so the backend loads each exactly once
//! (spec §4.5: claim/complete/fail/retry must each be a single atomic
//! round trip to Redis).

use redis::Script;

#[derive(Clone)]
pub struct Scripts {
    pub claim: Script,
    pub complete: Script,
    pub fail: Script,
    pub retry: Script,
    pub retry_all: Script,
    pub promote_delayed: Script,
    pub pause_queue: Script,
    pub resume_queue: Script,
    pub drain_queue: Script,
    pub remove_ids: Script,
    pub limiter_try_acquire: Script,
}

impl Default for Scripts {
    fn default() -> Self {
        Self {
            claim: Script::new(include_str!("../lua/claim.lua")),
            complete: Script::new(include_str!("../lua/complete.lua")),
            fail: Script::new(include_str!("../lua/fail.lua")),
            retry: Script::new(include_str!("../lua/retry.lua")),
            retry_all: Script::new(include_str!("../lua/retry_all.lua")),
            promote_delayed: Script::new(include_str!("../lua/promote_delayed.lua")),
            pause_queue: Script::new(include_str!("../lua/pause_queue.lua")),
            resume_queue: Script::new(include_str!("../lua/resume_queue.lua")),
            drain_queue: Script::new(include_str!("../lua/drain_queue.lua")),
            remove_ids: Script::new(include_str!("../lua/remove_ids.lua")),
            limiter_try_acquire: Script::new(include_str!("../lua/limiter_try_acquire.lua")),
        }
    }
}
