// SPDX-License-Identifier: MIT

//! On-wire shape stored in each queue's `:data` hash: a [`JobRecord`] plus
//! the precomputed claim-ordering score, so the Lua scripts never need to
//! recompute it (spec §4.6 "Selection policy", encoding in
//! [`crate::score`]).

use jobs_core::JobRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(flatten)]
    pub record: JobRecord,
    pub waiting_score: f64,
}
