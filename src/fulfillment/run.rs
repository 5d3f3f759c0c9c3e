//! Per-call state for one fulfillment pass.
//!
//! A [`FulfillmentRun`] is created at the start of a preview or confirm and dropped at
//! the end. It owns the class lookups, the future-session list per class, and the set
//! of session ids already handed out in this pass, so two order lines never receive
//! the same slot.

use crate::{
    core::class::get_class_by_id,
    entities::{class, session},
    errors::{Error, Result},
    fulfillment::effects::temp_session_id,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};

/// Run-scoped caches threaded through generation and allocation.
#[derive(Debug)]
pub struct FulfillmentRun {
    now: DateTime<Utc>,
    classes: HashMap<String, class::Model>,
    sessions: HashMap<String, Vec<session::Model>>,
    claimed: HashSet<String>,
    excluded: HashSet<String>,
}

impl FulfillmentRun {
    /// Starts a run at `now`. `excluded` holds session ids, real or `temp-` form,
    /// that must not receive attendance records.
    pub fn new(now: DateTime<Utc>, excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            now,
            classes: HashMap::new(),
            sessions: HashMap::new(),
            claimed: HashSet::new(),
            excluded: excluded.into_iter().collect(),
        }
    }

    /// The single timestamp used for every write and snapshot in this run.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Loads a class once per run.
    pub async fn load_class(
        &mut self,
        db: &DatabaseConnection,
        class_id: &str,
    ) -> Result<class::Model> {
        if let Some(cached) = self.classes.get(class_id) {
            return Ok(cached.clone());
        }
        let record = get_class_by_id(db, class_id)
            .await?
            .ok_or_else(|| Error::ClassNotFound {
                class_id: class_id.to_string(),
            })?;
        self.classes.insert(class_id.to_string(), record.clone());
        Ok(record)
    }

    #[must_use]
    pub fn cached_sessions(&self, class_id: &str) -> Option<&[session::Model]> {
        self.sessions.get(class_id).map(Vec::as_slice)
    }

    pub fn store_sessions(&mut self, class_id: &str, sessions: Vec<session::Model>) {
        self.sessions.insert(class_id.to_string(), sessions);
    }

    /// Marks a session as taken for the rest of the run.
    pub fn claim(&mut self, session_id: &str) {
        self.claimed.insert(session_id.to_string());
    }

    #[must_use]
    pub fn is_claimed(&self, session_id: &str) -> bool {
        self.claimed.contains(session_id)
    }

    /// Whether the admin dropped this session from the plan, by real id or by its
    /// stable `temp-<class>-<start>` id.
    #[must_use]
    pub fn is_excluded(&self, session: &session::Model) -> bool {
        self.excluded.contains(&session.id)
            || self
                .excluded
                .contains(&temp_session_id(&session.class_id, session.start_time))
    }
}
