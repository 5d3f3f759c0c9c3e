//! Session generator - makes sure a class has enough upcoming sessions.
//!
//! Recurrence is read by keyword: a rule containing `DAILY` repeats every day,
//! `MONTHLY` every 30 days, `WEEKLY` every 7 days, checked in that order. Without a
//! keyword, camps run daily and everything else weekly. New sessions continue from the
//! last upcoming session, or start from the class's nominal start time moved forward
//! to the first occurrence at or after `now`.

use crate::{
    core::session::{ListSessionsOptions, SessionDraft, list_sessions_by_class},
    entities::{ClassType, class, session},
    errors::{Error, Result},
    fulfillment::{effects::SessionMaterializer, run::FulfillmentRun},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::debug;

const FALLBACK_SESSION_MINUTES: i64 = 90;

/// Spacing between consecutive sessions of a class.
#[must_use]
pub fn session_interval(class: &class::Model) -> Duration {
    let rule = class.recurrence_rule.as_deref().unwrap_or_default();
    if rule.contains("DAILY") {
        Duration::days(1)
    } else if rule.contains("MONTHLY") {
        Duration::days(30)
    } else if rule.contains("WEEKLY") {
        Duration::days(7)
    } else if class.class_type == ClassType::Camp {
        Duration::days(1)
    } else {
        Duration::days(7)
    }
}

/// Length of each generated session: the class's nominal window when it is positive,
/// otherwise 90 minutes.
#[must_use]
pub fn session_duration(class: &class::Model) -> Duration {
    match (class.start_time, class.end_time) {
        (Some(start), Some(end)) if end > start => end - start,
        _ => Duration::minutes(FALLBACK_SESSION_MINUTES),
    }
}

/// Moves `seed` forward by whole intervals until it is no earlier than `now`.
#[must_use]
pub fn align_seed(seed: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = interval.num_milliseconds();
    if seed >= now || step <= 0 {
        return seed;
    }
    let behind = (now - seed).num_milliseconds();
    let steps = (behind + step - 1) / step;
    seed + Duration::milliseconds(steps * step)
}

/// Plans `count` sessions following the latest of `existing`.
///
/// # Errors
/// Returns [`Error::MissingSessionSeed`] when there is nothing to continue from and the
/// class has no start time.
pub fn plan_sessions(
    class: &class::Model,
    existing: &[session::Model],
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<SessionDraft>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let interval = session_interval(class);
    let duration = session_duration(class);
    let mut cursor = match existing.iter().map(|s| s.start_time).max() {
        Some(last) => last + interval,
        None => {
            let seed = class.start_time.ok_or_else(|| Error::MissingSessionSeed {
                class_id: class.id.clone(),
            })?;
            align_seed(seed, now, interval)
        }
    };

    let mut drafts = Vec::with_capacity(count);
    for _ in 0..count {
        drafts.push(SessionDraft {
            class_id: class.id.clone(),
            coach_ids: class.coach_ids.clone(),
            branch_id: class.branch_id.clone(),
            start_time: cursor,
            end_time: cursor + duration,
        });
        cursor += interval;
    }
    Ok(drafts)
}

/// Returns the class's upcoming sessions in start order, generating more until there
/// are at least `minimum`.
///
/// Upcoming sessions are read from the database once per run and cached; later calls
/// in the same run extend the cached list instead of querying again.
pub async fn ensure_sessions<M>(
    db: &DatabaseConnection,
    run: &mut FulfillmentRun,
    class: &class::Model,
    minimum: usize,
    materializer: &M,
) -> Result<Vec<session::Model>>
where
    M: SessionMaterializer + ?Sized,
{
    if minimum == 0 {
        return Ok(Vec::new());
    }

    let existing = if let Some(cached) = run.cached_sessions(&class.id) {
        cached.to_vec()
    } else {
        let options = ListSessionsOptions {
            start_from: Some(run.now()),
            ..Default::default()
        };
        let loaded = list_sessions_by_class(db, &class.id, &options).await?;
        run.store_sessions(&class.id, loaded.clone());
        loaded
    };
    if existing.len() >= minimum {
        return Ok(existing);
    }

    let drafts = plan_sessions(class, &existing, minimum - existing.len(), run.now())?;
    debug!(
        class_id = %class.id,
        existing = existing.len(),
        generated = drafts.len(),
        "Generating sessions"
    );
    let created = materializer.materialize(class, drafts, run.now()).await?;

    let mut merged = existing;
    merged.extend(created);
    merged.sort_by_key(|s| s.start_time);
    run.store_sessions(&class.id, merged.clone());
    Ok(merged)
}
