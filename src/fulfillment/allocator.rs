//! Allocation engine - reserves concrete sessions for purchased credits.

use crate::{
    core::attendance::list_attendance_by_student_and_sessions,
    entities::{class, session},
    errors::{Error, Result},
    fulfillment::{
        effects::{AttendanceWriter, SessionMaterializer, is_temp_session_id},
        generator::ensure_sessions,
        run::FulfillmentRun,
    },
};
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use tracing::debug;

/// Drops sessions the student already attends and sessions claimed earlier in the run.
async fn unoccupied_sessions(
    db: &DatabaseConnection,
    run: &FulfillmentRun,
    student_id: &str,
    sessions: &[session::Model],
) -> Result<Vec<session::Model>> {
    // Preview sessions cannot have attendance rows yet
    let stored_ids: Vec<String> = sessions
        .iter()
        .filter(|s| !is_temp_session_id(&s.id))
        .map(|s| s.id.clone())
        .collect();
    let attended: HashSet<String> =
        list_attendance_by_student_and_sessions(db, student_id, &stored_ids)
            .await?
            .into_iter()
            .map(|record| record.session_id)
            .collect();

    Ok(sessions
        .iter()
        .filter(|s| !attended.contains(&s.id) && !run.is_claimed(&s.id))
        .cloned()
        .collect())
}

/// Reserves the next `credits` free sessions of `class` for a student.
///
/// All selected sessions are claimed for the rest of the run. Sessions the admin
/// excluded are then dropped: they get no attendance row and are not returned, but
/// their slot stays used. Returns the sessions that were actually booked.
///
/// # Errors
/// Returns [`Error::InsufficientSessions`] when the class cannot supply enough free
/// sessions, plus any generation or write failure.
pub async fn allocate<M>(
    db: &DatabaseConnection,
    run: &mut FulfillmentRun,
    student_id: &str,
    class: &class::Model,
    credits: u32,
    effects: &M,
) -> Result<Vec<session::Model>>
where
    M: SessionMaterializer + AttendanceWriter + ?Sized,
{
    if credits == 0 {
        return Ok(Vec::new());
    }
    let wanted = credits as usize;

    let mut sessions = ensure_sessions(db, run, class, wanted, effects).await?;
    let mut available = unoccupied_sessions(db, run, student_id, &sessions).await?;
    while available.len() < wanted {
        let missing = wanted - available.len();
        let grown = ensure_sessions(db, run, class, sessions.len() + missing, effects).await?;
        if grown.len() <= sessions.len() {
            break;
        }
        sessions = grown;
        available = unoccupied_sessions(db, run, student_id, &sessions).await?;
    }

    if available.len() < wanted {
        return Err(Error::InsufficientSessions {
            class_id: class.id.clone(),
            requested: credits,
        });
    }
    available.truncate(wanted);

    for session in &available {
        run.claim(&session.id);
    }
    let booked: Vec<session::Model> = available
        .into_iter()
        .filter(|s| !run.is_excluded(s))
        .collect();

    debug!(
        class_id = %class.id,
        %student_id,
        requested = credits,
        booked = booked.len(),
        "Allocated sessions"
    );
    if !booked.is_empty() {
        effects.reserve(student_id, &booked).await?;
    }
    Ok(booked)
}
