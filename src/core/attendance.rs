//! Attendance ledger - which student holds which session slot.
//!
//! A row for a (session, student) pair means the slot is taken. Fulfillment creates
//! rows as `UNRECORDED`; guardians can later move their own upcoming slots to `LEAVE`
//! as long as they ask early enough.

use crate::{
    core::{class::list_classes_by_ids, session::list_sessions_by_ids},
    entities::{Attendance, AttendanceStatus, SessionStatus, attendance, session},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Input for [`create_attendance_records`].
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub session_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
    pub credits_used: i32,
}

impl NewAttendance {
    /// An `UNRECORDED` booking that consumes one credit.
    #[must_use]
    pub fn booking(session_id: &str, student_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            student_id: student_id.to_string(),
            status: AttendanceStatus::Unrecorded,
            credits_used: 1,
        }
    }
}

/// Session details shown next to an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceSession {
    pub id: String,
    pub class_id: String,
    pub class_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub branch_id: Option<String>,
}

/// An attendance record joined with its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceItem {
    pub id: String,
    pub student_id: String,
    pub session_id: String,
    pub status: AttendanceStatus,
    pub credits_used: i32,
    pub session: AttendanceSession,
}

/// Inclusive time window over session start times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Parses `from`/`to` boundaries given as `YYYY-MM-DD` or RFC 3339.
    ///
    /// `from` snaps to the start of its UTC day and `to` to the last millisecond of its day.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        Ok(Self {
            from: from
                .map(|value| parse_day_boundary(value, "from", NaiveTime::MIN))
                .transpose()?,
            to: to
                .map(|value| parse_day_boundary(value, "to", end_of_day()))
                .transpose()?,
        })
    }

    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| instant >= from) && self.to.is_none_or(|to| instant <= to)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_day_boundary(value: &str, field: &str, time: NaiveTime) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|instant| instant.with_timezone(&Utc).date_naive())
        })
        .ok_or_else(|| Error::invalid_input(format!("{field} must be a valid date")))?;
    Ok(day.and_time(time).and_utc())
}

/// Finds a student's attendance records among the given sessions.
pub async fn list_attendance_by_student_and_sessions(
    db: &DatabaseConnection,
    student_id: &str,
    session_ids: &[String],
) -> Result<Vec<attendance::Model>> {
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }
    Attendance::find()
        .filter(attendance::Column::StudentId.eq(student_id))
        .filter(attendance::Column::SessionId.is_in(session_ids.iter().cloned()))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists all of a student's attendance records, oldest first.
pub async fn list_attendance_by_student(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<Vec<attendance::Model>> {
    Attendance::find()
        .filter(attendance::Column::StudentId.eq(student_id))
        .order_by_asc(attendance::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Inserts attendance records in one statement, so a batch lands whole or not at all.
/// A second record for the same (session, student) pair is rejected by the unique
/// index and surfaces as [`Error::Conflict`].
pub async fn create_attendance_records(
    db: &DatabaseConnection,
    inputs: Vec<NewAttendance>,
) -> Result<Vec<attendance::Model>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let now = Utc::now();
    let records: Vec<attendance::Model> = inputs
        .into_iter()
        .map(|input| attendance::Model {
            id: super::new_id(),
            session_id: input.session_id,
            student_id: input.student_id,
            status: input.status,
            credits_used: input.credits_used,
            notes: None,
            is_makeup: false,
            created_at: now,
            updated_at: now,
        })
        .collect();

    Attendance::insert_many(records.iter().cloned().map(attendance::ActiveModel::from))
        .exec_without_returning(db)
        .await?;
    Ok(records)
}

/// Sets the status of a student's record in a session.
pub async fn update_attendance_status(
    db: &DatabaseConnection,
    student_id: &str,
    session_id: &str,
    status: AttendanceStatus,
) -> Result<attendance::Model> {
    let record = Attendance::find()
        .filter(attendance::Column::StudentId.eq(student_id))
        .filter(attendance::Column::SessionId.eq(session_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::AttendanceNotFound {
            student_id: student_id.to_string(),
            session_id: session_id.to_string(),
        })?;

    let mut model: attendance::ActiveModel = record.into();
    model.status = Set(status);
    model.updated_at = Set(Utc::now());
    model.update(db).await.map_err(Into::into)
}

/// Lists a student's attendance joined with session and class details.
///
/// Records whose session cannot be found are skipped, as are sessions starting
/// outside `range`.
pub async fn list_attendance_for_student(
    db: &DatabaseConnection,
    student_id: &str,
    range: DateRange,
) -> Result<Vec<AttendanceItem>> {
    let records = list_attendance_by_student(db, student_id).await?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let mut session_ids: Vec<String> = records.iter().map(|r| r.session_id.clone()).collect();
    session_ids.sort();
    session_ids.dedup();
    let sessions: HashMap<String, session::Model> = list_sessions_by_ids(db, &session_ids)
        .await?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut class_ids: Vec<String> = sessions.values().map(|s| s.class_id.clone()).collect();
    class_ids.sort();
    class_ids.dedup();
    let class_names: HashMap<String, String> = list_classes_by_ids(db, &class_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c.title))
        .collect();

    Ok(records
        .into_iter()
        .filter_map(|record| {
            let session = sessions.get(&record.session_id)?;
            if !range.contains(session.start_time) {
                return None;
            }
            Some(AttendanceItem {
                session: AttendanceSession {
                    id: session.id.clone(),
                    class_id: session.class_id.clone(),
                    class_name: class_names
                        .get(&session.class_id)
                        .cloned()
                        .unwrap_or_else(|| session.class_id.clone()),
                    start_time: session.start_time,
                    end_time: session.end_time,
                    status: session.status,
                    branch_id: session.branch_id.clone(),
                },
                id: record.id,
                student_id: record.student_id,
                session_id: record.session_id,
                status: record.status,
                credits_used: record.credits_used,
            })
        })
        .collect())
}

/// Marks a student's booked slot as `LEAVE`.
///
/// Allowed only while `now` is at least `cutoff_hours` before the session starts.
pub async fn apply_leave(
    db: &DatabaseConnection,
    student_id: &str,
    session_id: &str,
    now: DateTime<Utc>,
    cutoff_hours: i64,
) -> Result<attendance::Model> {
    if student_id.trim().is_empty() || session_id.trim().is_empty() {
        return Err(Error::invalid_input("student_id and session_id are required"));
    }

    let session = list_sessions_by_ids(db, &[session_id.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::SessionNotFound {
            session_id: session_id.to_string(),
        })?;

    let cutoff = session.start_time - Duration::hours(cutoff_hours);
    if now > cutoff {
        return Err(Error::LeaveCutoffPassed { cutoff_hours });
    }

    let updated = update_attendance_status(db, student_id, session_id, AttendanceStatus::Leave).await?;
    info!(%student_id, %session_id, "Leave applied");
    Ok(updated)
}
