//! Side-effect capabilities for a fulfillment pass.
//!
//! Generation, allocation, and crediting run the same code for previews and real
//! confirmations. What differs is what happens at the three write points, so each
//! one is a trait with two implementations: [`PersistingEffects`] writes to the
//! database, [`PreviewEffects`] produces stand-in values and writes nothing.

use crate::{
    core::{
        attendance::{NewAttendance, create_attendance_records},
        enrollment::{CreditPurchase, upsert_enrollment_credits},
        session::{SessionDraft, create_sessions},
    },
    entities::{class, session},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sea_orm::DatabaseConnection;

/// Prefix of session ids that exist only inside a preview.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Enrollment id reported by previews, where no ledger row is written.
pub const PREVIEW_ENROLLMENT_ID: &str = "temp-enrollment-id";

/// Millisecond-precision UTC timestamp, e.g. `2025-01-06T10:00:00.000Z`.
#[must_use]
pub fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stable id for a session that has not been stored yet.
///
/// The same class and start time always give the same id, so an exclusion picked in
/// a preview still matches when the confirmation creates the real session.
#[must_use]
pub fn temp_session_id(class_id: &str, start_time: DateTime<Utc>) -> String {
    format!("{TEMP_ID_PREFIX}{class_id}-{}", iso_timestamp(start_time))
}

#[must_use]
pub fn is_temp_session_id(session_id: &str) -> bool {
    session_id.starts_with(TEMP_ID_PREFIX)
}

/// Ledger row credited for one order entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub enrollment_id: String,
    pub expiry_date: Option<NaiveDate>,
}

/// Turns planned sessions into session records.
#[async_trait]
pub trait SessionMaterializer: Send + Sync {
    async fn materialize(
        &self,
        class: &class::Model,
        drafts: Vec<SessionDraft>,
        now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>>;
}

/// Books a student into sessions.
#[async_trait]
pub trait AttendanceWriter: Send + Sync {
    async fn reserve(&self, student_id: &str, sessions: &[session::Model]) -> Result<()>;
}

/// Adds purchased credits to the enrollment ledger.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn credit(&self, student_id: &str, class_id: &str, credits: u32) -> Result<LedgerEntry>;
}

/// Writes sessions, attendance, and ledger rows to the database.
#[derive(Debug, Clone, Copy)]
pub struct PersistingEffects<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PersistingEffects<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionMaterializer for PersistingEffects<'_> {
    async fn materialize(
        &self,
        _class: &class::Model,
        drafts: Vec<SessionDraft>,
        _now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>> {
        create_sessions(self.db, drafts).await
    }
}

#[async_trait]
impl AttendanceWriter for PersistingEffects<'_> {
    async fn reserve(&self, student_id: &str, sessions: &[session::Model]) -> Result<()> {
        let bookings = sessions
            .iter()
            .map(|s| NewAttendance::booking(&s.id, student_id))
            .collect();
        create_attendance_records(self.db, bookings).await?;
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for PersistingEffects<'_> {
    async fn credit(&self, student_id: &str, class_id: &str, credits: u32) -> Result<LedgerEntry> {
        let credits = i32::try_from(credits).map_err(|_| Error::InvalidCredits {
            credits: f64::from(credits),
        })?;
        let enrollment = upsert_enrollment_credits(
            self.db,
            &CreditPurchase {
                student_id: student_id.to_string(),
                class_id: class_id.to_string(),
                credits,
                expiry_date: None,
            },
        )
        .await?;
        Ok(LedgerEntry {
            enrollment_id: enrollment.id,
            expiry_date: enrollment.expiry_date,
        })
    }
}

/// Dry-run effects: temp session ids, no bookings, placeholder ledger rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewEffects;

#[async_trait]
impl SessionMaterializer for PreviewEffects {
    async fn materialize(
        &self,
        class: &class::Model,
        drafts: Vec<SessionDraft>,
        now: DateTime<Utc>,
    ) -> Result<Vec<session::Model>> {
        Ok(drafts
            .into_iter()
            .map(|draft| {
                let id = temp_session_id(&class.id, draft.start_time);
                draft.into_model(id, now)
            })
            .collect())
    }
}

#[async_trait]
impl AttendanceWriter for PreviewEffects {
    async fn reserve(&self, _student_id: &str, _sessions: &[session::Model]) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for PreviewEffects {
    async fn credit(&self, _student_id: &str, _class_id: &str, _credits: u32) -> Result<LedgerEntry> {
        Ok(LedgerEntry {
            enrollment_id: PREVIEW_ENROLLMENT_ID.to_string(),
            expiry_date: None,
        })
    }
}
