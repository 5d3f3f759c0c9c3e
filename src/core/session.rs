//! Session business logic - listing and creating dated class occurrences.

use crate::{
    entities::{Session, SessionStatus, session},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};

/// Filters for [`list_sessions_by_class`].
#[derive(Debug, Clone, Default)]
pub struct ListSessionsOptions {
    /// Only sessions starting at or after this instant
    pub start_from: Option<DateTimeUtc>,
    /// Include `CANCELLED` sessions (excluded by default)
    pub include_cancelled: bool,
    pub limit: Option<u64>,
}

/// A session that has been planned but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub class_id: String,
    pub coach_ids: Option<Json>,
    pub branch_id: Option<String>,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
}

impl SessionDraft {
    /// Builds the in-memory model for this draft under the given id.
    #[must_use]
    pub fn into_model(self, id: String, now: DateTimeUtc) -> session::Model {
        session::Model {
            id,
            class_id: self.class_id,
            coach_ids: self.coach_ids,
            branch_id: self.branch_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: SessionStatus::Scheduled,
            cancellation_reason: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lists a class's sessions in ascending start order.
pub async fn list_sessions_by_class(
    db: &DatabaseConnection,
    class_id: &str,
    options: &ListSessionsOptions,
) -> Result<Vec<session::Model>> {
    let mut query = Session::find()
        .filter(session::Column::ClassId.eq(class_id))
        .order_by_asc(session::Column::StartTime);

    if let Some(start_from) = options.start_from {
        query = query.filter(session::Column::StartTime.gte(start_from));
    }
    if !options.include_cancelled {
        query = query.filter(session::Column::Status.ne(SessionStatus::Cancelled));
    }
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }

    query.all(db).await.map_err(Into::into)
}

/// Loads the sessions with the given ids, in no particular order.
pub async fn list_sessions_by_ids(
    db: &DatabaseConnection,
    session_ids: &[String],
) -> Result<Vec<session::Model>> {
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }
    Session::find()
        .filter(session::Column::Id.is_in(session_ids.iter().cloned()))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores the drafts as `SCHEDULED` sessions in one statement and returns them in
/// draft order.
pub async fn create_sessions(
    db: &DatabaseConnection,
    drafts: Vec<SessionDraft>,
) -> Result<Vec<session::Model>> {
    if drafts.is_empty() {
        return Ok(Vec::new());
    }

    let now = chrono::Utc::now();
    let created: Vec<session::Model> = drafts
        .into_iter()
        .map(|draft| draft.into_model(super::new_id(), now))
        .collect();

    Session::insert_many(created.iter().cloned().map(session::ActiveModel::from))
        .exec_without_returning(db)
        .await?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone, Utc};
    use sea_orm::Set;

    fn draft(class_id: &str, start: DateTimeUtc) -> SessionDraft {
        SessionDraft {
            class_id: class_id.to_string(),
            coach_ids: None,
            branch_id: Some("branch-north".to_string()),
            start_time: start,
            end_time: start + Duration::minutes(90),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_sessions_in_start_order() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();

        // Insert out of order; listing must sort ascending
        let created = create_sessions(
            &db,
            vec![draft("swim", base + Duration::days(7)), draft("swim", base)],
        )
        .await?;
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].status, SessionStatus::Scheduled);
        assert_eq!(created[0].branch_id.as_deref(), Some("branch-north"));

        let listed = list_sessions_by_class(&db, "swim", &ListSessionsOptions::default()).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].start_time, base);
        assert_eq!(listed[1].start_time, base + Duration::days(7));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sessions_filters_past_and_cancelled() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
        let created = create_sessions(
            &db,
            vec![
                draft("swim", base - Duration::days(7)),
                draft("swim", base),
                draft("swim", base + Duration::days(7)),
            ],
        )
        .await?;

        let mut cancelled: session::ActiveModel = created[2].clone().into();
        cancelled.status = Set(SessionStatus::Cancelled);
        cancelled.update(&db).await?;

        let options = ListSessionsOptions {
            start_from: Some(base),
            ..Default::default()
        };
        let upcoming = list_sessions_by_class(&db, "swim", &options).await?;
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, created[1].id);

        let with_cancelled = ListSessionsOptions {
            start_from: Some(base),
            include_cancelled: true,
            limit: Some(10),
        };
        assert_eq!(list_sessions_by_class(&db, "swim", &with_cancelled).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_batch_stores_no_sessions() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();

        // The middle draft points at a class that does not exist
        let result = create_sessions(
            &db,
            vec![
                draft("swim", base),
                draft("ghost", base),
                draft("swim", base + Duration::days(7)),
            ],
        )
        .await;
        assert!(result.is_err());

        let stored = list_sessions_by_class(&db, "swim", &ListSessionsOptions::default()).await?;
        assert!(stored.is_empty());
        assert!(create_sessions(&db, Vec::new()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sessions_by_ids() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
        let created = create_sessions(&db, vec![draft("swim", base)]).await?;

        let found =
            list_sessions_by_ids(&db, &[created[0].id.clone(), "nope".to_string()]).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created[0].id);
        assert_eq!(found[0].start_time, base);
        assert!(list_sessions_by_ids(&db, &[]).await?.is_empty());
        Ok(())
    }
}
