//! Guardian-facing routes used by the LINE front-end.

use super::{AppState, json_or_default};
use crate::{
    core::{
        attendance::{self, DateRange},
        enrollment::list_enrollment_summaries,
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub student_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl StudentQuery {
    fn student_id(&self) -> Result<&str> {
        self.student_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid_input("student_id is required"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaveBody {
    #[serde(alias = "studentId")]
    pub student_id: Option<String>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
}

/// `GET /api/liff/enrollments?student_id=`
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<Value>> {
    let summaries = list_enrollment_summaries(&state.db, query.student_id()?).await?;
    Ok(Json(json!({ "data": summaries })))
}

/// `GET /api/liff/attendance?student_id=&from=&to=`
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<Value>> {
    let student_id = query.student_id()?;
    let range = DateRange::parse(
        query.from.as_deref().filter(|v| !v.trim().is_empty()),
        query.to.as_deref().filter(|v| !v.trim().is_empty()),
    )?;
    let items = attendance::list_attendance_for_student(&state.db, student_id, range).await?;
    Ok(Json(json!({ "data": items })))
}

/// `POST /api/liff/attendance/leave`
pub async fn apply_leave(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>> {
    let body: LeaveBody = json_or_default(&body)?;
    attendance::apply_leave(
        &state.db,
        body.student_id.as_deref().unwrap_or_default(),
        body.session_id.as_deref().unwrap_or_default(),
        chrono::Utc::now(),
        state.config.attendance.leave_cutoff_hours,
    )
    .await?;
    Ok(Json(json!({ "success": true })))
}
