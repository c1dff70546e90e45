use std::convert::TryFrom;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::progress::{
    CompletionStatus, EntryScores, ProgressEntry, ProgressFeedback,
};

#[derive(Debug, Clone)]
pub struct ProgressEntryRow {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub recorded_at: String,
    pub completion_status: String,
    pub time_spent_seconds: i64,
    pub overall_score: Option<f64>,
    pub composition_score: Option<f64>,
    pub color_score: Option<f64>,
    pub technique_score: Option<f64>,
    pub typography_score: Option<f64>,
    pub feedback_json: Option<String>,
    pub created_at: String,
}

impl ProgressEntryRow {
    pub fn from_entry(entry: &ProgressEntry, created_at: String) -> AppResult<Self> {
        let scores = entry.results.as_ref();
        Ok(Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            resource_id: entry.resource_id.clone(),
            recorded_at: format_timestamp(&entry.recorded_at),
            completion_status: entry.completion_status.as_str().to_string(),
            time_spent_seconds: entry.time_spent_seconds,
            overall_score: scores.map(|s| s.overall),
            composition_score: scores.map(|s| s.composition),
            color_score: scores.map(|s| s.color),
            technique_score: scores.map(|s| s.technique),
            typography_score: scores.and_then(|s| s.typography),
            feedback_json: entry
                .feedback
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            created_at,
        })
    }

    pub fn into_entry(self) -> AppResult<ProgressEntry> {
        let results = match (
            self.overall_score,
            self.composition_score,
            self.color_score,
            self.technique_score,
        ) {
            (Some(overall), Some(composition), Some(color), Some(technique)) => {
                Some(EntryScores {
                    overall,
                    composition,
                    color,
                    technique,
                    typography: self.typography_score,
                })
            }
            _ => None,
        };

        let feedback = self
            .feedback_json
            .as_deref()
            .map(serde_json::from_str::<ProgressFeedback>)
            .transpose()?;

        Ok(ProgressEntry {
            id: self.id,
            user_id: self.user_id,
            resource_id: self.resource_id,
            recorded_at: parse_timestamp(&self.recorded_at)?,
            completion_status: CompletionStatus::parse(&self.completion_status)?,
            time_spent_seconds: self.time_spent_seconds,
            results,
            feedback,
        })
    }
}

impl TryFrom<&Row<'_>> for ProgressEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            resource_id: row.get("resource_id")?,
            recorded_at: row.get("recorded_at")?,
            completion_status: row.get("completion_status")?,
            time_spent_seconds: row.get("time_spent_seconds")?,
            overall_score: row.get("overall_score")?,
            composition_score: row.get("composition_score")?,
            color_score: row.get("color_score")?,
            technique_score: row.get("technique_score")?,
            typography_score: row.get("typography_score")?,
            feedback_json: row.get("feedback_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        user_id,
        resource_id,
        recorded_at,
        completion_status,
        time_spent_seconds,
        overall_score,
        composition_score,
        color_score,
        technique_score,
        typography_score,
        feedback_json,
        created_at
    FROM progress_entries
"#;

pub struct ProgressRepository;

impl ProgressRepository {
    pub fn insert(conn: &Connection, entry: &ProgressEntry) -> AppResult<()> {
        let created_at = Utc::now().to_rfc3339();
        let row = ProgressEntryRow::from_entry(entry, created_at)?;

        conn.execute(
            r#"
                INSERT INTO progress_entries (
                    id,
                    user_id,
                    resource_id,
                    recorded_at,
                    completion_status,
                    time_spent_seconds,
                    overall_score,
                    composition_score,
                    color_score,
                    technique_score,
                    typography_score,
                    feedback_json,
                    created_at
                ) VALUES (
                    :id,
                    :user_id,
                    :resource_id,
                    :recorded_at,
                    :completion_status,
                    :time_spent_seconds,
                    :overall_score,
                    :composition_score,
                    :color_score,
                    :technique_score,
                    :typography_score,
                    :feedback_json,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":resource_id": &row.resource_id,
                ":recorded_at": &row.recorded_at,
                ":completion_status": &row.completion_status,
                ":time_spent_seconds": &row.time_spent_seconds,
                ":overall_score": &row.overall_score,
                ":composition_score": &row.composition_score,
                ":color_score": &row.color_score,
                ":technique_score": &row.technique_score,
                ":typography_score": &row.typography_score,
                ":feedback_json": &row.feedback_json,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<ProgressEntry>> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = :user_id ORDER BY recorded_at ASC, id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                ProgressEntryRow::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_entry()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    pub fn find_latest_for_resource(
        conn: &Connection,
        user_id: &str,
        resource_id: &str,
    ) -> AppResult<Option<ProgressEntry>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE user_id = :user_id AND resource_id = :resource_id \
             ORDER BY recorded_at DESC, id DESC LIMIT 1"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(
                named_params! {":user_id": user_id, ":resource_id": resource_id},
                |row| ProgressEntryRow::try_from(row),
            )
            .optional()?;

        row.map(|row| row.into_entry()).transpose()
    }

    pub fn update_feedback(
        conn: &Connection,
        entry_id: &str,
        feedback: &ProgressFeedback,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(feedback)?;
        let updated = conn.execute(
            "UPDATE progress_entries SET feedback_json = :feedback WHERE id = :id",
            named_params! {":feedback": payload, ":id": entry_id},
        )?;

        if updated == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}

// Fixed-width UTC keeps lexical order equal to chronological order.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| AppError::persistence(format!("invalid stored timestamp {raw}: {err}")))
}
