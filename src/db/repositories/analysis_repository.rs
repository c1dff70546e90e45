use rusqlite::{named_params, Connection, OptionalExtension};

use crate::error::{AppError, AppResult};
use crate::models::analysis::DesignAnalysis;

pub struct AnalysisRepository;

impl AnalysisRepository {
    pub fn insert(conn: &Connection, analysis: &DesignAnalysis) -> AppResult<()> {
        let payload = serde_json::to_string(analysis)?;

        conn.execute(
            r#"
                INSERT INTO design_analyses (
                    id,
                    user_id,
                    resource_id,
                    image_digest,
                    overall_score,
                    level,
                    analysis_json,
                    created_at
                ) VALUES (
                    :id,
                    :user_id,
                    :resource_id,
                    :image_digest,
                    :overall_score,
                    :level,
                    :analysis_json,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &analysis.id,
                ":user_id": &analysis.user_id,
                ":resource_id": &analysis.resource_id,
                ":image_digest": &analysis.image_digest,
                ":overall_score": &analysis.overall.score,
                ":level": analysis.level.as_str(),
                ":analysis_json": &payload,
                ":created_at": &analysis.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<DesignAnalysis>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT analysis_json FROM design_analyses WHERE id = :id",
                named_params! {":id": id},
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|value| serde_json::from_str(&value).map_err(AppError::from))
            .transpose()
    }

    /// Newest first.
    pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<DesignAnalysis>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT analysis_json
                FROM design_analyses
                WHERE user_id = :user_id
                ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                row.get::<_, String>(0)
            })?
            .map(|raw| {
                raw.map_err(AppError::from)
                    .and_then(|raw| serde_json::from_str(&raw).map_err(AppError::from))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }
}
