use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Report;

/// Queries over `reports` (`spec.md` §3, §4.6).
#[derive(Clone)]
pub struct ReportRepo {
    pool: PgPool,
}

impl ReportRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        reporter_id: i64,
        reported_id: i64,
        category: &str,
        reason: Option<&str>,
    ) -> Result<Report, ApiError> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (reporter_id, reported_id, category, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id, reporter_id, reported_id, category, reason, created_at
            "#,
        )
        .bind(reporter_id)
        .bind(reported_id)
        .bind(category)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(report)
    }

    pub async fn list_against(&self, reported_id: i64) -> Result<Vec<Report>, ApiError> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT id, reporter_id, reported_id, category, reason, created_at
             FROM reports WHERE reported_id = $1 ORDER BY created_at DESC",
        )
        .bind(reported_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }
}
