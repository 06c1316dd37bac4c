//! One-time detection of optional schema columns.

use sqlx::PgPool;
use youthgroup_core::model::SchemaCapabilities;
use youthgroup_core::{Result, YouthGroupError};

/// Probes `information_schema` for optional columns.
///
/// Older databases lack `registration.volunteer_id`; registration reads
/// then select `NULL` in its place and volunteer registrations are
/// rejected.
///
/// # Errors
///
/// Returns a relational store error if the probe query fails.
pub async fn detect_capabilities(pool: &PgPool) -> Result<SchemaCapabilities> {
    let registration_volunteer: bool = sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = 'registration'
              AND column_name = 'volunteer_id'
        )
        ",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| YouthGroupError::relational(format!("Failed to probe schema: {e}")))?;

    if !registration_volunteer {
        tracing::warn!("registration.volunteer_id is absent; volunteer registrations are disabled");
    }

    Ok(SchemaCapabilities {
        registration_volunteer,
    })
}
