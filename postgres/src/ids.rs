//! Application-assigned ids (`max(id) + 1`).
//!
//! The table is locked in `SHARE ROW EXCLUSIVE` mode for the rest of the
//! caller's transaction. That mode conflicts with itself and with row
//! writes, so two allocators for the same table serialize and the second
//! sees the first one's committed row.

use sqlx::PgConnection;
use youthgroup_core::Result;
use youthgroup_core::model::{RoleKind, next_manual_id};

use crate::db_error;

/// Tables without an identity column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ManualIdTable {
    Attendee,
    Leader,
    Volunteer,
    Registration,
    SmallGroup,
    SmallGroupMember,
    SmallGroupLeader,
}

impl ManualIdTable {
    pub(crate) const fn table(self) -> &'static str {
        match self {
            Self::Attendee => "attendee",
            Self::Leader => "leader",
            Self::Volunteer => "volunteer",
            Self::Registration => "registration",
            Self::SmallGroup => "small_group",
            Self::SmallGroupMember => "small_group_member",
            Self::SmallGroupLeader => "small_group_leader",
        }
    }

    pub(crate) const fn for_role(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Attendee => Self::Attendee,
            RoleKind::Leader => Self::Leader,
            RoleKind::Volunteer => Self::Volunteer,
        }
    }
}

/// Locks `table` and returns its next id. Must run inside a transaction.
pub(crate) async fn allocate_id(conn: &mut PgConnection, table: ManualIdTable) -> Result<i64> {
    let name = table.table();

    sqlx::query(&format!("LOCK TABLE {name} IN SHARE ROW EXCLUSIVE MODE"))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to lock table for id allocation"))?;

    let max: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX(id) FROM {name}"))
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("Failed to read current max id"))?;

    let next = next_manual_id(max);
    tracing::debug!(table = name, id = next, "Allocated id");
    Ok(next)
}
