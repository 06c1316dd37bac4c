//! Small groups with their member and leader join tables.

use sqlx::FromRow;
use youthgroup_core::YouthGroupError;
use youthgroup_core::model::{SmallGroup, SmallGroupLeader, SmallGroupMember};
use youthgroup_core::stores::{SmallGroupRepository, StoreFuture};

use crate::ids::{ManualIdTable, allocate_id};
use crate::{PostgresStore, commit, db_error, record_write};

#[derive(FromRow)]
struct GroupRow {
    id: i64,
    name: String,
}

impl From<GroupRow> for SmallGroup {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

/// Member and leader rows share a shape; `role_id` is the attendee or
/// leader id.
#[derive(FromRow)]
struct AssignmentRow {
    id: i64,
    small_group_id: i64,
    role_id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// One of the two group join tables.
#[derive(Clone, Copy)]
struct JoinTable {
    table: &'static str,
    ids: ManualIdTable,
    role_table: &'static str,
    role_column: &'static str,
    role_resource: &'static str,
    resource: &'static str,
}

const MEMBERS: JoinTable = JoinTable {
    table: "small_group_member",
    ids: ManualIdTable::SmallGroupMember,
    role_table: "attendee",
    role_column: "attendee_id",
    role_resource: "Attendee",
    resource: "Small group member",
};

const LEADERS: JoinTable = JoinTable {
    table: "small_group_leader",
    ids: ManualIdTable::SmallGroupLeader,
    role_table: "leader",
    role_column: "leader_id",
    role_resource: "Leader",
    resource: "Small group leader",
};

impl PostgresStore {
    async fn list_assignments(
        &self,
        join: JoinTable,
        group_id: i64,
    ) -> youthgroup_core::Result<Vec<AssignmentRow>> {
        let sql = format!(
            "SELECT j.id, j.small_group_id, j.{column} AS role_id, p.first_name, p.last_name \
             FROM {table} j \
             LEFT JOIN {role_table} r ON r.id = j.{column} \
             LEFT JOIN person p ON p.id = r.person_id \
             WHERE j.small_group_id = $1 \
             ORDER BY p.last_name, p.first_name, j.id",
            column = join.role_column,
            table = join.table,
            role_table = join.role_table,
        );
        sqlx::query_as(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list group assignments"))
    }

    async fn add_assignment(
        &self,
        join: JoinTable,
        group_id: i64,
        role_id: i64,
    ) -> youthgroup_core::Result<AssignmentRow> {
        let mut tx = self.begin().await?;

        let group: Option<i64> =
            sqlx::query_scalar("SELECT id FROM small_group WHERE id = $1 FOR SHARE")
                .bind(group_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to load small group"))?;
        if group.is_none() {
            return Err(YouthGroupError::not_found("Small group", group_id));
        }

        let names: Option<(Option<String>, Option<String>)> = sqlx::query_as(&format!(
            "SELECT p.first_name, p.last_name FROM {role_table} r \
             LEFT JOIN person p ON p.id = r.person_id WHERE r.id = $1",
            role_table = join.role_table,
        ))
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to load group role"))?;
        let Some((first_name, last_name)) = names else {
            return Err(YouthGroupError::not_found(join.role_resource, role_id));
        };

        let id = allocate_id(&mut tx, join.ids).await?;

        let already: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE small_group_id = $1 AND {column} = $2)",
            table = join.table,
            column = join.role_column,
        ))
        .bind(group_id)
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to check existing assignment"))?;
        if already {
            return Err(YouthGroupError::validation(format!(
                "{} {role_id} is already in small group {group_id}",
                join.role_resource
            )));
        }

        sqlx::query(&format!(
            "INSERT INTO {table} (id, small_group_id, {column}) VALUES ($1, $2, $3)",
            table = join.table,
            column = join.role_column,
        ))
        .bind(id)
        .bind(group_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to add group assignment"))?;

        commit(tx).await?;
        record_write(join.table);

        Ok(AssignmentRow {
            id,
            small_group_id: group_id,
            role_id,
            first_name,
            last_name,
        })
    }

    async fn remove_assignment(
        &self,
        join: JoinTable,
        group_id: i64,
        role_id: i64,
    ) -> youthgroup_core::Result<()> {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE small_group_id = $1 AND {column} = $2",
            table = join.table,
            column = join.role_column,
        ))
        .bind(group_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to remove group assignment"))?;

        if result.rows_affected() == 0 {
            return Err(YouthGroupError::not_found(
                join.resource,
                format!("{} {role_id} in group {group_id}", join.role_resource),
            ));
        }
        record_write(join.table);
        Ok(())
    }
}

fn member(row: AssignmentRow) -> SmallGroupMember {
    SmallGroupMember {
        id: row.id,
        small_group_id: row.small_group_id,
        attendee_id: row.role_id,
        first_name: row.first_name,
        last_name: row.last_name,
    }
}

fn leader(row: AssignmentRow) -> SmallGroupLeader {
    SmallGroupLeader {
        id: row.id,
        small_group_id: row.small_group_id,
        leader_id: row.role_id,
        first_name: row.first_name,
        last_name: row.last_name,
    }
}

impl SmallGroupRepository for PostgresStore {
    fn list_groups(&self) -> StoreFuture<'_, Vec<SmallGroup>> {
        Box::pin(async move {
            let rows: Vec<GroupRow> =
                sqlx::query_as("SELECT id, name FROM small_group ORDER BY name, id")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error("Failed to list small groups"))?;

            Ok(rows.into_iter().map(SmallGroup::from).collect())
        })
    }

    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<SmallGroup>> {
        Box::pin(async move {
            let row: Option<GroupRow> =
                sqlx::query_as("SELECT id, name FROM small_group WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_error("Failed to load small group"))?;

            Ok(row.map(SmallGroup::from))
        })
    }

    fn create_group(&self, name: String) -> StoreFuture<'_, SmallGroup> {
        Box::pin(async move {
            let mut tx = self.begin().await?;
            let id = allocate_id(&mut tx, ManualIdTable::SmallGroup).await?;

            sqlx::query("INSERT INTO small_group (id, name) VALUES ($1, $2)")
                .bind(id)
                .bind(&name)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to create small group"))?;

            commit(tx).await?;
            record_write("small_group");
            tracing::info!(small_group_id = id, "Created small group");
            Ok(SmallGroup { id, name })
        })
    }

    fn delete_group(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM small_group WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to lock small group"))?;
            if exists.is_none() {
                return Err(YouthGroupError::not_found("Small group", id));
            }

            for join in [MEMBERS, LEADERS] {
                sqlx::query(&format!("DELETE FROM {} WHERE small_group_id = $1", join.table))
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to delete group assignments"))?;
            }

            sqlx::query("DELETE FROM small_group WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete small group"))?;

            commit(tx).await?;
            record_write("small_group");
            Ok(())
        })
    }

    fn list_members(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupMember>> {
        Box::pin(async move {
            let rows = self.list_assignments(MEMBERS, group_id).await?;
            Ok(rows.into_iter().map(member).collect())
        })
    }

    fn add_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, SmallGroupMember> {
        Box::pin(async move {
            self.add_assignment(MEMBERS, group_id, attendee_id)
                .await
                .map(member)
        })
    }

    fn remove_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, ()> {
        Box::pin(self.remove_assignment(MEMBERS, group_id, attendee_id))
    }

    fn list_group_leaders(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupLeader>> {
        Box::pin(async move {
            let rows = self.list_assignments(LEADERS, group_id).await?;
            Ok(rows.into_iter().map(leader).collect())
        })
    }

    fn add_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, SmallGroupLeader> {
        Box::pin(async move {
            self.add_assignment(LEADERS, group_id, leader_id)
                .await
                .map(leader)
        })
    }

    fn remove_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, ()> {
        Box::pin(self.remove_assignment(LEADERS, group_id, leader_id))
    }
}
