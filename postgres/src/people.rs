//! People and role records.

use sqlx::FromRow;
use youthgroup_core::model::{
    NewPerson, NewRoleRecord, Person, PersonUpdate, RoleKind, RoleRecord,
};
use youthgroup_core::stores::{PeopleRepository, StoreFuture};
use youthgroup_core::YouthGroupError;

use crate::ids::{ManualIdTable, allocate_id};
use crate::{PostgresStore, commit, db_error, record_write};

#[derive(FromRow)]
struct PersonRow {
    id: i64,
    first_name: String,
    last_name: String,
    age: Option<i32>,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            age: row.age,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: i64,
    person_id: i64,
    guardian: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl RoleRow {
    fn into_record(self, kind: RoleKind) -> RoleRecord {
        RoleRecord {
            kind,
            id: self.id,
            person_id: self.person_id,
            guardian: self.guardian,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

pub(crate) const fn role_table(kind: RoleKind) -> &'static str {
    ManualIdTable::for_role(kind).table()
}

const fn guardian_column(kind: RoleKind) -> &'static str {
    match kind {
        RoleKind::Attendee => "r.guardian",
        RoleKind::Leader | RoleKind::Volunteer => "NULL::TEXT",
    }
}

fn role_select(kind: RoleKind) -> String {
    format!(
        "SELECT r.id, r.person_id, {guardian} AS guardian, p.first_name, p.last_name \
         FROM {table} r LEFT JOIN person p ON p.id = r.person_id",
        guardian = guardian_column(kind),
        table = role_table(kind),
    )
}

impl PeopleRepository for PostgresStore {
    fn list_people(&self) -> StoreFuture<'_, Vec<Person>> {
        Box::pin(async move {
            let rows: Vec<PersonRow> = sqlx::query_as(
                r"
                SELECT id, first_name, last_name, age
                FROM person
                ORDER BY last_name, first_name, id
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list people"))?;

            Ok(rows.into_iter().map(Person::from).collect())
        })
    }

    fn get_person(&self, id: i64) -> StoreFuture<'_, Option<Person>> {
        Box::pin(async move {
            let row: Option<PersonRow> = sqlx::query_as(
                "SELECT id, first_name, last_name, age FROM person WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load person"))?;

            Ok(row.map(Person::from))
        })
    }

    fn find_people(&self, ids: Vec<i64>) -> StoreFuture<'_, Vec<Person>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let rows: Vec<PersonRow> = sqlx::query_as(
                "SELECT id, first_name, last_name, age FROM person WHERE id = ANY($1)",
            )
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load people"))?;

            Ok(rows.into_iter().map(Person::from).collect())
        })
    }

    fn create_person(&self, person: NewPerson) -> StoreFuture<'_, Person> {
        Box::pin(async move {
            let row: PersonRow = sqlx::query_as(
                r"
                INSERT INTO person (first_name, last_name, age)
                VALUES ($1, $2, $3)
                RETURNING id, first_name, last_name, age
                ",
            )
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(person.age)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to create person"))?;

            record_write("person");
            Ok(row.into())
        })
    }

    fn update_person(&self, id: i64, update: PersonUpdate) -> StoreFuture<'_, Person> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM person WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to lock person"))?;
            if exists.is_none() {
                return Err(YouthGroupError::not_found("Person", id));
            }

            let row: PersonRow = sqlx::query_as(
                r"
                UPDATE person
                SET first_name = COALESCE($2, first_name),
                    last_name = COALESCE($3, last_name),
                    age = COALESCE($4, age)
                WHERE id = $1
                RETURNING id, first_name, last_name, age
                ",
            )
            .bind(id)
            .bind(update.first_name)
            .bind(update.last_name)
            .bind(update.age)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to update person"))?;

            commit(tx).await?;
            record_write("person");
            Ok(row.into())
        })
    }

    fn delete_person(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM person WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to lock person"))?;
            if exists.is_none() {
                return Err(YouthGroupError::not_found("Person", id));
            }

            let holds_role: bool = sqlx::query_scalar(
                r"
                SELECT EXISTS (SELECT 1 FROM attendee WHERE person_id = $1)
                    OR EXISTS (SELECT 1 FROM leader WHERE person_id = $1)
                    OR EXISTS (SELECT 1 FROM volunteer WHERE person_id = $1)
                ",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to check role records"))?;
            if holds_role {
                return Err(YouthGroupError::validation(format!(
                    "person {id} still holds role records"
                )));
            }

            let has_history: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM attendance_record WHERE person_id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to check attendance history"))?;
            if has_history {
                return Err(YouthGroupError::validation(format!(
                    "person {id} has attendance history"
                )));
            }

            sqlx::query("DELETE FROM person WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete person"))?;

            commit(tx).await?;
            record_write("person");
            tracing::info!(person_id = id, "Deleted person");
            Ok(())
        })
    }

    fn list_roles(&self, kind: RoleKind) -> StoreFuture<'_, Vec<RoleRecord>> {
        Box::pin(async move {
            let sql = format!("{} ORDER BY p.last_name, p.first_name, r.id", role_select(kind));
            let rows: Vec<RoleRow> = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list role records"))?;

            Ok(rows.into_iter().map(|row| row.into_record(kind)).collect())
        })
    }

    fn get_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, Option<RoleRecord>> {
        Box::pin(async move {
            let sql = format!("{} WHERE r.id = $1", role_select(kind));
            let row: Option<RoleRow> = sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load role record"))?;

            Ok(row.map(|row| row.into_record(kind)))
        })
    }

    fn create_role(&self, kind: RoleKind, role: NewRoleRecord) -> StoreFuture<'_, RoleRecord> {
        Box::pin(async move {
            let table = role_table(kind);
            let mut tx = self.begin().await?;

            let person: Option<PersonRow> = sqlx::query_as(
                "SELECT id, first_name, last_name, age FROM person WHERE id = $1 FOR SHARE",
            )
            .bind(role.person_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load person"))?;
            let Some(person) = person else {
                return Err(YouthGroupError::not_found("Person", role.person_id));
            };

            let id = allocate_id(&mut tx, ManualIdTable::for_role(kind)).await?;

            let already: bool = sqlx::query_scalar(&format!(
                "SELECT EXISTS (SELECT 1 FROM {table} WHERE person_id = $1)"
            ))
            .bind(role.person_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to check existing role"))?;
            if already {
                return Err(YouthGroupError::validation(format!(
                    "person {} already holds the {kind} role",
                    role.person_id
                )));
            }

            match kind {
                RoleKind::Attendee => {
                    sqlx::query("INSERT INTO attendee (id, person_id, guardian) VALUES ($1, $2, $3)")
                        .bind(id)
                        .bind(role.person_id)
                        .bind(&role.guardian)
                        .execute(&mut *tx)
                        .await
                }
                RoleKind::Leader | RoleKind::Volunteer => {
                    sqlx::query(&format!("INSERT INTO {table} (id, person_id) VALUES ($1, $2)"))
                        .bind(id)
                        .bind(role.person_id)
                        .execute(&mut *tx)
                        .await
                }
            }
            .map_err(db_error("Failed to create role record"))?;

            commit(tx).await?;
            record_write(table);

            Ok(RoleRecord {
                kind,
                id,
                person_id: role.person_id,
                guardian: role.guardian,
                first_name: Some(person.first_name),
                last_name: Some(person.last_name),
            })
        })
    }

    fn delete_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let table = role_table(kind);
            let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete role record"))?;

            if result.rows_affected() == 0 {
                return Err(YouthGroupError::not_found(kind.resource(), id));
            }
            record_write(table);
            Ok(())
        })
    }
}
