//! Events, registrations and attendance history.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use youthgroup_core::YouthGroupError;
use youthgroup_core::model::{
    AttendanceRecord, Event, EventUpdate, NewEvent, NewRegistration, Registration,
    RegistrationRole,
};
use youthgroup_core::stores::{EventCascade, EventRepository, StoreFuture};

use crate::ids::{ManualIdTable, allocate_id};
use crate::people::role_table;
use crate::{PostgresStore, commit, db_error, record_write};

#[derive(FromRow)]
struct EventRow {
    id: i64,
    name: String,
    event_type: String,
    date_time: DateTime<Utc>,
    location: String,
    notes: Option<String>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            event_type: row.event_type,
            date_time: row.date_time,
            location: row.location,
            notes: row.notes,
        }
    }
}

#[derive(FromRow)]
struct RegistrationRow {
    id: i64,
    event_id: i64,
    attendee_id: Option<i64>,
    leader_id: Option<i64>,
    volunteer_id: Option<i64>,
    emergency_contact: String,
    person_id: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            attendee_id: row.attendee_id,
            leader_id: row.leader_id,
            volunteer_id: row.volunteer_id,
            emergency_contact: row.emergency_contact,
            person_id: row.person_id,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: i64,
    event_id: i64,
    person_id: i64,
    checked_in_at: DateTime<Utc>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            person_id: row.person_id,
            checked_in_at: row.checked_in_at,
        }
    }
}

#[derive(FromRow)]
struct RegistrantRow {
    person_id: i64,
    first_name: String,
    last_name: String,
}

const REGISTRATIONS_WITH_VOLUNTEER: &str = r"
    SELECT r.id, r.event_id, r.attendee_id, r.leader_id, r.volunteer_id, r.emergency_contact,
           p.id AS person_id, p.first_name, p.last_name
    FROM registration r
    LEFT JOIN attendee a ON a.id = r.attendee_id
    LEFT JOIN leader l ON l.id = r.leader_id
    LEFT JOIN volunteer v ON v.id = r.volunteer_id
    LEFT JOIN person p ON p.id = COALESCE(a.person_id, l.person_id, v.person_id)
    WHERE r.event_id = $1
    ORDER BY r.id
";

const REGISTRATIONS_WITHOUT_VOLUNTEER: &str = r"
    SELECT r.id, r.event_id, r.attendee_id, r.leader_id, NULL::BIGINT AS volunteer_id,
           r.emergency_contact,
           p.id AS person_id, p.first_name, p.last_name
    FROM registration r
    LEFT JOIN attendee a ON a.id = r.attendee_id
    LEFT JOIN leader l ON l.id = r.leader_id
    LEFT JOIN person p ON p.id = COALESCE(a.person_id, l.person_id)
    WHERE r.event_id = $1
    ORDER BY r.id
";

const fn role_column(role: RegistrationRole) -> &'static str {
    match role {
        RegistrationRole::Attendee(_) => "attendee_id",
        RegistrationRole::Leader(_) => "leader_id",
        RegistrationRole::Volunteer(_) => "volunteer_id",
    }
}

impl EventRepository for PostgresStore {
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let rows: Vec<EventRow> = sqlx::query_as(
                r"
                SELECT id, name, event_type, date_time, location, notes
                FROM event
                ORDER BY date_time DESC, id DESC
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list events"))?;

            Ok(rows.into_iter().map(Event::from).collect())
        })
    }

    fn get_event(&self, id: i64) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let row: Option<EventRow> = sqlx::query_as(
                "SELECT id, name, event_type, date_time, location, notes FROM event WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load event"))?;

            Ok(row.map(Event::from))
        })
    }

    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let row: EventRow = sqlx::query_as(
                r"
                INSERT INTO event (name, event_type, date_time, location, notes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, name, event_type, date_time, location, notes
                ",
            )
            .bind(&event.name)
            .bind(&event.event_type)
            .bind(event.date_time)
            .bind(&event.location)
            .bind(&event.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to create event"))?;

            record_write("event");
            Ok(row.into())
        })
    }

    fn update_event(&self, id: i64, update: EventUpdate) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM event WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to lock event"))?;
            if exists.is_none() {
                return Err(YouthGroupError::not_found("Event", id));
            }

            let row: EventRow = sqlx::query_as(
                r"
                UPDATE event
                SET name = COALESCE($2, name),
                    event_type = COALESCE($3, event_type),
                    date_time = COALESCE($4, date_time),
                    location = COALESCE($5, location),
                    notes = COALESCE($6, notes)
                WHERE id = $1
                RETURNING id, name, event_type, date_time, location, notes
                ",
            )
            .bind(id)
            .bind(update.name)
            .bind(update.event_type)
            .bind(update.date_time)
            .bind(update.location)
            .bind(update.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to update event"))?;

            commit(tx).await?;
            record_write("event");
            Ok(row.into())
        })
    }

    fn delete_event(&self, id: i64) -> StoreFuture<'_, EventCascade> {
        Box::pin(async move {
            let mut tx = self.begin().await?;

            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM event WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to lock event"))?;
            if exists.is_none() {
                return Err(YouthGroupError::not_found("Event", id));
            }

            let registrations = sqlx::query("DELETE FROM registration WHERE event_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete registrations"))?
                .rows_affected();

            let attendance_records = sqlx::query("DELETE FROM attendance_record WHERE event_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete attendance records"))?
                .rows_affected();

            sqlx::query("DELETE FROM event WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete event"))?;

            commit(tx).await?;
            record_write("event");

            Ok(EventCascade {
                registrations,
                attendance_records,
            })
        })
    }

    fn list_registrations(&self, event_id: i64) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            let sql = if self.capabilities.registration_volunteer {
                REGISTRATIONS_WITH_VOLUNTEER
            } else {
                REGISTRATIONS_WITHOUT_VOLUNTEER
            };
            let rows: Vec<RegistrationRow> = sqlx::query_as(sql)
                .bind(event_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list registrations"))?;

            Ok(rows.into_iter().map(Registration::from).collect())
        })
    }

    fn create_registration(
        &self,
        event_id: i64,
        registration: NewRegistration,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            let role = registration.role;
            if matches!(role, RegistrationRole::Volunteer(_))
                && !self.capabilities.registration_volunteer
            {
                return Err(YouthGroupError::validation(
                    "volunteer registrations are not supported by this database schema",
                ));
            }

            let mut tx = self.begin().await?;

            let event: Option<i64> =
                sqlx::query_scalar("SELECT id FROM event WHERE id = $1 FOR SHARE")
                    .bind(event_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error("Failed to load event"))?;
            if event.is_none() {
                return Err(YouthGroupError::not_found("Event", event_id));
            }

            let registrant: Option<RegistrantRow> = sqlx::query_as(&format!(
                "SELECT r.person_id, p.first_name, p.last_name \
                 FROM {table} r JOIN person p ON p.id = r.person_id \
                 WHERE r.id = $1",
                table = role_table(role.kind()),
            ))
            .bind(role.role_id())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load registrant"))?;
            let Some(registrant) = registrant else {
                return Err(YouthGroupError::not_found(role.kind().resource(), role.role_id()));
            };

            let id = allocate_id(&mut tx, ManualIdTable::Registration).await?;

            sqlx::query(&format!(
                "INSERT INTO registration (id, event_id, {column}, emergency_contact) \
                 VALUES ($1, $2, $3, $4)",
                column = role_column(role),
            ))
            .bind(id)
            .bind(event_id)
            .bind(role.role_id())
            .bind(&registration.emergency_contact)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to create registration"))?;

            commit(tx).await?;
            record_write("registration");

            let (attendee_id, leader_id, volunteer_id) = role.keys();
            Ok(Registration {
                id,
                event_id,
                attendee_id,
                leader_id,
                volunteer_id,
                emergency_contact: registration.emergency_contact,
                person_id: Some(registrant.person_id),
                first_name: Some(registrant.first_name),
                last_name: Some(registrant.last_name),
            })
        })
    }

    fn delete_registration(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM registration WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete registration"))?;

            if result.rows_affected() == 0 {
                return Err(YouthGroupError::not_found("Registration", id));
            }
            record_write("registration");
            Ok(())
        })
    }

    fn record_attendance(
        &self,
        event_id: i64,
        person_id: i64,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, AttendanceRecord> {
        Box::pin(async move {
            let row: AttendanceRow = sqlx::query_as(
                r"
                INSERT INTO attendance_record (event_id, person_id, checked_in_at)
                VALUES ($1, $2, $3)
                RETURNING id, event_id, person_id, checked_in_at
                ",
            )
            .bind(event_id)
            .bind(person_id)
            .bind(at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to record attendance"))?;

            record_write("attendance_record");
            Ok(row.into())
        })
    }

    fn list_attendance(&self, event_id: i64) -> StoreFuture<'_, Vec<AttendanceRecord>> {
        Box::pin(async move {
            let rows: Vec<AttendanceRow> = sqlx::query_as(
                r"
                SELECT id, event_id, person_id, checked_in_at
                FROM attendance_record
                WHERE event_id = $1
                ORDER BY checked_in_at, id
                ",
            )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list attendance"))?;

            Ok(rows.into_iter().map(AttendanceRecord::from).collect())
        })
    }
}
