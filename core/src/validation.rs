//! Boundary validation. Runs before any store is contacted.

use crate::error::{Result, YouthGroupError};
use crate::model::{
    EventInput, EventUpdate, GroupLeaderInput, MemberInput, NewEvent, NewPerson, NewRegistration,
    NewRoleRecord, PersonInput, PersonUpdate, RegistrationInput, RegistrationRole, RoleInput,
    RoleKind, SmallGroupInput,
};

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(YouthGroupError::validation(format!("{field} is required"))),
    }
}

fn optional_text(value: Option<String>, field: &str) -> Result<Option<String>> {
    value.map(|v| required_text(Some(v), field)).transpose()
}

fn required_id(value: Option<i64>, field: &str) -> Result<i64> {
    value.ok_or_else(|| YouthGroupError::validation(format!("{field} is required")))
}

fn check_age(age: Option<i32>) -> Result<Option<i32>> {
    match age {
        Some(a) if a < 0 => Err(YouthGroupError::validation("age must not be negative")),
        other => Ok(other),
    }
}

impl PersonInput {
    /// Requires non-blank first and last names.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] naming the missing field.
    pub fn validate(self) -> Result<NewPerson> {
        Ok(NewPerson {
            first_name: required_text(self.first_name, "firstName")?,
            last_name: required_text(self.last_name, "lastName")?,
            age: check_age(self.age)?,
        })
    }
}

impl PersonUpdate {
    /// Rejects blank names; absent fields stay absent.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] for a blank name or negative age.
    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            first_name: optional_text(self.first_name, "firstName")?,
            last_name: optional_text(self.last_name, "lastName")?,
            age: check_age(self.age)?,
        })
    }
}

impl RoleInput {
    /// Requires a person id, and a guardian for attendees.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] naming the missing field.
    pub fn validate(self, kind: RoleKind) -> Result<NewRoleRecord> {
        let person_id = required_id(self.person_id, "personId")?;
        let guardian = match kind {
            RoleKind::Attendee => Some(required_text(self.guardian, "guardian")?),
            RoleKind::Leader | RoleKind::Volunteer => None,
        };
        Ok(NewRoleRecord {
            person_id,
            guardian,
        })
    }
}

impl EventInput {
    /// Requires name, type, date-time and location.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] naming the missing field.
    pub fn validate(self) -> Result<NewEvent> {
        Ok(NewEvent {
            name: required_text(self.name, "name")?,
            event_type: required_text(self.event_type, "type")?,
            date_time: self
                .date_time
                .ok_or_else(|| YouthGroupError::validation("dateTime is required"))?,
            location: required_text(self.location, "location")?,
            notes: self.notes,
        })
    }
}

impl EventUpdate {
    /// Rejects blank required fields.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] for a blank name, type or location.
    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            name: optional_text(self.name, "name")?,
            event_type: optional_text(self.event_type, "type")?,
            date_time: self.date_time,
            location: optional_text(self.location, "location")?,
            notes: self.notes,
        })
    }
}

impl RegistrationInput {
    /// Requires exactly one of attendee, leader or volunteer id, and an
    /// emergency contact.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] when zero or several role ids
    /// are set or the emergency contact is missing.
    pub fn validate(self) -> Result<NewRegistration> {
        let role = match (self.attendee_id, self.leader_id, self.volunteer_id) {
            (Some(id), None, None) => RegistrationRole::Attendee(id),
            (None, Some(id), None) => RegistrationRole::Leader(id),
            (None, None, Some(id)) => RegistrationRole::Volunteer(id),
            (None, None, None) => {
                return Err(YouthGroupError::validation(
                    "one of attendeeId, leaderId or volunteerId is required",
                ));
            }
            _ => {
                return Err(YouthGroupError::validation(
                    "only one of attendeeId, leaderId or volunteerId may be set",
                ));
            }
        };
        Ok(NewRegistration {
            role,
            emergency_contact: required_text(self.emergency_contact, "emergencyContact")?,
        })
    }
}

impl SmallGroupInput {
    /// Requires a non-blank name.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] when the name is missing.
    pub fn validate(self) -> Result<String> {
        required_text(self.name, "name")
    }
}

impl MemberInput {
    /// Requires the attendee id.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] when it is missing.
    pub fn validate(self) -> Result<i64> {
        required_id(self.attendee_id, "attendeeId")
    }
}

impl GroupLeaderInput {
    /// Requires the leader id.
    ///
    /// # Errors
    ///
    /// Returns [`YouthGroupError::Validation`] when it is missing.
    pub fn validate(self) -> Result<i64> {
        required_id(self.leader_id, "leaderId")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(
        attendee: Option<i64>,
        leader: Option<i64>,
        volunteer: Option<i64>,
        contact: Option<&str>,
    ) -> RegistrationInput {
        RegistrationInput {
            attendee_id: attendee,
            leader_id: leader,
            volunteer_id: volunteer,
            emergency_contact: contact.map(str::to_string),
        }
    }

    #[test]
    fn registration_requires_exactly_one_role() {
        let contact = Some("Mom 555-0100");
        assert!(registration(None, None, None, contact).validate().is_err());
        assert!(registration(Some(1), Some(2), None, contact).validate().is_err());
        assert!(registration(Some(1), Some(2), Some(3), contact).validate().is_err());
        assert!(registration(None, Some(2), Some(3), contact).validate().is_err());

        let ok = registration(None, None, Some(3), contact).validate();
        assert_eq!(ok.map(|r| r.role), Ok(RegistrationRole::Volunteer(3)));
    }

    #[test]
    fn registration_requires_emergency_contact() {
        let err = registration(Some(1), None, None, None).validate();
        assert_eq!(
            err,
            Err(YouthGroupError::Validation("emergencyContact is required".to_string()))
        );
        assert!(registration(Some(1), None, None, Some("   ")).validate().is_err());
    }

    #[test]
    fn attendee_requires_guardian() {
        let input = RoleInput {
            person_id: Some(4),
            guardian: None,
        };
        assert!(input.clone().validate(RoleKind::Attendee).is_err());
        let leader = input.validate(RoleKind::Leader);
        assert_eq!(
            leader,
            Ok(NewRoleRecord {
                person_id: 4,
                guardian: None
            })
        );
    }

    #[test]
    fn person_names_are_trimmed() {
        let person = PersonInput {
            first_name: Some(" Sam ".to_string()),
            last_name: Some("Lee".to_string()),
            age: Some(15),
        }
        .validate();
        assert_eq!(person.map(|p| p.first_name), Ok("Sam".to_string()));
    }

    #[test]
    fn blank_update_field_rejected() {
        let update = PersonUpdate {
            first_name: Some(String::new()),
            ..PersonUpdate::default()
        };
        assert!(update.validate().is_err());
        assert!(PersonUpdate::default().validate().is_ok());
    }

    #[test]
    fn event_requires_date_time() {
        let input = EventInput {
            name: Some("Retreat".to_string()),
            event_type: Some("Retreat".to_string()),
            date_time: None,
            location: Some("Camp".to_string()),
            notes: None,
        };
        assert_eq!(
            input.validate().map(|e| e.name),
            Err(YouthGroupError::Validation("dateTime is required".to_string()))
        );
    }
}
