//! Turns decoded QR text into a [`ScannedIdentity`].
//!
//! Student codes are JSON objects. Older codes were generated with camelCase
//! keys and some only carry the generic `id`, so every field is looked up under
//! a short list of accepted names. Only the student number is required.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::attendance::full_name;

/// Primary student number keys first, then the generic identity key.
const STUDENT_NUMBER_KEYS: [&str; 4] = ["student_id", "studentId", "student_number", "id"];
const EXTERNAL_ID_KEYS: [&str; 3] = ["id", "user_id", "userId"];
const FIRST_NAME_KEYS: [&str; 2] = ["first_name", "firstName"];
const LAST_NAME_KEYS: [&str; 2] = ["last_name", "lastName"];
const MIDDLE_INITIAL_KEYS: [&str; 2] = ["middle_initial", "middleInitial"];
const YEAR_LEVEL_KEYS: [&str; 2] = ["year_level", "yearLevel"];
const COURSE_KEYS: [&str; 3] = ["course", "course_name", "courseName"];
const AVATAR_KEYS: [&str; 2] = ["avatar_url", "avatarUrl"];

/// Why decoded QR text was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("This QR code does not contain valid student data ({0}).")]
    Malformed(String),
    #[error("This QR code is missing a student number.")]
    MissingIdentity,
}

/// A student identity claimed by a scanned QR code.
///
/// Values come straight from the code and may be stale. They are shown to the
/// operator for confirmation but never written to storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedIdentity {
    external_id: Option<String>,
    student_number: String,
    first_name: String,
    last_name: String,
    middle_initial: Option<String>,
    year_level: String,
    course: String,
    avatar_url: Option<String>,
    captured_at: DateTime<Utc>,
}

impl ScannedIdentity {
    /// Validates decoded QR text captured at `captured_at`.
    pub fn from_payload(raw: &str, captured_at: DateTime<Utc>) -> Result<Self, PayloadError> {
        let fields: Map<String, Value> = serde_json::from_str(raw.trim())
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;

        let student_number =
            first_text(&fields, &STUDENT_NUMBER_KEYS).ok_or(PayloadError::MissingIdentity)?;

        Ok(Self {
            external_id: first_text(&fields, &EXTERNAL_ID_KEYS),
            student_number,
            first_name: first_text(&fields, &FIRST_NAME_KEYS).unwrap_or_default(),
            last_name: first_text(&fields, &LAST_NAME_KEYS).unwrap_or_default(),
            middle_initial: first_text(&fields, &MIDDLE_INITIAL_KEYS),
            year_level: first_text(&fields, &YEAR_LEVEL_KEYS).unwrap_or_default(),
            course: first_text(&fields, &COURSE_KEYS).unwrap_or_default(),
            avatar_url: first_text(&fields, &AVATAR_KEYS),
            captured_at,
        })
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn student_number(&self) -> &str {
        &self.student_number
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn middle_initial(&self) -> Option<&str> {
        self.middle_initial.as_deref()
    }

    pub fn year_level(&self) -> &str {
        &self.year_level
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn full_name(&self) -> String {
        full_name(&self.first_name, self.middle_initial.as_deref(), &self.last_name)
    }
}

/// Returns the first non-empty value stored under any of `keys`.
/// Numbers are accepted and rendered as text.
fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
