//! Student profiles as stored in `user_profiles`.

use serde::{Deserialize, Serialize};

use crate::attendance::full_name;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Internal profile id (the auth provider's user id).
    pub id: String,
    /// Student number, the business key used on attendance rows.
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_initial: Option<String>,
    #[serde(default)]
    pub year_level: String,
    /// Display label of the student's course.
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl StudentProfile {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, self.middle_initial.as_deref(), &self.last_name)
    }

    /// The text encoded into this student's QR code.
    pub fn qr_payload(&self) -> String {
        serde_json::json!({
            "id": self.id,
            "student_id": self.student_id,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "middle_initial": self.middle_initial,
            "year_level": self.year_level,
            "course": self.course,
            "avatar_url": self.avatar_url,
        })
        .to_string()
    }
}
