//! Client for the hosted Postgres REST endpoint.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use dioxus_logger::tracing::debug;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{AttendanceStore, StoreError};
use crate::attendance::{AttendanceRecord, Event, NewAttendance, ScanType};
use crate::prefs::store_config::StoreConfig;
use crate::student::StudentProfile;

const ATTENDANCE_COLUMNS: &str =
    "id,event_id,student_id,first_name,last_name,middle_initial,course,year_level,time_in,time_out";
const PROFILE_COLUMNS: &str =
    "id,student_id,first_name,last_name,middle_initial,year_level,avatar_url,course:courses(name)";
const EVENT_COLUMNS: &str = "id,title,status,starts_at,ends_at";

/// A `user_profiles` row with its course embedded.
#[derive(Deserialize, Debug)]
struct ProfileRow {
    id: String,
    student_id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    middle_initial: Option<String>,
    #[serde(default)]
    year_level: Option<Value>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    course: Option<CourseRef>,
}

#[derive(Deserialize, Debug)]
struct CourseRef {
    name: String,
}

impl From<ProfileRow> for StudentProfile {
    fn from(row: ProfileRow) -> Self {
        let year_level = match row.year_level {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            id: row.id,
            student_id: row.student_id,
            first_name: row.first_name,
            last_name: row.last_name,
            middle_initial: row.middle_initial,
            year_level,
            course: row.course.map(|c| c.name).unwrap_or_default(),
            avatar_url: row.avatar_url,
        }
    }
}

pub struct PostgrestStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl PostgrestStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.config.rest_url(table))
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    /// Sends a request whose response body is a JSON array of rows.
    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<Vec<T>>().await?)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.config.auth_url("recover"))
            .header("apikey", &self.config.key)
            .json(&HashMap::from([("email", email)]))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl AttendanceStore for PostgrestStore {
    async fn profile_by_student_number(
        &self,
        student_number: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        let request = self.request(Method::GET, "user_profiles").query(&[
            ("select", PROFILE_COLUMNS.to_string()),
            ("student_id", format!("eq.{student_number}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<ProfileRow> = Self::rows(request).await?;
        Ok(rows.into_iter().next().map(StudentProfile::from))
    }

    async fn attendance_for(
        &self,
        event_id: i64,
        student_number: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let request = self.request(Method::GET, "attendance").query(&[
            ("select", ATTENDANCE_COLUMNS.to_string()),
            ("event_id", format!("eq.{event_id}")),
            ("student_id", format!("eq.{student_number}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<AttendanceRecord> = Self::rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_attendance(&self, row: &NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let request = self
            .request(Method::POST, "attendance")
            .header("Prefer", "return=representation")
            .query(&[("select", ATTENDANCE_COLUMNS)])
            .json(row);
        let rows: Vec<AttendanceRecord> = Self::rows(request).await?;
        debug!(event_id = row.event_id, student_id = %row.student_id, "attendance row inserted");
        rows.into_iter().next().ok_or_else(|| StoreError::Rejected {
            status: StatusCode::OK.as_u16(),
            body: "insert returned no row".to_string(),
        })
    }

    async fn set_time_if_unset(
        &self,
        record_id: i64,
        scan_type: ScanType,
        at: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let column = scan_type.column();
        // The `is.null` filter makes the update a no-op if another scanner got
        // there first.
        let request = self
            .request(Method::PATCH, "attendance")
            .header("Prefer", "return=representation")
            .query(&[
                ("select", ATTENDANCE_COLUMNS.to_string()),
                ("id", format!("eq.{record_id}")),
                (column, "is.null".to_string()),
            ])
            .json(&HashMap::from([(column, at)]));
        let rows: Vec<AttendanceRecord> = Self::rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
        let request = self.request(Method::GET, "events").query(&[
            ("select", EVENT_COLUMNS),
            ("status", "eq.active"),
            ("order", "starts_at.desc.nullslast"),
        ]);
        Self::rows(request).await
    }
}
