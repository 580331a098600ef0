use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::api::ApiClient;
use crate::error::Error;
use crate::types::UserId;

/// How a consultation is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentKind {
    Video,
    InPerson,
    Phone,
}

/// Lifecycle of an appointment request.
///
/// `Unknown` absorbs statuses this client version has not seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Requested,
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// One appointment as the backend presents it for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    /// Combined day and time; the backend emits a naive ISO datetime.
    #[serde(with = "iso_datetime")]
    pub date: PrimitiveDateTime,
    pub dietitian_name: String,
    #[serde(rename = "type")]
    pub kind: AppointmentKind,
    /// Minutes. The portal books half-hour consultations.
    pub duration: u32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
}

/// Request body for booking a consultation slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Calendar day, `YYYY-MM-DD`.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Half-hour label from [`booking_slots`], e.g. `"9:30 AM"`.
    pub time: String,
    #[serde(rename = "type")]
    pub kind: AppointmentKind,
    pub user_id: UserId,
}

/// Acknowledgement of a booking or update call.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AppointmentReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub appointment: Option<AppointmentRecord>,
}

/// The stored appointment row as mutation calls echo it back.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AppointmentRecord {
    pub id: String,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentList {
    #[serde(default)]
    appointments: Vec<Appointment>,
    #[serde(default)]
    error: Option<String>,
}

/// The bookable half-hour labels, 9:00 AM through 4:30 PM.
#[must_use]
pub fn booking_slots() -> [&'static str; 16] {
    [
        "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM", "12:00 PM",
        "12:30 PM", "1:00 PM", "1:30 PM", "2:00 PM", "2:30 PM", "3:00 PM", "3:30 PM",
        "4:00 PM", "4:30 PM",
    ]
}

/// Parse a 12-hour clock label (`"4:30 PM"`) into a time of day.
///
/// Follows the portal's arithmetic: 12 folds to 0 before the PM offset, so
/// `"12:00 PM"` is noon and `"12:00 AM"` is midnight. A label without a
/// modifier reads as AM.
#[must_use]
pub fn parse_clock_label(label: &str) -> Option<Time> {
    let (clock, modifier) = match label.split_once(' ') {
        Some((clock, modifier)) => (clock, modifier),
        None => (label, "AM"),
    };
    let (hours, minutes) = clock.split_once(':')?;
    let mut hours: u8 = hours.parse().ok()?;
    let minutes: u8 = minutes.parse().ok()?;
    if hours == 12 {
        hours = 0;
    }
    if modifier == "PM" {
        hours = hours.checked_add(12)?;
    }
    Time::from_hms(hours, minutes, 0).ok()
}

/// Render a time of day as the portal's 12-hour label, e.g. `"4:30 PM"`.
#[must_use]
pub fn clock_label(time: Time) -> String {
    let modifier = if time.hour() >= 12 { "PM" } else { "AM" };
    let clock_hour = match time.hour() % 12 {
        0 => 12,
        hour => hour,
    };
    format!("{clock_hour}:{:02} {modifier}", time.minute())
}

/// Split appointments into `(upcoming, past)` around `now`.
///
/// Anything dated today counts as upcoming, even when its time of day has
/// already passed.
#[must_use]
pub fn partition(
    appointments: Vec<Appointment>,
    now: PrimitiveDateTime,
) -> (Vec<Appointment>, Vec<Appointment>) {
    appointments
        .into_iter()
        .partition(|appointment| appointment.date > now || appointment.date.date() == now.date())
}

impl ApiClient {
    /// Fetch the user's appointments, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when
    /// the backend reports a failure (it does so in the body even on an
    /// otherwise successful response).
    pub async fn appointments(&self, user_id: &UserId) -> Result<Vec<Appointment>, Error> {
        let response = self
            .request(reqwest::Method::GET, "appointments")?
            .query(&[("user_id", user_id.as_str())])
            .send()
            .await?;

        let response = Self::ensure_success(
            response,
            "list appointments",
            "could not load appointments",
        )
        .await?;
        let list = response.json::<AppointmentList>().await?;
        if let Some(error) = list.error {
            return Err(Error::Api {
                operation: "list appointments",
                status: None,
                detail: error,
            });
        }
        Ok(list.appointments)
    }

    /// Request a consultation slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend rejects the booking.
    pub async fn book_appointment(
        &self,
        request: &BookingRequest,
    ) -> Result<AppointmentReceipt, Error> {
        let response = self
            .request(reqwest::Method::POST, "appointments")?
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success(
            response,
            "book appointment",
            "could not book the appointment",
        )
        .await?;
        response.json().await.map_err(Into::into)
    }

    /// Cancel an appointment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend rejects the cancellation.
    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<AppointmentReceipt, Error> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("appointments/{appointment_id}"),
            )?
            .json(&serde_json::json!({ "status": "cancelled" }))
            .send()
            .await?;

        let response = Self::ensure_success(
            response,
            "cancel appointment",
            "could not cancel the appointment",
        )
        .await?;
        response.json().await.map_err(Into::into)
    }
}

mod iso_datetime {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(
        value: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = value
            .format(super::PLAIN_DATETIME)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PrimitiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso(&raw).map_err(serde::de::Error::custom)
    }
}

mod iso_date {
    use serde::Serializer;
    use time::Date;
    use time::macros::format_description;

    pub fn serialize<S: Serializer>(value: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = value
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

const PLAIN_DATETIME: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const PLAIN_DATETIME_SUBSECONDS: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Parse the backend's naive ISO datetime, with or without fractional
/// seconds (its clock fallback emits microseconds).
///
/// # Errors
///
/// Returns the parse error for anything that matches neither shape.
pub fn parse_iso(raw: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(raw, PLAIN_DATETIME)
        .or_else(|_| PrimitiveDateTime::parse(raw, PLAIN_DATETIME_SUBSECONDS))
}
