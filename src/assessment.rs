use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::Error;
use crate::storage::UploadRequest;
use crate::types::UserId;

/// Unit the intake form offers for height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Feet,
    Cm,
}

/// Unit the intake form offers for weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

/// One logged meal in the daily routine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub time: String,
    pub description: String,
}

/// A recurring physical activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
    pub duration: String,
}

/// Start and end of the client's working day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

/// The full intake questionnaire, submitted once per client.
///
/// Measurements stay strings end to end; they arrive from free-text
/// inputs and the portal treats them as opaque. The attachment lists hold
/// object paths from [`ApiClient::upload_file`], not public URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAssessment {
    #[serde(rename = "user_id")]
    pub user_id: UserId,
    pub full_name: String,
    pub age: String,
    pub height: String,
    pub height_unit: HeightUnit,
    pub weight: String,
    pub weight_unit: WeightUnit,
    pub sex: String,
    pub city: String,
    pub health_concerns: String,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    pub other_condition: String,
    pub diet_type: String,
    pub wakeup_time: String,
    pub sleep_time: String,
    pub profession: String,
    pub occupation: String,
    pub leave_home_time: String,
    pub return_home_time: String,
    pub break_times: String,
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(rename = "photo_urls", default)]
    pub photo_urls: Vec<String>,
    #[serde(rename = "medical_report_urls", default)]
    pub medical_report_urls: Vec<String>,
}

impl HealthAssessment {
    /// Start an empty assessment for the given account.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            full_name: String::new(),
            age: String::new(),
            height: String::new(),
            height_unit: HeightUnit::default(),
            weight: String::new(),
            weight_unit: WeightUnit::default(),
            sex: String::new(),
            city: String::new(),
            health_concerns: String::new(),
            medical_conditions: Vec::new(),
            other_condition: String::new(),
            diet_type: String::new(),
            wakeup_time: String::new(),
            sleep_time: String::new(),
            profession: String::new(),
            occupation: String::new(),
            leave_home_time: String::new(),
            return_home_time: String::new(),
            break_times: String::new(),
            working_hours: WorkingHours::default(),
            meals: Vec::new(),
            activities: Vec::new(),
            photo_urls: Vec::new(),
            medical_report_urls: Vec::new(),
        }
    }
}

/// Acknowledgement of a stored assessment.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AssessmentReceipt {
    #[serde(default)]
    pub success: bool,
    /// The stored row as the backend keeps it (snake_case columns).
    #[serde(default)]
    pub assessment: Option<serde_json::Value>,
}

impl ApiClient {
    /// Submit the intake questionnaire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend rejects the assessment.
    pub async fn submit_assessment(
        &self,
        assessment: &HealthAssessment,
    ) -> Result<AssessmentReceipt, Error> {
        let response = self
            .request(reqwest::Method::POST, "health-assessment")?
            .json(assessment)
            .send()
            .await?;

        let response = Self::ensure_success(
            response,
            "submit assessment",
            "could not submit the health assessment",
        )
        .await?;
        response.json().await.map_err(Into::into)
    }
}

/// Upload attachments, then submit the assessment referencing them.
///
/// Photos go first, then medical reports. The first failed upload aborts
/// the whole submission so no assessment is stored with missing
/// attachments.
///
/// # Errors
///
/// Returns the first upload error, or whatever [`ApiClient::submit_assessment`]
/// returns for the final call.
pub async fn submit_with_uploads(
    api: &ApiClient,
    mut assessment: HealthAssessment,
    photos: Vec<UploadRequest>,
    reports: Vec<UploadRequest>,
) -> Result<AssessmentReceipt, Error> {
    let user_id = assessment.user_id.clone();

    for photo in photos {
        let stored = api.upload_file(&user_id, photo).await?;
        assessment.photo_urls.push(stored.path);
    }
    for report in reports {
        let stored = api.upload_file(&user_id, report).await?;
        assessment.medical_report_urls.push(stored.path);
    }

    api.submit_assessment(&assessment).await
}
