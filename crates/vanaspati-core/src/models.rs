//! Domain types shared by the client and its front ends.
//!
//! Wire names follow the server's snake_case JSON. Timestamps from the server
//! may lack an offset (naive UTC); [`timestamp`] accepts both forms.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::defaults;
use crate::error::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque server-assigned identifier.
///
/// The server currently hands out integers, but callers must not rely on
/// that; ids are compared and printed as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => RecordId(n.to_string()),
            Raw::Str(s) => RecordId(s),
        })
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Authenticated identity and role flags derived from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Successful `POST /auth/login` payload.
///
/// Fields the client does not interpret are kept in `extra` so callers get
/// the full server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl LoginResponse {
    pub fn session(&self) -> Session {
        Session {
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Successful `POST /auth/signup` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

// =============================================================================
// DIAGNOSIS HISTORY
// =============================================================================

/// Whether a diagnosis came from a single upload or a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisType {
    #[default]
    Single,
    Batch,
}

impl fmt::Display for DiagnosisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// A runner-up prediction.
///
/// The two historical front ends named the label `class` and
/// `predicted_class`; both are accepted, `class` is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(rename = "class", alias = "predicted_class", alias = "label")]
    pub label: String,
    pub confidence: f64,
}

impl Alternative {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// One stored classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: RecordId,
    #[serde(default)]
    pub diagnosis_type: DiagnosisType,
    #[serde(default)]
    pub image_name: String,
    pub disease_name: String,
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alternatives: Vec<Alternative>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remedy_info: Map<String, JsonValue>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub diagnosed_at: DateTime<Utc>,
    #[serde(default = "default_history_status")]
    pub status: String,
}

fn default_history_status() -> String {
    defaults::HISTORY_STATUS_ACTIVE.to_string()
}

/// Body of `POST /history/diagnosis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDiagnosis {
    pub diagnosis_type: DiagnosisType,
    pub image_name: String,
    pub disease_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub remedy_info: Map<String, JsonValue>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewDiagnosis {
    /// A single-image diagnosis with no alternatives, remedies, or notes.
    pub fn single(
        image_name: impl Into<String>,
        disease_name: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            diagnosis_type: DiagnosisType::Single,
            image_name: image_name.into(),
            disease_name: disease_name.into(),
            confidence,
            alternatives: Vec::new(),
            remedy_info: Map::new(),
            notes: None,
        }
    }

    /// A batch-upload diagnosis with no alternatives, remedies, or notes.
    pub fn batch(
        image_name: impl Into<String>,
        disease_name: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            diagnosis_type: DiagnosisType::Batch,
            ..Self::single(image_name, disease_name, confidence)
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Alternative>) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_remedy_info(mut self, remedy_info: Map<String, JsonValue>) -> Self {
        self.remedy_info = remedy_info;
        self
    }

    /// Build the local mirror of a record the server accepted under `id`.
    pub fn into_record(self, id: RecordId, diagnosed_at: DateTime<Utc>) -> DiagnosisRecord {
        DiagnosisRecord {
            id,
            diagnosis_type: self.diagnosis_type,
            image_name: self.image_name,
            disease_name: self.disease_name,
            confidence: self.confidence,
            alternatives: self.alternatives,
            remedy_info: self.remedy_info,
            notes: self.notes,
            diagnosed_at,
            status: default_history_status(),
        }
    }
}

/// Response of `POST /history/diagnosis`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveDiagnosisResponse {
    pub diagnosis_id: RecordId,
}

/// Response of `GET /history/diagnosis`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub history: Vec<DiagnosisRecord>,
    #[serde(default)]
    pub total: u64,
}

// =============================================================================
// GARDEN
// =============================================================================

/// Treatment progress of a tracked plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlantStatus {
    #[default]
    Monitoring,
    Treating,
    Recovered,
}

impl PlantStatus {
    pub const ALL: [PlantStatus; 3] = [
        PlantStatus::Monitoring,
        PlantStatus::Treating,
        PlantStatus::Recovered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Treating => "treating",
            Self::Recovered => "recovered",
        }
    }
}

impl fmt::Display for PlantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monitoring" => Ok(Self::Monitoring),
            "treating" => Ok(Self::Treating),
            "recovered" => Ok(Self::Recovered),
            other => Err(Error::Validation(format!(
                "Unknown plant status '{}', expected monitoring, treating or recovered",
                other
            ))),
        }
    }
}

/// A user-tracked plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GardenPlant {
    pub id: RecordId,
    pub plant_name: String,
    pub disease_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: PlantStatus,
    #[serde(with = "timestamp")]
    pub diagnosed_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_path: Option<String>,
}

/// Response of `GET /garden/plants`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GardenList {
    #[serde(default)]
    pub plants: Vec<GardenPlant>,
}

/// Parameters for `POST /garden/plants`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGardenPlant {
    pub plant_name: String,
    pub disease_name: String,
    pub confidence: f64,
    pub notes: Option<String>,
    pub status: PlantStatus,
}

impl NewGardenPlant {
    /// New plant in the default `monitoring` status.
    pub fn new(
        plant_name: impl Into<String>,
        disease_name: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            plant_name: plant_name.into(),
            disease_name: disease_name.into(),
            confidence,
            notes: None,
            status: PlantStatus::default(),
        }
    }

    /// Promote a diagnosis record; the plant name is taken from its class.
    pub fn from_diagnosis(record: &DiagnosisRecord) -> Self {
        let plant = crate::class_name::plant_name_of(&record.disease_name);
        let plant_name = if plant.is_empty() {
            record.image_name.clone()
        } else {
            plant
        };
        Self {
            notes: record.notes.clone(),
            ..Self::new(plant_name, record.disease_name.clone(), record.confidence)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_status(mut self, status: PlantStatus) -> Self {
        self.status = status;
        self
    }

    /// Query parameters; `notes` is omitted when absent.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("plant_name", self.plant_name.clone()),
            ("disease_name", self.disease_name.clone()),
            ("confidence", self.confidence.to_string()),
        ];
        if let Some(ref notes) = self.notes {
            params.push(("notes", notes.clone()));
        }
        params.push(("status", self.status.to_string()));
        params
    }
}

/// Partial update for `PATCH /garden/plants/{id}`.
///
/// `None` means "leave unchanged" and is not sent. `Some(String::new())` is
/// sent as an empty value and clears the notes server-side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlantUpdate {
    pub notes: Option<String>,
    pub status: Option<PlantStatus>,
}

impl PlantUpdate {
    pub fn status(status: PlantStatus) -> Self {
        Self {
            notes: None,
            status: Some(status),
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: PlantStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.status.is_none()
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref notes) = self.notes {
            params.push(("notes", notes.clone()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        params
    }
}

/// Per-status counts over a garden listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GardenStats {
    pub total: usize,
    pub monitoring: usize,
    pub treating: usize,
    pub recovered: usize,
}

impl GardenStats {
    pub fn from_plants(plants: &[GardenPlant]) -> Self {
        plants.iter().fold(
            Self {
                total: plants.len(),
                ..Default::default()
            },
            |mut stats, plant| {
                match plant.status {
                    PlantStatus::Monitoring => stats.monitoring += 1,
                    PlantStatus::Treating => stats.treating += 1,
                    PlantStatus::Recovered => stats.recovered += 1,
                }
                stats
            },
        )
    }
}

/// Plants in `status`, or all plants when `status` is `None`.
pub fn filter_by_status(plants: &[GardenPlant], status: Option<PlantStatus>) -> Vec<&GardenPlant> {
    plants
        .iter()
        .filter(|p| status.map_or(true, |s| p.status == s))
        .collect()
}

// =============================================================================
// CONFIDENCE
// =============================================================================

/// Display band for a prediction confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= defaults::CONFIDENCE_HIGH {
            Self::High
        } else if confidence >= defaults::CONFIDENCE_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps as RFC 3339, accepting naive (offset-less) UTC on input.
pub mod timestamp {
    use super::*;

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {}", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn record_id_accepts_int_and_string() {
        let a: RecordId = serde_json::from_value(json!(42)).unwrap();
        let b: RecordId = serde_json::from_value(json!("42")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "42");
    }

    #[test]
    fn session_defaults_admin_flag() {
        let s: Session =
            serde_json::from_value(json!({"username": "asha", "email": "asha@example.com"}))
                .unwrap();
        assert!(!s.is_admin);
    }

    #[test]
    fn login_response_keeps_extra_fields() {
        let resp: LoginResponse = serde_json::from_value(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "username": "asha",
            "email": "asha@example.com",
            "is_admin": true,
            "expires_in": 3600
        }))
        .unwrap();
        assert_eq!(resp.token_type.as_deref(), Some("bearer"));
        assert_eq!(resp.extra.get("expires_in"), Some(&json!(3600)));
        assert!(resp.session().is_admin);
    }

    #[test]
    fn alternative_accepts_both_label_names() {
        let a: Alternative =
            serde_json::from_value(json!({"class": "Tomato___Late_blight", "confidence": 0.1}))
                .unwrap();
        let b: Alternative = serde_json::from_value(
            json!({"predicted_class": "Tomato___Late_blight", "confidence": 0.1}),
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            json!({"class": "Tomato___Late_blight", "confidence": 0.1})
        );
    }

    #[test]
    fn diagnosis_record_tolerates_nulls_and_naive_timestamps() {
        let record: DiagnosisRecord = serde_json::from_value(json!({
            "id": 7,
            "diagnosis_type": "batch",
            "image_name": "leaf.jpg",
            "disease_name": "Apple___Black_rot",
            "confidence": 0.91,
            "alternatives": null,
            "remedy_info": null,
            "notes": null,
            "diagnosed_at": "2025-03-04T10:20:30.123456",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(record.id, RecordId::from(7));
        assert_eq!(record.diagnosis_type, DiagnosisType::Batch);
        assert!(record.alternatives.is_empty());
        assert!(record.remedy_info.is_empty());
        assert_eq!(
            record.diagnosed_at.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
    }

    #[test]
    fn new_diagnosis_serializes_wire_names() {
        let body = NewDiagnosis::single("leaf.jpg", "Tomato___Late_blight", 0.87)
            .with_alternatives(vec![Alternative::new("Tomato___Early_blight", 0.08)]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["diagnosis_type"], "single");
        assert_eq!(value["image_name"], "leaf.jpg");
        assert_eq!(value["alternatives"][0]["class"], "Tomato___Early_blight");
        assert_eq!(value["remedy_info"], json!({}));
        assert!(value["notes"].is_null());
    }

    #[test]
    fn into_record_sets_active_status() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = NewDiagnosis::batch("b.jpg", "Corn___healthy", 0.99).into_record("9".into(), at);
        assert_eq!(record.status, "active");
        assert_eq!(record.diagnosis_type, DiagnosisType::Batch);
        assert_eq!(record.diagnosed_at, at);
    }

    #[test]
    fn plant_status_parse_and_display() {
        assert_eq!("Treating".parse::<PlantStatus>().unwrap(), PlantStatus::Treating);
        assert_eq!(PlantStatus::Recovered.to_string(), "recovered");
        assert!(matches!(
            "dead".parse::<PlantStatus>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn new_plant_query_omits_absent_notes() {
        let query = NewGardenPlant::new("Tomato", "Tomato___Late_blight", 0.8).to_query();
        assert!(query.iter().all(|(k, _)| *k != "notes"));
        assert!(query.contains(&("status", "monitoring".to_string())));
    }

    #[test]
    fn plant_update_distinguishes_absent_from_empty() {
        assert!(PlantUpdate::status(PlantStatus::Treating)
            .to_query()
            .iter()
            .all(|(k, _)| *k != "notes"));

        let clear = PlantUpdate::notes("");
        assert_eq!(clear.to_query(), vec![("notes", String::new())]);
        assert!(PlantUpdate::default().is_empty());
    }

    #[test]
    fn from_diagnosis_uses_plant_from_class() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = NewDiagnosis::single("leaf.jpg", "Pepper,_bell___Bacterial_spot", 0.7)
            .with_notes("lower leaves")
            .into_record("1".into(), at);
        let plant = NewGardenPlant::from_diagnosis(&record);
        assert_eq!(plant.plant_name, "Pepper, bell");
        assert_eq!(plant.notes.as_deref(), Some("lower leaves"));
        assert_eq!(plant.status, PlantStatus::Monitoring);
    }

    fn plant(id: i64, status: PlantStatus) -> GardenPlant {
        GardenPlant {
            id: id.into(),
            plant_name: "Tomato".into(),
            disease_name: "Tomato___Late_blight".into(),
            confidence: 0.9,
            notes: None,
            status,
            diagnosed_at: Utc::now(),
            updated_at: None,
            image_path: None,
        }
    }

    #[test]
    fn garden_stats_and_filter() {
        let plants = vec![
            plant(1, PlantStatus::Monitoring),
            plant(2, PlantStatus::Treating),
            plant(3, PlantStatus::Treating),
            plant(4, PlantStatus::Recovered),
        ];
        let stats = GardenStats::from_plants(&plants);
        assert_eq!(
            stats,
            GardenStats {
                total: 4,
                monitoring: 1,
                treating: 2,
                recovered: 1
            }
        );
        assert_eq!(filter_by_status(&plants, Some(PlantStatus::Treating)).len(), 2);
        assert_eq!(filter_by_status(&plants, None).len(), 4);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(ConfidenceLevel::from_confidence(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.49), ConfidenceLevel::Low);
    }

    #[test]
    fn timestamp_parse_forms() {
        assert!(timestamp::parse("2025-03-04T10:20:30Z").is_some());
        assert!(timestamp::parse("2025-03-04T10:20:30+05:30").is_some());
        assert!(timestamp::parse("2025-03-04 10:20:30").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }
}
