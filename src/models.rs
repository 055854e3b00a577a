use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::calendar::WeekLabel;
use crate::error::AnalyticsError;

/// Bucket name used for any missing categorical value.
pub const UNKNOWN: &str = "Unknown";

/// Ordered list of non-blank values for a field that the backend may send
/// either as a bare string or as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MultiValue(Vec<String>);

impl MultiValue {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            values
                .into_iter()
                .map(Into::into)
                .filter(|value| !value.trim().is_empty())
                .collect(),
        )
    }

    pub fn single(value: impl Into<String>) -> Self {
        Self::new([value])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl<'de> Deserialize<'de> for MultiValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<Option<String>>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => MultiValue::default(),
            Some(Raw::One(value)) => MultiValue::single(value),
            Some(Raw::Many(values)) => MultiValue::new(values.into_iter().flatten()),
        })
    }
}

/// Task record as delivered by the backend. Read-only to the analytics core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskRecord")]
pub struct Task {
    pub id: String,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub governorate: Option<String>,
    pub district: Option<String>,
    pub team_name: Option<String>,
    pub team_company: Option<String>,
    pub validation_status: Option<String>,
    pub gaia_check: Option<String>,
    pub reason: MultiValue,
    pub sub_reason: MultiValue,
    pub root_cause: MultiValue,
    pub responsible: MultiValue,
    pub itn_related: MultiValue,
    pub related_to_subscription: MultiValue,
    pub evaluation_score: Option<f64>,
    pub created_at: Option<String>,
    pub interview_date: Option<String>,
    pub customer_name: Option<String>,
    pub contact_number: Option<String>,
    pub customer_feedback: Option<String>,
    pub slid: Option<String>,
    pub request_number: Option<String>,
}

/// Wire shape of a task. Document stores may send `_id`, `id` or both.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TaskRecord {
    id: Option<String>,
    #[serde(rename = "_id")]
    document_id: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    governorate: Option<String>,
    district: Option<String>,
    team_name: Option<String>,
    team_company: Option<String>,
    validation_status: Option<String>,
    gaia_check: Option<String>,
    reason: MultiValue,
    sub_reason: MultiValue,
    root_cause: MultiValue,
    responsible: MultiValue,
    itn_related: MultiValue,
    related_to_subscription: MultiValue,
    evaluation_score: Option<f64>,
    created_at: Option<String>,
    interview_date: Option<String>,
    customer_name: Option<String>,
    contact_number: Option<String>,
    customer_feedback: Option<String>,
    slid: Option<String>,
    request_number: Option<String>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id.or(record.document_id).unwrap_or_default(),
            priority: record.priority,
            status: record.status,
            governorate: record.governorate,
            district: record.district,
            team_name: record.team_name,
            team_company: record.team_company,
            validation_status: record.validation_status,
            gaia_check: record.gaia_check,
            reason: record.reason,
            sub_reason: record.sub_reason,
            root_cause: record.root_cause,
            responsible: record.responsible,
            itn_related: record.itn_related,
            related_to_subscription: record.related_to_subscription,
            evaluation_score: record.evaluation_score,
            created_at: record.created_at,
            interview_date: record.interview_date,
            customer_name: record.customer_name,
            contact_number: record.contact_number,
            customer_feedback: record.customer_feedback,
            slid: record.slid,
            request_number: record.request_number,
        }
    }
}

impl Task {
    /// Raw values of a categorical field, blank entries excluded.
    pub fn raw_values(&self, field: TaskField) -> Vec<&str> {
        match field.kind() {
            FieldKind::Scalar => self
                .scalar(field)
                .filter(|value| !value.trim().is_empty())
                .into_iter()
                .collect(),
            FieldKind::Multi => self
                .multi(field)
                .map(|values| values.as_slice().iter().map(String::as_str).collect())
                .unwrap_or_default(),
        }
    }

    /// Values used for aggregation: never empty, missing becomes `Unknown`.
    pub fn bucket_values(&self, field: TaskField) -> Vec<&str> {
        let values = self.raw_values(field);
        if values.is_empty() {
            vec![UNKNOWN]
        } else {
            values
        }
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::CustomerName => self.customer_name.as_deref(),
            TextField::ContactNumber => self.contact_number.as_deref(),
            TextField::CustomerFeedback => self.customer_feedback.as_deref(),
            TextField::Slid => self.slid.as_deref(),
            TextField::RequestNumber => self.request_number.as_deref(),
        }
    }

    /// Values checked by text search; empty when the record lacks the field.
    pub fn search_values(&self, key: SearchKey) -> Vec<&str> {
        match key {
            SearchKey::Category(field) => self.raw_values(field),
            SearchKey::Text(field) => self.text(field).into_iter().collect(),
        }
    }

    pub fn interview_day(&self) -> Option<NaiveDate> {
        self.interview_date.as_deref().and_then(parse_day)
    }

    pub fn created_day(&self) -> Option<NaiveDate> {
        self.created_at.as_deref().and_then(parse_day)
    }

    fn scalar(&self, field: TaskField) -> Option<&str> {
        match field {
            TaskField::Priority => self.priority.as_deref(),
            TaskField::Status => self.status.as_deref(),
            TaskField::Governorate => self.governorate.as_deref(),
            TaskField::District => self.district.as_deref(),
            TaskField::TeamName => self.team_name.as_deref(),
            TaskField::TeamCompany => self.team_company.as_deref(),
            TaskField::ValidationStatus => self.validation_status.as_deref(),
            TaskField::GaiaCheck => self.gaia_check.as_deref(),
            _ => None,
        }
    }

    fn multi(&self, field: TaskField) -> Option<&MultiValue> {
        match field {
            TaskField::Reason => Some(&self.reason),
            TaskField::SubReason => Some(&self.sub_reason),
            TaskField::RootCause => Some(&self.root_cause),
            TaskField::Responsible => Some(&self.responsible),
            TaskField::ItnRelated => Some(&self.itn_related),
            TaskField::RelatedToSubscription => Some(&self.related_to_subscription),
            _ => None,
        }
    }
}

/// Parses the date forms the backend emits; anything else is treated as absent.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|stamp| stamp.date())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Multi,
}

/// Categorical task fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskField {
    Priority,
    Status,
    Governorate,
    District,
    TeamName,
    TeamCompany,
    ValidationStatus,
    GaiaCheck,
    Reason,
    SubReason,
    RootCause,
    Responsible,
    ItnRelated,
    RelatedToSubscription,
}

impl TaskField {
    pub const ALL: [TaskField; 14] = [
        TaskField::Priority,
        TaskField::Status,
        TaskField::Governorate,
        TaskField::District,
        TaskField::TeamName,
        TaskField::TeamCompany,
        TaskField::ValidationStatus,
        TaskField::GaiaCheck,
        TaskField::Reason,
        TaskField::SubReason,
        TaskField::RootCause,
        TaskField::Responsible,
        TaskField::ItnRelated,
        TaskField::RelatedToSubscription,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            TaskField::Reason
            | TaskField::SubReason
            | TaskField::RootCause
            | TaskField::Responsible
            | TaskField::ItnRelated
            | TaskField::RelatedToSubscription => FieldKind::Multi,
            _ => FieldKind::Scalar,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskField::Priority => "priority",
            TaskField::Status => "status",
            TaskField::Governorate => "governorate",
            TaskField::District => "district",
            TaskField::TeamName => "teamName",
            TaskField::TeamCompany => "teamCompany",
            TaskField::ValidationStatus => "validationStatus",
            TaskField::GaiaCheck => "gaiaCheck",
            TaskField::Reason => "reason",
            TaskField::SubReason => "subReason",
            TaskField::RootCause => "rootCause",
            TaskField::Responsible => "responsible",
            TaskField::ItnRelated => "itnRelated",
            TaskField::RelatedToSubscription => "relatedToSubscription",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Folds camelCase, kebab-case and snake_case spellings into one key.
fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for TaskField {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        TaskField::ALL
            .into_iter()
            .find(|field| normalize_name(field.name()) == wanted)
            .ok_or_else(|| AnalyticsError::UnknownField(s.to_string()))
    }
}

/// Free-text fields reachable only through substring search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextField {
    CustomerName,
    ContactNumber,
    CustomerFeedback,
    Slid,
    RequestNumber,
}

impl TextField {
    pub const ALL: [TextField; 5] = [
        TextField::CustomerName,
        TextField::ContactNumber,
        TextField::CustomerFeedback,
        TextField::Slid,
        TextField::RequestNumber,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextField::CustomerName => "customerName",
            TextField::ContactNumber => "contactNumber",
            TextField::CustomerFeedback => "customerFeedback",
            TextField::Slid => "slid",
            TextField::RequestNumber => "requestNumber",
        }
    }
}

/// Any field the advanced search bag can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchKey {
    Category(TaskField),
    Text(TextField),
}

impl FromStr for SearchKey {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(field) = s.parse::<TaskField>() {
            return Ok(SearchKey::Category(field));
        }
        let wanted = normalize_name(s);
        TextField::ALL
            .into_iter()
            .find(|field| normalize_name(field.name()) == wanted)
            .map(SearchKey::Text)
            .ok_or_else(|| AnalyticsError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub name: String,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendKey {
    pub name: String,
    pub total: usize,
}

/// One week of a multi-series chart: a count per tracked value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPoint {
    pub week: WeekLabel,
    pub total: usize,
    #[serde(flatten)]
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub series: Vec<WeekPoint>,
    pub top_keys: Vec<TrendKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total: usize,
    pub validated: usize,
    pub scored: usize,
    pub promoters: usize,
    pub neutrals: usize,
    pub detractors: usize,
    pub compliance_rate: f64,
    pub promoter_rate: f64,
    pub neutral_rate: f64,
    pub detractor_rate: f64,
    pub avg_score: f64,
    pub nps: f64,
}
