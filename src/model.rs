use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Default API root of the automation service (Flask blueprint mounted under `/api/automation`).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api/automation";
/// File name used for CSV exports of the application history.
pub const EXPORT_FILENAME: &str = "linkedin_applications.csv";
/// Number of submissions shown in the dashboard's "recent" panel.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub notice_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub page_size: usize,
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(3),
            notice_ttl: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
            page_size: 50,
            user_agent: format!("autoapply-dashboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
}

impl RunState {
    pub fn is_running(self) -> bool {
        self == RunState::Running
    }

    pub fn toggled(self) -> Self {
        match self {
            RunState::Stopped => RunState::Running,
            RunState::Running => RunState::Stopped,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RunState::Stopped => "Stopped",
            RunState::Running => "Running",
        }
    }
}

/// Cached mirror of the service's run status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StatusWire")]
pub struct RunStatus {
    pub state: RunState,
    /// Whole seconds since the run started. Only populated while running.
    pub duration_seconds: Option<u64>,
    pub start_time: Option<String>,
    pub applications_count: Option<u64>,
}

impl RunStatus {
    pub fn stopped() -> Self {
        Self::tentative(RunState::Stopped)
    }

    /// A locally assumed status with no server-side details attached.
    pub fn tentative(state: RunState) -> Self {
        Self {
            state,
            duration_seconds: None,
            start_time: None,
            applications_count: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::stopped()
    }
}

/// `GET /status` body. The service reports `duration_seconds` as a float (or null).
/// Snapshots written by this crate carry `state` instead of `is_running`.
#[derive(Debug, Deserialize)]
struct StatusWire {
    #[serde(default)]
    is_running: Option<bool>,
    #[serde(default)]
    state: Option<RunState>,
    #[serde(default)]
    duration_seconds: Option<f64>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    applications_count: Option<u64>,
}

impl TryFrom<StatusWire> for RunStatus {
    type Error = String;

    fn try_from(w: StatusWire) -> Result<Self, Self::Error> {
        let state = match (w.is_running, w.state) {
            (Some(true), _) => RunState::Running,
            (Some(false), _) => RunState::Stopped,
            (None, Some(s)) => s,
            (None, None) => return Err("status body has neither `is_running` nor `state`".into()),
        };
        let duration_seconds = if state.is_running() {
            w.duration_seconds
                .filter(|d| d.is_finite())
                .map(|d| d.max(0.0).floor() as u64)
        } else {
            None
        };
        Ok(Self {
            state,
            duration_seconds,
            start_time: w.start_time,
            applications_count: w.applications_count,
        })
    }
}

/// Aggregate counters as computed by the service. Never derived locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, alias = "total_applications")]
    pub total: u64,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub skipped: Option<u64>,
    #[serde(default)]
    pub daily: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplicationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationId::Number(n) => write!(f, "{n}"),
            ApplicationId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Successful,
    Failed,
    /// Any other server value (e.g. `skipped:<reason>`), kept verbatim.
    Other(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::Successful => "successful",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ApplicationStatus::Successful => "Applied",
            ApplicationStatus::Failed => "Failed",
            ApplicationStatus::Other(s) => s,
        }
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "successful" => ApplicationStatus::Successful,
            "failed" => ApplicationStatus::Failed,
            _ => ApplicationStatus::Other(s),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(s: ApplicationStatus) -> Self {
        s.as_str().to_string()
    }
}

/// One submitted application, immutable once created on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub salary: String,
    pub status: ApplicationStatus,
    #[serde(default, deserialize_with = "lenient::string")]
    pub applied_at: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
}

impl Application {
    /// Parse `applied_at`. The service emits either SQLite `YYYY-MM-DD HH:MM:SS` or ISO-8601.
    pub fn applied_at_time(&self) -> Option<time::PrimitiveDateTime> {
        parse_timestamp(&self.applied_at)
    }

    pub fn applied_time_of_day(&self) -> String {
        let fmt = time::macros::format_description!("[hour]:[minute]:[second]");
        self.applied_at_time()
            .and_then(|t| t.format(&fmt).ok())
            .unwrap_or_else(|| self.applied_at.clone())
    }

    pub fn applied_date_time(&self) -> String {
        let fmt = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]");
        self.applied_at_time()
            .and_then(|t| t.format(&fmt).ok())
            .unwrap_or_else(|| self.applied_at.clone())
    }
}

fn parse_timestamp(raw: &str) -> Option<time::PrimitiveDateTime> {
    let fmt = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let raw = raw.trim();
    // Drop fractional seconds and any zone suffix; the service's timestamps are naive.
    let head: String = raw.chars().take(19).collect();
    let normalized = head.replacen('T', " ", 1);
    time::PrimitiveDateTime::parse(&normalized, &fmt).ok()
}

/// `GET /applications` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationsPage {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Search and form-filling configuration of the automation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient::string")]
    pub keywords: String,
    #[serde(deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(deserialize_with = "lenient::string")]
    pub experience_level: String,
    #[serde(deserialize_with = "lenient::string")]
    pub salary_min: String,
    #[serde(deserialize_with = "lenient::string")]
    pub job_type: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub remote: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub hybrid: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub onsite: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub auto_answer: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub years_experience: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_letter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords: "software engineer, backend developer, full stack developer".into(),
            location: "United States".into(),
            experience_level: "1-3 years".into(),
            salary_min: "80000".into(),
            job_type: "Full-time".into(),
            remote: true,
            hybrid: true,
            onsite: true,
            auto_answer: true,
            years_experience: "3".into(),
            cover_letter: "Dear Hiring Manager,\n\nI am excited to apply for this position. With my \
                background in software engineering and passion for technology, I believe I would \
                be a valuable addition to your team.\n\nBest regards"
                .into(),
        }
    }
}

/// Editable settings fields, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Keywords,
    Location,
    ExperienceLevel,
    SalaryMin,
    JobType,
    Remote,
    Hybrid,
    Onsite,
    AutoAnswer,
    YearsExperience,
    CoverLetter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl SettingsField {
    pub const ALL: [SettingsField; 11] = [
        SettingsField::Keywords,
        SettingsField::Location,
        SettingsField::ExperienceLevel,
        SettingsField::SalaryMin,
        SettingsField::JobType,
        SettingsField::Remote,
        SettingsField::Hybrid,
        SettingsField::Onsite,
        SettingsField::AutoAnswer,
        SettingsField::YearsExperience,
        SettingsField::CoverLetter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Keywords => "Keywords",
            SettingsField::Location => "Location",
            SettingsField::ExperienceLevel => "Experience level",
            SettingsField::SalaryMin => "Minimum salary",
            SettingsField::JobType => "Job type",
            SettingsField::Remote => "Remote",
            SettingsField::Hybrid => "Hybrid",
            SettingsField::Onsite => "On-site",
            SettingsField::AutoAnswer => "Auto-answer questions",
            SettingsField::YearsExperience => "Years of experience",
            SettingsField::CoverLetter => "Cover letter",
        }
    }

    pub fn is_flag(self) -> bool {
        matches!(
            self,
            SettingsField::Remote
                | SettingsField::Hybrid
                | SettingsField::Onsite
                | SettingsField::AutoAnswer
        )
    }

    pub fn get(self, s: &Settings) -> FieldValue {
        match self {
            SettingsField::Keywords => FieldValue::Text(s.keywords.clone()),
            SettingsField::Location => FieldValue::Text(s.location.clone()),
            SettingsField::ExperienceLevel => FieldValue::Text(s.experience_level.clone()),
            SettingsField::SalaryMin => FieldValue::Text(s.salary_min.clone()),
            SettingsField::JobType => FieldValue::Text(s.job_type.clone()),
            SettingsField::Remote => FieldValue::Flag(s.remote),
            SettingsField::Hybrid => FieldValue::Flag(s.hybrid),
            SettingsField::Onsite => FieldValue::Flag(s.onsite),
            SettingsField::AutoAnswer => FieldValue::Flag(s.auto_answer),
            SettingsField::YearsExperience => FieldValue::Text(s.years_experience.clone()),
            SettingsField::CoverLetter => FieldValue::Text(s.cover_letter.clone()),
        }
    }

    /// Write `value` into `s`. Returns false when the value kind does not fit the field.
    pub fn set(self, s: &mut Settings, value: FieldValue) -> bool {
        match (self, value) {
            (SettingsField::Keywords, FieldValue::Text(v)) => s.keywords = v,
            (SettingsField::Location, FieldValue::Text(v)) => s.location = v,
            (SettingsField::ExperienceLevel, FieldValue::Text(v)) => s.experience_level = v,
            (SettingsField::SalaryMin, FieldValue::Text(v)) => s.salary_min = v,
            (SettingsField::JobType, FieldValue::Text(v)) => s.job_type = v,
            (SettingsField::Remote, FieldValue::Flag(v)) => s.remote = v,
            (SettingsField::Hybrid, FieldValue::Flag(v)) => s.hybrid = v,
            (SettingsField::Onsite, FieldValue::Flag(v)) => s.onsite = v,
            (SettingsField::AutoAnswer, FieldValue::Flag(v)) => s.auto_answer = v,
            (SettingsField::YearsExperience, FieldValue::Text(v)) => s.years_experience = v,
            (SettingsField::CoverLetter, FieldValue::Text(v)) => s.cover_letter = v,
            _ => return false,
        }
        true
    }
}

/// Format a run duration as `1h 2m 3s`, `2m 5s` or `7s`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Decoders for the service's loosely typed rows (SQLite integers for booleans, numbers for text inputs).
mod lenient {
    use super::*;
    use serde::de::Error;
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(D::Error::custom(format!("expected text, got {other}"))),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                other => Err(D::Error::custom(format!("expected a flag, got {other:?}"))),
            },
            // Unset flags default to enabled, like the service does.
            Value::Null => Ok(true),
            other => Err(D::Error::custom(format!("expected a flag, got {other}"))),
        }
    }
}
