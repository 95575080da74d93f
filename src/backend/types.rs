use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::timestamps;

/// Defect record as returned by `GET /defects`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "stringified")]
    pub status: String,
    #[serde(default, deserialize_with = "optional_stringified")]
    pub priority: Option<String>,
    #[serde(default)]
    pub project: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "timestamps::deserialize_required")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamps::deserialize_optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The part of `GET /defects/{id}` this service reads. Events stay raw
/// so a bad entry only drops itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectDetailDto {
    #[serde(default)]
    pub audit_events: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditEventDto {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    new_value: Option<Value>,
    #[serde(default, deserialize_with = "timestamps::deserialize_optional")]
    created_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Category values are compared as text, so scalars of any JSON type are
/// accepted and keyed by their string form.
fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn stringified<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    stringify(Value::deserialize(deserializer)?)
        .ok_or_else(|| D::Error::custom("expected a value, found null"))
}

fn optional_stringified<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(stringify(Value::deserialize(deserializer)?))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefectStatus {
    Open,
    Reopened,
    Resolved,
    Closed,
    Other(String),
}

impl DefectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Reopened => "REOPENED",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl From<&str> for DefectStatus {
    fn from(value: &str) -> Self {
        match value {
            "OPEN" => Self::Open,
            "REOPENED" => Self::Reopened,
            "RESOLVED" => Self::Resolved,
            "CLOSED" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Defect {
    pub id: String,
    pub status: DefectStatus,
    pub priority: Option<String>,
    pub project: Option<String>,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Defect {
    /// Text used for topic clustering.
    pub fn document(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

impl From<DefectDto> for Defect {
    fn from(dto: DefectDto) -> Self {
        Self {
            status: DefectStatus::from(dto.status.as_str()),
            project: dto.project.as_ref().and_then(project_label),
            id: dto.id,
            priority: dto.priority,
            title: dto.title.unwrap_or_default(),
            description: dto.description.unwrap_or_default(),
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}

/// Projects arrive either embedded (`{"id": .., "name": ..}`) or as a bare
/// reference. Prefer the name, then the id, then the raw value.
fn project_label(project: &Value) -> Option<String> {
    match project {
        Value::Null => None,
        Value::String(name) => Some(name.clone()),
        Value::Object(fields) => match (fields.get("name"), fields.get("id")) {
            (Some(Value::String(name)), _) => Some(name.clone()),
            (_, Some(Value::String(id))) => Some(id.clone()),
            (_, Some(Value::Number(id))) => Some(id.to_string()),
            _ => Some(project.to_string()),
        },
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEventKind {
    StatusChange,
    Other(String),
}

impl From<&str> for AuditEventKind {
    fn from(value: &str) -> Self {
        match value {
            "STATUS_CHANGE" => Self::StatusChange,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub defect_id: String,
    pub kind: AuditEventKind,
    pub new_value: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AuditEvent {
    pub fn from_raw(defect_id: &str, raw: Value) -> serde_json::Result<Self> {
        let dto: AuditEventDto = serde_json::from_value(raw)?;

        Ok(Self {
            defect_id: defect_id.to_string(),
            kind: AuditEventKind::from(dto.kind.as_str()),
            new_value: dto.new_value,
            created_at: dto.created_at,
        })
    }

    /// Target status of a status-change event. `None` for other event
    /// kinds and for payloads that do not decode to an object with a
    /// string `status` field.
    pub fn new_status(&self) -> Option<DefectStatus> {
        if self.kind != AuditEventKind::StatusChange {
            return None;
        }

        let payload = match self.new_value.as_ref()? {
            Value::String(encoded) => serde_json::from_str::<Value>(encoded).ok()?,
            other => other.clone(),
        };

        payload
            .get("status")
            .and_then(Value::as_str)
            .map(DefectStatus::from)
    }
}
