use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Attribute names used in queries against the files collection.
pub mod attr {
    pub const EMAIL: &str = "email";
    pub const FOLDER_ID: &str = "folderId";
    pub const STARRED: &str = "starred";
}

/// A file record stored in the metadata store.
///
/// Field names follow the document wire format so the same type round-trips
/// through the local redb store and the hosted document API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "$id")]
    pub id: String,
    /// Blob id in the blob store
    pub file: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    /// Owner. Set once at creation.
    pub email: String,
    pub preview_url: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub starred: bool,
    #[serde(rename = "$permissions", default)]
    pub permissions: Vec<Permission>,
}

impl FileRecord {
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.email == email
    }
}

/// Documents created before `starred` existed carry `null` for it.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Partial update of a file record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
}

impl FilePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn starred(starred: bool) -> Self {
        Self {
            starred: Some(starred),
            ..Default::default()
        }
    }

    /// Point the record at a new blob. The preview URL must be the one derived
    /// from `file`, never the previous one.
    pub fn replace_blob(
        file: impl Into<String>,
        mime_type: impl Into<String>,
        preview_url: impl Into<String>,
    ) -> Self {
        Self {
            file: Some(file.into()),
            mime_type: Some(mime_type.into()),
            preview_url: Some(preview_url.into()),
            ..Default::default()
        }
    }

    pub fn apply(&self, record: &mut FileRecord) {
        if let Some(ref file) = self.file {
            record.file = file.clone();
        }
        if let Some(ref name) = self.name {
            record.name = name.clone();
        }
        if let Some(ref mime_type) = self.mime_type {
            record.mime_type = mime_type.clone();
        }
        if let Some(ref preview_url) = self.preview_url {
            record.preview_url = preview_url.clone();
        }
        if let Some(starred) = self.starred {
            record.starred = starred;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryMethod {
    Equal,
}

/// An equality predicate on a document attribute. A slice of queries is the
/// logical AND of its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub method: QueryMethod,
    pub attribute: String,
    pub values: Vec<serde_json::Value>,
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            method: QueryMethod::Equal,
            attribute: attribute.to_string(),
            values: vec![value.into()],
        }
    }

    /// The string form sent as a `queries[]` parameter.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Evaluate against a document in its JSON form.
    pub fn matches(&self, document: &serde_json::Value) -> bool {
        let actual = document
            .get(&self.attribute)
            .unwrap_or(&serde_json::Value::Null);
        match self.method {
            QueryMethod::Equal => self.values.iter().any(|v| v == actual),
        }
    }

    /// The single string value this query pins `attribute` to, if any.
    pub fn pinned_str(&self, attribute: &str) -> Option<&str> {
        match (self.method, self.values.as_slice()) {
            (QueryMethod::Equal, [value]) if self.attribute == attribute => value.as_str(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    Write,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Write => "write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Any,
    Users,
    User(String),
    /// Any other role the document API grants (`guests`, `team:<id>`,
    /// `label:<x>`, ...), kept verbatim.
    Other(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Any => f.write_str("any"),
            Role::Users => f.write_str("users"),
            Role::User(id) => write!(f, "user:{id}"),
            Role::Other(role) => f.write_str(role),
        }
    }
}

/// A document permission, rendered as `action("role")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Permission {
    pub action: Action,
    pub role: Role,
}

impl Permission {
    pub fn write(role: Role) -> Self {
        Self {
            action: Action::Write,
            role,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(\"{}\")", self.action.as_str(), self.role)
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (action, rest) = s
            .split_once('(')
            .ok_or_else(|| format!("malformed permission: {s}"))?;
        let role = rest
            .strip_suffix(')')
            .map(|r| r.trim_matches('"'))
            .ok_or_else(|| format!("malformed permission: {s}"))?;

        let action = match action {
            "read" => Action::Read,
            "update" => Action::Update,
            "delete" => Action::Delete,
            "write" => Action::Write,
            other => return Err(format!("unknown permission action: {other}")),
        };
        let role = match role {
            "any" => Role::Any,
            "users" => Role::Users,
            other => match other.strip_prefix("user:") {
                Some(id) if !id.contains('/') => Role::User(id.to_string()),
                _ => Role::Other(other.to_string()),
            },
        };

        Ok(Permission { action, role })
    }
}
