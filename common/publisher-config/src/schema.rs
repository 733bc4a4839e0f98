//! On-disk shape of the publisher configuration
//!
//! The document is a single JSON object with camelCase keys. [`validate`]
//! checks an arbitrary parsed value against that shape, collecting every
//! violation, and fills declared defaults for absent optional fields.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation};

/// Schema version written by this build
pub const CURRENT_VERSION: &str = "1.0.0";

// ============================================================================
// Document Types
// ============================================================================

/// One managed site: a local working copy plus its optional remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    /// Unique identifier, also the registry key
    pub name: String,
    pub local_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    /// Mirror of `Configuration::active_repository`, recomputed on read
    #[serde(default)]
    pub is_active: bool,
    /// Reserved for extensions; never interpreted by the store
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub metadata: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RepositoryRecord {
    /// Create a record with both timestamps set to now
    pub fn new(name: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            local_path: local_path.into(),
            remote_url: None,
            published_url: None,
            created_at: now,
            last_used_at: now,
            is_active: false,
            metadata: Map::new(),
        }
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    pub fn with_published_url(mut self, url: impl Into<String>) -> Self {
        self.published_url = Some(url.into());
        self
    }
}

/// User defaults consulted by the tool handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub default_repo_name: String,
    pub auto_commit: bool,
    pub commit_message: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_repo_name: "artifact-gallery".to_string(),
            auto_commit: true,
            commit_message: "Publish artifact".to_string(),
        }
    }
}

/// The whole persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
    /// Authoritative pointer to the selected repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_repository: Option<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_template_path: Option<String>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub preferences: Preferences,
}

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

impl Configuration {
    pub fn find(&self, name: &str) -> Option<&RepositoryRecord> {
        self.repositories.iter().find(|r| r.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut RepositoryRecord> {
        self.repositories.iter_mut().find(|r| r.name == name)
    }

    /// Resolve the active repository
    ///
    /// The pointer wins when set; an unset pointer falls back to the first
    /// record flagged active. A stale pointer resolves to `None`.
    pub fn active(&self) -> Option<&RepositoryRecord> {
        match &self.active_repository {
            Some(name) => self.find(name),
            None => self.repositories.iter().find(|r| r.is_active),
        }
    }

    /// Point the selection at `name` (or nothing) and rederive every flag
    pub fn select(&mut self, name: Option<&str>) {
        self.active_repository = name.map(str::to_string);
        for record in &mut self.repositories {
            record.is_active = Some(record.name.as_str()) == name;
        }
    }

    /// Bring the per-record flags back in line with the pointer
    ///
    /// Returns true when anything changed.
    pub fn sync_active_flags(&mut self) -> bool {
        let before = (
            self.active_repository.clone(),
            self.repositories.iter().map(|r| r.is_active).collect::<Vec<_>>(),
        );

        let resolved = self.active().map(|r| r.name.clone());
        self.select(resolved.as_deref());

        let after = (
            self.active_repository.clone(),
            self.repositories.iter().map(|r| r.is_active).collect::<Vec<_>>(),
        );
        before != after
    }
}

// ============================================================================
// Defaults
// ============================================================================

/// Process-wide inputs used only when a fresh document is synthesized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultOptions {
    pub debug: bool,
    pub local_template_path: Option<String>,
}

/// A valid, empty configuration
pub fn create_default(options: &DefaultOptions) -> Configuration {
    Configuration {
        version: default_version(),
        repositories: Vec::new(),
        active_repository: None,
        debug: options.debug,
        local_template_path: options.local_template_path.clone(),
        last_updated: Utc::now(),
        preferences: Preferences::default(),
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a parsed JSON value and convert it into a [`Configuration`]
pub fn validate(raw: &Value) -> Result<Configuration, ValidationError> {
    let Some(root) = raw.as_object() else {
        return Err(ValidationError {
            violations: vec![Violation::new("$", "expected an object")],
        });
    };

    let mut violations = Vec::new();

    if let Some(value) = root.get("version") {
        match value.as_str() {
            Some(v) if semver::Version::parse(v).is_ok() => {}
            Some(v) => violations.push(Violation::new(
                "version",
                format!("'{v}' is not a semantic version"),
            )),
            None => violations.push(Violation::new("version", "expected a string")),
        }
    }
    check_nullable_string(root, "activeRepository", "activeRepository", &mut violations);
    check_bool(root, "debug", "debug", &mut violations);
    check_nullable_string(root, "localTemplatePath", "localTemplatePath", &mut violations);
    check_timestamp(root, "lastUpdated", "lastUpdated", false, &mut violations);

    match root.get("preferences") {
        None => {}
        Some(Value::Object(prefs)) => {
            check_string(prefs, "defaultRepoName", "preferences.defaultRepoName", false, &mut violations);
            check_bool(prefs, "autoCommit", "preferences.autoCommit", &mut violations);
            check_string(prefs, "commitMessage", "preferences.commitMessage", false, &mut violations);
        }
        Some(_) => violations.push(Violation::new("preferences", "expected an object")),
    }

    match root.get("repositories") {
        None => {}
        Some(Value::Array(items)) => {
            let mut seen = std::collections::HashSet::new();
            for (index, item) in items.iter().enumerate() {
                let path = format!("repositories[{index}]");
                check_record(item, &path, &mut violations);
                if let Some(name) = item.get("name").and_then(Value::as_str) {
                    if !seen.insert(name) {
                        violations.push(Violation::new(
                            format!("{path}.name"),
                            format!("duplicate repository name '{name}'"),
                        ));
                    }
                }
            }
        }
        Some(_) => violations.push(Violation::new("repositories", "expected an array")),
    }

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    serde_json::from_value(raw.clone()).map_err(|e| ValidationError {
        violations: vec![Violation::new("$", e.to_string())],
    })
}

/// Validate an in-memory document by round-tripping it through JSON
pub fn validate_config(config: &Configuration) -> Result<(), ValidationError> {
    let value = serde_json::to_value(config).map_err(|e| ValidationError {
        violations: vec![Violation::new("$", e.to_string())],
    })?;
    validate(&value).map(|_| ())
}

fn check_record(item: &Value, path: &str, violations: &mut Vec<Violation>) {
    let Some(record) = item.as_object() else {
        violations.push(Violation::new(path, "expected an object"));
        return;
    };

    check_string(record, "name", &format!("{path}.name"), true, violations);
    check_string(record, "localPath", &format!("{path}.localPath"), true, violations);
    check_nullable_string(record, "remoteUrl", &format!("{path}.remoteUrl"), violations);
    check_nullable_string(record, "publishedUrl", &format!("{path}.publishedUrl"), violations);
    check_timestamp(record, "createdAt", &format!("{path}.createdAt"), true, violations);
    check_timestamp(record, "lastUsedAt", &format!("{path}.lastUsedAt"), true, violations);
    check_bool(record, "isActive", &format!("{path}.isActive"), violations);

    match record.get("metadata") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => violations.push(Violation::new(format!("{path}.metadata"), "expected an object")),
    }
}

fn check_string(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
    required: bool,
    violations: &mut Vec<Violation>,
) {
    match obj.get(key) {
        None if required => violations.push(Violation::new(field, "is required")),
        None => {}
        Some(Value::String(s)) if required && s.trim().is_empty() => {
            violations.push(Violation::new(field, "must not be empty"))
        }
        Some(Value::String(_)) => {}
        Some(_) => violations.push(Violation::new(field, "expected a string")),
    }
}

fn check_nullable_string(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
    violations: &mut Vec<Violation>,
) {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => violations.push(Violation::new(field, "expected a string or null")),
    }
}

fn check_bool(obj: &Map<String, Value>, key: &str, field: &str, violations: &mut Vec<Violation>) {
    match obj.get(key) {
        None | Some(Value::Bool(_)) => {}
        Some(_) => violations.push(Violation::new(field, "expected a boolean")),
    }
}

fn check_timestamp(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
    required: bool,
    violations: &mut Vec<Violation>,
) {
    match obj.get(key) {
        None if required => violations.push(Violation::new(field, "is required")),
        None => {}
        Some(Value::String(s)) => {
            if DateTime::parse_from_rfc3339(s).is_err() {
                violations.push(Violation::new(
                    field,
                    format!("'{s}' is not an ISO-8601 timestamp"),
                ));
            }
        }
        Some(_) => violations.push(Violation::new(field, "expected a timestamp string")),
    }
}
