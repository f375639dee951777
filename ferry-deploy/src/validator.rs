//! Descriptor validation
//!
//! Checks a raw JSON document against the descriptor schema before anything
//! touches the network, and turns it into a typed [`DeploymentDescriptor`].
//! Errors carry the dotted path of the offending value, e.g.
//! `script_storage.tick.interval`.

use ferry_core::domain::OrderedMap;
use ferry_core::domain::descriptor::{
    DESCRIPTOR_SECTIONS, DeploymentDescriptor, MIN_SCRIPT_INTERVAL_SECS,
};
use regex::Regex;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Pattern every section key must match
static IDENTIFIER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]+$").ok());

const SERVICE_FIELDS: &[&str] = &["node", "dependencies"];
const MODULE_FIELDS: &[&str] = &["file", "url", "config"];
const SCRIPT_FIELDS: &[&str] = &["file", "url", "variables"];
const SCRIPT_STORAGE_FIELDS: &[&str] = &["file", "url", "node", "interval"];

/// A descriptor value that does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending value (empty for the document itself)
    pub path: String,
    /// What was expected there
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

type Result<T> = std::result::Result<T, ValidationError>;

/// Checks whether a section key is a valid identifier
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

/// Validates a raw descriptor and applies defaults
///
/// Performs no I/O. On success every entry is typed, `dependencies` defaults
/// to an empty list and `interval` to three seconds.
pub fn validate(raw: &Value) -> Result<DeploymentDescriptor> {
    let root = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("", "descriptor must be a JSON object"))?;

    if let Some(unknown) = root
        .keys()
        .find(|key| !DESCRIPTOR_SECTIONS.contains(&key.as_str()))
    {
        return Err(ValidationError::new(
            unknown.as_str(),
            format!(
                "unknown section, expected one of: {}",
                DESCRIPTOR_SECTIONS.join(", ")
            ),
        ));
    }

    Ok(DeploymentDescriptor {
        services: section(root, "services", SERVICE_FIELDS, |_, _| Ok(()))?,
        modules: section(root, "modules", MODULE_FIELDS, check_source)?,
        scripts: section(root, "scripts", SCRIPT_FIELDS, check_source)?,
        script_storage: section(root, "script_storage", SCRIPT_STORAGE_FIELDS, |path, entry| {
            check_source(path, entry)?;
            check_interval(path, entry)
        })?,
    })
}

/// Validates one section and types its entries
fn section<T, F>(
    root: &Map<String, Value>,
    name: &str,
    fields: &[&str],
    check: F,
) -> Result<OrderedMap<T>>
where
    T: DeserializeOwned,
    F: Fn(&str, &Map<String, Value>) -> Result<()>,
{
    let entries = match root.get(name) {
        Some(Value::Object(entries)) => entries,
        Some(_) => return Err(ValidationError::new(name, "must be an object")),
        None => return Err(ValidationError::new(name, "section is required")),
    };

    let mut typed = OrderedMap::new();
    for (key, value) in entries {
        let path = format!("{}.{}", name, key);

        if !is_identifier(key) {
            return Err(ValidationError::new(
                path,
                "name must start with a letter and contain at least two letters, digits or underscores",
            ));
        }

        let entry = value
            .as_object()
            .ok_or_else(|| ValidationError::new(path.as_str(), "must be an object"))?;

        if let Some(unknown) = entry.keys().find(|field| !fields.contains(&field.as_str())) {
            return Err(ValidationError::new(
                format!("{}.{}", path, unknown),
                format!("unknown field, expected one of: {}", fields.join(", ")),
            ));
        }

        check(&path, entry)?;

        let spec = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::new(path.as_str(), e.to_string()))?;
        typed.insert(key.as_str(), spec);
    }

    Ok(typed)
}

/// Requires `file` or `url`, and an absolute `url`
fn check_source(path: &str, entry: &Map<String, Value>) -> Result<()> {
    if !entry.contains_key("file") && !entry.contains_key("url") {
        return Err(ValidationError::new(
            path,
            "must specify at least one of 'file' or 'url'",
        ));
    }

    if let Some(url) = entry.get("url") {
        let url_path = format!("{}.url", path);
        let url = url
            .as_str()
            .ok_or_else(|| ValidationError::new(url_path.as_str(), "must be a string"))?;
        Url::parse(url).map_err(|e| {
            ValidationError::new(url_path.as_str(), format!("must be an absolute URL ({})", e))
        })?;
    }

    Ok(())
}

/// Rejects intervals below the minimum
fn check_interval(path: &str, entry: &Map<String, Value>) -> Result<()> {
    let Some(interval) = entry.get("interval") else {
        return Ok(());
    };

    let interval_path = format!("{}.interval", path);
    match interval.as_f64() {
        Some(secs) if secs >= MIN_SCRIPT_INTERVAL_SECS as f64 => Ok(()),
        Some(_) => Err(ValidationError::new(
            interval_path,
            format!("must be at least {} seconds", MIN_SCRIPT_INTERVAL_SECS),
        )),
        None => Err(ValidationError::new(interval_path, "must be a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::domain::descriptor::DEFAULT_SCRIPT_INTERVAL_SECS;
    use serde_json::json;

    fn descriptor() -> Value {
        json!({
            "services": {
                "db": { "node": "12D3node1", "dependencies": ["sqlite3"] },
                "cache": { "node": "12D3node1" }
            },
            "modules": {
                "sqlite3": { "file": "sqlite3.wasm", "config": { "mem_pages_count": 200 } }
            },
            "scripts": {
                "init": { "url": "https://example.com/init.air", "variables": { "table": "users" } }
            },
            "script_storage": {
                "tick": { "file": "tick.air", "node": "12D3node1" }
            }
        })
    }

    fn error_path(raw: &Value) -> String {
        validate(raw).unwrap_err().path
    }

    #[test]
    fn test_valid_descriptor_gets_defaults() {
        let validated = validate(&descriptor()).unwrap();

        assert_eq!(
            validated.services.keys().collect::<Vec<_>>(),
            vec!["db", "cache"]
        );
        assert!(validated.services.get("cache").unwrap().dependencies.is_empty());
        assert_eq!(
            validated.script_storage.get("tick").unwrap().interval,
            DEFAULT_SCRIPT_INTERVAL_SECS
        );
        assert_eq!(
            validated.modules.get("sqlite3").unwrap().config.mem_pages_count,
            Some(200)
        );
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let mut raw = descriptor();
        raw["extra"] = json!({});
        assert_eq!(error_path(&raw), "extra");
    }

    #[test]
    fn test_every_section_is_required() {
        let mut raw = descriptor();
        raw.as_object_mut().unwrap().remove("scripts");
        let err = validate(&raw).unwrap_err();

        assert_eq!(err.path, "scripts");
        assert_eq!(err.message, "section is required");
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(is_identifier("db"));
        assert!(is_identifier("Sqlite_3"));
        assert!(!is_identifier("a"));
        assert!(!is_identifier("1db"));
        assert!(!is_identifier("my-service"));
        assert!(!is_identifier("_db"));

        let mut raw = descriptor();
        raw["modules"]["my-module"] = json!({ "file": "m.wasm" });
        assert_eq!(error_path(&raw), "modules.my-module");
    }

    #[test]
    fn test_unknown_entry_field_rejected() {
        let mut raw = descriptor();
        raw["services"]["db"]["replicas"] = json!(3);
        assert_eq!(error_path(&raw), "services.db.replicas");

        let mut raw = descriptor();
        raw["modules"]["sqlite3"]["config"]["threads"] = json!(4);
        assert_eq!(error_path(&raw), "modules.sqlite3");
    }

    #[test]
    fn test_source_required() {
        let mut raw = descriptor();
        raw["scripts"]["init"] = json!({ "variables": {} });
        let err = validate(&raw).unwrap_err();

        assert_eq!(err.path, "scripts.init");
        assert!(err.message.contains("'file' or 'url'"));
    }

    #[test]
    fn test_url_must_be_absolute() {
        let mut raw = descriptor();
        raw["scripts"]["init"]["url"] = json!("/relative/init.air");
        assert_eq!(error_path(&raw), "scripts.init.url");
    }

    #[test]
    fn test_interval_accepts_any_number_of_seconds() {
        let mut raw = descriptor();
        raw["script_storage"]["tick"]["interval"] = json!(3.0);
        let validated = validate(&raw).unwrap();
        assert_eq!(validated.script_storage.get("tick").unwrap().interval, 3);

        raw["script_storage"]["tick"]["interval"] = json!(4.5);
        let validated = validate(&raw).unwrap();
        assert_eq!(validated.script_storage.get("tick").unwrap().interval, 5);
    }

    #[test]
    fn test_interval_minimum() {
        let mut raw = descriptor();
        raw["script_storage"]["tick"]["interval"] = json!(2);
        let err = validate(&raw).unwrap_err();
        assert_eq!(err.path, "script_storage.tick.interval");

        raw["script_storage"]["tick"]["interval"] = json!(2.9);
        assert_eq!(error_path(&raw), "script_storage.tick.interval");

        raw["script_storage"]["tick"]["interval"] = json!(3);
        assert!(validate(&raw).is_ok());

        raw["script_storage"]["tick"]["interval"] = json!("soon");
        assert_eq!(error_path(&raw), "script_storage.tick.interval");
    }

    #[test]
    fn test_wrong_field_type_reported_on_entry() {
        let mut raw = descriptor();
        raw["services"]["db"]["node"] = json!(42);
        assert_eq!(error_path(&raw), "services.db");

        let mut raw = descriptor();
        raw["services"]["db"].as_object_mut().unwrap().remove("node");
        assert_eq!(error_path(&raw), "services.db");
    }

    #[test]
    fn test_non_object_document_rejected() {
        assert_eq!(error_path(&json!([])), "");

        let mut raw = descriptor();
        raw["services"] = json!([]);
        assert_eq!(error_path(&raw), "services");
    }
}
