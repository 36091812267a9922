//! Manifest validation against the host naming rules

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::ConfigResult;
use crate::library::{module_folders, read_json};

static GUID: OnceLock<Option<Regex>> = OnceLock::new();
static MODULE_NAME: OnceLock<Option<Regex>> = OnceLock::new();
static PREFIX: OnceLock<Option<Regex>> = OnceLock::new();

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` with uppercase hex, braces optional
pub fn is_valid_guid(guid: &str) -> bool {
    matches(
        &GUID,
        r"^\{?[A-Z0-9]{8}-[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{12}\}?$",
        guid,
    )
}

/// Alphanumerics, spaces and underscores; no leading or trailing space
pub fn is_valid_module_name(name: &str) -> bool {
    matches(
        &MODULE_NAME,
        r"^[A-Za-z0-9](?:[A-Za-z0-9 _]*[A-Za-z0-9])?$",
        name,
    )
}

/// Uppercase alphanumerics
pub fn is_valid_prefix(prefix: &str) -> bool {
    matches(&PREFIX, r"^[A-Z0-9]+$", prefix)
}

pub fn is_valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// A single rule violation in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

struct Checker<'a> {
    path: PathBuf,
    json: &'a Value,
    issues: Vec<ValidationIssue>,
}

impl<'a> Checker<'a> {
    fn new(path: PathBuf, json: &'a Value) -> Self {
        Self {
            path,
            json,
            issues: Vec::new(),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: self.path.clone(),
            message: message.into(),
        });
    }

    fn string(&mut self, key: &str) -> Option<&'a str> {
        let json = self.json;
        match json.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.fail(format!("'{}' must be a string", key));
                None
            }
            None => {
                self.fail(format!("'{}' is missing", key));
                None
            }
        }
    }

    fn integer(&mut self, key: &str) -> Option<i64> {
        let json = self.json;
        match json.get(key) {
            Some(v) if v.is_i64() => v.as_i64(),
            Some(_) => {
                self.fail(format!("'{}' must be an integer", key));
                None
            }
            None => {
                self.fail(format!("'{}' is missing", key));
                None
            }
        }
    }

    fn array(&mut self, key: &str) -> Option<&'a Vec<Value>> {
        let json = self.json;
        match json.get(key) {
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.fail(format!("'{}' must be an array", key));
                None
            }
            None => {
                self.fail(format!("'{}' is missing", key));
                None
            }
        }
    }

    fn guid(&mut self, key: &str, what: &str) {
        if let Some(id) = self.string(key) {
            if !is_valid_guid(id) {
                self.fail(format!("{} id is not a valid GUID", what));
            }
        }
    }

    fn url(&mut self, key: &str, what: &str) {
        if let Some(url) = self.string(key) {
            if !is_valid_url(url) {
                self.fail(format!("{} url is not valid", what));
            }
        }
    }

    fn guid_list(&mut self, key: &str) {
        if let Some(items) = self.array(key) {
            for item in items {
                match item.as_str() {
                    Some(guid) if is_valid_guid(guid) => {}
                    _ => self.fail(format!("'{}' contains an invalid GUID", key)),
                }
            }
        }
    }
}

/// Validate a library folder and all of its module folders
///
/// Returns the list of rule violations; I/O and JSON syntax errors of
/// `library.json` itself are returned as errors.
pub fn validate_library(dir: impl AsRef<Path>) -> ConfigResult<Vec<ValidationIssue>> {
    let dir = dir.as_ref();
    let path = dir.join("library.json");
    let json: Value = read_json(&path)?;

    let mut checker = Checker::new(path, &json);
    checker.guid("id", "library");
    checker.string("author");
    checker.string("name");
    checker.url("url", "library");
    checker.string("version");
    checker.integer("build");
    checker.integer("date");

    let expected_keys = match json.get("compatibility") {
        None => 7,
        Some(Value::Object(compat)) => {
            if compat.get("version").is_some_and(|v| !v.is_string()) {
                checker.fail("'compatibility.version' must be a string");
            }
            if compat.get("date").is_some_and(|v| !v.is_i64()) {
                checker.fail("'compatibility.date' must be an integer");
            }
            8
        }
        Some(_) => {
            checker.fail("'compatibility' must be an object");
            8
        }
    };
    if json.as_object().map_or(0, |o| o.len()) != expected_keys {
        checker.fail(format!("library.json must have exactly {} keys", expected_keys));
    }

    let mut issues = checker.issues;
    for folder in module_folders(dir)? {
        issues.extend(validate_module(&folder)?);
    }
    Ok(issues)
}

/// Validate a single module folder
pub fn validate_module(dir: impl AsRef<Path>) -> ConfigResult<Vec<ValidationIssue>> {
    let dir = dir.as_ref();
    let path = dir.join("module.json");
    if !path.exists() {
        return Ok(vec![ValidationIssue {
            path,
            message: "module json is missing".to_string(),
        }]);
    }

    let json: Value = read_json(&path)?;
    let mut checker = Checker::new(path, &json);

    checker.guid("id", "module");
    if let Some(name) = checker.string("name") {
        if !is_valid_module_name(name) {
            checker.fail("module name is not valid");
        }
    }
    if let Some(module_type) = checker.integer("type") {
        if !(0..=5).contains(&module_type) {
            checker.fail("module type must be between 0 and 5");
        }
    }
    checker.string("vendor");
    checker.array("aliases");
    checker.url("url", "module");
    checker.guid_list("parentRequirements");
    checker.guid_list("childRequirements");
    checker.guid_list("implemented");
    if let Some(prefix) = checker.string("prefix") {
        if !is_valid_prefix(prefix) {
            checker.fail("module prefix is not valid");
        }
    }

    for extra in ["form.json", "locale.json"] {
        let extra_path = dir.join(extra);
        if extra_path.exists() && read_json::<Value>(&extra_path).is_err() {
            checker.fail(format!("module {} is invalid JSON", extra));
        }
    }

    Ok(checker.issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ==================== Naming Rules ====================

    #[test]
    fn test_guid_rule() {
        assert!(is_valid_guid("{43192F0B-135B-4CE7-A0A7-1475603F3060}"));
        assert!(is_valid_guid("43192F0B-135B-4CE7-A0A7-1475603F3060"));
        assert!(!is_valid_guid("{43192f0b-135b-4ce7-a0a7-1475603f3060}"));
        assert!(!is_valid_guid("{43192F0B-135B-4CE7-A0A7}"));
    }

    #[test]
    fn test_name_rule() {
        assert!(is_valid_module_name("Archive Control"));
        assert!(is_valid_module_name("A"));
        assert!(is_valid_module_name("My_Module 2"));
        assert!(!is_valid_module_name(" Leading"));
        assert!(!is_valid_module_name("Trailing "));
        assert!(!is_valid_module_name("Bad-Name"));
        assert!(!is_valid_module_name(""));
    }

    #[test]
    fn test_prefix_and_url_rules() {
        assert!(is_valid_prefix("AC"));
        assert!(is_valid_prefix("MB2"));
        assert!(!is_valid_prefix("ac"));
        assert!(is_valid_url("https://example.org"));
        assert!(is_valid_url("http://example.org"));
        assert!(!is_valid_url("ftp://example.org"));
    }

    // ==================== Folder Validation ====================

    fn make_test_library(module_json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("library.json"),
            r#"{"id": "{11111111-2222-3333-4444-555555555555}", "author": "Jane",
                "name": "Demo", "url": "https://example.org", "version": "1.0",
                "build": 1, "date": 0}"#,
        )
        .unwrap();
        let module = dir.path().join("Demo");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("module.json"), module_json).unwrap();
        dir
    }

    const VALID_MODULE: &str = r#"{"id": "{AAAAAAAA-0000-0000-0000-000000000000}",
        "name": "Demo Device", "type": 3, "vendor": "", "aliases": [],
        "url": "https://example.org", "parentRequirements": [],
        "childRequirements": [], "implemented": [], "prefix": "DEMO"}"#;

    #[test]
    fn test_valid_library_has_no_issues() {
        let dir = make_test_library(VALID_MODULE);
        assert!(validate_library(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_module_reports_issues() {
        let dir = make_test_library(
            r#"{"id": "nope", "name": " bad", "type": 9, "vendor": "", "aliases": [],
                "url": "ftp://x", "parentRequirements": ["x"], "childRequirements": [],
                "implemented": [], "prefix": "lower"}"#,
        );
        let issues = validate_library(dir.path()).unwrap();
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"module id is not a valid GUID"));
        assert!(messages.contains(&"module name is not valid"));
        assert!(messages.contains(&"module type must be between 0 and 5"));
        assert!(messages.contains(&"module url is not valid"));
        assert!(messages.contains(&"'parentRequirements' contains an invalid GUID"));
        assert!(messages.contains(&"module prefix is not valid"));
    }

    #[test]
    fn test_invalid_form_json() {
        let dir = make_test_library(VALID_MODULE);
        fs::write(dir.path().join("Demo").join("form.json"), "{").unwrap();
        let issues = validate_library(dir.path()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "module form.json is invalid JSON");
    }

    #[test]
    fn test_library_extra_keys() {
        let dir = make_test_library(VALID_MODULE);
        fs::write(
            dir.path().join("library.json"),
            r#"{"id": "{11111111-2222-3333-4444-555555555555}", "author": "Jane",
                "name": "Demo", "url": "https://example.org", "version": "1.0",
                "build": 1, "date": 0, "extra": true}"#,
        )
        .unwrap();
        let issues = validate_library(dir.path()).unwrap();
        assert_eq!(issues[0].message, "library.json must have exactly 7 keys");
    }
}
