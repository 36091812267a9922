//! Typed `module.json` and `library.json`

use serde::{Deserialize, Serialize};

use ips_core::ModuleType;

/// Module manifest from module.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parent_requirements: Vec<String>,
    #[serde(default)]
    pub child_requirements: Vec<String>,
    #[serde(default)]
    pub implemented: Vec<String>,
    pub prefix: String,
}

impl ModuleManifest {
    /// Manifest with empty optional fields
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        module_type: ModuleType,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            module_type,
            vendor: String::new(),
            aliases: Vec::new(),
            url: String::new(),
            parent_requirements: Vec::new(),
            child_requirements: Vec::new(),
            implemented: Vec::new(),
            prefix: prefix.into(),
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_parent_requirements(mut self, guids: &[&str]) -> Self {
        self.parent_requirements = guids.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_child_requirements(mut self, guids: &[&str]) -> Self {
        self.child_requirements = guids.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_implemented(mut self, guids: &[&str]) -> Self {
        self.implemented = guids.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Name of the module class (module name without spaces)
    pub fn class_name(&self) -> String {
        self.name.replace(' ', "")
    }
}

/// Library manifest from library.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryManifest {
    pub id: String,
    pub author: String,
    pub name: String,
    pub url: String,
    pub version: String,
    pub build: i64,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// Minimum kernel requirement of a library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}
