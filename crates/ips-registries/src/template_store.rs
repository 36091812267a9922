//! Template Store
//!
//! Presentation templates keyed by a braced, uppercase GUID.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

use ips_core::{KernelError, KernelResult};

/// A presentation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "TemplateID")]
    pub template_id: String,
    #[serde(rename = "PresentationID")]
    pub presentation_id: String,
    pub display_name: String,
    pub values: serde_json::Map<String, serde_json::Value>,
    pub is_read_only: bool,
}

/// Generate a template identity such as `{1F0C9D4A-...}`
fn generate_template_id() -> String {
    format!("{{{}}}", Uuid::new_v4().hyphenated().to_string().to_uppercase())
}

#[derive(Default)]
pub struct TemplateStore {
    by_id: RwLock<IndexMap<String, Arc<Template>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<Template>>> {
        self.by_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<Template>>> {
        self.by_id.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty editable template for `presentation_id`
    pub fn create(&self, presentation_id: &str) -> String {
        let template = Template {
            template_id: generate_template_id(),
            presentation_id: presentation_id.to_string(),
            display_name: String::new(),
            values: serde_json::Map::new(),
            is_read_only: false,
        };
        let id = template.template_id.clone();
        debug!("Created template {} for presentation {}", id, presentation_id);
        self.write().insert(id.clone(), Arc::new(template));
        id
    }

    /// Store a complete template, replacing one with the same identity
    pub fn create_ex(&self, mut template: Template, is_read_only: bool) -> KernelResult<()> {
        if template.template_id.is_empty() {
            return Err(KernelError::invalid("template id cannot be empty"));
        }
        template.is_read_only = is_read_only;
        self.write()
            .insert(template.template_id.clone(), Arc::new(template));
        Ok(())
    }

    pub fn delete(&self, template_id: &str) -> KernelResult<()> {
        self.write()
            .shift_remove(template_id)
            .map(|_| ())
            .ok_or_else(|| KernelError::not_found("Template", template_id))
    }

    pub fn exists(&self, template_id: &str) -> bool {
        self.read().contains_key(template_id)
    }

    pub fn get(&self, template_id: &str) -> KernelResult<Arc<Template>> {
        self.read()
            .get(template_id)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Template", template_id))
    }

    pub fn list(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn list_by_presentation(&self, presentation_id: &str) -> Vec<String> {
        self.read()
            .values()
            .filter(|t| t.presentation_id == presentation_id)
            .map(|t| t.template_id.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn update<F>(&self, template_id: &str, f: F) -> KernelResult<()>
    where
        F: FnOnce(&mut Template),
    {
        let mut idx = self.write();
        let slot = idx
            .get_mut(template_id)
            .ok_or_else(|| KernelError::not_found("Template", template_id))?;
        if slot.is_read_only {
            return Err(KernelError::invalid(format!(
                "template {} is read-only",
                template_id
            )));
        }
        let mut template = (**slot).clone();
        f(&mut template);
        *slot = Arc::new(template);
        Ok(())
    }

    pub fn set_display_name(&self, template_id: &str, name: &str) -> KernelResult<()> {
        self.update(template_id, |t| t.display_name = name.to_string())
    }

    pub fn set_values(
        &self,
        template_id: &str,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> KernelResult<()> {
        self.update(template_id, |t| t.values = values)
    }
}
