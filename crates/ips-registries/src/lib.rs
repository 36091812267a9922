//! Kernel Registries
//!
//! This crate provides the in-memory stores backing the kernel:
//! - Objects (ObjectRegistry), the shared tree and identity pool
//! - Variables, Instances, Scripts, Events, Media, Links, Categories
//! - Profiles, Templates and the Presentation pool (keyed by name/GUID)
//!
//! Typed stores only hold the specialized record of an object; name, ident,
//! parent and position live in the object registry.

mod records;

pub mod object_registry;

pub mod category_store;
pub mod event_store;
pub mod instance_store;
pub mod link_store;
pub mod media_store;
pub mod script_store;
pub mod variable_store;

pub mod presentation_pool;
pub mod profile_store;
pub mod template_store;

// Re-export main types
pub use object_registry::{is_valid_ident, placeholder_name, ObjectEntry, ObjectRegistry};

pub use category_store::{CategoryEntry, CategoryStore};
pub use event_store::{EventEntry, EventStore, EventTrigger};
pub use instance_store::{InstanceEntry, InstanceStore, ModuleRef};
pub use link_store::{LinkEntry, LinkStore};
pub use media_store::{MediaEntry, MediaStore};
pub use script_store::{ScriptEntry, ScriptStore, DEFAULT_SCRIPT_CONTENT};
pub use variable_store::{legacy_presentation, Presentation, VariableEntry, VariableStore};

pub use presentation_pool::{PresentationPool, PresentationRecord};
pub use profile_store::{ProfileAssociation, ProfileStore, VariableProfile};
pub use template_store::{Template, TemplateStore};

use ips_config::IdentityPoolConfig;

/// All stores bundled together
pub struct Registries {
    pub objects: ObjectRegistry,
    pub categories: CategoryStore,
    pub instances: InstanceStore,
    pub variables: VariableStore,
    pub scripts: ScriptStore,
    pub events: EventStore,
    pub media: MediaStore,
    pub links: LinkStore,
    pub profiles: ProfileStore,
    pub presentations: PresentationPool,
    pub templates: TemplateStore,
}

impl Registries {
    pub fn new(pool: IdentityPoolConfig) -> Self {
        Self {
            objects: ObjectRegistry::new(pool),
            categories: CategoryStore::new(),
            instances: InstanceStore::new(),
            variables: VariableStore::new(),
            scripts: ScriptStore::new(),
            events: EventStore::new(),
            media: MediaStore::new(),
            links: LinkStore::new(),
            profiles: ProfileStore::new(),
            presentations: PresentationPool::new(),
            templates: TemplateStore::new(),
        }
    }

    /// Clear every store and rebuild the object tree with a fresh identity pool
    pub fn reset_all(&self) {
        self.objects.reset();
        self.categories.clear();
        self.instances.clear();
        self.variables.clear();
        self.scripts.clear();
        self.events.clear();
        self.media.clear();
        self.links.clear();
        self.profiles.clear();
        self.presentations.clear();
        self.templates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_core::{ObjectId, ObjectType, VariableType};

    #[test]
    fn test_registries_bundle() {
        let registries = Registries::new(IdentityPoolConfig {
            seed: Some(7),
            ..Default::default()
        });
        registries.reset_all();

        let id = registries.objects.register(ObjectType::Variable).unwrap();
        registries.variables.create(id, VariableType::Integer).unwrap();
        registries.profiles.create("Level", VariableType::Integer).unwrap();
        assert!(registries.variables.exists(id));

        registries.reset_all();
        assert!(!registries.objects.exists(id));
        assert!(!registries.variables.exists(id));
        assert!(registries.profiles.list().is_empty());
        assert_eq!(registries.objects.list(), vec![ObjectId::ROOT]);
    }
}
