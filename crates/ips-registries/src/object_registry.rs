//! Object Registry
//!
//! Owns identity allocation, the parent/child tree and the generic metadata
//! every object carries. Identity 0 is the root and exists after the first
//! reset; all other identities come from a shuffled pool so that tests cannot
//! depend on sequential assignment.

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

use ips_config::IdentityPoolConfig;
use ips_core::constants::ROOT_NAME;
use ips_core::{KernelError, KernelResult, ObjectId, ObjectType};

/// Generic metadata of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub name: String,
    pub ident: String,
    pub info: String,
    pub icon: String,
    pub summary: String,
    pub parent_id: ObjectId,
    pub children: IndexSet<ObjectId>,
    pub position: i32,
    pub hidden: bool,
    pub disabled: bool,
    pub locked: bool,
    pub read_only: bool,
}

impl ObjectEntry {
    fn new(id: ObjectId, object_type: ObjectType) -> Self {
        Self {
            id,
            object_type,
            name: placeholder_name(id),
            ident: String::new(),
            info: String::new(),
            icon: String::new(),
            summary: String::new(),
            parent_id: ObjectId::ROOT,
            children: IndexSet::new(),
            position: 0,
            hidden: false,
            disabled: false,
            locked: false,
            read_only: false,
        }
    }

    fn root() -> Self {
        let mut root = Self::new(ObjectId::ROOT, ObjectType::Category);
        root.name = ROOT_NAME.to_string();
        root
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Name given to objects without an explicit name
pub fn placeholder_name(id: ObjectId) -> String {
    format!("Unnamed Object (ID: {})", id)
}

/// Idents may only contain ASCII alphanumerics and underscore
pub fn is_valid_ident(ident: &str) -> bool {
    ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Default)]
struct ObjectTree {
    objects: IndexMap<ObjectId, ObjectEntry>,
    available: Vec<ObjectId>,
}

impl ObjectTree {
    fn get(&self, id: ObjectId) -> KernelResult<&ObjectEntry> {
        self.objects
            .get(&id)
            .ok_or_else(|| KernelError::not_found("Object", id))
    }

    fn get_mut(&mut self, id: ObjectId) -> KernelResult<&mut ObjectEntry> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| KernelError::not_found("Object", id))
    }

    fn is_initialized(&self) -> bool {
        self.objects.contains_key(&ObjectId::ROOT)
    }

    /// Sibling below `parent` (other than `except`) using `ident`
    fn ident_taken(&self, parent: ObjectId, ident: &str, except: ObjectId) -> bool {
        self.objects.get(&parent).is_some_and(|p| {
            p.children.iter().any(|child| {
                *child != except && self.objects.get(child).is_some_and(|c| c.ident == ident)
            })
        })
    }
}

/// Object Registry
pub struct ObjectRegistry {
    pool: IdentityPoolConfig,
    tree: RwLock<ObjectTree>,
}

impl ObjectRegistry {
    /// Create a registry; it stays uninitialized until the first [`reset`](Self::reset)
    pub fn new(pool: IdentityPoolConfig) -> Self {
        Self {
            pool,
            tree: RwLock::new(ObjectTree::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ObjectTree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectTree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every object, reseed the root and refill the identity pool
    pub fn reset(&self) {
        let mut available: Vec<ObjectId> = (self.pool.first..=self.pool.last)
            .map(ObjectId::new)
            .collect();
        let mut rng = match self.pool.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        available.shuffle(&mut rng);

        let mut objects = IndexMap::new();
        objects.insert(ObjectId::ROOT, ObjectEntry::root());

        let count = available.len();
        *self.write() = ObjectTree { objects, available };
        info!("Object registry reset ({} identities available)", count);
    }

    /// Allocate an identity and attach a new object to the root
    #[instrument(skip(self))]
    pub fn register(&self, object_type: ObjectType) -> KernelResult<ObjectId> {
        let mut tree = self.write();
        if !tree.is_initialized() {
            return Err(KernelError::NotInitialized);
        }
        let id = tree
            .available
            .pop()
            .ok_or(KernelError::ExhaustedIdentitySpace)?;

        tree.objects.insert(id, ObjectEntry::new(id, object_type));
        tree.get_mut(ObjectId::ROOT)?.children.insert(id);
        debug!("Registered object {} ({:?})", id, object_type);
        Ok(id)
    }

    /// Check that `id` could be unregistered right now
    pub fn check_removable(&self, id: ObjectId) -> KernelResult<()> {
        if id.is_root() {
            return Err(KernelError::RootImmutable);
        }
        let tree = self.read();
        if tree.get(id)?.has_children() {
            return Err(KernelError::HasChildren(id));
        }
        Ok(())
    }

    /// Remove an object without children and return its identity to the pool
    #[instrument(skip(self))]
    pub fn unregister(&self, id: ObjectId) -> KernelResult<()> {
        self.check_removable(id)?;
        let mut tree = self.write();
        let entry = tree
            .objects
            .shift_remove(&id)
            .ok_or_else(|| KernelError::not_found("Object", id))?;
        if let Some(parent) = tree.objects.get_mut(&entry.parent_id) {
            parent.children.shift_remove(&id);
        }
        tree.available.push(id);
        debug!("Unregistered object {}", id);
        Ok(())
    }

    fn update<F>(&self, id: ObjectId, root_guarded: bool, f: F) -> KernelResult<()>
    where
        F: FnOnce(&mut ObjectEntry),
    {
        if root_guarded && id.is_root() {
            return Err(KernelError::RootImmutable);
        }
        let mut tree = self.write();
        f(tree.get_mut(id)?);
        Ok(())
    }

    /// Move an object below another parent
    #[instrument(skip(self))]
    pub fn set_parent(&self, id: ObjectId, parent_id: ObjectId) -> KernelResult<()> {
        if id.is_root() {
            return Err(KernelError::RootImmutable);
        }
        let mut tree = self.write();
        let ident = tree.get(id)?.ident.clone();
        tree.get(parent_id)?;

        let mut cursor = parent_id;
        while !cursor.is_root() {
            if cursor == id {
                return Err(KernelError::invariant(format!(
                    "object #{} cannot be moved below its own descendant #{}",
                    id, parent_id
                )));
            }
            cursor = tree.get(cursor)?.parent_id;
        }

        if !ident.is_empty() && tree.ident_taken(parent_id, &ident, id) {
            return Err(KernelError::DuplicateIdent {
                ident,
                parent: parent_id,
            });
        }

        let old_parent = tree.get(id)?.parent_id;
        if let Some(old) = tree.objects.get_mut(&old_parent) {
            old.children.shift_remove(&id);
        }
        tree.get_mut(parent_id)?.children.insert(id);
        tree.get_mut(id)?.parent_id = parent_id;
        debug!("Moved object {} from {} to {}", id, old_parent, parent_id);
        Ok(())
    }

    /// Set the ident; an empty ident clears it
    pub fn set_ident(&self, id: ObjectId, ident: &str) -> KernelResult<()> {
        let mut tree = self.write();
        let parent_id = tree.get(id)?.parent_id;
        if !is_valid_ident(ident) {
            return Err(KernelError::InvalidIdent(ident.to_string()));
        }
        if !ident.is_empty() && !id.is_root() && tree.ident_taken(parent_id, ident, id) {
            return Err(KernelError::DuplicateIdent {
                ident: ident.to_string(),
                parent: parent_id,
            });
        }
        tree.get_mut(id)?.ident = ident.to_string();
        Ok(())
    }

    /// Set the name; an empty name restores the placeholder
    pub fn set_name(&self, id: ObjectId, name: &str) -> KernelResult<()> {
        let name = if name.is_empty() {
            placeholder_name(id)
        } else {
            name.to_string()
        };
        self.update(id, false, |entry| entry.name = name)
    }

    pub fn set_info(&self, id: ObjectId, info: &str) -> KernelResult<()> {
        self.update(id, false, |entry| entry.info = info.to_string())
    }

    pub fn set_icon(&self, id: ObjectId, icon: &str) -> KernelResult<()> {
        self.update(id, false, |entry| entry.icon = icon.to_string())
    }

    pub fn set_summary(&self, id: ObjectId, summary: &str) -> KernelResult<()> {
        self.update(id, true, |entry| entry.summary = summary.to_string())
    }

    pub fn set_position(&self, id: ObjectId, position: i32) -> KernelResult<()> {
        self.update(id, true, |entry| entry.position = position)
    }

    pub fn set_read_only(&self, id: ObjectId, read_only: bool) -> KernelResult<()> {
        self.update(id, true, |entry| entry.read_only = read_only)
    }

    pub fn set_hidden(&self, id: ObjectId, hidden: bool) -> KernelResult<()> {
        self.update(id, true, |entry| entry.hidden = hidden)
    }

    pub fn set_disabled(&self, id: ObjectId, disabled: bool) -> KernelResult<()> {
        self.update(id, true, |entry| entry.disabled = disabled)
    }

    // ==================== Queries ====================

    pub fn exists(&self, id: ObjectId) -> bool {
        self.read().objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<ObjectEntry> {
        self.read().get(id).cloned()
    }

    pub fn object_type(&self, id: ObjectId) -> KernelResult<ObjectType> {
        Ok(self.read().get(id)?.object_type)
    }

    pub fn name(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self.read().get(id)?.name.clone())
    }

    pub fn ident(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self.read().get(id)?.ident.clone())
    }

    pub fn parent(&self, id: ObjectId) -> KernelResult<ObjectId> {
        Ok(self.read().get(id)?.parent_id)
    }

    pub fn children(&self, id: ObjectId) -> KernelResult<Vec<ObjectId>> {
        Ok(self.read().get(id)?.children.iter().copied().collect())
    }

    pub fn has_children(&self, id: ObjectId) -> KernelResult<bool> {
        Ok(self.read().get(id)?.has_children())
    }

    /// All identities, root included
    pub fn list(&self) -> Vec<ObjectId> {
        self.read().objects.keys().copied().collect()
    }

    pub fn list_by_type(&self, object_type: ObjectType) -> Vec<ObjectId> {
        self.read()
            .objects
            .values()
            .filter(|entry| entry.object_type == object_type)
            .map(|entry| entry.id)
            .collect()
    }

    /// Whether `id` sits below `parent_id`, directly or (if `recursive`) transitively
    pub fn is_child(&self, id: ObjectId, parent_id: ObjectId, recursive: bool) -> KernelResult<bool> {
        let tree = self.read();
        tree.get(parent_id)?;
        let mut cursor = tree.get(id)?.parent_id;
        if !recursive || id.is_root() {
            return Ok(!id.is_root() && cursor == parent_id);
        }
        loop {
            if cursor == parent_id {
                return Ok(true);
            }
            if cursor.is_root() {
                return Ok(false);
            }
            cursor = tree.get(cursor)?.parent_id;
        }
    }

    /// First child of `parent_id` named `name`
    pub fn get_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.find_child(parent_id, "name", name, |entry| entry.name == name)
    }

    /// First child of `parent_id` named `name` with the given kind
    pub fn get_id_by_name_ex(
        &self,
        name: &str,
        parent_id: ObjectId,
        object_type: ObjectType,
    ) -> KernelResult<ObjectId> {
        self.find_child(parent_id, "name", name, |entry| {
            entry.name == name && entry.object_type == object_type
        })
    }

    /// Child of `parent_id` with `ident`
    pub fn get_id_by_ident(&self, ident: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.find_child(parent_id, "ident", ident, |entry| entry.ident == ident)
    }

    /// Like [`get_id_by_ident`](Self::get_id_by_ident) but a missing ident is `None`
    pub fn find_by_ident(&self, ident: &str, parent_id: ObjectId) -> KernelResult<Option<ObjectId>> {
        match self.get_id_by_ident(ident, parent_id) {
            Ok(id) => Ok(Some(id)),
            Err(KernelError::NotFound { kind: "Ident", .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn find_child<P>(&self, parent_id: ObjectId, what: &str, key: &str, predicate: P) -> KernelResult<ObjectId>
    where
        P: Fn(&ObjectEntry) -> bool,
    {
        if key.is_empty() {
            return Err(KernelError::invalid(format!("{} cannot be empty", what)));
        }
        let tree = self.read();
        let parent = tree.get(parent_id)?;
        parent
            .children
            .iter()
            .filter_map(|child| tree.objects.get(child))
            .find(|entry| predicate(entry))
            .map(|entry| entry.id)
            .ok_or_else(|| {
                let kind = if what == "ident" { "Ident" } else { "Name" };
                KernelError::not_found(kind, format!("{} below #{}", key, parent_id))
            })
    }

    /// Names from the topmost ancestor down to `id`, joined by `\`
    pub fn location(&self, id: ObjectId) -> KernelResult<String> {
        let tree = self.read();
        let mut names = Vec::new();
        let mut cursor = id;
        while !cursor.is_root() {
            let entry = tree.get(cursor)?;
            names.push(entry.name.clone());
            cursor = entry.parent_id;
        }
        names.reverse();
        Ok(names.join("\\"))
    }

    /// Number of identities left in the pool
    pub fn available(&self) -> usize {
        self.read().available.len()
    }
}
