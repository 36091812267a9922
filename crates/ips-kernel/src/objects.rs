//! Typed object creation and deletion
//!
//! Every typed object is an object registry entry plus a record in its
//! store. Creation registers first and rolls back when the store refuses;
//! deletion checks the record and removability before touching anything.

use tracing::debug;

use ips_core::{
    EventType, KernelError, KernelResult, MediaType, ObjectId, ObjectType, ScriptType,
    VariableType,
};

use crate::kernel::Kernel;

impl Kernel {
    fn register_object<F>(&self, object_type: ObjectType, create: F) -> KernelResult<ObjectId>
    where
        F: FnOnce(ObjectId) -> KernelResult<()>,
    {
        let id = self.objects().register(object_type)?;
        if let Err(err) = create(id) {
            self.objects().unregister(id)?;
            return Err(err);
        }
        Ok(id)
    }

    fn remove_object<F>(&self, id: ObjectId, kind: &'static str, exists: bool, delete: F) -> KernelResult<()>
    where
        F: FnOnce(ObjectId) -> KernelResult<()>,
    {
        if !exists {
            return Err(KernelError::not_found(kind, id));
        }
        self.objects().check_removable(id)?;
        delete(id)?;
        self.objects().unregister(id)
    }

    // ==================== Categories ====================

    pub fn create_category(&self) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Category, |id| self.categories().create(id))
    }

    pub fn delete_category(&self, id: ObjectId) -> KernelResult<()> {
        self.remove_object(id, "Category", self.categories().exists(id), |id| {
            self.categories().delete(id)
        })
    }

    pub fn get_category_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Category)
    }

    // ==================== Variables ====================

    pub fn create_variable(&self, variable_type: VariableType) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Variable, |id| {
            self.variables().create(id, variable_type)
        })
    }

    pub fn delete_variable(&self, id: ObjectId) -> KernelResult<()> {
        self.remove_object(id, "Variable", self.variables().exists(id), |id| {
            self.variables().delete(id)
        })
    }

    pub fn get_variable_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Variable)
    }

    // ==================== Scripts ====================

    pub fn create_script(&self, script_type: ScriptType) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Script, |id| self.scripts().create(id, script_type))
    }

    /// Delete a script; script files only exist in memory, so `delete_file`
    /// has nothing extra to remove
    pub fn delete_script(&self, id: ObjectId, delete_file: bool) -> KernelResult<()> {
        self.remove_object(id, "Script", self.scripts().exists(id), |id| {
            debug!(delete_file, "Deleting script {}", id);
            self.scripts().delete(id)
        })
    }

    pub fn get_script_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Script)
    }

    /// Script whose file name is `file`
    pub fn get_script_id_by_file(&self, file: &str) -> KernelResult<ObjectId> {
        self.scripts()
            .list()
            .into_iter()
            .find(|id| self.scripts().file(*id).is_ok_and(|f| f == file))
            .ok_or_else(|| KernelError::not_found("Script", file))
    }

    // ==================== Events ====================

    pub fn create_event(&self, event_type: EventType) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Event, |id| self.events().create(id, event_type))
    }

    pub fn delete_event(&self, id: ObjectId) -> KernelResult<()> {
        self.remove_object(id, "Event", self.events().exists(id), |id| {
            self.events().delete(id)
        })
    }

    pub fn get_event_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Event)
    }

    // ==================== Media ====================

    pub fn create_media(&self, media_type: MediaType) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Media, |id| self.media().create(id, media_type))
    }

    pub fn delete_media(&self, id: ObjectId, delete_file: bool) -> KernelResult<()> {
        self.remove_object(id, "Media", self.media().exists(id), |id| {
            debug!(delete_file, "Deleting media {}", id);
            self.media().delete(id)
        })
    }

    pub fn get_media_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Media)
    }

    pub fn get_media_id_by_file(&self, file: &str) -> KernelResult<ObjectId> {
        self.media()
            .find_by_file(file)
            .ok_or_else(|| KernelError::not_found("Media", file))
    }

    // ==================== Links ====================

    pub fn create_link(&self) -> KernelResult<ObjectId> {
        self.register_object(ObjectType::Link, |id| self.links().create(id))
    }

    pub fn delete_link(&self, id: ObjectId) -> KernelResult<()> {
        self.remove_object(id, "Link", self.links().exists(id), |id| self.links().delete(id))
    }

    /// Point a link at an existing object
    pub fn set_link_target(&self, id: ObjectId, target_id: ObjectId) -> KernelResult<()> {
        if !self.objects().exists(target_id) {
            return Err(KernelError::not_found("Object", target_id));
        }
        self.links().set_target(id, target_id)
    }

    pub fn get_link_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Link)
    }

    pub fn get_instance_id_by_name(&self, name: &str, parent_id: ObjectId) -> KernelResult<ObjectId> {
        self.objects()
            .get_id_by_name_ex(name, parent_id, ObjectType::Instance)
    }
}
