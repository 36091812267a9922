//! Tile Visualization
//!
//! Notifications are only counted: each post bumps `LastNotificationsID`
//! and returns the new value.

use serde_json::Value as Json;
use tracing::debug;

use ips_core::{KernelError, KernelResult, ObjectId};
use ips_kernel::{FunctionSignature, Module, ModuleClass, ModuleContext, ParameterType};

use crate::args::{id_arg, str_arg};

pub const TILE_VISUALIZATION_ID: &str = "{B5B875BB-9B76-45FD-4E67-2607E45B3AC4}";

const LAST_NOTIFICATION: &str = "LastNotificationsID";

#[derive(Debug, Default)]
pub struct TileVisualization;

impl TileVisualization {
    pub fn class() -> ModuleClass {
        use ParameterType::{Integer, String};

        ModuleClass::new("TileVisualization", || TileVisualization)
            .with_function(
                FunctionSignature::new("OpenObject")
                    .param("ObjectID", Integer)
                    .param("TokenList", String),
            )
            .with_function(
                FunctionSignature::new("PostNotification")
                    .param("Title", String)
                    .param("Text", String)
                    .param("Type", String)
                    .param("TargetID", Integer),
            )
            .with_function(
                FunctionSignature::new("PostNotificationEx")
                    .param("Title", String)
                    .param("Text", String)
                    .param("Icon", String)
                    .param("Sound", String)
                    .param("TargetID", Integer),
            )
    }

    fn post_notification(ctx: &ModuleContext<'_>, title: &str, target: ObjectId) -> KernelResult<i64> {
        let next = ctx.read_attribute_integer(LAST_NOTIFICATION)? + 1;
        ctx.write_attribute_integer(LAST_NOTIFICATION, next)?;
        debug!("Notification {} '{}' for {}", next, title, target);
        Ok(next)
    }
}

impl Module for TileVisualization {
    fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.register_attribute_integer(LAST_NOTIFICATION, 0)
    }

    fn call(&self, ctx: &ModuleContext<'_>, function: &str, args: &[Json]) -> KernelResult<Json> {
        match function {
            "OpenObject" => Ok(Json::Null),
            "PostNotification" => {
                let id = Self::post_notification(ctx, str_arg(args, 0, "Title")?, id_arg(args, 3, "TargetID")?)?;
                Ok(Json::from(id))
            }
            "PostNotificationEx" => {
                let id = Self::post_notification(ctx, str_arg(args, 0, "Title")?, id_arg(args, 4, "TargetID")?)?;
                Ok(Json::from(id))
            }
            _ => Err(KernelError::not_found("Function", function)),
        }
    }
}
