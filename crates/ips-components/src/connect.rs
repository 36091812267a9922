//! Connect Control
//!
//! Remote access is out of reach for an emulated kernel; the functions
//! exist so calls resolve, and all of them fail with `NotImplemented`.

use serde_json::Value as Json;

use ips_core::{KernelError, KernelResult};
use ips_kernel::{FunctionSignature, Module, ModuleClass, ModuleContext, ParameterType};

pub const CONNECT_CONTROL_ID: &str = "{9486D575-BE8C-4ED8-B5B5-20930E26DE6F}";

const FUNCTIONS: [(&str, &[(&str, ParameterType)]); 8] = [
    ("ActivateServer", &[]),
    ("GetConnectURL", &[]),
    (
        "GetQRCodeSVG",
        &[("WebFrontVisualizationID", ParameterType::Integer)],
    ),
    (
        "MakeRequest",
        &[
            ("Endpoint", ParameterType::String),
            ("RequestData", ParameterType::String),
        ],
    ),
    (
        "SendGoogleAssistantStateReport",
        &[("States", ParameterType::String)],
    ),
    ("GetRequestLimitCount", &[]),
    ("GetTrafficStatistics", &[]),
    ("GetGoogleAssistantLimitCount", &[]),
];

#[derive(Debug, Default)]
pub struct ConnectControl;

impl ConnectControl {
    pub fn class() -> ModuleClass {
        FUNCTIONS
            .iter()
            .fold(ModuleClass::new("ConnectControl", || ConnectControl), |class, (name, params)| {
                let signature = params
                    .iter()
                    .fold(FunctionSignature::new(*name), |signature, (param, kind)| {
                        signature.param(*param, *kind)
                    });
                class.with_function(signature)
            })
    }
}

impl Module for ConnectControl {
    fn call(&self, _ctx: &ModuleContext<'_>, function: &str, _args: &[Json]) -> KernelResult<Json> {
        if FUNCTIONS.iter().any(|(name, _)| *name == function) {
            Err(KernelError::not_implemented(format!("'{}'", function)))
        } else {
            Err(KernelError::not_found("Function", function))
        }
    }
}
