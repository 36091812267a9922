//! Archive Control driven through its generated `AC_*` functions

use ips_components::{register_core_modules, ARCHIVE_CONTROL_ID};
use ips_core::{ErrorKind, ObjectId, VariableType};
use ips_kernel::Kernel;
use serde_json::{json, Value as Json};

struct Archive {
    kernel: Kernel,
    archive: ObjectId,
    variable: ObjectId,
}

impl Archive {
    fn new() -> Self {
        let kernel = Kernel::default();
        kernel.reset();
        register_core_modules(&kernel).unwrap();
        let archive = kernel.create_instance(ARCHIVE_CONTROL_ID).unwrap();
        let variable = kernel.create_variable(VariableType::Float).unwrap();
        Self {
            kernel,
            archive,
            variable,
        }
    }

    fn call(&self, function: &str, args: &[Json]) -> Result<Json, ips_core::KernelError> {
        self.kernel.call_function(function, self.archive, args)
    }

    fn id(&self) -> Json {
        json!(self.variable.get())
    }
}

fn timestamps(result: &Json) -> Vec<i64> {
    result
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["TimeStamp"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_logged_values_round_trip() {
    let archive = Archive::new();
    archive
        .call(
            "AC_AddLoggedValues",
            &[
                archive.id(),
                json!([
                    {"TimeStamp": 20, "Value": 2.5},
                    {"TimeStamp": 10, "Value": 1.5},
                    {"TimeStamp": 30, "Value": 3.5}
                ]),
            ],
        )
        .unwrap();

    let values = archive
        .call("AC_GetLoggedValues", &[archive.id(), json!(0), json!(100), json!(0)])
        .unwrap();
    assert_eq!(timestamps(&values), vec![30, 20, 10]);
    assert_eq!(values[0]["Value"], json!(3.5));

    let limited = archive
        .call("AC_GetLoggedValues", &[archive.id(), json!(15), json!(100), json!(1)])
        .unwrap();
    assert_eq!(timestamps(&limited), vec![30]);
}

#[test]
fn test_values_before_newest_are_rejected() {
    let archive = Archive::new();
    archive
        .call("AC_AddLoggedValues", &[archive.id(), json!([{"TimeStamp": 50, "Value": 1}])])
        .unwrap();

    let err = archive
        .call("AC_AddLoggedValues", &[archive.id(), json!([{"TimeStamp": 40, "Value": 1}])])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
}

#[test]
fn test_unknown_variable_is_rejected() {
    let archive = Archive::new();
    let err = archive
        .call("AC_AddLoggedValues", &[json!(9999), json!([])])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = archive
        .call("AC_SetLoggingStatus", &[json!(9999), json!(true)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_aggregated_values_and_status() {
    let archive = Archive::new();
    archive
        .call(
            "AC_AddAggregatedValues",
            &[
                archive.id(),
                json!(1),
                json!([{"TimeStamp": 0, "Duration": 86400, "Avg": 2.0, "Min": 1.0, "Max": 3.0}]),
            ],
        )
        .unwrap();
    let daily = archive
        .call("AC_GetAggregatedValues", &[archive.id(), json!(1), json!(0), json!(86400), json!(0)])
        .unwrap();
    assert_eq!(daily[0]["Avg"], json!(2.0));

    let err = archive
        .call("AC_GetAggregatedValues", &[archive.id(), json!(9), json!(0), json!(1), json!(0)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    archive.call("AC_SetLoggingStatus", &[archive.id(), json!(true)]).unwrap();
    archive.call("AC_SetAggregationType", &[archive.id(), json!(1)]).unwrap();
    assert_eq!(archive.call("AC_GetLoggingStatus", &[archive.id()]).unwrap(), json!(true));
    assert_eq!(archive.call("AC_GetAggregationType", &[archive.id()]).unwrap(), json!(1));

    let variables = archive.call("AC_GetAggregationVariables", &[json!(false)]).unwrap();
    assert_eq!(variables[0]["VariableID"], archive.id());
    assert_eq!(variables[0]["AggregationType"], json!(1));
    assert_eq!(variables[0]["AggregationActive"], json!(true));
}

#[test]
fn test_delete_and_move_archive() {
    let archive = Archive::new();
    archive
        .call(
            "AC_AddLoggedValues",
            &[archive.id(), json!([{"TimeStamp": 10, "Value": 1}, {"TimeStamp": 20, "Value": 2}])],
        )
        .unwrap();

    let removed = archive
        .call("AC_DeleteVariableData", &[archive.id(), json!(15), json!(25)])
        .unwrap();
    assert_eq!(removed, json!(1));

    let target = archive.kernel.create_variable(VariableType::Float).unwrap();
    archive
        .call("AC_ChangeVariableID", &[archive.id(), json!(target.get())])
        .unwrap();
    let moved = archive
        .call("AC_GetLoggedValues", &[json!(target.get()), json!(0), json!(100), json!(0)])
        .unwrap();
    assert_eq!(timestamps(&moved), vec![10]);
}

#[test]
fn test_graph_functions_are_not_implemented() {
    let archive = Archive::new();
    for (function, args) in [
        ("AC_GetGraphStatus", vec![archive.id()]),
        ("AC_SetGraphStatus", vec![archive.id(), json!(true)]),
        ("AC_ReAggregateVariable", vec![archive.id()]),
    ] {
        let err = archive.call(function, &args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }
}
