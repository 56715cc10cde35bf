//! OSD payload translation

use serde_json::{json, Map, Value};

use super::command;
use crate::observability::Logger;
use crate::request::{CommandBatch, RequestError, RequestResult};

/// Cluster-wide OSD flags that may be set or unset
pub const OSD_FLAGS: &[&str] = &[
    "pause",
    "noup",
    "nodown",
    "noout",
    "noin",
    "nobackfill",
    "norebalance",
    "norecover",
    "noscrub",
    "nodeep-scrub",
];

/// Commands that may be run against a single OSD
pub const OSD_IMPLEMENTED_COMMANDS: &[&str] = &["scrub", "deep-scrub", "repair"];

/// `{flag: bool}` to one batch of `osd set` / `osd unset`.
///
/// Unknown flags are logged and skipped; a payload with no valid flag
/// at all is rejected.
pub fn flag_commands(args: &Map<String, Value>) -> RequestResult<Vec<CommandBatch>> {
    let mut batch = Vec::new();
    let mut invalid = Vec::new();

    for (flag, value) in args {
        if !OSD_FLAGS.contains(&flag.as_str()) {
            invalid.push(flag.as_str());
            continue;
        }
        let enable = value.as_bool().ok_or_else(|| {
            RequestError::invalid(format!("flag \"{}\" needs a boolean value", flag))
        })?;
        let mode = if enable { "set" } else { "unset" };
        batch.push(command(json!({
            "prefix": format!("osd {}", mode),
            "key": flag,
        })));
    }

    if !invalid.is_empty() {
        Logger::warn("OSD_FLAGS_SKIPPED", &[("flags", &invalid.join(","))]);
    }
    if batch.is_empty() {
        return Err(RequestError::invalid("no valid OSD flag given"));
    }
    Ok(vec![batch])
}

/// `{in, up, reweight}` for one OSD to a single batch.
pub fn state_commands(osd_id: u32, args: &Map<String, Value>) -> RequestResult<Vec<CommandBatch>> {
    let ids = json!([osd_id.to_string()]);
    let mut batch = Vec::new();

    if let Some(value) = args.get("in") {
        let prefix = match value.as_bool() {
            Some(true) => "osd in",
            Some(false) => "osd out",
            None => return Err(RequestError::invalid("\"in\" needs a boolean value")),
        };
        batch.push(command(json!({ "prefix": prefix, "ids": ids })));
    }

    if let Some(value) = args.get("up") {
        match value.as_bool() {
            Some(false) => batch.push(command(json!({ "prefix": "osd down", "ids": ids }))),
            Some(true) => {
                return Err(RequestError::invalid(
                    "It is not valid to set a down OSD to be up",
                ))
            }
            None => return Err(RequestError::invalid("\"up\" needs a boolean value")),
        }
    }

    if let Some(weight) = args.get("reweight") {
        if !weight.is_number() {
            return Err(RequestError::invalid("\"reweight\" needs a numeric value"));
        }
        batch.push(command(json!({
            "prefix": "osd reweight",
            "id": osd_id,
            "weight": weight,
        })));
    }

    if batch.is_empty() {
        return Err(RequestError::invalid("nothing to change for the OSD"));
    }
    Ok(vec![batch])
}

/// One implemented command against one OSD
pub fn osd_command(osd_id: u32, name: &str) -> RequestResult<Vec<CommandBatch>> {
    if !OSD_IMPLEMENTED_COMMANDS.contains(&name) {
        return Err(RequestError::invalid(format!("Command \"{}\" not available", name)));
    }
    Ok(vec![vec![command(json!({
        "prefix": format!("osd {}", name),
        "who": osd_id.to_string(),
    }))]])
}
