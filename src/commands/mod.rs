//! Payload-to-command translation
//!
//! Pure functions turning REST payloads into ordered command batches for
//! `RequestRegistry::submit`. They validate their input and know nothing
//! about cluster topology.

pub mod osd;
pub mod pool;

pub use osd::{flag_commands, osd_command, state_commands, OSD_FLAGS, OSD_IMPLEMENTED_COMMANDS};
pub use pool::{create_commands, delete_commands, invalid_pool_args, update_commands};

use serde_json::{Map, Value};

use crate::request::Command;

/// Build a command from a `json!` object literal
pub(crate) fn command(value: Value) -> Command {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
