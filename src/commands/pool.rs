//! Pool payload translation
//!
//! Pool updates run in two waves: most properties and quotas first,
//! then `pgp_num`, which the cluster only accepts once `pg_num` landed.

use serde_json::{json, Map, Value};

use super::command;
use crate::request::{Command, CommandBatch, RequestError, RequestResult};

/// Properties set in the first wave
pub const POOL_PROPERTIES_FIRST: &[&str] = &[
    "size",
    "min_size",
    "crash_replay_interval",
    "pg_num",
    "crush_ruleset",
    "hashpspool",
];

/// Properties set in the second wave
pub const POOL_PROPERTIES_SECOND: &[&str] = &["pgp_num"];

/// Quota arguments and the `set-quota` field each maps to
pub const POOL_QUOTAS: &[(&str, &str)] = &[
    ("quota_max_bytes", "max_bytes"),
    ("quota_max_objects", "max_objects"),
];

fn is_pool_arg(key: &str) -> bool {
    POOL_PROPERTIES_FIRST.contains(&key)
        || POOL_PROPERTIES_SECOND.contains(&key)
        || POOL_QUOTAS.iter().any(|(arg, _)| *arg == key)
}

/// Keys of `args` that are not pool arguments, sorted
pub fn invalid_pool_args(args: &Map<String, Value>) -> Vec<String> {
    args.keys().filter(|k| !is_pool_arg(k)).cloned().collect()
}

fn set(pool: &str, var: &str, val: &Value) -> Command {
    command(json!({ "prefix": "osd pool set", "pool": pool, "var": var, "val": val }))
}

/// Translate a pool update into its two waves.
///
/// Waves that end up empty are dropped. `pgp_num` follows `pg_num` when
/// only the latter is given.
pub fn update_commands(pool: &str, args: &Map<String, Value>) -> RequestResult<Vec<CommandBatch>> {
    let invalid = invalid_pool_args(args);
    if !invalid.is_empty() {
        return Err(RequestError::invalid(format!(
            "Invalid arguments found: {:?}",
            invalid
        )));
    }

    let mut first = Vec::new();
    let mut second = Vec::new();

    for var in POOL_PROPERTIES_FIRST {
        if let Some(val) = args.get(*var) {
            first.push(set(pool, var, val));
        }
    }
    for (arg, field) in POOL_QUOTAS {
        if let Some(val) = args.get(*arg) {
            let val = match val {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            first.push(command(json!({
                "prefix": "osd pool set-quota",
                "pool": pool,
                "field": field,
                "val": val,
            })));
        }
    }

    match (args.get("pgp_num"), args.get("pg_num")) {
        (Some(pgp), _) => second.push(set(pool, "pgp_num", pgp)),
        (None, Some(pg)) => second.push(set(pool, "pgp_num", pg)),
        (None, None) => {}
    }

    Ok([first, second].into_iter().filter(|b| !b.is_empty()).collect())
}

/// `{name, pg_num, ...}` to a create batch followed by update waves
pub fn create_commands(args: &Map<String, Value>) -> RequestResult<Vec<CommandBatch>> {
    let mut rest = args.clone();
    let name = match rest.remove("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        Some(_) => return Err(RequestError::invalid("pool \"name\" must be a string")),
        None => {
            return Err(RequestError::invalid(
                "You need to specify the pool \"name\" argument",
            ))
        }
    };
    let pg_num = rest
        .remove("pg_num")
        .ok_or_else(|| RequestError::invalid("You need to specify the \"pg_num\" argument"))?;

    let create = command(json!({
        "prefix": "osd pool create",
        "pool": name,
        "pg_num": pg_num,
    }));

    let mut batches = vec![vec![create]];
    batches.extend(update_commands(&name, &rest)?);
    Ok(batches)
}

/// Single batch deleting a pool
pub fn delete_commands(pool: &str) -> Vec<CommandBatch> {
    vec![vec![command(json!({
        "prefix": "osd pool delete",
        "pool": pool,
        "pool2": pool,
        "sure": "--yes-i-really-really-mean-it",
    }))]]
}
