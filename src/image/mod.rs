use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[cfg(test)]
mod tests;

/// Image runtime configuration, as stored in the config blob.
///
/// Only the fields this tool rewrites are modeled; everything else the base
/// image carries is preserved through the `extra` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub config: RuntimeConfig,
    pub rootfs: RootFs,
    #[serde(default)]
    pub history: Vec<History>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "Env", default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
    #[serde(rename = "Cmd", default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "Entrypoint", default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(
        rename = "ExposedPorts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exposed_ports: Option<BTreeMap<String, Value>>,
    #[serde(rename = "WorkingDir", default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub empty_layer: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Look up the value of a `NAME=value` entry.
pub fn lookup_env<'a>(env: &'a [String], name: &str) -> Option<&'a str> {
    env.iter().find_map(|entry| {
        entry
            .split_once('=')
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v)
    })
}

/// Set `name` to `value`, replacing an existing entry or appending a new one.
pub fn set_env(env: &mut Vec<String>, name: &str, value: &str) {
    let entry = format!("{}={}", name, value);
    match env
        .iter()
        .position(|e| e.split_once('=').map(|(k, _)| k) == Some(name))
    {
        Some(idx) => env[idx] = entry,
        None => env.push(entry),
    }
}

/// Append `value` to `name` using `separator`.
///
/// An unset or empty variable takes the bare value, without a leading
/// separator.
pub fn append_env(env: &mut Vec<String>, name: &str, value: &str, separator: &str) {
    let joined = match lookup_env(env, name) {
        Some(existing) if !existing.is_empty() => {
            format!("{}{}{}", existing, separator, value)
        }
        _ => value.to_string(),
    };
    set_env(env, name, &joined);
}

/// Add a port to the exposed-port set. Accepts `22` or `22/tcp` forms;
/// a bare port defaults to tcp.
pub fn expose_port(ports: &mut Option<BTreeMap<String, Value>>, port: &str) {
    let key = if port.contains('/') {
        port.to_string()
    } else {
        format!("{}/tcp", port)
    };
    ports
        .get_or_insert_with(BTreeMap::new)
        .insert(key, Value::Object(serde_json::Map::new()));
}
