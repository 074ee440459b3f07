//! Item codec
//!
//! Converts application resources to and from [`StoredItem`]s. Encoding injects the
//! bookkeeping attributes and a generated `meta`; decoding strips them again.
//! The two are not inverse: status and lease are one-way.

use crate::core::clock;
use crate::domain::item::{
    DOCUMENT_STATUS_FIELD, EXTERNAL_ID_FIELD, LOCK_END_TS_FIELD, REFERENCES_FIELD, VID_FIELD,
};
use crate::domain::{DocumentStatus, Result, StoredItem, VellumError};
use serde_json::{json, Map, Value};

/// Separator between logical id and suffix in composite ids
pub const ID_SEPARATOR: char = '_';

/// Encodes `resource` as version `vid` of `id` in the given status.
///
/// `meta.versionId`/`meta.lastUpdated` are generated when `meta` is absent or has
/// no version id; an existing version id is never overwritten. `lockEndTs` is set
/// to now. The input is not modified.
pub fn encode(
    resource: &Value,
    id: &str,
    vid: u64,
    status: DocumentStatus,
) -> Result<StoredItem> {
    let mut body = match resource {
        Value::Object(map) => map.clone(),
        _ => {
            return Err(VellumError::InvalidResource(
                "Resource must be a JSON object".to_string(),
            ))
        }
    };

    let resource_type = match body.remove("resourceType") {
        Some(Value::String(rt)) if !rt.is_empty() => rt,
        _ => {
            return Err(VellumError::InvalidResource(
                "Resource is missing resourceType".to_string(),
            ))
        }
    };

    for field in [
        "id",
        VID_FIELD,
        DOCUMENT_STATUS_FIELD,
        LOCK_END_TS_FIELD,
        EXTERNAL_ID_FIELD,
    ] {
        body.remove(field);
    }

    let references = match body.remove(REFERENCES_FIELD) {
        Some(Value::Array(refs)) => refs
            .into_iter()
            .filter_map(|r| r.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    merge_generated_meta(&mut body, vid);

    Ok(StoredItem {
        id: id.to_string(),
        vid,
        resource_type,
        document_status: status,
        lock_end_ts: clock::now_millis(),
        external_id: id.to_string(),
        references,
        body,
    })
}

/// Decodes a stored item back into the caller-visible resource
pub fn decode(item: &StoredItem) -> Value {
    let mut resource = item.body.clone();
    resource.insert("id".to_string(), Value::String(logical_id(&item.id).to_string()));
    resource.insert(
        "resourceType".to_string(),
        Value::String(item.resource_type.clone()),
    );
    if !item.references.is_empty() {
        resource.insert(REFERENCES_FIELD.to_string(), json!(item.references));
    }
    Value::Object(resource)
}

/// Logical id of a possibly suffix-decorated id (`p1_3` -> `p1`)
pub fn logical_id(id: &str) -> &str {
    id.split(ID_SEPARATOR).next().unwrap_or(id)
}

/// Removes server-assigned `meta` attributes supplied by a caller
pub fn strip_server_meta(resource: &mut Value) {
    if let Some(Value::Object(meta)) = resource.get_mut("meta") {
        meta.remove("versionId");
        meta.remove("lastUpdated");
    }
}

/// Fails unless `resource` declares `expected` as its resourceType
pub fn check_resource_type(resource: &Value, expected: &str) -> Result<()> {
    match resource.get("resourceType").and_then(Value::as_str) {
        Some(rt) if rt == expected => Ok(()),
        Some(rt) => Err(VellumError::InvalidResource(format!(
            "Resource type {rt} does not match request type {expected}"
        ))),
        None => Err(VellumError::InvalidResource(
            "Resource is missing resourceType".to_string(),
        )),
    }
}

fn generate_meta(vid: u64) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("versionId".to_string(), Value::String(vid.to_string()));
    meta.insert("lastUpdated".to_string(), Value::String(clock::now_rfc3339()));
    meta
}

fn merge_generated_meta(body: &mut Map<String, Value>, vid: u64) {
    match body.get_mut("meta") {
        Some(Value::Object(meta)) => {
            if !meta.contains_key("versionId") {
                meta.extend(generate_meta(vid));
            }
        }
        _ => {
            body.insert("meta".to_string(), Value::Object(generate_meta(vid)));
        }
    }
}
