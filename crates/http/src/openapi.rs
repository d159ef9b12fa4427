//! OpenAPI document assembly
//!
//! Each module contributes a fragment whose paths are relative to its mount
//! point. Fragments are folded into the base document with their paths
//! prefixed by `/{module_name}`.

use serde_json::{Map, Value};
use utoipa::OpenApi;

use libris_kernel::ModuleRegistry;

use crate::{error::ErrorBody, response::MessageBody};

pub const API_TITLE: &str = "Libris API";
pub const API_VERSION: &str = "1.0.0";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library book catalog. Log in through `/auth/github` first; \
                       the session cookie authorizes every `/books` call."
    ),
    paths(crate::health_check),
    components(schemas(ErrorBody, MessageBody)),
    tags((name = "Health", description = "Liveness probe"))
)]
struct BaseApi;

/// Base document plus every module fragment
pub fn merged_document(registry: &ModuleRegistry) -> Value {
    let mut doc = serde_json::to_value(BaseApi::openapi()).unwrap_or_else(|_| {
        serde_json::json!({
            "openapi": "3.1.0",
            "info": { "title": API_TITLE, "version": API_VERSION },
            "paths": {}
        })
    });

    for module in registry.modules() {
        if let Some(fragment) = module.openapi() {
            merge_fragment(&mut doc, module.name(), &fragment);
        }
    }

    doc
}

/// Fold one module fragment into `doc`
pub fn merge_fragment(doc: &mut Value, module_name: &str, fragment: &Value) {
    if let Some(paths) = fragment.get("paths").and_then(Value::as_object) {
        let target = object_at(doc, &["paths"]);
        for (path, path_item) in paths {
            target.insert(prefixed_path(module_name, path), path_item.clone());
        }
    }

    for section in ["schemas", "securitySchemes"] {
        if let Some(entries) = fragment
            .get("components")
            .and_then(|components| components.get(section))
            .and_then(Value::as_object)
        {
            let target = object_at(doc, &["components", section]);
            for (name, definition) in entries {
                target.insert(name.clone(), definition.clone());
            }
        }
    }

    if let Some(tags) = fragment.get("tags").and_then(Value::as_array) {
        if let Some(existing) = ensure_array(doc, "tags") {
            for tag in tags {
                if !existing.contains(tag) {
                    existing.push(tag.clone());
                }
            }
        }
    }
}

fn prefixed_path(module_name: &str, path: &str) -> String {
    if path == "/" || path.is_empty() {
        format!("/{}", module_name)
    } else {
        format!("/{}{}", module_name, path)
    }
}

/// Walk (creating as needed) nested objects and return the innermost map
fn object_at<'a>(value: &'a mut Value, keys: &[&str]) -> &'a mut Map<String, Value> {
    let mut current = value;
    for key in keys {
        current = ensure_object(current)
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current)
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just made an object"),
    }
}

fn ensure_array<'a>(doc: &'a mut Value, key: &str) -> Option<&'a mut Vec<Value>> {
    let map = doc.as_object_mut()?;
    map.entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
}
