//! Parsing of YAML and JSON fixtures into documents.

use serde::Deserialize;
use serde_json::Value;

use fnserver_core::proto::Struct;

use crate::error::FixtureError;

/// Annotation naming a resource in a multi-document fixture. It is removed
/// from the resource before use.
pub const ANNOTATION_KEY_RESOURCE_NAME: &str = "fn-server.test/resource-name";

/// Parse a single YAML document into a JSON value.
pub fn value_from_yaml(raw: &str) -> Result<Value, FixtureError> {
    Ok(serde_yaml::from_str(raw)?)
}

/// Parse a single JSON document.
pub fn value_from_json(raw: &str) -> Result<Value, FixtureError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parse a single YAML document holding an object.
pub fn object_from_yaml(raw: &str) -> Result<Struct, FixtureError> {
    into_object(value_from_yaml(raw)?)
}

/// Parse a single JSON document holding an object.
pub fn object_from_json(raw: &str) -> Result<Struct, FixtureError> {
    into_object(value_from_json(raw)?)
}

/// Parse every object of a multi-document YAML stream. Empty documents are
/// skipped.
pub fn objects_from_yaml(raw: &str) -> Result<Vec<Struct>, FixtureError> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(raw) {
        match Value::deserialize(document)? {
            Value::Null => continue,
            value => objects.push(into_object(value)?),
        }
    }
    Ok(objects)
}

/// Parse a multi-document YAML stream into `(name, object)` pairs, taking
/// each name from [`ANNOTATION_KEY_RESOURCE_NAME`].
pub fn named_objects_from_yaml(raw: &str) -> Result<Vec<(String, Struct)>, FixtureError> {
    objects_from_yaml(raw)?
        .into_iter()
        .map(|mut object| {
            let name = take_resource_name(&mut object)
                .ok_or(FixtureError::MissingName(ANNOTATION_KEY_RESOURCE_NAME))?;
            Ok((name, object))
        })
        .collect()
}

fn into_object(value: Value) -> Result<Struct, FixtureError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(FixtureError::NotAnObject),
    }
}

/// Remove the name annotation from `object` and return its value. An
/// annotations map left empty is removed as well.
fn take_resource_name(object: &mut Struct) -> Option<String> {
    let metadata = object.get_mut("metadata")?.as_object_mut()?;
    let annotations = metadata.get_mut("annotations")?.as_object_mut()?;
    let name = match annotations.remove(ANNOTATION_KEY_RESOURCE_NAME)? {
        Value::String(name) if !name.is_empty() => name,
        _ => return None,
    };
    if annotations.is_empty() {
        metadata.remove("annotations");
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RESOURCES: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
  annotations:
    fn-server.test/resource-name: first
---
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
  annotations:
    fn-server.test/resource-name: second
    keep: me
"#;

    #[test]
    fn parses_named_documents() {
        let objects = named_objects_from_yaml(RESOURCES).unwrap();
        assert_eq!(objects.len(), 2);

        let (name, first) = &objects[0];
        assert_eq!(name, "first");
        assert_eq!(Value::Object(first["metadata"].as_object().unwrap().clone()), json!({"name": "first"}));

        let (name, second) = &objects[1];
        assert_eq!(name, "second");
        assert_eq!(second["metadata"]["annotations"], json!({"keep": "me"}));
    }

    #[test]
    fn missing_name_annotation_is_an_error() {
        let err = named_objects_from_yaml("kind: ConfigMap\n").unwrap_err();
        assert!(matches!(err, FixtureError::MissingName(_)));
    }

    #[test]
    fn scalar_document_is_not_an_object() {
        assert!(matches!(object_from_yaml("just text"), Err(FixtureError::NotAnObject)));
        assert!(matches!(object_from_json("[1]"), Err(FixtureError::NotAnObject)));
    }

    #[test]
    fn yaml_and_json_agree() {
        let from_yaml = object_from_yaml("kind: Bucket\nspec:\n  size: 3\n").unwrap();
        let from_json = object_from_json(r#"{"kind": "Bucket", "spec": {"size": 3}}"#).unwrap();
        assert_eq!(from_yaml, from_json);
    }
}
