//! Wire envelope of a composition function call.
//!
//! These types follow the JSON mapping of the Crossplane `RunFunctionRequest`
//! and `RunFunctionResponse` messages: camelCase field names, enum values as
//! their protobuf names and `bytes` as base64 strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A structured document: the JSON object form of a `google.protobuf.Struct`.
pub type Struct = serde_json::Map<String, serde_json::Value>;

/// Tri-state readiness of a desired resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ready {
    #[default]
    #[serde(rename = "READY_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "READY_TRUE")]
    True,
    #[serde(rename = "READY_FALSE")]
    False,
}

impl Ready {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Ready::Unspecified)
    }
}

/// One addressable resource: its document, readiness and connection details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Struct>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        with = "connection_details"
    )]
    pub connection_details: BTreeMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "Ready::is_unspecified")]
    pub ready: Ready,
}

/// Observed or desired state: the composite plus named composed resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<Resource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, Resource>,
}

/// Severity of a [`FunctionResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    #[serde(rename = "SEVERITY_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "SEVERITY_FATAL")]
    Fatal,
    #[serde(rename = "SEVERITY_WARNING")]
    Warning,
    #[serde(rename = "SEVERITY_NORMAL")]
    Normal,
}

/// A diagnostic emitted by a function. The router passes these through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResult {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
}

impl FunctionResult {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn normal(message: impl Into<String>) -> Self {
        Self::new(Severity::Normal, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub tag: String,
}

/// Inbound call envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFunctionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
    #[serde(default)]
    pub observed: State,
    /// Desired state accumulated by earlier steps of a pipeline, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Struct>,
    /// Opaque routing envelope; decodes to a [`crate::input::ServerInput`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

impl RunFunctionRequest {
    pub fn tag(&self) -> &str {
        self.meta.as_ref().map(|m| m.tag.as_str()).unwrap_or_default()
    }
}

/// Outbound call envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(default)]
    pub desired: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Struct>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<FunctionResult>,
}

/// Connection details travel as base64 strings, like protobuf `bytes` in JSON.
mod connection_details {
    use std::collections::BTreeMap;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        details: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(details.len()))?;
        for (key, value) in details {
            map.serialize_entry(key, &STANDARD.encode(value))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(key, value)| {
                STANDARD
                    .decode(value)
                    .map(|bytes| (key, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ready_uses_protobuf_names() {
        assert_eq!(
            serde_json::to_value(Ready::True).unwrap(),
            json!("READY_TRUE")
        );
        let ready: Ready = serde_json::from_value(json!("READY_FALSE")).unwrap();
        assert_eq!(ready, Ready::False);
    }

    #[test]
    fn connection_details_are_base64() {
        let mut resource = Resource::default();
        resource
            .connection_details
            .insert("password".into(), b"s3cret".to_vec());

        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value, json!({"connectionDetails": {"password": "czNjcmV0"}}));

        let back: Resource = serde_json::from_value(value).unwrap();
        assert_eq!(back.connection_details["password"], b"s3cret");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let result: Result<Resource, _> =
            serde_json::from_value(json!({"connectionDetails": {"k": "%%%"}}));
        assert!(result.is_err());
    }

    #[test]
    fn request_parses_camel_case_envelope() {
        let req: RunFunctionRequest = serde_json::from_value(json!({
            "meta": {"tag": "abc"},
            "observed": {
                "composite": {"resource": {"kind": "XDatabase"}},
                "resources": {"db": {"resource": {"kind": "Instance"}, "ready": "READY_TRUE"}}
            },
            "context": {"k": 1},
            "input": {"spec": {"functionName": "greet"}}
        }))
        .unwrap();

        assert_eq!(req.tag(), "abc");
        assert!(req.desired.is_none());
        assert_eq!(req.observed.resources["db"].ready, Ready::True);
        assert_eq!(req.context.unwrap()["k"], json!(1));
    }

    #[test]
    fn empty_response_serializes_compactly() {
        let value = serde_json::to_value(RunFunctionResponse::default()).unwrap();
        assert_eq!(value, json!({"desired": {}}));
    }
}
