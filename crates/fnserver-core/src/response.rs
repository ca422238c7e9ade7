use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::ServerError;
use crate::proto::{FunctionResult, Resource, Struct};
use crate::resource::ResourceModifier;

/// Per-invocation accumulator a server function writes its output into.
///
/// Every field starts unset. The server only overwrites the corresponding
/// field of the outer response for fields that were set here; everything
/// else passes through from the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunServerFunctionResponse {
    desired_composite: Option<Resource>,
    desired_composed: Option<BTreeMap<String, Resource>>,
    desired_context: Option<Struct>,
    results: Option<Vec<FunctionResult>>,
}

/// The staged output of one invocation, taken apart for merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedOutput {
    pub desired_composite: Option<Resource>,
    pub desired_composed: Option<BTreeMap<String, Resource>>,
    pub desired_context: Option<Struct>,
    pub results: Option<Vec<FunctionResult>>,
}

impl RunServerFunctionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `object` as the desired composite, replacing any earlier value.
    pub fn set_composite<T: Serialize + ?Sized>(
        &mut self,
        object: &T,
        mods: &[ResourceModifier],
    ) -> Result<(), ServerError> {
        let resource = Resource::from_object(object, mods)
            .map_err(|e| ServerError::encode("desired composite", e))?;
        self.desired_composite = Some(resource);
        Ok(())
    }

    /// Stage a native resource as the desired composite.
    pub fn set_composite_raw(&mut self, resource: Resource) {
        self.desired_composite = Some(resource);
    }

    /// Decode the staged desired composite. `Ok(None)` if nothing was staged.
    pub fn composite<T: DeserializeOwned>(&self) -> Result<Option<T>, ServerError> {
        let Some(staged) = self.desired_composite.as_ref() else {
            return Ok(None);
        };
        codec::as_object(staged.resource.as_ref())
            .map(Some)
            .map_err(|e| ServerError::decode("desired composite", e))
    }

    /// Stage `object` as the desired composed resource `name`.
    pub fn set_composed<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        object: &T,
        mods: &[ResourceModifier],
    ) -> Result<(), ServerError> {
        let name = name.into();
        let resource = Resource::from_object(object, mods)
            .map_err(|e| ServerError::encode(format!("desired resource {name:?}"), e))?;
        self.set_composed_raw(name, resource);
        Ok(())
    }

    /// Stage a native resource as the desired composed resource `name`.
    pub fn set_composed_raw(&mut self, name: impl Into<String>, resource: Resource) {
        self.desired_composed
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), resource);
    }

    /// Decode the staged desired composed resource `name`.
    ///
    /// Unlike reading observed state, a name that was never staged is an
    /// error ([`ServerError::NotFound`]).
    pub fn composed<T: DeserializeOwned>(&self, name: &str) -> Result<T, ServerError> {
        let staged = self
            .desired_composed
            .as_ref()
            .and_then(|m| m.get(name))
            .ok_or_else(|| ServerError::NotFound(name.to_string()))?;
        codec::as_object(staged.resource.as_ref())
            .map_err(|e| ServerError::decode(format!("desired resource {name:?}"), e))
    }

    /// Set context field `key` to `value`.
    pub fn set_context_field<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), ServerError> {
        let key = key.into();
        let value = codec::to_value(value)
            .map_err(|e| ServerError::encode(format!("context field {key:?}"), e))?;
        self.desired_context
            .get_or_insert_with(Struct::new)
            .insert(key, value);
        Ok(())
    }

    /// Replace the diagnostic results.
    pub fn set_native_results(&mut self, results: Vec<FunctionResult>) {
        self.results = Some(results);
    }

    /// Append one diagnostic result.
    pub fn add_result(&mut self, result: FunctionResult) {
        self.results.get_or_insert_with(Vec::new).push(result);
    }

    pub fn desired_composite(&self) -> Option<&Resource> {
        self.desired_composite.as_ref()
    }

    pub fn desired_composed(&self) -> Option<&BTreeMap<String, Resource>> {
        self.desired_composed.as_ref()
    }

    pub fn desired_context(&self) -> Option<&Struct> {
        self.desired_context.as_ref()
    }

    pub fn results(&self) -> Option<&[FunctionResult]> {
        self.results.as_deref()
    }

    pub fn into_staged(self) -> StagedOutput {
        StagedOutput {
            desired_composite: self.desired_composite,
            desired_composed: self.desired_composed,
            desired_context: self.desired_context,
            results: self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Ready;
    use crate::resource::{not_ready, ready};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Bucket {
        kind: String,
        region: String,
    }

    fn bucket(region: &str) -> Bucket {
        Bucket {
            kind: "Bucket".into(),
            region: region.into(),
        }
    }

    #[test]
    fn starts_empty() {
        let res = RunServerFunctionResponse::new();
        assert_eq!(res.into_staged(), StagedOutput::default());
    }

    #[test]
    fn composite_reads_back_staged_value() {
        let mut res = RunServerFunctionResponse::new();
        assert_eq!(res.composite::<Bucket>().unwrap(), None);

        res.set_composite(&bucket("eu"), &[]).unwrap();
        res.set_composite(&bucket("us"), &[not_ready()]).unwrap();

        assert_eq!(res.composite::<Bucket>().unwrap(), Some(bucket("us")));
        assert_eq!(res.desired_composite().unwrap().ready, Ready::False);
    }

    #[test]
    fn composed_reads_back_staged_value() {
        let mut res = RunServerFunctionResponse::new();
        res.set_composed("a", &bucket("eu"), &[ready()]).unwrap();
        res.set_composed("b", &bucket("us"), &[]).unwrap();
        res.set_composed("a", &bucket("ap"), &[]).unwrap();

        assert_eq!(res.composed::<Bucket>("a").unwrap(), bucket("ap"));
        assert_eq!(res.composed::<Bucket>("b").unwrap(), bucket("us"));
        assert_eq!(res.desired_composed().unwrap().len(), 2);
        assert_eq!(res.desired_composed().unwrap()["a"].ready, Ready::Unspecified);
    }

    #[test]
    fn composed_of_unset_name_is_not_found() {
        let mut res = RunServerFunctionResponse::new();
        let err = res.composed::<Bucket>("db").unwrap_err();
        assert!(err.is_not_found());

        res.set_composed("other", &bucket("eu"), &[]).unwrap();
        assert!(res.composed::<Bucket>("db").unwrap_err().is_not_found());
    }

    #[test]
    fn composed_raw_is_stored_as_is() {
        let mut res = RunServerFunctionResponse::new();
        let raw = Resource {
            ready: Ready::True,
            ..Default::default()
        };
        res.set_composed_raw("raw", raw.clone());
        assert_eq!(res.desired_composed().unwrap()["raw"], raw);
    }

    #[test]
    fn context_fields_are_created_lazily() {
        let mut res = RunServerFunctionResponse::new();
        assert!(res.desired_context().is_none());

        res.set_context_field("greeting", "hello Ada").unwrap();
        res.set_context_field("count", &3).unwrap();

        let context = res.desired_context().unwrap();
        assert_eq!(context["greeting"], json!("hello Ada"));
        assert_eq!(context["count"], json!(3));
    }

    #[test]
    fn unrepresentable_context_value_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        let value = BTreeMap::from([(vec![1u8], 1)]);
        let err = res.set_context_field("bad", &value).unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert!(res.desired_context().is_none());
    }

    #[test]
    fn non_finite_context_value_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        let err = res.set_context_field("bad", &f64::NAN).unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert!(err.to_string().contains("context field \"bad\""));
        assert!(res.desired_context().is_none());
    }

    #[derive(Serialize)]
    struct Gauge {
        x: f64,
    }

    #[test]
    fn non_finite_composed_field_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        let err = res
            .set_composed("nan", &Gauge { x: f64::INFINITY }, &[])
            .unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert!(res.desired_composed().is_none());
    }

    #[test]
    fn non_object_composed_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        let err = res.set_composed("db", "just a string", &[ready()]).unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert!(err.to_string().contains("desired resource \"db\""));
        assert!(res.desired_composed().is_none());
    }

    #[test]
    fn non_finite_composite_field_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        res.set_composite(&json!({"x": 1}), &[]).unwrap();
        let err = res
            .set_composite(&Gauge { x: f64::NEG_INFINITY }, &[])
            .unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert_eq!(res.composite::<serde_json::Value>().unwrap(), Some(json!({"x": 1})));
    }

    #[test]
    fn non_object_composite_is_an_encode_error() {
        let mut res = RunServerFunctionResponse::new();
        let err = res.set_composite("just a string", &[]).unwrap_err();
        assert!(matches!(err, ServerError::Encode { .. }));
        assert!(res.desired_composite().is_none());
    }

    #[test]
    fn results_are_set_and_appended() {
        let mut res = RunServerFunctionResponse::new();
        res.add_result(FunctionResult::normal("one"));
        res.add_result(FunctionResult::warning("two"));
        assert_eq!(res.results().unwrap().len(), 2);

        res.set_native_results(vec![FunctionResult::fatal("replaced")]);
        assert_eq!(res.results().unwrap(), &[FunctionResult::fatal("replaced")]);
    }
}
