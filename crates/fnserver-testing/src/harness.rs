use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use fnserver_core::proto::{FunctionResult, Resource, RunFunctionRequest, State, Struct};
use fnserver_core::{
    ResourceModifier, RunServerFunctionRequest, RunServerFunctionResponse, ServerFunction,
    ServerInput,
};

use crate::fixture;
use crate::outcome::{Mismatch, TestOutcome};

/// Name the function under test is invoked as.
const FUNCTION_UNDER_TEST: &str = "function-under-test";

/// Runs one [`ServerFunction`] against fixture state and compares what it
/// staged with the expectations.
///
/// Fixture methods panic on malformed fixtures, failing the calling test.
///
/// ```rust
/// use fnserver_core::from_fn;
/// use fnserver_testing::FunctionTest;
///
/// # async fn run() {
/// let function = from_fn(|req, res| {
///     let bucket: serde_json::Value = req.input()?;
///     res.set_composed("bucket", &bucket, &[])?;
///     Ok(())
/// });
///
/// FunctionTest::new(function)
///     .with_input_yaml("kind: Bucket")
///     .expect_desired_resource_yaml("bucket", "kind: Bucket", &[])
///     .assert()
///     .await;
/// # }
/// ```
pub struct FunctionTest<F> {
    function: F,
    input: Value,
    observed_composite: Option<Resource>,
    observed_resources: BTreeMap<String, Resource>,
    context: Struct,
    want: Want,
}

#[derive(Default)]
struct Want {
    desired_composite: Option<Resource>,
    desired_resources: BTreeMap<String, Resource>,
    context: BTreeMap<String, Value>,
    results: Vec<FunctionResult>,
    error: Option<String>,
}

fn must<T>(result: Result<T, crate::FixtureError>) -> T {
    result.unwrap_or_else(|e| panic!("{e}"))
}

fn must_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| panic!("cannot encode fixture: {e}"))
}

fn must_resource<T: Serialize + ?Sized>(object: &T, mods: &[ResourceModifier]) -> Resource {
    Resource::from_object(object, mods).unwrap_or_else(|e| panic!("cannot encode fixture: {e}"))
}

impl<F: ServerFunction> FunctionTest<F> {
    pub fn new(function: F) -> Self {
        Self {
            function,
            input: Value::Null,
            observed_composite: None,
            observed_resources: BTreeMap::new(),
            context: Struct::new(),
            want: Want::default(),
        }
    }

    /// Input passed to the function. Anything that serializes to JSON.
    pub fn with_input<T: Serialize + ?Sized>(mut self, input: &T) -> Self {
        self.input = must_value(input);
        self
    }

    pub fn with_input_json(mut self, raw: &str) -> Self {
        self.input = must(fixture::value_from_json(raw));
        self
    }

    pub fn with_input_yaml(mut self, raw: &str) -> Self {
        self.input = must(fixture::value_from_yaml(raw));
        self
    }

    pub fn with_observed_composite<T: Serialize + ?Sized>(mut self, object: &T) -> Self {
        self.observed_composite = Some(must_resource(object, &[]));
        self
    }

    pub fn with_observed_composite_json(self, raw: &str) -> Self {
        let object = must(fixture::object_from_json(raw));
        self.with_observed_composite(&object)
    }

    pub fn with_observed_composite_yaml(self, raw: &str) -> Self {
        let object = must(fixture::object_from_yaml(raw));
        self.with_observed_composite(&object)
    }

    /// Add `object` to the observed resources under `name`.
    pub fn with_observed_resource<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        object: &T,
    ) -> Self {
        self.observed_resources
            .insert(name.into(), must_resource(object, &[]));
        self
    }

    pub fn with_observed_resource_json(self, name: impl Into<String>, raw: &str) -> Self {
        let object = must(fixture::object_from_json(raw));
        self.with_observed_resource(name, &object)
    }

    pub fn with_observed_resource_yaml(self, name: impl Into<String>, raw: &str) -> Self {
        let object = must(fixture::object_from_yaml(raw));
        self.with_observed_resource(name, &object)
    }

    /// Add every object of a multi-document YAML stream to the observed
    /// resources, named by [`fixture::ANNOTATION_KEY_RESOURCE_NAME`].
    pub fn with_observed_resources_yaml(mut self, raw: &str) -> Self {
        for (name, object) in must(fixture::named_objects_from_yaml(raw)) {
            self = self.with_observed_resource(name, &object);
        }
        self
    }

    /// Set context field `key` of the request.
    pub fn with_context_value<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        self.context.insert(key.into(), must_value(value));
        self
    }

    pub fn with_context_value_json(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.context
            .insert(key.into(), must(fixture::value_from_json(raw)));
        self
    }

    pub fn with_context_value_yaml(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.context
            .insert(key.into(), must(fixture::value_from_yaml(raw)));
        self
    }

    pub fn expect_desired_composite<T: Serialize + ?Sized>(
        mut self,
        object: &T,
        mods: &[ResourceModifier],
    ) -> Self {
        self.want.desired_composite = Some(must_resource(object, mods));
        self
    }

    pub fn expect_desired_composite_json(self, raw: &str, mods: &[ResourceModifier]) -> Self {
        let object = must(fixture::object_from_json(raw));
        self.expect_desired_composite(&object, mods)
    }

    pub fn expect_desired_composite_yaml(self, raw: &str, mods: &[ResourceModifier]) -> Self {
        let object = must(fixture::object_from_yaml(raw));
        self.expect_desired_composite(&object, mods)
    }

    pub fn expect_desired_resource<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        object: &T,
        mods: &[ResourceModifier],
    ) -> Self {
        self.want
            .desired_resources
            .insert(name.into(), must_resource(object, mods));
        self
    }

    pub fn expect_desired_resource_json(
        self,
        name: impl Into<String>,
        raw: &str,
        mods: &[ResourceModifier],
    ) -> Self {
        let object = must(fixture::object_from_json(raw));
        self.expect_desired_resource(name, &object, mods)
    }

    pub fn expect_desired_resource_yaml(
        self,
        name: impl Into<String>,
        raw: &str,
        mods: &[ResourceModifier],
    ) -> Self {
        let object = must(fixture::object_from_yaml(raw));
        self.expect_desired_resource(name, &object, mods)
    }

    /// Expect every object of a multi-document YAML stream as a desired
    /// resource, named by [`fixture::ANNOTATION_KEY_RESOURCE_NAME`].
    pub fn expect_desired_resources_yaml(mut self, raw: &str) -> Self {
        for (name, object) in must(fixture::named_objects_from_yaml(raw)) {
            self = self.expect_desired_resource(name, &object, &[]);
        }
        self
    }

    /// Expect context field `key` to be staged with `value`.
    pub fn expect_context_value<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        self.want.context.insert(key.into(), must_value(value));
        self
    }

    pub fn expect_results(mut self, results: Vec<FunctionResult>) -> Self {
        self.want.results = results;
        self
    }

    /// Expect the function to fail with an error whose message contains
    /// `message`.
    pub fn expect_error(mut self, message: impl Into<String>) -> Self {
        self.want.error = Some(message.into());
        self
    }

    /// Run the function once and collect every mismatch.
    pub async fn run(self) -> TestOutcome {
        let native = RunFunctionRequest {
            observed: State {
                composite: self.observed_composite,
                resources: self.observed_resources,
            },
            context: Some(self.context),
            ..Default::default()
        };
        let req = RunServerFunctionRequest::new(
            &native,
            ServerInput::new(FUNCTION_UNDER_TEST, self.input),
        );
        let mut res = RunServerFunctionResponse::new();

        let result = self.function.run(&req, &mut res).await;

        let want = self.want;
        let mut mismatches = Vec::new();

        compare(
            &mut mismatches,
            "Composite",
            &want.desired_composite,
            &res.desired_composite().cloned(),
        );
        compare(
            &mut mismatches,
            "Resources",
            &want.desired_resources,
            &res.desired_composed().cloned().unwrap_or_default(),
        );
        compare(
            &mut mismatches,
            "Results",
            &want.results,
            &res.results().map(<[FunctionResult]>::to_vec).unwrap_or_default(),
        );

        let staged_context = res.desired_context();
        for (key, value) in &want.context {
            let got = staged_context.and_then(|c| c.get(key)).cloned();
            compare(&mut mismatches, &format!("Context[{key}]"), &Some(value.clone()), &got);
        }

        let got_error = result.err().map(|e| e.to_string());
        match (&want.error, &got_error) {
            (Some(want), Some(got)) if got.contains(want.as_str()) => {}
            (None, None) => {}
            _ => mismatches.push(Mismatch::new("Error", &want.error, &got_error)),
        }

        TestOutcome::new(mismatches)
    }

    /// Run the function and panic with a readable diff on any mismatch.
    pub async fn assert(self) {
        self.run().await.assert_success();
    }
}

fn compare<T: Serialize + PartialEq>(mismatches: &mut Vec<Mismatch>, field: &str, want: &T, got: &T) {
    if want != got {
        mismatches.push(Mismatch::new(field, want, got));
    }
}
