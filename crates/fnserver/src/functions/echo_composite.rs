use fnserver_core::proto::FunctionResult;
use fnserver_core::{
    RunFuture, RunServerFunctionRequest, RunServerFunctionResponse, ServerFunction,
};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EchoCompositeInput {
    /// Fields merged into the composite's `spec`.
    pub spec: Map<String, Value>,
}

/// Copies the observed composite into the desired state, overlaying the
/// input's `spec` fields, and reports which fields it set.
pub struct EchoComposite;

impl ServerFunction for EchoComposite {
    fn run<'a>(
        &'a self,
        req: &'a RunServerFunctionRequest<'a>,
        res: &'a mut RunServerFunctionResponse,
    ) -> RunFuture<'a> {
        Box::pin(async move {
            let input: EchoCompositeInput = req.input()?;
            let mut xr: Map<String, Value> = req.composite()?;

            let spec = xr
                .entry("spec")
                .or_insert_with(|| Value::Object(Map::new()));
            if !spec.is_object() {
                return Err("composite spec is not an object".into());
            }
            let fields: Vec<String> = input.spec.keys().cloned().collect();
            if let Value::Object(spec) = spec {
                spec.extend(input.spec);
            }

            res.set_composite(&xr, &[])?;
            res.add_result(FunctionResult::normal(if fields.is_empty() {
                "echoed composite".to_string()
            } else {
                format!("echoed composite with spec fields {}", fields.join(", "))
            }));
            Ok(())
        })
    }
}
