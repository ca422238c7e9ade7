use crate::error::ServerError;
use crate::input::ServerInput;
use crate::proto::{ResponseMeta, RunFunctionRequest, RunFunctionResponse};
use crate::registry::{Registry, ServerOption};
use crate::request::RunServerFunctionRequest;
use crate::response::{RunServerFunctionResponse, StagedOutput};

/// A composition function that routes each call to one of several server
/// functions.
///
/// The composition passes a [`ServerInput`] as function input; its
/// `functionName` picks the server function and its `input` is handed to it.
///
/// ```
/// use fnserver_core::{Server, from_fn, with_function};
///
/// let server = Server::new([
///     with_function("noop", from_fn(|_req, _res| Ok(()))),
/// ]);
/// assert_eq!(server.registry().names(), vec!["noop"]);
/// ```
#[derive(Debug)]
pub struct Server {
    registry: Registry,
}

impl Server {
    pub fn new(opts: impl IntoIterator<Item = ServerOption>) -> Self {
        Self::from_registry(Registry::new(opts))
    }

    pub fn from_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one function call: decode the routing input, invoke the named
    /// server function and merge what it staged into the response.
    ///
    /// Nothing is merged if the server function fails.
    pub async fn run_function(
        &self,
        req: &RunFunctionRequest,
    ) -> Result<RunFunctionResponse, ServerError> {
        let tag = req.tag();

        let server_input = ServerInput::from_value(req.input.as_ref()).inspect_err(|e| {
            tracing::warn!(tag = %tag, error = %e, "Cannot parse server input");
        })?;
        let name = server_input.function_name().to_string();

        let Some(function) = self.registry.lookup(&name) else {
            tracing::warn!(tag = %tag, function = %name, "No server function registered");
            return Err(ServerError::UnknownFunction { name });
        };

        tracing::debug!(tag = %tag, function = %name, "Running server function");

        let fn_req = RunServerFunctionRequest::new(req, server_input);
        let mut fn_res = RunServerFunctionResponse::new();
        if let Err(source) = function.run(&fn_req, &mut fn_res).await {
            tracing::warn!(
                tag = %tag,
                function = %name,
                error = %source,
                "Server function failed"
            );
            return Err(ServerError::Handler { name, source });
        }

        let staged = fn_res.into_staged();
        tracing::debug!(
            tag = %tag,
            function = %name,
            composite = staged.desired_composite.is_some(),
            resources = staged.desired_composed.as_ref().map_or(0, |m| m.len()),
            context = staged.desired_context.is_some(),
            results = staged.results.as_ref().map_or(0, |r| r.len()),
            "Merging staged output"
        );

        let res = merge(req, staged);
        tracing::info!(tag = %tag, function = %name, "Server function completed");
        Ok(res)
    }
}

/// Start from the request's desired state, or from its observed state when
/// the request carries no desired state, plus the request's context. Then
/// overwrite each field the server function staged.
///
/// Staged composed resources replace the whole resource mapping; resources
/// the function did not stage are dropped from the response.
fn merge(req: &RunFunctionRequest, staged: StagedOutput) -> RunFunctionResponse {
    let mut res = RunFunctionResponse {
        meta: req.meta.as_ref().map(|m| ResponseMeta { tag: m.tag.clone() }),
        desired: req.desired.clone().unwrap_or_else(|| req.observed.clone()),
        context: req.context.clone(),
        results: Vec::new(),
    };

    if let Some(composite) = staged.desired_composite {
        res.desired.composite = Some(composite);
    }
    if let Some(resources) = staged.desired_composed.filter(|m| !m.is_empty()) {
        res.desired.resources = resources;
    }
    if let Some(context) = staged.desired_context {
        res.context = Some(context);
    }
    if let Some(results) = staged.results {
        res.results = results;
    }
    res
}
