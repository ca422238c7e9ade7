use fnserver_core::{
    RunFuture, RunServerFunctionRequest, RunServerFunctionResponse, ServerFunction,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GreetInput {
    pub name: String,
}

/// Writes `greeting: "hello <name>"` into the pipeline context.
pub struct Greet;

impl ServerFunction for Greet {
    fn run<'a>(
        &'a self,
        req: &'a RunServerFunctionRequest<'a>,
        res: &'a mut RunServerFunctionResponse,
    ) -> RunFuture<'a> {
        Box::pin(async move {
            let input: GreetInput = req.input()?;
            tracing::debug!(name = %input.name, "Greeting");
            res.set_context_field("greeting", &format!("hello {}", input.name))?;
            Ok(())
        })
    }
}
