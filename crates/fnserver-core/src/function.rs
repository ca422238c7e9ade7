use std::future::Future;
use std::pin::Pin;

use crate::error::BoxError;
use crate::request::RunServerFunctionRequest;
use crate::response::RunServerFunctionResponse;

/// Future returned by [`ServerFunction::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;

/// A named subroutine served behind the single function endpoint.
///
/// The server calls `run` once per request with a fresh request view and an
/// empty response. Whatever the function stages in `res` is merged into the
/// outer response if `run` succeeds, and discarded if it fails.
pub trait ServerFunction: Send + Sync {
    fn run<'a>(
        &'a self,
        req: &'a RunServerFunctionRequest<'a>,
        res: &'a mut RunServerFunctionResponse,
    ) -> RunFuture<'a>;
}

/// A [`ServerFunction`] backed by a synchronous closure. See [`from_fn`].
pub struct FnServerFunction<F> {
    f: F,
}

/// Wrap a synchronous closure as a [`ServerFunction`].
///
/// ```
/// use fnserver_core::function::from_fn;
///
/// let greet = from_fn(|req, res| {
///     let name: String = req.input()?;
///     res.set_context_field("greeting", &format!("hello {name}"))?;
///     Ok(())
/// });
/// # let _ = greet;
/// ```
pub fn from_fn<F>(f: F) -> FnServerFunction<F>
where
    F: Fn(&RunServerFunctionRequest<'_>, &mut RunServerFunctionResponse) -> Result<(), BoxError>
        + Send
        + Sync,
{
    FnServerFunction { f }
}

impl<F> ServerFunction for FnServerFunction<F>
where
    F: Fn(&RunServerFunctionRequest<'_>, &mut RunServerFunctionResponse) -> Result<(), BoxError>
        + Send
        + Sync,
{
    fn run<'a>(
        &'a self,
        req: &'a RunServerFunctionRequest<'a>,
        res: &'a mut RunServerFunctionResponse,
    ) -> RunFuture<'a> {
        let result = (self.f)(req, res);
        Box::pin(std::future::ready(result))
    }
}
