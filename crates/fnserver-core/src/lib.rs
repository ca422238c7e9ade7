//! Routing core of fnserver.
//!
//! A single composition function endpoint serves many *server functions*.
//! Each call carries a [`ServerInput`] naming the server function to run;
//! [`Server`] looks it up, runs it against a simplified view of the request
//! ([`RunServerFunctionRequest`]) and merges what it staged
//! ([`RunServerFunctionResponse`]) into the outer response.
//!
//! ```rust
//! use fnserver_core::{Server, from_fn, with_function};
//! use fnserver_core::proto::RunFunctionRequest;
//!
//! # async fn run() -> Result<(), fnserver_core::ServerError> {
//! let server = Server::new([
//!     with_function("greet", from_fn(|req, res| {
//!         let name: String = req.input()?;
//!         res.set_context_field("greeting", &format!("hello {name}"))?;
//!         Ok(())
//!     })),
//! ]);
//!
//! let req: RunFunctionRequest = serde_json::from_value(serde_json::json!({
//!     "input": {"spec": {"functionName": "greet", "input": "Ada"}}
//! })).unwrap();
//! let res = server.run_function(&req).await?;
//! assert_eq!(res.context.unwrap()["greeting"], "hello Ada");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod function;
pub mod input;
pub mod proto;
pub mod registry;
pub mod request;
pub mod resource;
pub mod response;
pub mod server;

pub use error::{BoxError, ServerError, is_not_found};
pub use function::{FnServerFunction, RunFuture, ServerFunction, from_fn};
pub use input::ServerInput;
pub use registry::{Registry, ServerOption, with_function};
pub use request::RunServerFunctionRequest;
pub use resource::{
    ResourceModifier, not_ready, ready, ready_unspecified, with_connection_details, with_ready,
};
pub use response::RunServerFunctionResponse;
pub use server::Server;
