use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::ServerError;
use crate::input::ServerInput;
use crate::proto::RunFunctionRequest;

/// Read-only view of one call, handed to a server function.
///
/// Wraps the native request together with the already decoded
/// [`ServerInput`] so functions never touch the routing envelope.
#[derive(Debug, Clone)]
pub struct RunServerFunctionRequest<'r> {
    native: &'r RunFunctionRequest,
    server_input: ServerInput,
}

impl<'r> RunServerFunctionRequest<'r> {
    pub fn new(native: &'r RunFunctionRequest, server_input: ServerInput) -> Self {
        Self {
            native,
            server_input,
        }
    }

    /// The underlying request, for functions that need lower-level access.
    ///
    /// Note that its `input` is the routing envelope, not this function's
    /// input. Use [`Self::input`] for that.
    pub fn native_request(&self) -> &'r RunFunctionRequest {
        self.native
    }

    pub fn server_input(&self) -> &ServerInput {
        &self.server_input
    }

    /// Decode this server function's input.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, ServerError> {
        serde_json::from_value(self.server_input.spec.input.clone())
            .map_err(|e| ServerError::decode("server function input", e))
    }

    /// Decode the observed composite resource.
    ///
    /// Without an observed composite this decodes an empty object.
    pub fn composite<T: DeserializeOwned>(&self) -> Result<T, ServerError> {
        let doc = self
            .native
            .observed
            .composite
            .as_ref()
            .and_then(|c| c.resource.as_ref());
        codec::as_object(doc).map_err(|e| ServerError::decode("observed composite", e))
    }

    /// Decode the observed composed resource `name`.
    ///
    /// Returns `Ok(None)` when no such resource is observed: it may simply not
    /// exist yet.
    pub fn composed<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ServerError> {
        let Some(observed) = self.native.observed.resources.get(name) else {
            return Ok(None);
        };
        codec::as_object(observed.resource.as_ref())
            .map(Some)
            .map_err(|e| ServerError::decode(format!("observed resource {name:?}"), e))
    }

    /// Decode one field of the inbound context. `Ok(None)` if unset.
    pub fn context_field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServerError> {
        let Some(value) = self.native.context.as_ref().and_then(|c| c.get(key)) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ServerError::decode(format!("context field {key:?}"), e))
    }
}
