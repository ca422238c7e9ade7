//! Building resource envelopes from typed objects.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec;
use crate::proto::{Ready, Resource};

/// Adjusts a [`Resource`] right after it was encoded.
pub type ResourceModifier = Box<dyn Fn(&mut Resource) + Send + Sync>;

/// Sets the ready state of a resource.
pub fn with_ready(ready: Ready) -> ResourceModifier {
    Box::new(move |r| r.ready = ready)
}

/// Marks a resource as ready.
pub fn ready() -> ResourceModifier {
    with_ready(Ready::True)
}

/// Marks a resource as not ready.
pub fn not_ready() -> ResourceModifier {
    with_ready(Ready::False)
}

/// Leaves readiness to whoever consumes the desired state.
pub fn ready_unspecified() -> ResourceModifier {
    with_ready(Ready::Unspecified)
}

/// Replaces the connection details of a resource.
pub fn with_connection_details(details: BTreeMap<String, Vec<u8>>) -> ResourceModifier {
    Box::new(move |r| r.connection_details = details.clone())
}

impl Resource {
    /// Encode `object` and apply `mods` in order.
    pub fn from_object<T: Serialize + ?Sized>(
        object: &T,
        mods: &[ResourceModifier],
    ) -> Result<Self, serde_json::Error> {
        let mut resource = Resource {
            resource: Some(codec::as_struct(object)?),
            ..Default::default()
        };
        resource.apply(mods);
        Ok(resource)
    }

    pub fn apply(&mut self, mods: &[ResourceModifier]) {
        for modify in mods {
            modify(self);
        }
    }
}
