//! Server functions shipped with the `fn-server` binary.

pub mod cluster_role;
pub mod echo_composite;
pub mod greet;

use fnserver_core::{ServerOption, with_function};

/// Registration options for every built-in server function.
pub fn all() -> Vec<ServerOption> {
    vec![
        with_function("greet", greet::Greet),
        with_function("cluster-role", cluster_role::ClusterRole),
        with_function("echo-composite", echo_composite::EchoComposite),
        // more server functions can be registered here
    ]
}
