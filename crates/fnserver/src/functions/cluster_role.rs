use fnserver_core::{
    RunFuture, RunServerFunctionRequest, RunServerFunctionResponse, ServerFunction, ready,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Name of the composed resource this function stages.
pub const RESOURCE_NAME: &str = "clusterRole";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleInput {
    pub api_groups: Vec<Value>,
    pub resources: Vec<Value>,
}

/// Stages a read-only RBAC `ClusterRole` for the given API groups and
/// resources, marked ready.
pub struct ClusterRole;

impl ServerFunction for ClusterRole {
    fn run<'a>(
        &'a self,
        req: &'a RunServerFunctionRequest<'a>,
        res: &'a mut RunServerFunctionResponse,
    ) -> RunFuture<'a> {
        Box::pin(async move {
            let input: ClusterRoleInput = req.input()?;
            tracing::debug!(
                api_groups = input.api_groups.len(),
                resources = input.resources.len(),
                "Composing cluster role"
            );

            let role = json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "ClusterRole",
                "metadata": {"name": "composed"},
                "rules": [{
                    "apiGroups": input.api_groups,
                    "resources": input.resources,
                    "verbs": ["get", "watch", "list"],
                }],
            });
            res.set_composed(RESOURCE_NAME, &role, &[ready()])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnserver_testing::FunctionTest;

    const COMPOSITE: &str = include_str!("../../testdata/composite.yaml");
    const INPUT: &str = include_str!("../../testdata/input.yaml");
    const EXPECTED_RESOURCES: &str = include_str!("../../testdata/expected-resources.yaml");

    #[tokio::test]
    async fn composes_cluster_role() {
        FunctionTest::new(ClusterRole)
            .with_observed_composite_yaml(COMPOSITE)
            .with_input_yaml(INPUT)
            .expect_desired_resource_yaml(
                RESOURCE_NAME,
                &expected_resource(),
                &[ready()],
            )
            .assert()
            .await;
    }

    #[tokio::test]
    async fn matches_multi_document_fixture_except_readiness() {
        // Multi-document fixtures cannot carry readiness, so only the
        // readiness of the staged resource differs.
        let outcome = FunctionTest::new(ClusterRole)
            .with_input_yaml(INPUT)
            .expect_desired_resources_yaml(EXPECTED_RESOURCES)
            .run()
            .await;

        assert_eq!(outcome.mismatches().len(), 1);
        assert!(outcome.mismatches()[0].got.contains("READY_TRUE"));
    }

    #[tokio::test]
    async fn rejects_incomplete_input() {
        FunctionTest::new(ClusterRole)
            .with_input_yaml("apiGroups: [\"\"]\n")
            .expect_error("missing field `resources`")
            .assert()
            .await;
    }

    fn expected_resource() -> String {
        EXPECTED_RESOURCES
            .lines()
            .filter(|line| !line.contains("annotations") && !line.contains("fn-server.test"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
