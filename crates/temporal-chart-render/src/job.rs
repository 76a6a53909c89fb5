//! Schema Job: creates, sets up and migrates both stores
//!
//! Each enabled step runs as an init container per store, in step order
//! (create, setup, update) and store order (default, visibility), so the
//! Job succeeds only when every store is ready.

use std::collections::BTreeMap;

use temporal_chart_values::{StoreBackend, StoreValues};

use crate::env::schema_env;
use crate::error::RenderError;
use crate::k8s::{Container, Job, JobSpec, PodSpec, PodTemplateSpec};
use crate::metadata::{MetadataScope, Target, WorkloadMetadata};
use crate::renderer::ChartRenderer;

const SCHEMA_ROOT: &str = "/etc/temporal/schema";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Create,
    Setup,
    Update,
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::Setup => "setup",
            Step::Update => "update",
        }
    }
}

/// The schema Job, or `None` when every step is disabled
pub fn schema_job(r: &ChartRenderer<'_>) -> Result<Option<Job>, RenderError> {
    let schema = &r.values.schema;
    if !schema.any_enabled() {
        return Ok(None);
    }

    let steps = [
        (Step::Create, schema.create_database.enabled),
        (Step::Setup, schema.setup.enabled),
        (Step::Update, schema.update.enabled),
    ];
    let stores = r.values.server.config.persistence.stores();
    let init_containers = steps
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .flat_map(|(step, _)| stores.into_iter().map(move |store| (step, store)))
        .map(|(step, store)| step_container(r, step, store))
        .collect();

    let image = &r.values.admintools_image;
    let done = Container {
        name: "done".to_string(),
        image: image.reference(),
        image_pull_policy: Some(image.pull_policy.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo \"Store setup completed\"".to_string(),
        ]),
        ..Default::default()
    };

    let hooks = hook_annotations(r);
    let no_labels = BTreeMap::new();
    let metadata = WorkloadMetadata::fan_out(&[
        r.additional_scope(),
        MetadataScope::new(&no_labels, &hooks, Target::Resource),
        MetadataScope::new(&schema.pod_labels, &schema.pod_annotations, Target::Pod),
    ])
    .with_standard_labels(&r.names.standard_labels("database"));

    Ok(Some(Job {
        api_version: "batch/v1".to_string(),
        kind: "Job".to_string(),
        metadata: metadata.object_meta(
            r.names.schema_job(r.release.revision),
            r.release.namespace.clone(),
        ),
        spec: JobSpec {
            backoff_limit: schema.setup.backoff_limit.or(schema.update.backoff_limit),
            template: PodTemplateSpec {
                metadata: metadata.pod_meta(),
                spec: PodSpec {
                    service_account_name: r.names.service_account(r.values),
                    restart_policy: Some("OnFailure".to_string()),
                    init_containers,
                    containers: vec![done],
                    ..Default::default()
                },
            },
        },
    }))
}

/// Run after install when the release brings its own database
fn hook_annotations(r: &ChartRenderer<'_>) -> BTreeMap<String, String> {
    let values = r.values;
    let bundled_db = values.cassandra_enabled || values.mysql_enabled || values.postgresql_enabled;
    let hook = if bundled_db {
        "post-install,post-upgrade"
    } else {
        "pre-install,pre-upgrade"
    };
    BTreeMap::from([
        ("helm.sh/hook".to_string(), hook.to_string()),
        ("helm.sh/hook-weight".to_string(), "-1".to_string()),
        (
            "helm.sh/hook-delete-policy".to_string(),
            "before-hook-creation,hook-succeeded".to_string(),
        ),
    ])
}

fn step_container(r: &ChartRenderer<'_>, step: Step, store: &StoreValues) -> Container {
    let image = &r.values.admintools_image;
    Container {
        name: format!("{}-{}-store", step.as_str(), store.name.as_str()),
        image: image.reference(),
        image_pull_policy: Some(image.pull_policy.clone()),
        command: Some(step_command(step, store)),
        env: schema_env(&r.names, store),
        ..Default::default()
    }
}

fn step_command(step: Step, store: &StoreValues) -> Vec<String> {
    let schema = store.name.schema_name();
    let command: Vec<String> = match (&store.backend, step) {
        (StoreBackend::Cassandra(c), Step::Create) => vec![
            "temporal-cassandra-tool".into(),
            "create-keyspace".into(),
            "-k".into(),
            c.keyspace.clone(),
            "--replication-factor".into(),
            c.replication_factor.to_string(),
        ],
        (StoreBackend::Cassandra(_), Step::Setup) => vec![
            "temporal-cassandra-tool".into(),
            "setup-schema".into(),
            "-v".into(),
            "0.0".into(),
        ],
        (StoreBackend::Cassandra(_), Step::Update) => vec![
            "temporal-cassandra-tool".into(),
            "update-schema".into(),
            "--schema-dir".into(),
            format!("{SCHEMA_ROOT}/cassandra/{schema}/versioned"),
        ],
        (StoreBackend::Sql(_), Step::Create) => {
            vec!["temporal-sql-tool".into(), "create-database".into()]
        }
        (StoreBackend::Sql(_), Step::Setup) => vec![
            "temporal-sql-tool".into(),
            "setup-schema".into(),
            "-v".into(),
            "0.0".into(),
        ],
        (StoreBackend::Sql(s), Step::Update) => vec![
            "temporal-sql-tool".into(),
            "update-schema".into(),
            "--schema-dir".into(),
            format!("{SCHEMA_ROOT}/{}/{schema}/versioned", s.plugin.schema_dir()),
        ],
    };
    command
}

#[cfg(test)]
mod tests {
    use temporal_chart_values::{ChartValues, Release, ValueLayer, ValueTree};

    use super::*;

    fn render(overrides: &[&str]) -> Option<Job> {
        let layers = [
            ValueLayer::defaults().unwrap(),
            ValueLayer::from_set_args(overrides).unwrap(),
        ];
        let tree = ValueTree::merge(&layers).unwrap();
        let release = Release::default();
        let values = ChartValues::from_tree(&tree, &release).unwrap();
        schema_job(&ChartRenderer::new(&values, &release).unwrap()).unwrap()
    }

    fn init_names(job: &Job) -> Vec<&str> {
        job.spec
            .template
            .spec
            .init_containers
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    #[test]
    fn steps_run_per_store_in_order() {
        let job = render(&[]).unwrap();
        assert_eq!(job.metadata.name, "temporal-schema-1");
        assert_eq!(
            init_names(&job),
            vec![
                "create-default-store",
                "create-visibility-store",
                "setup-default-store",
                "setup-visibility-store",
                "update-default-store",
                "update-visibility-store"
            ]
        );
        assert_eq!(job.spec.template.spec.restart_policy.as_deref(), Some("OnFailure"));
    }

    #[test]
    fn disabled_steps_are_skipped() {
        let job = render(&["schema.createDatabase.enabled=false", "schema.update.enabled=false"]).unwrap();
        assert_eq!(init_names(&job), vec!["setup-default-store", "setup-visibility-store"]);
    }

    #[test]
    fn no_job_when_every_step_is_off() {
        assert!(render(&[
            "schema.createDatabase.enabled=false",
            "schema.setup.enabled=false",
            "schema.update.enabled=false",
        ])
        .is_none());
    }

    #[test]
    fn sql_update_uses_plugin_schema_dir() {
        let job = render(&[
            "cassandra.enabled=false",
            "postgresql.enabled=true",
            "server.config.persistence.visibility.driver=sql",
        ])
        .unwrap();
        let update = job
            .spec
            .template
            .spec
            .init_containers
            .iter()
            .find(|c| c.name == "update-visibility-store")
            .unwrap();
        assert_eq!(
            update.command.as_ref().unwrap().last().map(String::as_str),
            Some("/etc/temporal/schema/postgresql/v12/visibility/versioned")
        );
    }

    #[test]
    fn hook_runs_before_install_for_external_databases() {
        let external = render(&["cassandra.enabled=false"]).unwrap();
        assert_eq!(external.metadata.annotations["helm.sh/hook"], "pre-install,pre-upgrade");

        let bundled = render(&[]).unwrap();
        assert_eq!(bundled.metadata.annotations["helm.sh/hook"], "post-install,post-upgrade");
    }
}
