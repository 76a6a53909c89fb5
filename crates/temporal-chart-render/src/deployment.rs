//! Server Deployments, one per enabled component

use std::collections::BTreeMap;

use temporal_chart_values::{Component, ComponentValues};

use crate::entrypoint::config_mounts;
use crate::env::{parse_list, server_env};
use crate::error::RenderError;
use crate::k8s::{
    Container, ContainerPort, Deployment, DeploymentSpec, LabelSelector, PodSecurityContext,
    PodSpec, PodTemplateSpec, PortRef, ProbeSpec, TcpSocketAction, Toleration, Volume,
    VolumeMount,
};
use crate::metadata::{MetadataScope, Target, WorkloadMetadata};
use crate::renderer::ChartRenderer;

/// Prometheus scrape port of every server container
pub const METRICS_PORT: u16 = 9090;

/// Pod annotation carrying the config checksum
pub const CHECKSUM_ANNOTATION: &str = "checksum/config";

pub fn deployments(r: &ChartRenderer<'_>, checksum: &str) -> Result<Vec<Deployment>, RenderError> {
    r.values
        .server
        .enabled_components()
        .map(|c| deployment(r, c, checksum))
        .collect()
}

fn deployment(
    r: &ChartRenderer<'_>,
    component: &ComponentValues,
    checksum: &str,
) -> Result<Deployment, RenderError> {
    let server = &r.values.server;
    let name = component.component.service_name();

    let metadata = WorkloadMetadata::fan_out(&[
        r.additional_scope(),
        MetadataScope::new(&server.deployment_labels, &server.deployment_annotations, Target::Resource),
        MetadataScope::new(&server.pod_labels, &server.pod_annotations, Target::Pod),
        MetadataScope::new(
            &component.deployment_labels,
            &component.deployment_annotations,
            Target::Resource,
        ),
        MetadataScope::new(&component.pod_labels, &component.pod_annotations, Target::Pod),
    ])
    .with_pod_annotation_defaults(metrics_annotations(r, component.component))
    .with_standard_labels(&r.names.standard_labels(name))
    .with_pod_annotation(CHECKSUM_ANNOTATION, checksum);

    let mounts = config_mounts(server, &r.names);
    let mut volumes = mounts.volumes;
    volumes.extend(parse_list::<Volume>(&server.additional_volumes, "server.additionalVolumes")?);
    let mut volume_mounts = mounts.mounts;
    volume_mounts.extend(parse_list::<VolumeMount>(
        &server.additional_volume_mounts,
        "server.additionalVolumeMounts",
    )?);

    let container = Container {
        name: format!("temporal-{name}"),
        image: server.image.reference(),
        image_pull_policy: Some(server.image.pull_policy.clone()),
        command: mounts.command,
        env: server_env(
            &r.names,
            component.component,
            server.config.persistence.stores(),
            &server.additional_env,
        )?,
        ports: container_ports(component),
        liveness_probe: (component.component != Component::Worker).then(|| ProbeSpec {
            tcp_socket: Some(TcpSocketAction {
                port: PortRef::Name("rpc".to_string()),
            }),
            initial_delay_seconds: Some(150),
        }),
        resources: non_empty(&component.resources),
        volume_mounts,
        ..Default::default()
    };

    let security = &server.security_context;
    let security_context = (security.fs_group.is_some() || security.run_as_user.is_some()).then(|| {
        PodSecurityContext {
            fs_group: security.fs_group,
            run_as_user: security.run_as_user,
        }
    });

    Ok(Deployment {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        metadata: metadata.object_meta(r.names.component(component.component), r.release.namespace.clone()),
        spec: DeploymentSpec {
            replicas: component.replica_count,
            selector: LabelSelector {
                match_labels: r.names.selector_labels(name),
            },
            template: PodTemplateSpec {
                metadata: metadata.pod_meta(),
                spec: PodSpec {
                    service_account_name: r.names.service_account(r.values),
                    security_context,
                    containers: vec![container],
                    volumes,
                    node_selector: component.node_selector.clone(),
                    tolerations: parse_list::<Toleration>(&server.tolerations, "server.tolerations")?,
                    ..Default::default()
                },
            },
        },
    })
}

fn container_ports(component: &ComponentValues) -> Vec<ContainerPort> {
    let service = &component.service;
    let mut ports = vec![
        ContainerPort::tcp("rpc", service.port),
        ContainerPort::tcp("membership", service.membership_port),
    ];
    if component.component.is_frontend() {
        if let Some(http) = service.http_port {
            ports.push(ContainerPort::tcp("http", http));
        }
    }
    ports.push(ContainerPort::tcp("metrics", METRICS_PORT));
    ports
}

/// Generated scrape annotations; user pod annotations override them
fn metrics_annotations(r: &ChartRenderer<'_>, component: Component) -> BTreeMap<String, String> {
    if !r.values.server.metrics_annotations {
        return BTreeMap::new();
    }
    BTreeMap::from([
        (
            "prometheus.io/job".to_string(),
            format!("{}-{}", r.names.chart_name(), component.service_name()),
        ),
        ("prometheus.io/scrape".to_string(), "true".to_string()),
        ("prometheus.io/port".to_string(), METRICS_PORT.to_string()),
    ])
}

fn non_empty(value: &serde_json::Value) -> Option<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) if map.is_empty() => None,
        serde_json::Value::Null => None,
        other => Some(other.clone()),
    }
}
