//! Client and membership Services

use std::collections::BTreeMap;

use temporal_chart_values::ComponentValues;

use crate::deployment::METRICS_PORT;
use crate::k8s::{Service, ServicePort, ServiceSpec};
use crate::metadata::{MetadataScope, Target};
use crate::renderer::ChartRenderer;

/// Client Services for enabled frontends, then one headless membership
/// Service per enabled component
pub fn services(r: &ChartRenderer<'_>) -> Vec<Service> {
    let components: Vec<&ComponentValues> = r.values.server.enabled_components().collect();

    let clients = components
        .iter()
        .filter(|c| c.component.is_frontend())
        .map(|c| client_service(r, c));
    let headless = components.iter().map(|c| headless_service(r, c));

    clients.chain(headless).collect()
}

/// `clusterIP` is copied from values as-is, `None` included
fn client_service(r: &ChartRenderer<'_>, component: &ComponentValues) -> Service {
    let svc = &component.service;
    let name = component.component.service_name();

    let mut ports = vec![ServicePort::tcp("grpc-rpc", svc.port, "rpc", Some("grpc"))];
    if let Some(http) = svc.http_port {
        ports.push(ServicePort::tcp("http", http, "http", Some("http")));
    }

    Service {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        metadata: r.object_meta(
            r.names.component(component.component),
            name,
            &[MetadataScope::new(&svc.labels, &svc.annotations, Target::Resource)],
        ),
        spec: ServiceSpec {
            type_: Some(svc.service_type.clone()),
            cluster_ip: svc.cluster_ip.clone(),
            publish_not_ready_addresses: None,
            ports,
            selector: r.names.selector_labels(name),
        },
    }
}

fn headless_service(r: &ChartRenderer<'_>, component: &ComponentValues) -> Service {
    let svc = &component.service;
    let name = component.component.service_name();

    let mut annotations = BTreeMap::from([(
        "service.alpha.kubernetes.io/tolerate-unready-endpoints".to_string(),
        "true".to_string(),
    )]);
    if r.values.server.metrics_annotations {
        annotations.insert(
            "prometheus.io/job".to_string(),
            format!("{}-{}", r.names.chart_name(), name),
        );
        annotations.insert("prometheus.io/scrape".to_string(), "true".to_string());
        annotations.insert("prometheus.io/port".to_string(), METRICS_PORT.to_string());
    }
    let no_labels = BTreeMap::new();

    Service {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        metadata: r.object_meta(
            r.names.headless(component.component),
            name,
            &[MetadataScope::new(&no_labels, &annotations, Target::Resource)],
        ),
        spec: ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some("None".to_string()),
            publish_not_ready_addresses: Some(true),
            ports: vec![
                ServicePort::tcp("grpc-rpc", svc.port, "rpc", Some("grpc")),
                ServicePort::tcp("grpc-membership", svc.membership_port, "membership", Some("grpc")),
                ServicePort::tcp("metrics", METRICS_PORT, "metrics", Some("http")),
            ],
            selector: r.names.selector_labels(name),
        },
    }
}
