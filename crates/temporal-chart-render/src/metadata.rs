//! Label and annotation fan-out
//!
//! A workload carries metadata in two places: on the resource itself and on
//! its pod template. Each user scope targets one or both of them. "Additional"
//! scopes target both, `deployment*` maps only the resource and `pod*` maps
//! only the pod. Scopes are applied lowest precedence first, so a key set at
//! a more specific scope overwrites the same key from a broader one.

use std::collections::BTreeMap;

use crate::k8s::{ObjectMeta, PodMeta};

/// Where a scope's entries land
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Resource,
    Pod,
    Both,
}

impl Target {
    fn resource(self) -> bool {
        matches!(self, Target::Resource | Target::Both)
    }

    fn pod(self) -> bool {
        matches!(self, Target::Pod | Target::Both)
    }
}

/// One label or annotation scope and its target
#[derive(Clone, Copy, Debug)]
pub struct MetadataScope<'a> {
    pub labels: &'a BTreeMap<String, String>,
    pub annotations: &'a BTreeMap<String, String>,
    pub target: Target,
}

impl<'a> MetadataScope<'a> {
    pub fn new(
        labels: &'a BTreeMap<String, String>,
        annotations: &'a BTreeMap<String, String>,
        target: Target,
    ) -> Self {
        Self {
            labels,
            annotations,
            target,
        }
    }
}

/// Labels and annotations of one location
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataSet {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl MetadataSet {
    fn overlay(&mut self, scope: &MetadataScope<'_>) {
        extend(&mut self.labels, scope.labels);
        extend(&mut self.annotations, scope.annotations);
    }
}

/// Resource and pod-template metadata of one workload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadMetadata {
    pub resource: MetadataSet,
    pub pod: MetadataSet,
}

impl WorkloadMetadata {
    /// Apply scopes, lowest precedence first
    pub fn fan_out(scopes: &[MetadataScope<'_>]) -> Self {
        let mut metadata = Self::default();
        for scope in scopes {
            if scope.target.resource() {
                metadata.resource.overlay(scope);
            }
            if scope.target.pod() {
                metadata.pod.overlay(scope);
            }
        }
        metadata
    }

    /// Put generated pod annotations underneath everything user supplied
    pub fn with_pod_annotation_defaults(mut self, defaults: BTreeMap<String, String>) -> Self {
        let mut annotations = defaults;
        annotations.append(&mut self.pod.annotations);
        self.pod.annotations = annotations;
        self
    }

    /// Stamp identity labels on both locations, overriding user values
    pub fn with_standard_labels(mut self, labels: &BTreeMap<String, String>) -> Self {
        extend(&mut self.resource.labels, labels);
        extend(&mut self.pod.labels, labels);
        self
    }

    /// Set a pod annotation that nothing may override
    pub fn with_pod_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pod.annotations.insert(key.into(), value.into());
        self
    }

    /// Resource metadata with the given name
    pub fn object_meta(&self, name: impl Into<String>, namespace: impl Into<String>) -> ObjectMeta {
        ObjectMeta {
            labels: self.resource.labels.clone(),
            annotations: self.resource.annotations.clone(),
            ..ObjectMeta::new(name, namespace)
        }
    }

    /// Pod template metadata
    pub fn pod_meta(&self) -> PodMeta {
        PodMeta {
            labels: self.pod.labels.clone(),
            annotations: self.pod.annotations.clone(),
        }
    }
}

fn extend(into: &mut BTreeMap<String, String>, from: &BTreeMap<String, String>) {
    into.extend(from.iter().map(|(k, v)| (k.clone(), v.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // =========================================================================
    // Story: additional scopes reach both locations, others only their own
    // =========================================================================

    #[test]
    fn additional_scope_fans_out_to_both() {
        let additional = map(&[("zero", "zero")]);
        let empty = BTreeMap::new();

        let metadata = WorkloadMetadata::fan_out(&[MetadataScope::new(
            &empty,
            &additional,
            Target::Both,
        )]);

        assert_eq!(metadata.resource.annotations["zero"], "zero");
        assert_eq!(metadata.pod.annotations["zero"], "zero");
    }

    #[test]
    fn targeted_scopes_stay_in_place() {
        let deployment = map(&[("kind", "deployment")]);
        let pod = map(&[("kind", "pod")]);
        let empty = BTreeMap::new();

        let metadata = WorkloadMetadata::fan_out(&[
            MetadataScope::new(&deployment, &empty, Target::Resource),
            MetadataScope::new(&pod, &empty, Target::Pod),
        ]);

        assert_eq!(metadata.resource.labels["kind"], "deployment");
        assert_eq!(metadata.pod.labels["kind"], "pod");
    }

    // =========================================================================
    // Story: most specific scope wins per key, siblings are kept
    // =========================================================================

    #[test]
    fn later_scopes_win_per_key() {
        let server = map(&[("one", "one"), ("two", "two")]);
        let frontend = map(&[("one", "three")]);
        let empty = BTreeMap::new();

        let metadata = WorkloadMetadata::fan_out(&[
            MetadataScope::new(&server, &empty, Target::Pod),
            MetadataScope::new(&frontend, &empty, Target::Pod),
        ]);

        assert_eq!(metadata.pod.labels, map(&[("one", "three"), ("two", "two")]));
    }

    #[test]
    fn generated_annotations_yield_to_user_values() {
        let user = map(&[("prometheus.io/scrape", "false")]);
        let empty = BTreeMap::new();

        let metadata = WorkloadMetadata::fan_out(&[MetadataScope::new(&empty, &user, Target::Pod)])
            .with_pod_annotation_defaults(map(&[
                ("prometheus.io/scrape", "true"),
                ("prometheus.io/port", "9090"),
            ]))
            .with_pod_annotation("checksum/config", "abc");

        assert_eq!(metadata.pod.annotations["prometheus.io/scrape"], "false");
        assert_eq!(metadata.pod.annotations["prometheus.io/port"], "9090");
        assert_eq!(metadata.pod.annotations["checksum/config"], "abc");
    }

    #[test]
    fn standard_labels_override_user_labels() {
        let user = map(&[("app.kubernetes.io/name", "mine"), ("team", "core")]);
        let empty = BTreeMap::new();

        let metadata = WorkloadMetadata::fan_out(&[MetadataScope::new(&user, &empty, Target::Both)])
            .with_standard_labels(&map(&[("app.kubernetes.io/name", "temporal")]));

        assert_eq!(metadata.resource.labels["app.kubernetes.io/name"], "temporal");
        assert_eq!(metadata.pod.labels["team"], "core");
    }
}
