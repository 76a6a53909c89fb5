//! Chart rendering entry points
//!
//! [`render_chart`] merges value layers, resolves typed values and assembles
//! the resources of the selected templates. Output is ordered the way the
//! resources would be installed: Secrets, ConfigMaps, Services, Deployments,
//! then the schema Job.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use temporal_chart_values::{ChartValues, Release, ValueLayer, ValueTree};
use tracing::{debug, info};

use crate::error::RenderError;
use crate::k8s::{ObjectMeta, Resource};
use crate::metadata::{MetadataScope, Target, WorkloadMetadata};
use crate::names::Names;
use crate::template::TemplateEngine;
use crate::{configmap, deployment, job, secret, service};

/// A chart template file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    ServerSecret,
    ServerConfigMap,
    ServerService,
    ServerDeployment,
    ServerJob,
}

impl TemplateKind {
    /// Every template in install order
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::ServerSecret,
        TemplateKind::ServerConfigMap,
        TemplateKind::ServerService,
        TemplateKind::ServerDeployment,
        TemplateKind::ServerJob,
    ];

    /// File name below `templates/`
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::ServerSecret => "server-secret.yaml",
            TemplateKind::ServerConfigMap => "server-configmap.yaml",
            TemplateKind::ServerService => "server-service.yaml",
            TemplateKind::ServerDeployment => "server-deployment.yaml",
            TemplateKind::ServerJob => "server-job.yaml",
        }
    }

    /// The template a rendered resource came from
    pub fn of(resource: &Resource) -> Self {
        match resource {
            Resource::Secret(_) => TemplateKind::ServerSecret,
            Resource::ConfigMap(_) => TemplateKind::ServerConfigMap,
            Resource::Service(_) => TemplateKind::ServerService,
            Resource::Deployment(_) => TemplateKind::ServerDeployment,
            Resource::Job(_) => TemplateKind::ServerJob,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "templates/{}", self.file_name())
    }
}

impl FromStr for TemplateKind {
    type Err = RenderError;

    /// Accepts `templates/server-job.yaml`, `server-job.yaml` or `server-job`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let file = s.strip_prefix("templates/").unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|kind| {
                let name = kind.file_name();
                file == name || Some(file) == name.strip_suffix(".yaml")
            })
            .ok_or_else(|| RenderError::UnknownTemplate(s.to_string()))
    }
}

/// Renders resources for one set of resolved values
pub struct ChartRenderer<'a> {
    pub(crate) values: &'a ChartValues,
    pub(crate) release: &'a Release,
    pub(crate) names: Names,
    pub(crate) engine: TemplateEngine,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(values: &'a ChartValues, release: &'a Release) -> Result<Self, RenderError> {
        Ok(Self {
            names: Names::new(values, release),
            engine: TemplateEngine::new()?,
            values,
            release,
        })
    }

    /// Render the selected templates; an empty selection renders all of them
    pub fn render(&self, selection: &[TemplateKind]) -> Result<Vec<Resource>, RenderError> {
        if !self.values.server.enabled {
            info!(release = %self.release.name, "server disabled, nothing to render");
            return Ok(Vec::new());
        }

        let selected = |kind: TemplateKind| selection.is_empty() || selection.contains(&kind);
        let config_maps = configmap::config_maps(self)?;
        let mut resources = Vec::new();

        for kind in TemplateKind::ALL.into_iter().filter(|k| selected(*k)) {
            let before = resources.len();
            match kind {
                TemplateKind::ServerSecret => resources.extend(
                    secret::store_secrets(self).into_iter().map(Resource::Secret),
                ),
                TemplateKind::ServerConfigMap => resources.extend(
                    config_maps.iter().cloned().map(Resource::ConfigMap),
                ),
                TemplateKind::ServerService => resources.extend(
                    service::services(self).into_iter().map(Resource::Service),
                ),
                TemplateKind::ServerDeployment => {
                    let checksum = configmap::config_checksum(&config_maps);
                    resources.extend(
                        deployment::deployments(self, &checksum)?
                            .into_iter()
                            .map(Resource::Deployment),
                    )
                }
                TemplateKind::ServerJob => {
                    resources.extend(job::schema_job(self)?.map(Resource::Job))
                }
            }
            debug!(template = %kind, count = resources.len() - before, "template rendered");
        }

        Ok(resources)
    }

    /// Metadata for a resource without a pod template: `additional*` scopes,
    /// then `extra` scopes, then identity labels
    pub(crate) fn object_meta(
        &self,
        name: impl Into<String>,
        component: &str,
        extra: &[MetadataScope<'_>],
    ) -> ObjectMeta {
        let mut scopes = vec![self.additional_scope()];
        scopes.extend_from_slice(extra);
        WorkloadMetadata::fan_out(&scopes)
            .with_standard_labels(&self.names.standard_labels(component))
            .object_meta(name, self.release.namespace.clone())
    }

    /// `additionalLabels`/`additionalAnnotations`, applied everywhere
    pub(crate) fn additional_scope(&self) -> MetadataScope<'a> {
        MetadataScope::new(
            &self.values.additional_labels,
            &self.values.additional_annotations,
            Target::Both,
        )
    }
}

/// Merge `layers`, resolve values for `release` and render `selection`
pub fn render_chart(
    layers: &[ValueLayer],
    release: &Release,
    selection: &[TemplateKind],
) -> Result<Vec<Resource>, RenderError> {
    let tree = ValueTree::merge(layers)?;
    let values = ChartValues::from_tree(&tree, release)?;
    let resources = ChartRenderer::new(&values, release)?.render(selection)?;
    info!(release = %release.name, resources = resources.len(), "chart rendered");
    Ok(resources)
}

/// Multi-document YAML, each document preceded by its source template
pub fn to_yaml(resources: &[Resource]) -> Result<String, RenderError> {
    let mut out = String::new();
    for resource in resources {
        out.push_str("---\n");
        out.push_str(&format!(
            "# Source: {}/{}\n",
            temporal_chart_values::CHART_NAME,
            TemplateKind::of(resource)
        ));
        out.push_str(&serde_yaml::to_string(resource)?);
    }
    Ok(out)
}

/// JSON array of all resources
pub fn to_json(resources: &[Resource]) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(resources)?)
}

/// Count rendered resources per kind
pub fn summarize(resources: &[Resource]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for resource in resources {
        *counts.entry(resource.kind().to_string()).or_insert(0) += 1;
    }
    counts
}
