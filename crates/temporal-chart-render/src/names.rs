//! Resource names and standard labels

use std::collections::BTreeMap;

use temporal_chart_values::{
    ChartValues, Component, ConfigFlavor, Release, StoreName, StoreValues, CHART_VERSION,
};

/// Kubernetes name length limit
const MAX_NAME_LEN: usize = 63;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_CHART: &str = "helm.sh/chart";

/// Name and label factory for one release
#[derive(Clone, Debug)]
pub struct Names {
    fullname: String,
    chart_name: String,
    release: String,
    app_version: String,
}

impl Names {
    pub fn new(values: &ChartValues, release: &Release) -> Self {
        let chart_name = values.chart_name().to_string();
        let fullname = match &values.fullname_override {
            Some(name) => truncate(name),
            None if release.name.contains(&chart_name) => truncate(&release.name),
            None => truncate(&format!("{}-{}", release.name, chart_name)),
        };
        Self {
            fullname,
            chart_name,
            release: release.name.clone(),
            app_version: values.server.image.tag.clone(),
        }
    }

    /// `<release>-<chart>`, or the release alone when it already names the chart
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    pub fn chart_name(&self) -> &str {
        &self.chart_name
    }

    /// Deployment and client Service name of a component
    pub fn component(&self, component: Component) -> String {
        self.suffixed(component.service_name())
    }

    /// Membership Service of a component
    pub fn headless(&self, component: Component) -> String {
        self.suffixed(&format!("{}-headless", component.service_name()))
    }

    /// ConfigMap holding the classic config template
    pub fn config(&self) -> String {
        self.suffixed("config")
    }

    /// ConfigMap holding one config flavor for the entrypoint script
    pub fn flavor_config(&self, flavor: ConfigFlavor) -> String {
        self.suffixed(&format!("config-{}", flavor.as_str()))
    }

    /// ConfigMap holding the entrypoint script
    pub fn entrypoint(&self) -> String {
        self.suffixed("entrypoint")
    }

    /// Generated Secret for a store password
    pub fn store_secret(&self, store: StoreName) -> String {
        self.suffixed(&format!("{}-store", store.as_str()))
    }

    /// Secret a store password is read from, generated or pre-existing
    pub fn store_password_secret(&self, store: &StoreValues) -> String {
        store
            .existing_secret
            .clone()
            .unwrap_or_else(|| self.store_secret(store.name))
    }

    /// Schema Job name, unique per release revision
    pub fn schema_job(&self, revision: u32) -> String {
        self.suffixed(&format!("schema-{revision}"))
    }

    /// Service account used by every pod
    pub fn service_account(&self, values: &ChartValues) -> String {
        match &values.service_account.name {
            Some(name) => name.clone(),
            None if values.service_account.create => self.fullname.clone(),
            None => "default".to_string(),
        }
    }

    /// Labels selecting the pods of one component
    pub fn selector_labels(&self, component: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_NAME.to_string(), self.chart_name.clone()),
            (LABEL_INSTANCE.to_string(), self.release.clone()),
            (LABEL_COMPONENT.to_string(), component.to_string()),
        ])
    }

    /// Identity labels stamped on every resource and pod
    pub fn standard_labels(&self, component: &str) -> BTreeMap<String, String> {
        let mut labels = self.selector_labels(component);
        labels.insert(LABEL_VERSION.to_string(), self.app_version.replace('+', "_"));
        labels.insert(LABEL_MANAGED_BY.to_string(), "Helm".to_string());
        labels.insert(LABEL_PART_OF.to_string(), self.chart_name.clone());
        labels.insert(
            LABEL_CHART.to_string(),
            format!("{}-{}", self.chart_name, CHART_VERSION.replace('+', "_")),
        );
        labels
    }

    fn suffixed(&self, suffix: &str) -> String {
        truncate(&format!("{}-{}", self.fullname, suffix))
    }
}

/// Cut to 63 characters without leaving a trailing `-`
fn truncate(name: &str) -> String {
    let cut: String = name.chars().take(MAX_NAME_LEN).collect();
    cut.trim_end_matches('-').to_string()
}
