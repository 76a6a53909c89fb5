//! Store password Secrets

use crate::k8s::Secret;
use crate::renderer::ChartRenderer;

/// One Secret per store that does not name an existing one
pub fn store_secrets(r: &ChartRenderer<'_>) -> Vec<Secret> {
    r.values
        .server
        .config
        .persistence
        .stores()
        .into_iter()
        .filter(|store| store.existing_secret.is_none())
        .map(|store| {
            let meta = r.object_meta(r.names.store_secret(store.name), "database", &[]);
            Secret::new(meta).with_data(&store.secret_key, &store.password)
        })
        .collect()
}
