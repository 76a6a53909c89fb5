//! Config volumes, mounts and command of the server container
//!
//! Without the entrypoint script the image's own entrypoint renders
//! `/etc/temporal/config/config_template.yaml`. With it, the script is
//! mounted from its ConfigMap, renders each mounted flavor into the
//! `config-processed` emptyDir and starts the server.

use temporal_chart_values::ServerValues;

use crate::configmap::{CONFIG_KEY, ENTRYPOINT_KEY, PROCESSED_DIR};
use crate::k8s::{Volume, VolumeMount};
use crate::names::Names;

pub const ENTRYPOINT_PATH: &str = "/etc/temporal/entrypoint.sh";
pub const ENTRYPOINT_VOLUME: &str = "entrypoint-script";
pub const PROCESSED_VOLUME: &str = "config-processed";
pub const CONFIG_VOLUME: &str = "config";

/// Everything the config mode contributes to a server pod
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigMounts {
    pub command: Option<Vec<String>>,
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
}

pub fn config_mounts(server: &ServerValues, names: &Names) -> ConfigMounts {
    if !server.use_entrypoint_script {
        return ConfigMounts {
            command: None,
            volumes: vec![Volume::from_config_map(CONFIG_VOLUME, names.config())],
            mounts: vec![VolumeMount::file(
                CONFIG_VOLUME,
                format!("/etc/temporal/config/{CONFIG_KEY}"),
                CONFIG_KEY,
            )],
        };
    }

    let mut volumes = vec![
        Volume::executable_config_map(ENTRYPOINT_VOLUME, names.entrypoint()),
        Volume::from_empty_dir(PROCESSED_VOLUME),
    ];
    let mut mounts = vec![
        VolumeMount::file(ENTRYPOINT_VOLUME, ENTRYPOINT_PATH, ENTRYPOINT_KEY),
        VolumeMount::dir(PROCESSED_VOLUME, PROCESSED_DIR),
    ];

    for flavor in server.config_maps_to_mount.flavors() {
        let volume = format!("config-{}", flavor.as_str());
        mounts.push(VolumeMount::dir(
            volume.clone(),
            format!("/etc/temporal/{volume}"),
        ));
        volumes.push(Volume::from_config_map(volume, names.flavor_config(*flavor)));
    }

    ConfigMounts {
        command: Some(vec![ENTRYPOINT_PATH.to_string()]),
        volumes,
        mounts,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use temporal_chart_values::{ChartValues, Release, ValueLayer, ValueTree};

    use super::*;

    fn mounts(overrides: &[&str]) -> ConfigMounts {
        let layers = [
            ValueLayer::defaults().unwrap(),
            ValueLayer::from_set_args(overrides).unwrap(),
        ];
        let tree = ValueTree::merge(&layers).unwrap();
        let release = Release::default();
        let values = ChartValues::from_tree(&tree, &release).unwrap();
        config_mounts(&values.server, &Names::new(&values, &release))
    }

    fn volume_names(mounts: &ConfigMounts) -> Vec<&str> {
        mounts.volumes.iter().map(|v| v.name.as_str()).collect()
    }

    // =========================================================================
    // Story: each configMapsToMount value mounts exactly its own volumes
    // =========================================================================

    #[rstest]
    #[case::legacy("legacy", &["config-legacy"])]
    #[case::modern("modern", &["config-modern"])]
    #[case::both("both", &["config-legacy", "config-modern"])]
    #[case::dockerize("dockerize", &["config-dockerize"])]
    #[case::sprig("sprig", &["config-sprig"])]
    fn flavor_volumes_are_exclusive(#[case] mode: &str, #[case] expected: &[&str]) {
        let mounts = mounts(&[
            "server.useEntrypointScript=true",
            &format!("server.configMapsToMount={mode}"),
        ]);
        let names = volume_names(&mounts);

        assert_eq!(&names[..2], &[ENTRYPOINT_VOLUME, PROCESSED_VOLUME]);
        assert_eq!(&names[2..], expected);
        for flavor in ["config-legacy", "config-modern", "config-dockerize", "config-sprig"] {
            let mounted = mounts.mounts.iter().any(|m| m.name == flavor);
            assert_eq!(mounted, expected.contains(&flavor), "{flavor} for {mode}");
        }
        assert!(!names.contains(&CONFIG_VOLUME));
    }

    #[test]
    fn entrypoint_mode_overrides_command() {
        let mounts = mounts(&["server.useEntrypointScript=true"]);
        assert_eq!(mounts.command, Some(vec![ENTRYPOINT_PATH.to_string()]));

        let script = &mounts.volumes[0];
        assert_eq!(script.config_map.as_ref().unwrap().name, "temporal-entrypoint");
        assert_eq!(script.config_map.as_ref().unwrap().default_mode, Some(0o755));
        assert!(mounts.volumes[1].empty_dir.is_some());
    }

    // =========================================================================
    // Story: without the entrypoint script nothing entrypoint-related appears
    // =========================================================================

    #[rstest]
    #[case::default(&[])]
    #[case::flag_ignored(&["server.configMapsToMount=both"])]
    fn classic_mode_mounts_config_template(#[case] overrides: &[&str]) {
        let mounts = mounts(overrides);

        assert_eq!(mounts.command, None);
        assert_eq!(volume_names(&mounts), vec![CONFIG_VOLUME]);
        assert_eq!(
            mounts.mounts[0].mount_path,
            "/etc/temporal/config/config_template.yaml"
        );
        assert_eq!(mounts.mounts[0].sub_path.as_deref(), Some(CONFIG_KEY));
    }
}
