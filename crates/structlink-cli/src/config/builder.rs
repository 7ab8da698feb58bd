use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileContactConfig, FileHBondConfig};
use super::models::AppConfig;
use crate::cli::{NetworkOverrides, ViewerArgs};
use crate::error::{CliError, Result};
use std::str::FromStr;
use std::time::Duration;
use structlink::engine::config::{self as core_config, ContactSettings, HBondSettings, InteractionScope};

/// Merges defaults, the configuration file, `--set` values and command-line
/// flags, in increasing order of precedence.
pub fn build_config(viewer: &ViewerArgs, overrides: &NetworkOverrides) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &viewer.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &viewer.set_values)?;

    let gateway = build_gateway_config(viewer, &mut file_config, &defaults)?;
    let network = build_network_config(overrides, &mut file_config, &defaults)?;
    let columns = build_column_config(&mut file_config);

    Ok(AppConfig {
        gateway,
        network,
        columns,
    })
}

fn build_gateway_config(
    args: &ViewerArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<core_config::GatewayConfig> {
    let viewer_file = file_config.viewer.take().unwrap_or_default();

    let candidate_paths = if !args.viewer_paths.is_empty() {
        args.viewer_paths.clone()
    } else {
        viewer_file
            .paths
            .unwrap_or_else(core_config::default_candidate_paths)
    };
    let timeout_secs = args
        .timeout
        .or(viewer_file.timeout_secs)
        .unwrap_or(defaults.reply_timeout_secs);

    let mut builder = core_config::GatewayConfigBuilder::new()
        .candidate_paths(candidate_paths)
        .reply_timeout(Duration::from_secs(timeout_secs));
    if let Some(launch_args) = viewer_file.launch_args {
        builder = builder.launch_args(launch_args);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn build_network_config(
    overrides: &NetworkOverrides,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<core_config::NetworkConfig> {
    let network_file = file_config.network.take().unwrap_or_default();

    let scope = match (overrides.scope, network_file.scope.as_deref()) {
        (Some(scope), _) => scope.into(),
        (None, Some(name)) => parse_scope(name)?,
        (None, None) => defaults.scope,
    };

    let contacts = if overrides.no_contacts {
        None
    } else {
        merge_contacts(network_file.contacts, defaults.contacts_enabled, defaults.contacts)
    };
    let clashes = if overrides.clashes {
        Some(merge_contacts(network_file.clashes, true, defaults.clashes).unwrap_or(defaults.clashes))
    } else {
        merge_contacts(network_file.clashes, false, defaults.clashes)
    };
    let hbonds = merge_hbonds(network_file.hbonds, overrides.hbonds, defaults.hbonds);

    let distances_file = network_file.distances.unwrap_or_default();
    let distances_enabled = overrides.distances
        || overrides.distance_cutoff.is_some()
        || distances_file.enabled.unwrap_or(distances_file.cutoff.is_some());
    let distance_cutoff = distances_enabled.then(|| {
        overrides
            .distance_cutoff
            .or(distances_file.cutoff)
            .unwrap_or(defaults.distance_cutoff)
    });

    let mut builder = core_config::NetworkConfigBuilder::new()
        .scope(scope)
        .add_hydrogens(overrides.add_hydrogens || network_file.add_hydrogens.unwrap_or(false))
        .ignore_water(
            !overrides.keep_water && network_file.ignore_water.unwrap_or(defaults.ignore_water),
        )
        .contacts(contacts)
        .clashes(clashes)
        .hbonds(hbonds)
        .connectivity(overrides.connectivity || network_file.connectivity.unwrap_or(false))
        .distance_cutoff(distance_cutoff)
        .combined_edges(overrides.combined_edges || network_file.combined_edges.unwrap_or(false));
    if let Some(name) = overrides.name.clone().or(network_file.name) {
        builder = builder.name(name);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn build_column_config(file_config: &mut FileConfig) -> core_config::ColumnConfig {
    let mut columns = core_config::ColumnConfig::default();
    if let Some(file) = file_config.columns.take() {
        if let Some(structure) = file.structure {
            columns.structure_columns = structure;
        }
        if let Some(chemical) = file.chemical {
            columns.chemical_columns = chemical;
        }
        if let Some(residue) = file.residue {
            columns.residue_columns = residue;
        }
    }
    columns
}

/// A present table enables the search unless it says `enabled = false`.
fn merge_contacts(
    file_val: Option<FileContactConfig>,
    enabled_by_default: bool,
    defaults: ContactSettings,
) -> Option<ContactSettings> {
    let enabled = file_val
        .as_ref()
        .map_or(enabled_by_default, |f| f.enabled.unwrap_or(true));
    if !enabled {
        return None;
    }
    let file_val = file_val.unwrap_or_default();
    Some(ContactSettings {
        overlap_cutoff: file_val.overlap_cutoff.unwrap_or(defaults.overlap_cutoff),
        hbond_allowance: file_val.hbond_allowance.unwrap_or(defaults.hbond_allowance),
        bond_separation: file_val.bond_separation.unwrap_or(defaults.bond_separation),
    })
}

fn merge_hbonds(
    file_val: Option<FileHBondConfig>,
    cli_enabled: bool,
    defaults: HBondSettings,
) -> Option<HBondSettings> {
    let enabled = cli_enabled || file_val.as_ref().is_some_and(|f| f.enabled.unwrap_or(true));
    if !enabled {
        return None;
    }
    let file_val = file_val.unwrap_or_default();
    Some(HBondSettings {
        remove_redundant: file_val.remove_redundant.unwrap_or(defaults.remove_redundant),
        relax: file_val.relax.unwrap_or(defaults.relax),
        distance_slop: file_val.distance_slop.unwrap_or(defaults.distance_slop),
        angle_slop: file_val.angle_slop.unwrap_or(defaults.angle_slop),
    })
}

fn parse_scope(name: &str) -> Result<InteractionScope> {
    match name {
        "within" => Ok(InteractionScope::WithinSelection),
        "between" => Ok(InteractionScope::BetweenSelectionAndOther),
        "all" => Ok(InteractionScope::All),
        other => Err(CliError::Config(format!(
            "Invalid scope '{}'. Expected 'within', 'between' or 'all'.",
            other
        ))),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();
        let value = value.trim();

        if let Some(field) = key.strip_prefix("viewer.") {
            let viewer = config.viewer.get_or_insert_with(Default::default);
            match field {
                "timeout-secs" => viewer.timeout_secs = Some(parse_value(key, value)?),
                "paths" => {
                    viewer.paths = Some(value.split(',').map(|p| p.trim().into()).collect())
                }
                _ => return Err(unsupported(key)),
            }
            continue;
        }

        let Some(field) = key.strip_prefix("network.") else {
            return Err(unsupported(key));
        };
        let network = config.network.get_or_insert_with(Default::default);
        match field.split_once('.') {
            None => match field {
                "name" => network.name = Some(value.to_string()),
                "scope" => {
                    parse_scope(value)?;
                    network.scope = Some(value.to_string());
                }
                "add-hydrogens" => network.add_hydrogens = Some(parse_value(key, value)?),
                "ignore-water" => network.ignore_water = Some(parse_value(key, value)?),
                "connectivity" => network.connectivity = Some(parse_value(key, value)?),
                "combined-edges" => network.combined_edges = Some(parse_value(key, value)?),
                _ => return Err(unsupported(key)),
            },
            Some((table @ ("contacts" | "clashes"), setting)) => {
                let section = if table == "contacts" {
                    network.contacts.get_or_insert_with(Default::default)
                } else {
                    network.clashes.get_or_insert_with(Default::default)
                };
                match setting {
                    "enabled" => section.enabled = Some(parse_value(key, value)?),
                    "overlap-cutoff" => section.overlap_cutoff = Some(parse_value(key, value)?),
                    "hbond-allowance" => section.hbond_allowance = Some(parse_value(key, value)?),
                    "bond-separation" => section.bond_separation = Some(parse_value(key, value)?),
                    _ => return Err(unsupported(key)),
                }
            }
            Some(("hbonds", setting)) => {
                let section = network.hbonds.get_or_insert_with(Default::default);
                match setting {
                    "enabled" => section.enabled = Some(parse_value(key, value)?),
                    "remove-redundant" => section.remove_redundant = Some(parse_value(key, value)?),
                    "relax" => section.relax = Some(parse_value(key, value)?),
                    "distance-slop" => section.distance_slop = Some(parse_value(key, value)?),
                    "angle-slop" => section.angle_slop = Some(parse_value(key, value)?),
                    _ => return Err(unsupported(key)),
                }
            }
            Some(("distances", setting)) => {
                let section = network.distances.get_or_insert_with(Default::default);
                match setting {
                    "enabled" => section.enabled = Some(parse_value(key, value)?),
                    "cutoff" => section.cutoff = Some(parse_value(key, value)?),
                    _ => return Err(unsupported(key)),
                }
            }
            Some(_) => return Err(unsupported(key)),
        }
    }
    Ok(config)
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ScopeArg;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn viewer_args() -> ViewerArgs {
        ViewerArgs {
            viewer_paths: vec![PathBuf::from("/opt/viewer/bin/chimera")],
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let app = build_config(&ViewerArgs::default(), &NetworkOverrides::default()).expect("build ok");

        assert_eq!(app.gateway.candidate_paths, core_config::default_candidate_paths());
        assert_eq!(app.gateway.launch_args, vec!["--start", "ReadStdin"]);
        assert_eq!(app.gateway.reply_timeout, core_config::DEFAULT_REPLY_TIMEOUT);
        assert_eq!(app.network, core_config::NetworkConfig::default());
        assert_eq!(app.columns, core_config::ColumnConfig::default());
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("structlink.toml");
        let toml = r#"
            [viewer]
            paths = ["/usr/local/chimera/bin/chimera"]
            timeout-secs = 45

            [network]
            name = "RIN from file"
            scope = "all"
            connectivity = true

            [network.clashes]
            overlap-cutoff = 0.8

            [network.hbonds]
            remove-redundant = false

            [network.distances]
            cutoff = 8.0

            [columns]
            residue = ["Sites"]
            "#;
        fs::write(&cfg_path, toml).unwrap();

        let args = ViewerArgs {
            config: Some(cfg_path),
            ..Default::default()
        };
        let app = build_config(&args, &NetworkOverrides::default()).expect("build ok");

        assert_eq!(
            app.gateway.candidate_paths,
            vec![PathBuf::from("/usr/local/chimera/bin/chimera")]
        );
        assert_eq!(app.gateway.reply_timeout, Duration::from_secs(45));
        let network = app.network;
        assert_eq!(network.name.as_deref(), Some("RIN from file"));
        assert_eq!(network.scope, InteractionScope::All);
        assert!(network.connectivity);
        assert_eq!(network.contacts, Some(ContactSettings::CONTACTS));
        let clashes = network.clashes.unwrap();
        assert_eq!(clashes.overlap_cutoff, 0.8);
        assert_eq!(clashes.hbond_allowance, ContactSettings::CLASHES.hbond_allowance);
        assert!(!network.hbonds.unwrap().remove_redundant);
        assert_eq!(network.distance_cutoff, Some(8.0));
        assert_eq!(app.columns.residue_columns, vec!["Sites"]);
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("structlink.toml");
        let toml = r#"
            [viewer]
            timeout-secs = 45
            [network]
            scope = "all"
            ignore-water = true
            [network.distances]
            enabled = false
            cutoff = 8.0
            "#;
        fs::write(&cfg_path, toml).unwrap();

        let mut args = viewer_args();
        args.config = Some(cfg_path);
        args.timeout = Some(10);
        let overrides = NetworkOverrides {
            scope: Some(ScopeArg::Between),
            keep_water: true,
            no_contacts: true,
            distances: true,
            hbonds: true,
            ..Default::default()
        };

        let app = build_config(&args, &overrides).expect("build ok");
        assert_eq!(app.gateway.candidate_paths, vec![PathBuf::from("/opt/viewer/bin/chimera")]);
        assert_eq!(app.gateway.reply_timeout, Duration::from_secs(10));
        assert_eq!(app.network.scope, InteractionScope::BetweenSelectionAndOther);
        assert!(!app.network.ignore_water);
        assert!(app.network.contacts.is_none());
        assert_eq!(app.network.hbonds, Some(HBondSettings::default()));
        assert_eq!(app.network.distance_cutoff, Some(8.0));
    }

    #[test]
    fn set_values_override_file_and_cli_flags_win() {
        let mut args = viewer_args();
        args.set_values = vec![
            "viewer.timeout-secs=5".to_string(),
            "network.contacts.overlap-cutoff=-0.25".to_string(),
            "network.clashes.enabled=true".to_string(),
            "network.distances.cutoff=0".to_string(),
            "network.combined-edges=true".to_string(),
            "network.scope=between".to_string(),
        ];
        let overrides = NetworkOverrides {
            distance_cutoff: Some(4.5),
            ..Default::default()
        };

        let app = build_config(&args, &overrides).expect("build ok");
        assert_eq!(app.gateway.reply_timeout, Duration::from_secs(5));
        assert_eq!(app.network.contacts.unwrap().overlap_cutoff, -0.25);
        assert_eq!(app.network.clashes, Some(ContactSettings::CLASHES));
        assert_eq!(app.network.distance_cutoff, Some(4.5));
        assert!(app.network.combined_edges);
        assert_eq!(app.network.scope, InteractionScope::BetweenSelectionAndOther);
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        for bad in [
            "network.connectivity",
            "network.connectivity=maybe",
            "network.scope=sideways",
            "network.unknown=1",
            "forcefield.s-factor=1.0",
            "network.hbonds.tolerance=1",
        ] {
            let mut args = viewer_args();
            args.set_values = vec![bad.to_string()];
            let result = build_config(&args, &NetworkOverrides::default());
            assert!(matches!(result, Err(CliError::Config(_))), "accepted '{bad}'");
        }
    }

    #[test]
    fn invalid_values_fail_core_validation() {
        let mut args = viewer_args();
        args.timeout = Some(0);
        assert!(matches!(
            build_config(&args, &NetworkOverrides::default()),
            Err(CliError::Config(_))
        ));

        let overrides = NetworkOverrides {
            distance_cutoff: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            build_config(&viewer_args(), &overrides),
            Err(CliError::Config(_))
        ));
    }
}
