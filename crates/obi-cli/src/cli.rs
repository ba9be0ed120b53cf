//! Command line of `obi-launch`

use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{value_parser, Arg, ArgMatches, Command};
use obi_scan::ExecutionMode;
use uuid::Uuid;

use crate::launch::LaunchArgs;

/// Build the `obi-launch` command
#[must_use]
pub fn command() -> Command {
    Command::new("obi-launch")
        .version(crate::VERSION)
        .about("Execute a stored scan or single coordinate configuration")
        .arg(required("entity_type").help("Type of the entity holding the configuration"))
        .arg(required("entity_id").help("Id of the entity holding the configuration"))
        .arg(required("config_asset_id").help("Asset id of the configuration file"))
        .arg(
            required("entity_cache")
                .value_parser(value_parser!(PathBuf))
                .help("Directory the configuration is downloaded into"),
        )
        .arg(
            required("scan_output_root")
                .value_parser(value_parser!(PathBuf))
                .help("Output root of the executed scan"),
        )
        .arg(
            required("virtual_lab_id")
                .value_parser(value_parser!(Uuid))
                .help("Virtual lab of the launch"),
        )
        .arg(
            required("project_id")
                .value_parser(value_parser!(Uuid))
                .help("Project of the launch"),
        )
        .arg(
            Arg::new("activity_type")
                .long("activity_type")
                .requires("activity_id")
                .help("Type of the activity tracking this launch"),
        )
        .arg(
            Arg::new("activity_id")
                .long("activity_id")
                .requires("activity_type")
                .help("Id of the activity tracking this launch"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .default_value("generate")
                .value_parser(
                    PossibleValuesParser::new(["generate", "run"]).try_map(|mode| mode.parse::<ExecutionMode>()),
                )
                .help("Coordinate hook to execute"),
        )
}

fn required(name: &'static str) -> Arg {
    Arg::new(name).long(name).required(true)
}

/// Read [`LaunchArgs`] from parsed matches
///
/// # Errors
/// Returns error if a required argument is missing
pub fn launch_args(matches: &ArgMatches) -> Result<LaunchArgs, clap::Error> {
    Ok(LaunchArgs {
        entity_type: get::<String>(matches, "entity_type")?,
        entity_id: get::<String>(matches, "entity_id")?,
        config_asset_id: get::<String>(matches, "config_asset_id")?,
        entity_cache: get::<PathBuf>(matches, "entity_cache")?,
        scan_output_root: get::<PathBuf>(matches, "scan_output_root")?,
        virtual_lab_id: get::<Uuid>(matches, "virtual_lab_id")?,
        project_id: get::<Uuid>(matches, "project_id")?,
        activity_type: matches.get_one::<String>("activity_type").cloned(),
        activity_id: matches.get_one::<String>("activity_id").cloned(),
        mode: matches.get_one::<ExecutionMode>("mode").copied().unwrap_or_default(),
    })
}

fn get<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> Result<T, clap::Error> {
    matches.get_one::<T>(name).cloned().ok_or_else(|| {
        clap::Error::raw(
            clap::error::ErrorKind::MissingRequiredArgument,
            format!("missing --{name}\n"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAB: &str = "6f1c2a5e-9a0b-4c4e-8d7b-0e5a3f1d2c11";
    const PROJECT: &str = "0b9d8e7f-1a2b-4c3d-9e8f-7a6b5c4d3e2f";

    fn base() -> Vec<&'static str> {
        vec![
            "obi-launch",
            "--entity_type",
            "simulation",
            "--entity_id",
            "sim-1",
            "--config_asset_id",
            "asset-1",
            "--entity_cache",
            "/cache",
            "--scan_output_root",
            "/out",
            "--virtual_lab_id",
            LAB,
            "--project_id",
            PROJECT,
        ]
    }

    #[test]
    fn parses_required_and_defaults_to_generate() {
        let matches = command().try_get_matches_from(base()).unwrap();
        let args = launch_args(&matches).unwrap();
        assert_eq!(args.entity_id, "sim-1");
        assert_eq!(args.scan_output_root, PathBuf::from("/out"));
        assert_eq!(args.project_id, PROJECT.parse::<Uuid>().unwrap());
        assert_eq!(args.mode, ExecutionMode::Generate);
        assert_eq!(args.activity_id, None);
    }

    #[test]
    fn parses_activity_and_run_mode() {
        let mut argv = base();
        argv.extend(["--activity_type", "simulation_execution", "--activity_id", "act-1", "--mode", "run"]);
        let args = launch_args(&command().try_get_matches_from(argv).unwrap()).unwrap();
        assert_eq!(args.activity_type.as_deref(), Some("simulation_execution"));
        assert_eq!(args.mode, ExecutionMode::Run);
    }

    #[test]
    fn command_line_round_trips() {
        let mut argv = base();
        argv.extend(["--activity_type", "a", "--activity_id", "b"]);
        let args = launch_args(&command().try_get_matches_from(argv).unwrap()).unwrap();

        let mut again = vec!["obi-launch".to_string()];
        again.extend(args.to_command_line());
        let reparsed = launch_args(&command().try_get_matches_from(again).unwrap()).unwrap();
        assert_eq!(reparsed, args);
    }

    #[test]
    fn rejects_bad_input() {
        let mut missing = base();
        missing.truncate(3);
        assert!(command().try_get_matches_from(missing).is_err());

        let mut bad_mode = base();
        bad_mode.extend(["--mode", "simulate"]);
        assert!(command().try_get_matches_from(bad_mode).is_err());

        let mut lone_activity = base();
        lone_activity.extend(["--activity_id", "act-1"]);
        assert!(command().try_get_matches_from(lone_activity).is_err());

        let mut bad_uuid = base();
        bad_uuid[12] = "not-a-uuid";
        assert!(command().try_get_matches_from(bad_uuid).is_err());
    }
}
