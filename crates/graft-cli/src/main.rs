//! `graft` command-line tool

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use graft_core::{verify, ExtensionInstaller, GraftConfig, InstallReport, ReconcileMode};
use graft_store::ProjectStore;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("graft")
        .version(graft_core::VERSION)
        .about("Graft an app-extension target into an Xcode project")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log detail (-v info, -vv debug, -vvv trace)"),
        )
        .subcommand(
            Command::new("install")
                .about("Create or refresh the extension target")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(project_arg())
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Host target name or identifier"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .help("Extension target name"),
                )
                .arg(
                    Arg::new("bundle-id")
                        .long("bundle-id")
                        .help("Extension bundle identifier"),
                )
                .arg(
                    Arg::new("source-root")
                        .long("source-root")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding the extension sources"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["settings-only", "full"])
                        .help("Behaviour when the extension target exists"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report what would change without writing"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Check a project for dangling references and duplicate entries")
                .arg(project_arg())
                .arg(json_arg()),
        )
}

fn project_arg() -> Arg {
    Arg::new("project")
        .long("project")
        .short('p')
        .value_parser(value_parser!(PathBuf))
        .help("project.pbxproj, an .xcodeproj, or a directory holding one")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn install_config(args: &ArgMatches) -> anyhow::Result<GraftConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => GraftConfig::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => GraftConfig::default(),
    };
    if let Some(project) = args.get_one::<PathBuf>("project") {
        config = config.with_project(project);
    }
    if let Some(host) = args.get_one::<String>("host") {
        config = config.with_host_target(host);
    }
    if let Some(name) = args.get_one::<String>("name") {
        config = config.with_extension_name(name);
    }
    if let Some(id) = args.get_one::<String>("bundle-id") {
        config = config.with_bundle_identifier(id);
    }
    if let Some(root) = args.get_one::<PathBuf>("source-root") {
        config = config.with_source_root(root);
    }
    match args.get_one::<String>("mode").map(String::as_str) {
        Some("full") => config = config.with_mode(ReconcileMode::Full),
        Some("settings-only") => config = config.with_mode(ReconcileMode::SettingsOnly),
        _ => {}
    }
    if args.get_flag("dry-run") {
        config = config.with_dry_run(true);
    }
    Ok(config)
}

fn print_install(report: &InstallReport) {
    let verb = if report.dry_run { "would change" } else { "changed" };
    println!("Extension: {} (host {})", report.extension, report.host);
    println!("  Target: {} ({})", report.target.id, if report.target.created { "created" } else { "existing" });
    println!("  Path: {:?}", report.states);
    println!("  Objects created: {}", report.created());
    println!("  Configurations {verb}: {}", report.configurations_changed);
    for path in &report.skipped_files {
        println!("  Skipped missing file: {}", path.display());
    }
    if let Some(capability) = &report.capability {
        println!(
            "  Capability document: {} [{}]{}",
            capability.path,
            capability.groups.join(", "),
            if capability.changed { format!(" ({verb})") } else { String::new() }
        );
    }
    println!(
        "  Project: {}",
        match (report.graph_changed, report.graph_written) {
            (_, true) => "written",
            (true, false) => "would be written",
            (false, false) => "unchanged",
        }
    );
}

fn run(matches: &ArgMatches) -> anyhow::Result<bool> {
    match matches.subcommand() {
        Some(("install", args)) => {
            let config = install_config(args)?;
            debug!(?config, "install configuration");
            let report = ExtensionInstaller::new(config)?.run()?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_install(&report);
            }
            Ok(true)
        }
        Some(("verify", args)) => {
            let project = args
                .get_one::<PathBuf>("project")
                .cloned()
                .unwrap_or_else(|| GraftConfig::default().project);
            let doc = ProjectStore::open(&project)
                .and_then(|store| store.load())
                .with_context(|| format!("loading {}", project.display()))?;
            let report = verify(doc.graph());
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Objects: {}", doc.graph().len());
                println!("Integrity: {}", if report.is_clean() { "VALID" } else { "INVALID" });
                for (from, to) in &report.dangling {
                    println!("  {from} refers to missing {to}");
                }
                for duplicate in &report.duplicate_children {
                    println!("  group {} lists {} twice", duplicate.group, duplicate.path);
                }
                for duplicate in &report.duplicate_build_files {
                    println!("  phase {} wraps {} twice", duplicate.phase, duplicate.file_ref);
                }
            }
            Ok(report.is_clean())
        }
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    if !run(&matches)? {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn flags_override_config_defaults() {
        let matches = cli().get_matches_from([
            "graft", "install", "--project", "App.xcodeproj", "--host", "App", "--name", "Widget",
            "--mode", "full", "--dry-run",
        ]);
        let (_, args) = matches.subcommand().unwrap();
        let config = install_config(args).unwrap();
        assert_eq!(config.project, PathBuf::from("App.xcodeproj"));
        assert_eq!(config.host_target.as_deref(), Some("App"));
        assert_eq!(config.extension.name, "Widget");
        assert_eq!(config.mode, ReconcileMode::Full);
        assert!(config.dry_run);
    }

    #[test]
    fn defaults_without_flags() {
        let matches = cli().get_matches_from(["graft", "install"]);
        let (_, args) = matches.subcommand().unwrap();
        let config = install_config(args).unwrap();
        assert_eq!(config.mode, ReconcileMode::SettingsOnly);
        assert!(config.host_target.is_none());
        assert!(!config.dry_run);
    }
}
