use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use nugraph::config::{RunConfig, Settings, LATEST};
use nugraph::export::write_diagram;
use nugraph::graph::DependencyGraph;
use nugraph::registry::{FixtureRegistry, NuGetRegistry, RegistryPort};
use nugraph::render::{render_ascii_tree, render_diagram};
use nugraph::resolve::{resolve_graph, CancellationToken};

#[derive(Parser)]
#[command(name = "nugraph")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(about = "Transitive NuGet dependency graph resolver", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Package id to analyze
    #[arg(short, long)]
    package: String,

    /// NuGet v3 service index URL, or a fixture file with --test-mode
    #[arg(short, long)]
    repository: String,

    /// Package version, or "latest"
    #[arg(short, long, default_value = LATEST)]
    version: String,

    /// Maximum dependency depth
    #[arg(short = 'd', long, default_value_t = 10, allow_negative_numbers = true)]
    max_depth: i64,

    /// Only keep packages whose id contains this text
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Print an ASCII tree instead of writing a diagram
    #[arg(short, long)]
    ascii_tree: bool,

    /// Diagram output file (.png, .svg, .dot, .json, ...)
    #[arg(short, long, default_value = "graph.png")]
    output: PathBuf,

    /// Read the repository from a local fixture file
    #[arg(short, long)]
    test_mode: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            package: cli.package,
            repository: cli.repository,
            version: cli.version,
            max_depth: cli.max_depth,
            filter: cli.filter,
            ascii_tree: cli.ascii_tree,
            output: cli.output,
            test_mode: cli.test_mode,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RunConfig::from(Cli::parse());
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    config.validate()?;
    for (key, value) in config.summary() {
        info!("{}: {}", key, value);
    }

    let settings = Settings::load().context("invalid NUGRAPH_* environment settings")?;
    let registry = open_registry(config, &settings)?;

    let cancellation = CancellationToken::new();
    watch_ctrl_c(cancellation.clone());

    let graph = resolve_graph(registry.as_ref(), config, &settings, cancellation)?;
    log_summary(&graph);

    if config.ascii_tree {
        print!("{}", render_ascii_tree(&graph));
    } else {
        let written = write_diagram(&render_diagram(&graph), &config.output)?;
        info!("Diagram written to {}", written.display());
    }
    Ok(())
}

fn open_registry(config: &RunConfig, settings: &Settings) -> Result<Box<dyn RegistryPort>> {
    if config.test_mode {
        let registry = FixtureRegistry::from_file(Path::new(&config.repository))
            .with_context(|| format!("cannot load fixture {}", config.repository))?;
        Ok(Box::new(registry))
    } else {
        let registry = NuGetRegistry::connect(&config.repository, settings)
            .with_context(|| format!("cannot reach registry {}", config.repository))?;
        Ok(Box::new(registry))
    }
}

/// Cancels the build on the first Ctrl-C. The partial graph is still rendered.
fn watch_ctrl_c(cancellation: CancellationToken) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("Ctrl-C handling unavailable: {}", err);
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            warn!("Interrupted, finishing the current level");
            cancellation.cancel();
        }
    });
}

fn log_summary(graph: &DependencyGraph) {
    let cycles = graph.detect_cycles();
    info!(
        "{} packages, {} dependencies, {} back edges, {} cycles, {} warnings",
        graph.node_count(),
        graph.edge_count(),
        graph.back_edges().len(),
        cycles.len(),
        graph.warnings().len()
    );
    for cycle in &cycles {
        info!("Cycle: {}", cycle.cycle_path());
    }
    for (package, warning) in graph.warnings() {
        warn!("{}: {}", package, warning);
    }
    if !graph.is_complete() {
        warn!("Resolution was cancelled; the graph is incomplete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> RunConfig {
        let argv = std::iter::once("nugraph").chain(args.iter().copied());
        RunConfig::from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--package", "Foo", "--repository", "https://api.nuget.org/v3/index.json"]);

        assert_eq!(
            config,
            RunConfig {
                package: "Foo".into(),
                repository: "https://api.nuget.org/v3/index.json".into(),
                ..RunConfig::default()
            }
        );
        assert_eq!(config.version, "latest");
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.output, PathBuf::from("graph.png"));
    }

    #[test]
    fn test_short_flags() {
        let config = parse(&[
            "-p", "Foo", "-r", "fixture.json", "-v", "1.2.0", "-d", "3", "-f", "log", "-a", "-o",
            "deps.svg", "-t",
        ]);

        assert_eq!(config.package, "Foo");
        assert_eq!(config.repository, "fixture.json");
        assert_eq!(config.version, "1.2.0");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.filter, "log");
        assert!(config.ascii_tree);
        assert_eq!(config.output, PathBuf::from("deps.svg"));
        assert!(config.test_mode);
    }

    #[test]
    fn test_version_flag_selects_package_version() {
        let config = parse(&["-p", "Foo", "-r", "feed", "--version", "2.0.0"]);
        assert_eq!(config.version, "2.0.0");
    }

    #[test]
    fn test_non_positive_depth_reaches_validation() {
        let config = parse(&["-p", "Foo", "-r", "feed", "-d", "-1"]);

        assert_eq!(config.max_depth, -1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_package_and_repository_are_required() {
        let err = Cli::try_parse_from(["nugraph", "-r", "feed"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["nugraph", "-p", "Foo"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
