//! `obi-launch`: execute a stored scan or single coordinate configuration

use anyhow::Context;
use obi_cli::{cli, launch, LocalEntityStore};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = match cli::command().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let code = i32::from(err.use_stderr());
            let _ = err.print();
            std::process::exit(code);
        }
    };
    match run(&matches) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            tracing::error!("{err:#}");
            std::process::exit(1);
        }
    }
}

fn run(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let args = cli::launch_args(matches)?;
    let registry = obi_tasks::registry().context("building type registry")?;
    let store = LocalEntityStore::new(&args.entity_cache);

    let report = launch(&args, &store, &registry)
        .with_context(|| format!("launching {} '{}'", args.entity_type, args.entity_id))?;
    tracing::info!(
        task = %report.task_type,
        files = report.written.len(),
        "launch complete"
    );
    Ok(())
}
