use super::args::*;
use anyhow::Context;
use scorecard_core::config::{load_config, write_sample_config, ScorecardConfig};
use scorecard_core::engine::Runner;
use scorecard_core::storage::Store;
use scorecard_core::{ScorecardError, TestsService};
use serde::Serialize;
use std::sync::Arc;

pub mod catalog;
pub mod runs;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

/// Everything a command needs: the loaded config and a service over the store.
pub struct Session {
    pub cfg: ScorecardConfig,
    pub store: Arc<Store>,
    pub service: TestsService,
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match execute(cli).await {
        Err(e) => match e.downcast_ref::<ScorecardError>() {
            Some(se) if se.is_client_error() || matches!(se, ScorecardError::Config(_)) => {
                tracing::debug!(event = "scorecard.cli.rejected", error = %se);
                eprintln!("error: {se}");
                Ok(exit_codes::CONFIG_ERROR)
            }
            _ => Err(e),
        },
        ok => ok,
    }
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Init(args) = &cli.cmd {
        return cmd_init(&cli, args);
    }
    if let Command::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(exit_codes::OK);
    }

    let loaded = load_config(&cli.config)?;
    let mut cfg = loaded.config;
    if let Some(db) = &cli.db {
        cfg.db = db.clone();
    }
    crate::init_logging(&cfg.log_level, cli.log_json);
    for warning in &loaded.warnings {
        warning.log();
    }

    let store = Store::open(&cfg.db).with_context(|| format!("opening {}", cfg.db.display()))?;
    store.init_schema()?;
    let store = Arc::new(store);
    let session = Session {
        service: TestsService::new(store.clone(), store.clone()),
        store,
        cfg,
    };

    match cli.cmd {
        Command::Upload(args) => catalog::cmd_upload(&session, args).await,
        Command::Sets(args) => catalog::cmd_sets(&session, args),
        Command::Show(args) => catalog::cmd_show(&session, args),
        Command::Run(args) => runs::cmd_run(&session, args).await,
        Command::Runs(args) => runs::cmd_runs(&session, args),
        Command::RunInfo(args) => runs::cmd_run_info(&session, args),
        Command::Rows(args) => runs::cmd_rows(&session, args),
        Command::Download(args) => runs::cmd_download(&session, args).await,
        Command::Init(_) | Command::Version => Ok(exit_codes::OK),
    }
}

fn cmd_init(cli: &Cli, args: &InitArgs) -> anyhow::Result<i32> {
    if cli.config.exists() && !args.force {
        eprintln!(
            "note: {} already exists (skipped, use --force to overwrite)",
            cli.config.display()
        );
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = cli.config.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_sample_config(&cli.config)?;
    eprintln!("created {}", cli.config.display());
    Ok(exit_codes::OK)
}

/// Service with a runner wired from the config's answerer and scorer sections.
pub fn runnable_service(session: &Session) -> anyhow::Result<TestsService> {
    let answerer = session.cfg.answerer.build()?;
    let scorer = scorecard_metrics::build_scorer(&session.cfg.scorer)?;
    let runner = Runner::new(session.store.clone(), session.store.clone(), answerer, scorer)
        .with_policy(session.cfg.run_policy());
    Ok(session.service.clone().with_runner(runner))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
