//! Vicky CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use vicky::cli::{RunArgs, ServeArgs, ServerArgs};
use vicky::logging::init_tracing;
use vicky::{
    run_test, Cli, Commands, JsonStore, LogSink, NullStore, Server, Store, TracingSink,
    VickyError,
};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> vicky::Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().map_err(|e| VickyError::Config {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;

    match cli.command {
        Commands::Serve(args) => runtime.block_on(run_serve(args)),
        Commands::Run(args) => runtime.block_on(run_with_test(args)),
    }
}

/// Store files chosen for this run, if recording is enabled
struct StorePaths {
    context: PathBuf,
    actions: PathBuf,
}

fn open_store(args: &ServerArgs) -> vicky::Result<(Arc<dyn Store>, Option<StorePaths>)> {
    match &args.store_dir {
        Some(dir) => {
            let store = JsonStore::new(dir, &args.run_id)?;
            let paths = StorePaths {
                context: store.context_path().to_path_buf(),
                actions: store.actions_path().to_path_buf(),
            };
            Ok((Arc::new(store), Some(paths)))
        }
        None => Ok((Arc::new(NullStore), None)),
    }
}

async fn run_serve(args: ServeArgs) -> vicky::Result<ExitCode> {
    let config = args.server.server_config()?;
    init_tracing(args.server.log_dir.as_deref(), &args.server.run_id)?;
    tracing::info!("Starting vicky v{}", env!("CARGO_PKG_VERSION"));

    let (store, _) = open_store(&args.server)?;
    let log: Arc<dyn LogSink> = Arc::new(TracingSink);
    let server = Server::bind(config, log, store).await?;

    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            handle.shutdown();
        }
    });

    server.run().await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_with_test(args: RunArgs) -> vicky::Result<ExitCode> {
    let config = args.run_config()?;
    let log_path = init_tracing(config.log_dir.as_deref(), &config.run_id)?;
    tracing::info!("Starting vicky v{}", env!("CARGO_PKG_VERSION"));

    let (store, store_paths) = open_store(&args.server)?;
    let log: Arc<dyn LogSink> = Arc::new(TracingSink);
    let server = Server::bind(config.server.clone(), Arc::clone(&log), store).await?;
    let handle = server.shutdown_handle();
    let mut server_task = tokio::spawn(server.run());

    let result = tokio::select! {
        result = run_test(config.runner.as_deref(), &config.test_file, log.as_ref()) => result,
        served = &mut server_task => {
            flatten(served)?;
            return Err(VickyError::Runner {
                message: "Server stopped before the test process finished".to_string(),
            });
        }
    };

    handle.shutdown();
    flatten(server_task.await)?;

    let summary = json!({
        "success": result.success,
        "time": result.duration_ms,
        "log": log_path.map(|p| p.display().to_string()),
        "context_store": store_paths.as_ref().map(|p| p.context.display().to_string()),
        "actions_store": store_paths.as_ref().map(|p| p.actions.display().to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if result.success {
        Ok(ExitCode::SUCCESS)
    } else {
        log.error("Test run failed; see log for details.");
        Ok(ExitCode::from(1))
    }
}

fn flatten(joined: Result<vicky::Result<()>, tokio::task::JoinError>) -> vicky::Result<()> {
    joined.map_err(|e| VickyError::Runner {
        message: format!("Server task failed: {}", e),
    })?
}
