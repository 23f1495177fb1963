//! Smoke Runtime - CLI Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use smoke_runtime::config::{MockConfig, MockRoute, MockServer, Protocol};
use smoke_runtime::executor::HttpStepExecutor;
use smoke_runtime::runner::ScenarioRunner;
use smoke_runtime::runtime::MockRuntime;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "smoke-runtime",
    about = "Contract-driven smoke testing runtime - mock servers and scenario execution",
    version
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve mock servers from a configuration file
    Mock {
        /// Path to the mock configuration file
        #[arg(short, long, default_value = "mock-config.yaml")]
        config: PathBuf,

        /// Validate the configuration and exit
        #[arg(long)]
        validate: bool,
    },

    /// Execute a scenario bundle and record artifacts
    Run {
        /// Path to the scenario bundle (directory or scenario file)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Root directory for run artifacts
        #[arg(short, long, default_value = "runs")]
        output_dir: PathBuf,

        /// Identifier for this run; a fresh UUID when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Target base URL (overrides SMOKE_RUNTIME_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds (overrides SMOKE_RUNTIME_TIMEOUT)
        #[arg(long)]
        timeout: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Mock { config, validate } => serve_mocks(config, validate).await,
        Command::Run {
            bundle,
            output_dir,
            run_id,
            base_url,
            timeout,
        } => run_scenario(bundle, output_dir, run_id, base_url, timeout).await,
    }
}

async fn serve_mocks(config_path: PathBuf, validate: bool) -> Result<()> {
    info!(path = ?config_path, "Loading mock configuration");
    let config = MockConfig::from_file(&config_path)?;

    if validate {
        println!(
            "Configuration is valid ({} servers, {} routes)",
            config.servers.len(),
            config.servers.iter().map(|s| s.routes.len()).sum::<usize>()
        );
        return Ok(());
    }

    let mut runtime = MockRuntime::new(config);
    if let Err(e) = runtime.start().await {
        // A partial start leaves earlier listeners tracked; release them.
        runtime.stop().await;
        return Err(e);
    }

    let addrs = runtime.addrs();
    for (server, addr) in runtime.config().servers.iter().zip(addrs.iter()) {
        for line in server_summary(server, *addr) {
            println!("{}", line);
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    runtime.stop().await;
    Ok(())
}

async fn run_scenario(
    bundle: PathBuf,
    output_dir: PathBuf,
    run_id: Option<String>,
    base_url: Option<String>,
    timeout: Option<f64>,
) -> Result<()> {
    let timeout = timeout
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64);
    let executor = HttpStepExecutor::new(base_url.as_deref(), timeout)?;
    let runner = ScenarioRunner::new(bundle, output_dir, run_id, Box::new(executor));
    let summary = runner.run().await?;

    println!(
        "Scenario {}: {} steps, {} passed, {} failed ({:.0}ms)",
        summary.scenario_id,
        summary.total_steps,
        summary.passed_steps,
        summary.failed_steps,
        summary.duration_ms
    );
    println!("Artifacts: {}", summary.summary_file);

    if !summary.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn server_summary(server: &MockServer, addr: SocketAddr) -> Vec<String> {
    let mut lines = vec![format!(
        "[mock-runtime] {} ({}) listening on {}",
        server.name,
        server.protocol.to_string().to_uppercase(),
        addr
    )];
    lines.push("    routes:".to_string());
    if server.routes.is_empty() {
        lines.push("      (no routes configured)".to_string());
    } else {
        for route in &server.routes {
            lines.push(format!("      - {}", describe_route(server.protocol, route)));
        }
    }
    lines
}

fn describe_route(protocol: Protocol, route: &MockRoute) -> String {
    match protocol {
        Protocol::Rest => {
            let method = route
                .matcher
                .method
                .as_deref()
                .unwrap_or("*")
                .to_uppercase();
            let path = route.matcher.path.as_deref().unwrap_or("/*");
            format!("{} {}", method, path)
        }
        Protocol::Soap => format!(
            "SOAPAction {}",
            route.matcher.soap_action.as_deref().unwrap_or(&route.operation)
        ),
        Protocol::Rpc => format!(
            "RPC {}",
            route.matcher.rpc_method.as_deref().unwrap_or(&route.operation)
        ),
    }
}
