use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tfdrift::drift::{detect_drift_type, generate_recommendations};
use tfdrift::formatters::OutputFormatter;
use tfdrift::shared::logging;
use tfdrift::terraform::extract_drifted_resources;
use tfdrift::{CommandRunner, Config, ScriptedRunner, ShellRunner, TfDrift};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code of `check` when drift was found, mirroring `plan -detailed-exitcode`.
const EXIT_DRIFT_FOUND: i32 = 2;

#[derive(Parser)]
#[command(
    name = "tfdrift",
    about = "Detect Terraform drift, explain it, and correct it through apply or pull requests.",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        short = 'c',
        value_name = "PATH",
        help = "Path to the JSON configuration file"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'd',
        value_name = "PATH",
        help = "Terraform working directory (overrides TERRAFORM_PATH)"
    )]
    pub dir: Option<String>,

    #[arg(long, help = "Log commands instead of executing them")]
    pub dry_run: bool,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "serve", about = "Serve the drift HTTP API")]
    Serve {
        #[arg(long, help = "Address to bind")]
        host: Option<String>,
        #[arg(long, short = 'p', help = "Port to listen on")]
        port: Option<u16>,
    },

    #[command(name = "check", about = "Run a plan once and print the drift report")]
    Check {
        #[arg(long, help = "Indent the JSON report")]
        pretty: bool,
    },

    #[command(
        name = "analyze",
        about = "Classify and assess saved plan output ('-' reads stdin)"
    )]
    Analyze {
        #[arg(long, value_name = "PATH")]
        plan_file: String,
    },
}

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    let Some(command) = &cli.command else {
        println!("No command specified. Use --help for usage information.");
        return;
    };

    let result = match command {
        Commands::Serve { host, port } => run_serve(&cli, host.clone(), *port).await,
        Commands::Check { pretty } => run_check(&cli, *pretty).await,
        Commands::Analyze { plan_file } => run_analyze(plan_file),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("{:#}", err);
            std::process::exit(1);
        }
    }
}

fn init_tfdrift(cli: &Cli) -> anyhow::Result<TfDrift> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.dir {
        tracing::info!("Using Terraform directory from CLI arg: {}", dir);
        config.terraform.terraform_path = Some(dir.clone());
        config.terraform.terragrunt_path = None;
    }

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        tracing::info!("Dry run: commands will be logged, not executed");
        Arc::new(ScriptedRunner::new())
    } else {
        Arc::new(ShellRunner::detect()?)
    };

    tracing::info!(
        working_dir = ?config.working_dir(),
        tool = config.tool(),
        "Initializing tfdrift"
    );
    Ok(TfDrift::new(config, runner))
}

async fn run_serve(cli: &Cli, host: Option<String>, port: Option<u16>) -> anyhow::Result<i32> {
    let app = init_tfdrift(cli)?;
    let host = host.unwrap_or_else(|| app.config().server.host.clone());
    let port = port.unwrap_or(app.config().server.port);
    tfdrift::server::serve(Arc::new(app), &host, port).await?;
    Ok(0)
}

async fn run_check(cli: &Cli, pretty: bool) -> anyhow::Result<i32> {
    let app = init_tfdrift(cli)?;
    let report = app.check_drift().await?;
    println!(
        "{}",
        OutputFormatter::render(&OutputFormatter::format_drift_report(&report), pretty)?
    );
    Ok(if report.has_changes { EXIT_DRIFT_FOUND } else { 0 })
}

fn run_analyze(plan_file: &str) -> anyhow::Result<i32> {
    let plan = if plan_file == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(plan_file)?
    };

    let resources = extract_drifted_resources(&plan);
    let analysis = OutputFormatter::format_analysis(
        &detect_drift_type(&resources),
        &generate_recommendations(&resources),
    );
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(0)
}
