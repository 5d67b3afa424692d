//! opascan - policy compliance scanning for infrastructure-as-code
//!
//! ## Commands
//!
//! - `scan`: scan a CloudFormation project or Terraform plan against Rego rules
//! - `event`: run a scan described by a serverless / CodePipeline event file
//!
//! The scan result is printed on stdout as a JSON array of
//! `{id, message, type, valid}` objects.

mod event;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opascan_core::{
    obs, split_rules, Dialect, MergePolicy, ParameterSet, ScanOptions, ScanRequest, Scanner,
    SubstitutionMode,
};
use opascan_engine::{OpaCliGateway, OpaConfig};
use opascan_storage::{is_object_uri, ObjectLocation, S3Client, S3Url, SourceRouter};
use tracing::{info, Level};

use crate::event::ScanEvent;

#[derive(Parser)]
#[command(name = "opascan")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy compliance scanning for CloudFormation and Terraform", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an input file or directory against rule modules
    Scan(ScanArgs),

    /// Run a scan described by an event JSON file
    Event {
        /// Path to the event JSON
        #[arg(short, long)]
        file: PathBuf,

        /// Exit non-zero when any rule reports a violation
        #[arg(long)]
        fail_on_violation: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Input file or directory (local path or s3://bucket/prefix)
    #[arg(short, long, env = "INPUT")]
    input: String,

    /// Comma separated rule locations (local paths or s3://bucket/prefix)
    #[arg(short, long, env = "RULES")]
    rules: String,

    /// Deployment parameters, e.g. `Env=prod,Subnets=[subnet-a,subnet-b]`
    #[arg(short, long, env = "PARAMETERS", default_value = "")]
    parameters: String,

    /// Skip dialect detection (terraform | cloudformation)
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Replace `{"Ref": key}` objects in the parsed document instead of
    /// rewriting the serialized text
    #[arg(long)]
    structured_substitution: bool,

    /// Fail when two input documents disagree on a value
    #[arg(long)]
    strict_merge: bool,

    /// Abort the scan after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Also write the result to this path or s3://bucket/key
    #[arg(short, long)]
    output: Option<String>,

    /// Exit non-zero when any rule reports a violation
    #[arg(long)]
    fail_on_violation: bool,
}

impl ScanArgs {
    fn options(&self) -> ScanOptions {
        ScanOptions {
            dialect: self.dialect,
            substitution: if self.structured_substitution {
                SubstitutionMode::Structured
            } else {
                SubstitutionMode::Textual
            },
            merge_policy: if self.strict_merge {
                MergePolicy::RejectConflicts
            } else {
                MergePolicy::LastWins
            },
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    opascan_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Scan(args) => cmd_scan(args).await,
        Commands::Event {
            file,
            fail_on_violation,
        } => cmd_event(&file, fail_on_violation).await,
    }
}

/// Scan from command-line arguments.
async fn cmd_scan(args: ScanArgs) -> Result<()> {
    let rules = split_rules(&args.rules);
    if rules.is_empty() {
        anyhow::bail!("At least one rule location is required");
    }
    let parameters = ParameterSet::parse(&args.parameters).context("Invalid --parameters")?;

    let request = ScanRequest::new(args.input.clone(), rules)
        .with_parameters(parameters)
        .with_options(args.options());

    run_scan(request, args.output, args.fail_on_violation).await
}

/// Scan from a serverless event file.
async fn cmd_event(file: &Path, fail_on_violation: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read event file {}", file.display()))?;
    let event: ScanEvent = serde_json::from_str(&raw).context("Invalid scan event")?;
    let invocation = event.into_invocation()?;

    if let Some(job_id) = &invocation.job_id {
        info!(job_id = %job_id, "Handling CodePipeline job");
    }

    let parameters =
        ParameterSet::parse(&invocation.parameters).context("Invalid event parameters")?;
    let request = ScanRequest::new(invocation.input, invocation.rules).with_parameters(parameters);

    run_scan(request, invocation.output, fail_on_violation).await
}

async fn run_scan(
    request: ScanRequest,
    output: Option<String>,
    fail_on_violation: bool,
) -> Result<()> {
    let config = OpaConfig::from_env().context("Invalid engine configuration")?;
    let router = build_router(&request, output.as_deref()).await;
    let scanner = Scanner::new(router.clone(), Arc::new(OpaCliGateway::new(config)));

    let report = scanner.scan(&request).await.context("Scan failed")?;
    let result_json = serde_json::to_string(&report.result)?;
    println!("{}", result_json);

    if let Some(target) = output.as_deref() {
        store_result(&router, target, &result_json)
            .await
            .with_context(|| format!("Failed to write result to {}", target))?;
        info!(output = %target, "Stored scan result");
    }

    let verdict = report.verdict();
    obs::emit_verdict(&report.scan_id, &verdict);

    if fail_on_violation && !verdict.passed {
        anyhow::bail!("{}: {}", verdict.message, verdict.failure_payload()?);
    }
    Ok(())
}

/// S3 credentials are only loaded when some location needs them.
async fn build_router(request: &ScanRequest, output: Option<&str>) -> SourceRouter {
    let needs_object_storage = is_object_uri(&request.input)
        || request.rules.iter().any(|r| is_object_uri(r))
        || output.is_some_and(is_object_uri);

    if needs_object_storage {
        SourceRouter::new(Arc::new(S3Client::from_env().await))
    } else {
        SourceRouter::local_only()
    }
}

/// Split an output target into the location handed to `store`.
///
/// `s3://bucket/key` maps to bucket and key; a local path maps to its
/// parent directory and file name.
fn output_location(target: &str) -> Result<ObjectLocation> {
    if is_object_uri(target) {
        let url = S3Url::parse(target)?;
        if url.prefix.is_empty() {
            anyhow::bail!("Output {} has no object key", target);
        }
        return Ok(ObjectLocation::new(url.bucket, url.prefix));
    }

    let path = Path::new(target);
    let file_name = path
        .file_name()
        .with_context(|| format!("Output {} has no file name", target))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    };
    Ok(ObjectLocation::new(dir, file_name.to_string_lossy()))
}

async fn store_result(router: &SourceRouter, target: &str, content: &str) -> Result<()> {
    let location = output_location(target)?;
    router.for_uri(target)?.store(&location, content).await?;
    Ok(())
}
