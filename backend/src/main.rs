//! manifest-bulk CLI - validate and submit bulk e-Manifest workbooks
//!
//! ```bash
//! manifest-bulk check bulk.xlsx            # Validate and print the payloads
//! manifest-bulk submit bulk.xlsx           # Validate, build and save to e-Manifest
//! manifest-bulk serve --port 3000          # Start the HTTP server
//! ```
//!
//! Credentials and the target environment come from `EMANIFEST_*` variables
//! (or a `.env` file); `--env` overrides the environment.

use clap::{Parser, Subcommand};
use manifest_bulk::{
    check_file, logging, process_file, BatchResponse, CheckResponse, ClientConfig,
    EManifestClient, Environment,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "manifest-bulk")]
#[command(about = "Bulk upload of hazardous-waste manifests to e-Manifest", long_about = None)]
struct Cli {
    /// Target environment: dev, preprod or prod (default: EMANIFEST_ENV or preprod)
    #[arg(short, long, global = true)]
    env: Option<Environment>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workbook and output the manifests that would be submitted
    Check {
        /// Input workbook (.xlsx)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate, build and submit every manifest of a workbook
    Submit {
        /// Input workbook (.xlsx)
        input: PathBuf,

        /// Output file for the batch result (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { input, output } => cmd_check(&input, output.as_deref()),
        Commands::Submit { input, output } => {
            cmd_submit(&input, output.as_deref(), cli.env).await
        }
        Commands::Serve { port } => cmd_serve(port, cli.env).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn client(env: Option<Environment>) -> Result<EManifestClient, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(env) = env {
        config.environment = env;
    }
    Ok(EManifestClient::new(config)?)
}

fn cmd_check(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Checking: {}", input.display());

    match check_file(input) {
        Ok(payloads) => {
            let response = CheckResponse::ready(payloads);
            eprintln!("✅ {} manifests ready to submit", response.total_manifests);
            write_output(&serde_json::to_string_pretty(&response)?, output)?;
            Ok(())
        }
        Err(err) => {
            let response = BatchResponse::from(err);
            write_output(&serde_json::to_string_pretty(&response)?, output)?;
            Err("workbook is not valid, nothing would be submitted".into())
        }
    }
}

async fn cmd_submit(
    input: &Path,
    output: Option<&Path>,
    env: Option<Environment>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = client(env)?;
    eprintln!(
        "📄 Submitting: {} to {}",
        input.display(),
        client.environment()
    );

    let response = process_file(input, &client).await;
    write_output(&serde_json::to_string_pretty(&response)?, output)?;

    match &response {
        BatchResponse::Submitted { batch_result, results } => {
            eprintln!(
                "\n📊 Results: {} saved, {} failed ({})",
                results.success.len(),
                results.fail.len(),
                batch_result
            );
            for saved in &results.success {
                eprintln!("   ✅ manifestId {} → {}", saved.manifest_id, saved.mtn);
            }
            if !response.is_success() {
                return Err("one or more manifests were not saved".into());
            }
            eprintln!("\n✨ Done!");
            Ok(())
        }
        BatchResponse::ValidationErrors { all_errors } => {
            for group in all_errors {
                eprintln!(
                    "   ❌ {}: {} error(s)",
                    group.stage.sheet(),
                    group.error_count()
                );
            }
            Err("workbook is not valid, nothing was submitted".into())
        }
        BatchResponse::InputErrors { message, .. }
        | BatchResponse::AuthErrors { message, .. }
        | BatchResponse::SystemError { message, .. } => Err(message.clone().into()),
    }
}

async fn cmd_serve(
    port: u16,
    env: Option<Environment>,
) -> Result<(), Box<dyn std::error::Error>> {
    manifest_bulk::server::start_server(port, client(env)?).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
