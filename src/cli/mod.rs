//! Command-line interface for aegis.
//!
//! Provides commands for running the remediation pipeline against a
//! repository and for inspecting resolved configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::{Orchestrator, Stage};
use crate::domain::RunResult;

/// aegis - automated security-remediation pipeline
#[derive(Parser, Debug)]
#[command(name = "aegis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the remediation pipeline against a repository
    Run {
        /// URL of the repository to remediate
        repo_url: String,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { repo_url, json } => run_pipeline(&repo_url, json).await,
            Commands::Config => show_config(),
        }
    }
}

async fn run_pipeline(repo_url: &str, json: bool) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = Orchestrator::from_config(&config);

    // Ctrl-C cancels at the next stage boundary
    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = orchestrator.run(repo_url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }

    if result.stage == Stage::Error {
        anyhow::bail!(
            "run ended in ERROR: {}",
            result.error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

fn print_report(result: &RunResult) {
    println!("Run {} finished: {}", result.run_id, result.stage);
    println!("  Vulnerabilities found: {}", result.vulnerabilities_found);
    println!("  Fixes applied:         {}", result.fixes_applied);
    match result.pull_request {
        Some(ref pr) => println!("  Pull request:          {}", pr.url),
        None => println!("  Pull request:          none"),
    }
    println!();
    println!("{}", result.summary);
}

fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Workspace dir: {}", config.workspace_dir.display());
    match config.config_file {
        Some(ref path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none found)"),
    }
    println!("Ollama:        {}", config.ollama.base_url);
    for (role, settings) in [
        ("scanner", &config.ollama.scanner),
        ("researcher", &config.ollama.researcher),
        ("fixer", &config.ollama.fixer),
        ("reviewer", &config.ollama.reviewer),
    ] {
        println!(
            "  {:<10} model={} temperature={} max_tokens={}",
            role, settings.model, settings.temperature, settings.max_tokens
        );
    }
    Ok(())
}
