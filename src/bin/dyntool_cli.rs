//! A debugging entry point for exercising discovery and execution from a
//! terminal, the same role the teacher's `spec_helper`/`cli` binaries play
//! for spec-driven code generation. Not a server; carries no inbound surface.

use clap::{Parser, Subcommand};
use dyntool_core::{ActionParams, Credential, CoreConfig, DiscoveryHints, ToolBinding};
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "dyntool")]
#[command(about = "Dynamic tool integration core CLI", long_about = None)]
struct Cli {
    /// Base URL of the API to bind against.
    #[arg(short, long, global = true)]
    base_url: Option<String>,

    /// Bearer token, if the target API needs one.
    #[arg(short, long, global = true, env = "DYNTOOL_TOKEN")]
    token: Option<String>,

    /// Tool name, used to derive the resource scope (e.g. `github_issues`).
    #[arg(long, global = true, default_value = "tool")]
    tool_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run discovery against `--base-url` and print what was found.
    Discover {
        /// Skip the strategy ladder and fetch this spec URL directly.
        #[arg(long)]
        openapi_url: Option<String>,
    },
    /// Discover then print the resource-scoped, permission-filtered action catalog.
    ListActions,
    /// Discover, resolve `action_id`, and execute it with the given `key=value` params.
    Execute {
        action_id: String,
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn credential(cli: &Cli) -> Credential {
    match &cli.token {
        Some(token) => Credential::Token(token.clone()),
        None => Credential::None,
    }
}

fn hints(openapi_url: Option<String>) -> DiscoveryHints {
    match openapi_url {
        Some(url) => DiscoveryHints::with_openapi_url(url),
        None => DiscoveryHints::none(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_url = cli
        .base_url
        .clone()
        .ok_or("--base-url is required")?;

    match &cli.command {
        Commands::Discover { openapi_url } => {
            let (spec_store, pattern_store, _encryption) = dyntool_core::store::default_collaborators();
            let binding = ToolBinding::with_collaborators(
                cli.tool_name.clone(),
                base_url,
                credential(&cli),
                hints(openapi_url.clone()),
                CoreConfig::default(),
                spec_store,
                pattern_store,
            );
            let result = binding.discover().await?;
            println!("{:#?}", result.status);
            if let Some(url) = result.spec_url {
                println!("spec_url: {url}");
            }
        }
        Commands::ListActions => {
            let binding = ToolBinding::new(cli.tool_name.clone(), base_url, credential(&cli));
            binding.discover().await?;
            for entry in binding.list_actions().await? {
                println!(
                    "{:<8} {:<40} {} (allowed: {})",
                    entry.method, entry.path, entry.action_id, entry.allowed
                );
            }
        }
        Commands::Execute { action_id, params } => {
            let binding = ToolBinding::new(cli.tool_name.clone(), base_url, credential(&cli));
            binding.discover().await?;
            let mut action_params: ActionParams = HashMap::new();
            for (k, v) in params {
                action_params.insert(k.clone(), serde_json::Value::String(v.clone()));
            }
            let outcome = binding.execute_action(action_id, &action_params).await?;
            println!("status: {:?}", outcome.status_code);
            if let Some(body) = outcome.parsed_body {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if let Some(raw) = outcome.raw_body {
                println!("{raw}");
            }
        }
    }

    Ok(())
}
