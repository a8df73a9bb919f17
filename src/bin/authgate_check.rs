//! authgate-check
//!
//! Authorizes one request described on the command line and prints the decision

use anyhow::Context;
use authgate::cache::CacheRegistry;
use authgate::{AuthRequest, Settings};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "authgate-check")]
#[command(about = "Check whether a request would be authorized")]
struct Args {
    /// Settings file (TOML)
    #[arg(short = 's', long)]
    settings: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request path
    #[arg(short = 'p', long)]
    path: String,

    /// Request header as name=value, repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid header '{}'. Expected name=value", s)),
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let settings = match &args.settings {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    info!("cache: {}, policy: {:?}", settings.cache.kind, settings.policy_path);

    let registry = CacheRegistry::new();
    let authorizer = settings.authorizer(&registry).await?;

    let mut request = AuthRequest::new(args.method, args.path);
    for (name, value) in args.headers {
        request = request.with_header(name, value);
    }
    authorizer.apply_pre_actions(&mut request.attributes)?;

    match authorizer.authorize(&request, &CancellationToken::new()).await {
        Ok(mut authorized) => {
            // the runtime drops detached tasks on exit
            if let Some(persist) = authorized.persist.take() {
                persist.await.context("caching principal")?;
            }
            let decision = serde_json::to_value(&authorized)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "allowed": true, "decision": decision }))?
            );
            Ok(true)
        }
        Err(e) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "allowed": false, "reason": e.to_string() }))?
            );
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
