//!
//! serveline binary
//! ----------------
//! Command-line front end for the restaurant API session core. Runs one command
//! (`login`, `whoami`, `staff list`, ...) or an interactive interpreter with `repl`.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use serveline::cli::{parse_command, run_command, run_repl, Command, USAGE};
use serveline::config::ClientConfig;
use serveline::context::ClientContext;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api-url <url>] [--token-file <path>] <command> [args...]\n\nFlags:\n  --api-url <url>          API base URL (env SERVELINE_API_URL, default http://localhost:3000)\n  --token-file <path>      Where session tokens are kept (env SERVELINE_TOKEN_FILE)\n  -h, --help               Show this help\n\n{USAGE}"
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "serveline".to_string() } else { args.remove(0) };

    let mut api_url: Option<String> = None;
    let mut token_file: Option<PathBuf> = None;
    let mut rest: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" => {
                let Some(v) = args.get(i + 1) else { print_usage(&program); std::process::exit(2); };
                api_url = Some(v.clone());
                i += 2;
            }
            "--token-file" => {
                let Some(v) = args.get(i + 1) else { print_usage(&program); std::process::exit(2); };
                token_file = Some(PathBuf::from(v));
                i += 2;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            _ => {
                rest.extend(args[i..].iter().cloned());
                break;
            }
        }
    }

    let mut config = ClientConfig::load().context("failed to load configuration")?;
    if let Some(url) = api_url { config.api_url = url; }
    if let Some(path) = token_file { config.token_file = path; }
    config.validate().context("invalid configuration")?;

    let command = match parse_command(&rest) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let ctx = ClientContext::from_config(&config).context("failed to initialise client")?;
    info!(target: "startup", "serveline starting: session={:?}", ctx.session.status());

    match command {
        Command::Repl => run_repl(&rt, &ctx),
        Command::Help => {
            print_usage(&program);
            Ok(())
        }
        cmd => rt.block_on(run_command(&ctx, cmd)),
    }
}
