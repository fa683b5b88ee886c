//! `safeline` binary: serve the API or mint operator video tokens

use anyhow::Context;
use clap::{Arg, Command};
use safeline_core::{ServiceConfig, TokenService, UserId};
use safeline_server::{api, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warp::Filter;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(clap::value_parser!(PathBuf))
        .help("Path to a TOML configuration file")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("safeline")
        .version(safeline_server::VERSION)
        .about("SafeLine personal-safety incident API")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP API")
                .arg(config_arg())
                .arg(
                    Arg::new("addr")
                        .long("addr")
                        .help("Listen address, overrides http.listen_addr"),
                ),
        )
        .subcommand(
            Command::new("token")
                .about("Mint a video access token with the configured key")
                .arg(config_arg())
                .arg(
                    Arg::new("user")
                        .long("user")
                        .required(true)
                        .help("User the token is issued to"),
                ),
        );

    let matches = cli.get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match matches.subcommand() {
        Some(("serve", args)) => {
            let mut config = ServiceConfig::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))
                .context("loading configuration")?;
            if let Some(addr) = args.get_one::<String>("addr") {
                config.http.listen_addr = addr.clone();
            }
            serve(&config).await
        }
        Some(("token", args)) => {
            let config = ServiceConfig::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))
                .context("loading configuration")?;
            let user = args
                .get_one::<String>("user")
                .context("--user is required")?;
            if config.token.secret.is_none() {
                tracing::warn!("No token secret configured; the token will not verify on any server");
            }
            let issued = TokenService::from_config(&config.token).issue(&UserId::new(user.clone()));
            println!("{}", serde_json::to_string_pretty(&issued)?);
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn serve(config: &ServiceConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .http
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address: {}", config.http.listen_addr))?;
    let state = AppState::compose(config).context("composing service")?;

    let routes = api(state).with(warp::trace::request());
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!("SafeLine API listening on {}", bound);
    server.await;
    tracing::info!("SafeLine API stopped");
    Ok(())
}
