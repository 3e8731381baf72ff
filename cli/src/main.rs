mod completer;
mod console;
mod display;
mod prompt;
mod shell;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use config::Settings;
use rpc::{Console, HttpTransport, Session};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::console::ShellConsole;
use crate::shell::Shell;

#[derive(clap_derive::Parser, Debug)]
#[command(name = "rbofh", version, about = "Interactive console for a bofhd administration server")]
struct Args {
    /// Connect to an alternate server
    #[arg(long, env = "RBOFH_URL")]
    url: Option<String>,

    /// Connect as the given user
    #[arg(long, short)]
    user: Option<String>,

    /// Override a setting, e.g. --set console_prompt="admin> "
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Enable debug logging
    #[arg(long, short)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = Settings::load();
    for spec in &args.set {
        settings.apply_override(spec).map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(url) = args.url {
        settings.url = Some(url);
    }
    let url = settings
        .url
        .clone()
        .context("no server url configured; pass --url or set url in settings.toml")?;

    let console = Arc::new(ShellConsole::new());
    console.show_message(&format!("Server is at {}", url), true);
    let session = Session::new(HttpTransport::new(url.as_str()), console.clone());

    let username = args
        .user
        .or_else(|| std::env::var("USER").ok())
        .filter(|u| !u.is_empty());

    let mut shell = Shell::new(session, console, settings);
    shell.initial_login(username).await?;
    shell.run().await
}
