//! `registrar` - CLI and web server for event registration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use registrar::cli::{output, Cli, Command, ConfigCommand, ServeCommand};
use registrar::web::{self, AppState};
use registrar::{init_logging, Config, SendGridNotifier, SharedStorage, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Registrants(cmd) => {
            let storage = Storage::open(config.database_path())?;
            print!("{}", output::registrants(&storage.list_all()?, cmd.format)?);
            Ok(())
        }
        Command::Status(cmd) => {
            let storage = Storage::open(config.database_path())?;
            print!("{}", output::status(storage.path(), &storage.stats()?, cmd.json)?);
            Ok(())
        }
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate_for_serve()?;

    let database = config.database_path();
    let storage = Storage::open(&database)
        .with_context(|| format!("opening database {}", database.display()))?;
    info!("Using database {}", database.display());

    let notifier = SendGridNotifier::from_config(&config.mail)?;
    let state = AppState::new(
        SharedStorage::new(storage),
        Arc::new(notifier),
        config.event.clone(),
        config.listing.credentials()?,
    );

    web::serve(config.server.socket_addr(), state).await?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let shown = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen:             {}", shown.server.socket_addr());
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", shown.database_path().display());
                println!();
                println!("[Mail]");
                println!("  From:               {}", or_unset(shown.mail.from_email.as_deref()));
                println!("  API key:            {}", or_unset(shown.mail.api_key.as_deref()));
                println!("  API base URL:       {}", shown.mail.api_base_url);
                println!("  Timeout (secs):     {}", shown.mail.timeout_secs);
                println!();
                println!("[Event]");
                println!("  Name:               {}", shown.event.name);
                println!("  Banner:             {}", shown.event.banner_url);
                println!("  Attachment:         {}", shown.event.attachment_name);
                println!();
                println!("[Listing]");
                println!("  Username:           {}", or_unset(shown.listing.username.as_deref()));
                println!("  Password:           {}", or_unset(shown.listing.password.as_deref()));
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            let loaded = Config::load_from(Some(path))?;
            match loaded.validate_for_serve() {
                Ok(()) => println!("Configuration is valid."),
                Err(e) => println!("Configuration loads, but cannot serve: {e}"),
            }
        }
    }
    Ok(())
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}
