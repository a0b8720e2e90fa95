use std::{process, sync::Arc};

use clap::Parser;
use log::{error, info, LevelFilter};

use gdnotes::{App, Cli, Config, LogErrorSink, Workspace};

pub fn initialize_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match config_path.as_deref() {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                eprintln!("Error: {}", e);
                process::exit(2);
            }
        },
        None => Config::default(),
    };
    if let Some(root_dir) = cli.root_dir.clone() {
        config.root_dir = root_dir;
    }
    info!("Using workspace root {}", config.root_dir.display());

    let mut app = App::new(Workspace::new(config), Arc::new(LogErrorSink), cli.verbose);
    if let Err(e) = app.run(cli.command).await {
        match e.code() {
            Some(code) => eprintln!("Error [{}]: {}", code, e),
            None => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}
