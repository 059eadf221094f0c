// CLI module - command-line argument parsing and handlers
//
// Running with no subcommand starts the control plane. Subcommands:
// - config --show: Display effective configuration
// - config --path: Show config file path

use clap::{Parser, Subcommand};

use crate::config::{Config, VERSION};

/// Switchyard - blue/green deployment control plane for search indices
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(version = VERSION)]
#[command(about = "Blue/green deployment control plane for search indices", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli() -> bool {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { show, path }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show();
            } else {
                println!("Usage: switchyard config [--show|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --path    Show config file path");
            }
            true
        }
        None => false, // No subcommand, run the server
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() {
    let config = Config::from_env();

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("bind_addr = {:?}", config.bind_addr.to_string());
    println!("elasticsearch_url = {:?}", config.elasticsearch_url);
    println!(
        "elasticsearch_api_key = {}",
        if config.elasticsearch_api_key.is_some() {
            "(set)"
        } else {
            "(unset)"
        }
    );
    println!("default_alias = {:?}", config.default_alias);
    println!("log_level = {:?}", config.log_level);

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}
