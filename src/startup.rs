// Startup module - banner and structured startup logging

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Print the startup banner before the server takes over.
pub fn print_startup(config: &Config) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}Switchyard{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Blue/green deployment control plane for search indices{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Cluster {BOLD}{}{RESET}",
        config.elasticsearch_url
    );
    println!(
        "  {MAGENTA}▸{RESET} Listening on {BOLD}{}{RESET}",
        config.bind_addr
    );
    println!(
        "  {MAGENTA}▸{RESET} Default alias {BOLD}{}{RESET}",
        config.default_alias
    );
    println!();
}

/// Mirror the banner into the structured log stream.
pub fn log_startup(config: &Config) {
    tracing::info!(version = VERSION, "switchyard starting");
    tracing::info!(cluster = config.elasticsearch_url.as_str(), "cluster target");
    tracing::info!(bind_addr = %config.bind_addr, "http surface");
    tracing::info!(
        default_alias = config.default_alias.as_str(),
        "default alias"
    );
}
