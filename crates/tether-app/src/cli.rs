use clap::Parser;

/// Tether — terminal client for an agent-backed coding chat server.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about)]
pub struct Args {
    /// Server base URL override.
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Resume an existing session id instead of starting a new one.
    #[arg(long)]
    pub session: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
