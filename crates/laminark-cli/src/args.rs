use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "laminark", version, about = "Persistent-memory subsystem for an interactive coding assistant")]
pub struct Cli {
    /// Override the data directory (else `LAMINARK_PATH`, then the OS data dir).
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Override the project root used to derive the project tag (else
    /// `LAMINARK_PROJECT_ROOT`, then the hook event's own `cwd`).
    #[arg(long, global = true)]
    pub project_root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read one hook event as JSON from stdin and handle it (§6). This is
    /// the command a host's hook configuration invokes; it always exits 0.
    #[command(about = "Handle one hook IPC event read from stdin")]
    Hook,

    /// Start the background processor and curation loops and block until
    /// interrupted.
    #[command(about = "Run the classification and curation loops")]
    Serve,

    /// Report schema version and storage health.
    #[command(about = "Check schema version and storage health")]
    Doctor,

    /// Inspect the effective configuration.
    #[command(about = "Inspect the effective configuration")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective merged configuration as JSON.
    #[command(about = "Print the effective merged configuration")]
    Show,
}
