use anyhow::Result;

use laminark_core::{discover_project_root, load_config, project_tag_from_root, resolve_data_dir};

use crate::args::{Cli, Commands, ConfigCommand};
use crate::handlers;

/// Dispatch one CLI invocation. `hook` never returns an error — any
/// internal failure is logged and swallowed there, per §7's rule that a
/// failed capture must never surface to the host.
pub fn run(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    std::fs::create_dir_all(&data_dir)?;

    match cli.command {
        Commands::Hook => {
            handlers::hook::handle(&data_dir, cli.project_root.as_deref());
            Ok(())
        }
        Commands::Serve => {
            let project_root = discover_project_root(cli.project_root.as_deref(), None)?;
            let project_tag = project_tag_from_root(&project_root.display().to_string());
            let config = load_config(&data_dir)?;
            handlers::serve::handle(&data_dir, &config, project_tag)
        }
        Commands::Doctor => handlers::doctor::handle(&data_dir),
        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                let config = load_config(&data_dir)?;
                handlers::config::handle_show(&config)
            }
        },
    }
}
