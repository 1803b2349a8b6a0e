use std::path::Path;

use anyhow::Result;

use laminark_storage::Store;

const DB_FILE_NAME: &str = "db.sqlite";

/// Opens the store (running any pending migrations) and reports its
/// schema version and journal mode.
pub fn handle(data_dir: &Path) -> Result<()> {
    let store = Store::open(&data_dir.join(DB_FILE_NAME))?;
    let health = store.health()?;

    println!("data dir:        {}", data_dir.display());
    println!("schema version:  {} (latest known: {})", health.schema_version, health.latest_known_version);
    println!("journal mode:    {}", health.journal_mode);
    println!("status:          {}", if health.is_current() { "ok" } else { "pending migration" });

    Ok(())
}
