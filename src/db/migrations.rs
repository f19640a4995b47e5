use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `i` upgrades `user_version` `i` to `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;
    usize::try_from(version).with_context(|| format!("negative user_version {version}"))
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;
    let target = MIGRATIONS.len();

    if current > target {
        bail!("progress database is at schema {current}, newer than supported schema {target}");
    }
    if current == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (name, script) in &MIGRATIONS[current..] {
        tx.execute_batch(script)
            .with_context(|| format!("failed to apply {name}"))?;
    }
    tx.pragma_update(None, "user_version", target as i64)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    log::info!("Progress database migrated from schema {current} to {target}");
    Ok(())
}
