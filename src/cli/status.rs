use std::path::Path;

use anyhow::Result;
use sqlembed::db;
use sqlembed::semantic::status::table_status;

/// Display embedding coverage for every table in the database.
pub fn status(db_path: &Path) -> Result<()> {
    let conn = db::open_database(db_path)?;
    let tables = table_status(&conn)?;

    println!("Embedding Status: {}", db_path.display());
    println!("{}", "=".repeat(40));
    if tables.is_empty() {
        println!("  (no tables)");
        return Ok(());
    }

    for table in &tables {
        println!("{:<24} {} rows", table.table, table.rows);
        if !table.searchable() {
            println!("  not enriched");
            continue;
        }
        for column in &table.columns {
            println!(
                "  {:<32} {}/{}",
                column.model, column.embedded_rows, table.rows
            );
        }
    }

    Ok(())
}
