// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `somnia status` command implementation.
//!
//! Opens the configured database and prints row counts for the main
//! tables plus queue depth, as a quick health view.

use somnia_config::SomniaConfig;
use somnia_core::SomniaError;
use somnia_storage::Database;

/// Row counts gathered for the status view.
#[derive(Debug)]
struct Counts {
    users: i64,
    dreams: i64,
    images_completed: i64,
    images_failed: i64,
    symbols: i64,
    archetypes: i64,
    emotions: i64,
    queue_pending: i64,
    queue_failed: i64,
}

/// Run the `somnia status` command.
pub async fn run_status(config: &SomniaConfig) -> Result<(), SomniaError> {
    let db = Database::open(&config.storage.database_path).await?;
    let counts = gather_counts(&db).await?;
    db.close().await?;

    println!("somnia status");
    println!("  database:   {}", config.storage.database_path);
    println!("  users:      {}", counts.users);
    println!(
        "  dreams:     {} ({} illustrated, {} failed images)",
        counts.dreams, counts.images_completed, counts.images_failed
    );
    println!(
        "  catalog:    {} symbols, {} archetypes, {} emotions",
        counts.symbols, counts.archetypes, counts.emotions
    );
    println!(
        "  queue:      {} pending, {} failed",
        counts.queue_pending, counts.queue_failed
    );
    Ok(())
}

async fn gather_counts(db: &Database) -> Result<Counts, SomniaError> {
    db.connection()
        .call(|conn| {
            let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
            Ok(Counts {
                users: count("SELECT COUNT(*) FROM users")?,
                dreams: count("SELECT COUNT(*) FROM dreams")?,
                images_completed: count(
                    "SELECT COUNT(*) FROM dreams WHERE image_status = 'completed'",
                )?,
                images_failed: count(
                    "SELECT COUNT(*) FROM dreams WHERE image_status = 'failed'",
                )?,
                symbols: count("SELECT COUNT(*) FROM symbols")?,
                archetypes: count("SELECT COUNT(*) FROM archetypes")?,
                emotions: count("SELECT COUNT(*) FROM emotions")?,
                queue_pending: count("SELECT COUNT(*) FROM queue WHERE status = 'pending'")?,
                queue_failed: count("SELECT COUNT(*) FROM queue WHERE status = 'failed'")?,
            })
        })
        .await
        .map_err(somnia_storage::database::map_tr_err)
}
