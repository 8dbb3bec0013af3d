//! `DuckDB` connection handling.

use std::path::Path;

use ::duckdb::Connection;

/// Open (or create) the database file and apply session settings.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a valid database.
pub fn open_connection(path: &Path) -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open(path)?;
    configure_connection(&connection)?;
    Ok(connection)
}

/// Open a throwaway in-memory database with the same session settings.
///
/// # Errors
/// Returns an error if `DuckDB` fails to initialise.
pub fn open_in_memory() -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open_in_memory()?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    Ok(())
}
