use crate::catalog::{Catalog, Session};
use crate::storage::{SnapshotError, SnapshotResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a snapshot: a JSON array of sessions
pub fn load_snapshot(path: &Path) -> SnapshotResult<Vec<Session>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SnapshotError::MissingFile(path.display().to_string()),
        _ => SnapshotError::Io(e),
    })?;

    let sessions: Vec<Session> = serde_json::from_reader(BufReader::new(file))?;
    Ok(sessions)
}

/// Writes sessions as a pretty-printed JSON array, ordered by identifier
pub fn save_snapshot(path: &Path, sessions: &[Session]) -> SnapshotResult<()> {
    let mut sorted: Vec<&Session> = sessions.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &sorted)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Saved {} sessions to {}", sorted.len(), path.display());
    Ok(())
}

/// Populates the catalog from a snapshot and marks it ready
///
/// No page is fetched. A missing or corrupt snapshot is returned as an error
/// and the catalog is left unready, since there is no other data source.
pub fn load_offline(catalog: &Catalog, path: &Path) -> SnapshotResult<usize> {
    tracing::info!("Running in offline mode, loading sessions from {}", path.display());

    let sessions = load_snapshot(path)?;
    tracing::info!("Loaded {} sessions from file", sessions.len());
    for session in &sessions {
        tracing::debug!("Added session {}: {}", session.id, session.title);
    }

    let total = catalog.store().put_all(sessions);
    tracing::info!("Total sessions in catalog: {}", total);
    catalog.mark_ready();

    Ok(total)
}
