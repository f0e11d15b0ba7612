//! CSV export of completed training.
//!
//! One row per logged set of every completed session, oldest session first.

use crate::identity::Caller;
use crate::store::Store;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    session_id: String,
    workout: String,
    exercise: String,
    set_number: u32,
    weight: f64,
    reps: u32,
    rpe: Option<u8>,
}

/// Rows for a client, if the caller may see them
fn collect_rows<S: Store>(store: &S, caller: &Caller, client_id: Uuid) -> Result<Vec<CsvRow>> {
    let Some(viewer) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        if viewer != client_id && !t.is_linked(viewer, client_id) {
            return Err(Error::NotFound("client".into()));
        }

        let mut logs = t.completed_logs(client_id);
        logs.reverse();

        let rows: Vec<CsvRow> = logs
            .into_iter()
            .flat_map(|log| {
                let workout = t
                    .workout(log.workout_id)
                    .map(|w| w.name.clone())
                    .unwrap_or_default();
                t.sets_for_log(log.id).into_iter().map(move |set| CsvRow {
                    date: log.date.format("%Y-%m-%d").to_string(),
                    session_id: log.id.to_string(),
                    workout: workout.clone(),
                    exercise: set.exercise_name.clone(),
                    set_number: set.set_number,
                    weight: set.weight,
                    reps: set.reps,
                    rpe: log.rpe,
                })
            })
            .collect();
        Ok(rows)
    })?
}

/// Write a client's completed sets as CSV; returns the number of rows
pub fn export_sets<S: Store, W: Write>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
    out: W,
) -> Result<usize> {
    let rows = collect_rows(store, caller, client_id)?;

    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Exported {} sets for client {}", rows.len(), client_id);
    Ok(rows.len())
}

/// Export to a file, replacing it atomically
pub fn export_sets_to_path<S: Store>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
    path: &Path,
) -> Result<usize> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let count = export_sets(store, caller, client_id, temp.as_file())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote export to {:?}", path);
    Ok(count)
}
