use crate::{
    compute::mapping_for,
    data::{Error, Platform, Table},
};
use std::{fs::File, io::ErrorKind, path::Path};
use tracing::{debug, info};

/// Loads `file_name` from `data_dir`. A missing file is reported as
/// `Error::FileNotFound` rather than a bare I/O error.
pub(crate) fn load_data(data_dir: &Path, file_name: &str) -> Result<Table, Error> {
    let path = data_dir.join(file_name);
    let file = File::open(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::FileNotFound(path.clone()),
        _ => Error::Io(e),
    })?;
    let table = read_table(file)?;
    info!(file = %path.display(), rows = table.rows.len(), "loaded export");
    Ok(table)
}

/// Simple CSV importer; headers come from the first line, every field is trimmed.
pub(crate) fn read_table<R: std::io::Read>(reader: R) -> Result<Table, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
    Ok(Table { headers, rows })
}

/// Keeps the rows whose status is one of the platform's completed statuses.
/// Other rows are dropped without being reported.
pub(crate) fn filter_completed(table: Table, platform: Platform) -> Result<Table, Error> {
    let mapping = mapping_for(platform);
    let status = table.column_index(mapping.status_column)?;
    let total = table.rows.len();
    let rows: Vec<_> = table
        .rows
        .into_iter()
        .filter(|row| {
            row.get(status)
                .is_some_and(|value| mapping.completed.iter().any(|done| *done == value))
        })
        .collect();
    debug!(%platform, kept = rows.len(), dropped = total - rows.len(), "filtered on status");
    Ok(Table {
        headers: table.headers,
        rows,
    })
}
