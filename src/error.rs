use thiserror::Error;

/// Failures while reading one source table.
///
/// Each variant halts the table it was raised for, never the whole run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {table} table: {source}")]
    Io {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: &'static str },

    #[error("{table} table has no header row")]
    EmptyTable { table: &'static str },
}

/// Failures that abort report generation for a single tenant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("site inventory was not loaded")]
    MissingInventory,

    #[error("event log was not loaded")]
    MissingEvents,
}
