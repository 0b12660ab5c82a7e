use crate::domain::analysis::ResultRow;
use crate::domain::pipeline_config::RestrictedColumns;

/// Strips restricted columns from result rows, whichever table they came
/// from. Removes keys only, so the row count is never affected.
#[derive(Debug, Clone)]
pub struct FieldRedactor {
    restricted: RestrictedColumns,
}

impl FieldRedactor {
    pub fn new(restricted: RestrictedColumns) -> Self {
        Self { restricted }
    }

    pub fn redact(&self, rows: Vec<ResultRow>) -> Vec<ResultRow> {
        rows.into_iter().map(|row| self.redact_row(row)).collect()
    }

    pub fn redact_row(&self, row: ResultRow) -> ResultRow {
        row.into_iter()
            .filter(|(column, _)| !self.restricted.contains(column))
            .collect()
    }
}
