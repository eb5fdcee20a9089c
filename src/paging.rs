//! Offset-based pagination over a paged remote report.

use std::error::Error as StdError;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::guard::{FailureDetail, guard};
use crate::run_log::RunLog;

/// One table of delimited rows as returned by a single report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBatch {
    #[serde(default)]
    pub name: String,
    /// Header labels, already joined with the report delimiter.
    pub columns: String,
    #[serde(default)]
    pub rows: Vec<String>,
}

impl RowBatch {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// All batches of one fetch, in the order they were read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagedResultSet {
    batches: Vec<RowBatch>,
    total_rows: u64,
}

impl PagedResultSet {
    pub fn push(&mut self, batch: RowBatch) {
        self.total_rows += batch.rows.len() as u64;
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[RowBatch] {
        &self.batches
    }

    #[cfg(test)]
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

/// Read every page of a remote result set.
///
/// `page` receives `(offset, limit)`. Each call goes through [`guard`] with
/// `retries`; a terminal failure aborts the whole fetch so callers never see
/// partial data. A page whose last batch holds fewer than `page_size` rows
/// ends the fetch, so a result set that is an exact multiple of `page_size`
/// costs one extra, empty page. Zero-row batches are not kept.
pub async fn fetch_all<E, F, Fut>(
    log: &mut RunLog,
    label: &str,
    page_size: u32,
    retries: u32,
    mut page: F,
) -> Result<PagedResultSet, FailureDetail>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<RowBatch>, E>>,
    E: StdError,
{
    let page_size = page_size.max(1);
    let mut result = PagedResultSet::default();
    let mut offset = 0u32;

    loop {
        log.note(format!("Retrieving {page_size} records from offset {offset}"));
        let batches = guard(log, label, retries, || page(offset, page_size)).await?;

        let last_rows = batches.last().map_or(0, RowBatch::row_count);
        for batch in batches.into_iter().filter(|b| !b.rows.is_empty()) {
            result.push(batch);
        }

        if last_rows < page_size as usize {
            break;
        }
        offset = offset.saturating_add(page_size);
    }

    log.note(format!(
        "{label} added {} tables with a total of {} records",
        result.batches.len(),
        result.total_rows
    ));
    Ok(result)
}
