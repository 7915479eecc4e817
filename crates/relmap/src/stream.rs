//! Consuming driver row streams.
//!
//! Drivers hand rows over one at a time through [`RowSource`]. Mapping is
//! synchronous; the only suspension point is pulling the next row.

use std::collections::VecDeque;
use std::future::Future;

use asupersync::{Cx, Outcome};

use relmap_core::{Error, Row};

use crate::row_mapper::RowMapper;

/// A stream of rows produced by a driver.
pub trait RowSource: Send {
    /// Pull the next row, or `None` when the result set is exhausted.
    fn next_row(&mut self, cx: &Cx) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    rows: VecDeque<Row>,
    pulled: usize,
}

impl VecRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
            pulled: 0,
        }
    }

    /// Number of rows handed out so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self, cx: &Cx) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let next = if let Some(reason) = cx.cancel_reason() {
            Outcome::Cancelled(reason)
        } else {
            let row = self.rows.pop_front();
            if row.is_some() {
                self.pulled += 1;
            }
            Outcome::Ok(row)
        };
        async move { next }
    }
}

/// Map every row of `source` with `mapper`.
///
/// Stops pulling at the first mapping error, driver error or cancellation;
/// rows mapped before the failure are discarded.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn map_rows<T, S, M>(cx: &Cx, source: &mut S, mapper: &M) -> Outcome<Vec<T>, Error>
where
    S: RowSource,
    M: RowMapper<T> + ?Sized,
{
    let mut mapped = Vec::new();
    loop {
        if let Some(reason) = cx.cancel_reason() {
            tracing::debug!(mapped = mapped.len(), "Row stream cancelled");
            return Outcome::Cancelled(reason);
        }

        let row = match source.next_row(cx).await {
            Outcome::Ok(Some(row)) => row,
            Outcome::Ok(None) => break,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        match mapper.map_row(&row, row.metadata()) {
            Ok(value) => mapped.push(value),
            Err(e) => {
                tracing::debug!(mapped = mapped.len(), error = %e, "Row mapping failed");
                return Outcome::Err(e);
            }
        }
    }

    tracing::trace!(rows = mapped.len(), "Row stream exhausted");
    Outcome::Ok(mapped)
}
