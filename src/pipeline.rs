//! Pipeline Module
//! Typed datasets, the `Dashboard` contract and memoized, latest-wins sessions.

use crate::data::{NormalizeReport, NormalizedRecord, RawRecord, Schema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A dashboard row type built from a normalized record.
pub trait TypedRow: Sized + Send + Sync {
    /// Columns this dashboard reads, with their types and which are required.
    fn schema() -> Schema;

    /// Build the typed row. Derived fields (fiscal rank, month labels) are computed here.
    /// A `None` is counted in the normalization report as a `RowType` exclusion.
    fn from_record(record: &NormalizedRecord) -> Option<Self>;
}

/// One dashboard: a pure function of (rows, filter options) to a serializable result.
pub trait Dashboard {
    const NAME: &'static str;
    type Row: TypedRow;
    /// Plain options object from the UI; missing keys mean "All".
    type Filters: Serialize + DeserializeOwned + Default + Clone + Send;
    type Output: Serialize + Clone + Send;

    fn compute(rows: &[Self::Row], filters: &Self::Filters) -> Self::Output;
}

/// Immutable snapshot of typed rows plus the report of how they were normalized.
#[derive(Debug)]
pub struct Dataset<R> {
    rows: Arc<[R]>,
    report: NormalizeReport,
}

impl<R> Clone for Dataset<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            report: self.report.clone(),
        }
    }
}

impl<R: TypedRow> Dataset<R> {
    /// Normalize raw rows once; every later recompute reads this snapshot.
    pub fn from_raw(raw: &[RawRecord]) -> Self {
        let normalized = R::schema().normalize(raw);
        let rows: Vec<R> = normalized
            .records
            .iter()
            .filter_map(R::from_record)
            .collect();
        let mut report = normalized.report;
        let rejected = normalized.records.len() - rows.len();
        if rejected > 0 {
            warn!(rejected, "normalized records rejected by row type");
            report.reject_rows(rejected);
        }
        Self {
            rows: rows.into(),
            report,
        }
    }
}

impl<R> Dataset<R> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Identifies one requested recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out tickets and only accepts results for the most recently issued one.
#[derive(Debug, Default)]
pub struct RecomputeGate {
    issued: u64,
}

impl RecomputeGate {
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }
}

/// A recompute detached from its session, so it can run elsewhere (another thread,
/// after an asynchronous load) and be published back later.
pub struct Recompute<D: Dashboard> {
    ticket: Ticket,
    key: Option<String>,
    filters: D::Filters,
    data: Dataset<D::Row>,
}

impl<D: Dashboard> Recompute<D> {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn run(self) -> Finished<D> {
        let output = D::compute(self.data.rows(), &self.filters);
        Finished {
            ticket: self.ticket,
            key: self.key,
            output,
        }
    }
}

pub struct Finished<D: Dashboard> {
    ticket: Ticket,
    key: Option<String>,
    output: D::Output,
}

/// Holds one dashboard's dataset and its most recent published output.
pub struct Session<D: Dashboard> {
    data: Dataset<D::Row>,
    memo: HashMap<String, D::Output>,
    gate: RecomputeGate,
    current: Option<D::Output>,
}

impl<D: Dashboard> Session<D> {
    pub fn new(data: Dataset<D::Row>) -> Self {
        Self {
            data,
            memo: HashMap::new(),
            gate: RecomputeGate::default(),
            current: None,
        }
    }

    pub fn from_raw(raw: &[RawRecord]) -> Self {
        Self::new(Dataset::from_raw(raw))
    }

    pub fn data(&self) -> &Dataset<D::Row> {
        &self.data
    }

    /// Last output accepted by the gate.
    pub fn current(&self) -> Option<&D::Output> {
        self.current.as_ref()
    }

    pub fn cached(&self) -> usize {
        self.memo.len()
    }

    fn memo_key(filters: &D::Filters) -> Option<String> {
        match serde_json::to_string(filters) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(dashboard = D::NAME, error = %e, "filters not memoizable");
                None
            }
        }
    }

    /// Start a recompute for `filters`. Any recompute requested earlier becomes stale.
    pub fn request(&mut self, filters: &D::Filters) -> Recompute<D> {
        Recompute {
            ticket: self.gate.begin(),
            key: Self::memo_key(filters),
            filters: filters.clone(),
            data: self.data.clone(),
        }
    }

    /// Publish a finished recompute. Returns `false`, leaving the current output
    /// untouched, when a newer recompute has been requested since.
    pub fn publish(&mut self, finished: Finished<D>) -> bool {
        if let Some(key) = finished.key {
            self.memo.insert(key, finished.output.clone());
        }
        if !self.gate.is_latest(finished.ticket) {
            debug!(
                dashboard = D::NAME,
                ticket = finished.ticket.0,
                latest = self.gate.issued,
                "discarding stale recompute"
            );
            return false;
        }
        self.current = Some(finished.output);
        true
    }

    /// Synchronous recompute: served from the memo when these filters were seen before.
    pub fn apply(&mut self, filters: &D::Filters) -> D::Output {
        let job = self.request(filters);
        if let Some(hit) = job.key.as_ref().and_then(|k| self.memo.get(k)) {
            debug!(dashboard = D::NAME, "memoized result");
            let output = hit.clone();
            self.current = Some(output.clone());
            return output;
        }
        let finished = job.run();
        let output = finished.output.clone();
        self.publish(finished);
        output
    }
}
