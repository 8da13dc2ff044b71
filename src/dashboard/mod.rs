//! Reconciler - turns a CDR collection into table rows and chart data
//!
//! Every render recomputes the whole table from scratch but keeps chart
//! handles alive across renders, so charts are mutated in place instead of
//! being torn down and rebuilt. Rows whose id was not part of the previous
//! render are marked "new" for a short while.

pub mod charts;
pub mod table;

pub use charts::{CategoryCounts, ChartId, ChartSink, ChartSpec, Dataset, LogSink};
pub use table::{Column, TableView};

use charts::ChartInstances;

use crate::filter::DateFilter;
use crate::model::{Cdr, ServiceType, SortKey};
use chrono::{Local, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// How long a newly seen row stays highlighted
pub const NEW_ROW_TTL: Duration = Duration::from_millis(1500);

/// Options applied on top of the held collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub sort: Option<SortKey>,
    pub service_type: Option<ServiceType>,
    /// Only narrows the chart input, never the table
    pub date: DateFilter,
}

/// Summary of one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub rows: usize,
    pub new_rows: usize,
    /// Advisory to show once for this render
    pub advisory: Option<String>,
}

pub struct Reconciler<S> {
    charts: ChartInstances<S>,
    table: TableView,
    counts: CategoryCounts,
    /// Record ids seen by the previous render
    seen_ids: HashSet<i64>,
    /// Highlighted ids and when their highlight ends
    fresh: HashMap<i64, Instant>,
    new_row_ttl: Duration,
}

impl<S: ChartSink> Reconciler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            charts: ChartInstances::new(sink),
            table: TableView::default(),
            counts: CategoryCounts::default(),
            seen_ids: HashSet::new(),
            fresh: HashMap::new(),
            new_row_ttl: NEW_ROW_TTL,
        }
    }

    pub fn render(&mut self, records: &[Cdr], options: &RenderOptions) -> RenderReport {
        self.render_at(records, options, Instant::now(), Local::now().date_naive())
    }

    /// Render with an explicit clock, for tests
    pub fn render_at(
        &mut self,
        records: &[Cdr],
        options: &RenderOptions,
        now: Instant,
        today: NaiveDate,
    ) -> RenderReport {
        self.prune_expired(now);

        let view = table::build_table(records, options);

        let mut new_rows = 0;
        for row in &view.rows {
            if !self.seen_ids.contains(&row.id) {
                self.fresh.insert(row.id, now + self.new_row_ttl);
                new_rows += 1;
            }
        }
        self.seen_ids = records.iter().map(|r| r.id).collect();

        self.counts = match options.date {
            DateFilter::All => CategoryCounts::from_records(records),
            DateFilter::Today => CategoryCounts::from_records(
                records.iter().filter(|r| r.start_date() == Some(today)),
            ),
        };
        for id in ChartId::all() {
            self.charts.draw(id, self.counts.dataset(id));
        }

        let report = RenderReport {
            rows: view.rows.len(),
            new_rows,
            advisory: view.advisory.clone(),
        };
        self.table = view;

        tracing::debug!(
            "Rendered {} rows ({} new) from {} records",
            report.rows,
            report.new_rows,
            records.len()
        );
        report
    }

    /// True while the row's "new" highlight is active
    pub fn is_new(&self, id: i64, now: Instant) -> bool {
        self.fresh.get(&id).is_some_and(|until| *until > now)
    }

    /// Drop highlights that have run out; true if any were dropped
    pub fn prune_expired(&mut self, now: Instant) -> bool {
        let before = self.fresh.len();
        self.fresh.retain(|_, until| *until > now);
        self.fresh.len() != before
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn counts(&self) -> &CategoryCounts {
        &self.counts
    }

    /// Info labels under the per-category charts
    pub fn labels(&self) -> Vec<String> {
        ServiceType::ALL
            .iter()
            .map(|s| self.counts.info_label(*s))
            .collect()
    }

    pub fn sink(&self) -> &S {
        self.charts.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.charts.sink_mut()
    }
}
