// Service-type charts
//
// Charts are owned by a sink (the TUI, or a logger in headless mode). The
// reconciler only talks to it through `ChartSink`: create a chart once per
// identifier, then mutate its dataset on every later render.

use crate::model::{Cdr, ServiceType};
use std::collections::HashMap;
use std::time::Instant;

/// Chart identifiers used by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartId {
    /// Counts of every category side by side
    Distribution,
    /// One category against the rest
    Category(ServiceType),
}

impl ChartId {
    pub fn all() -> Vec<ChartId> {
        let mut ids = vec![ChartId::Distribution];
        ids.extend(ServiceType::ALL.iter().map(|s| ChartId::Category(*s)));
        ids
    }

    pub fn title(&self) -> String {
        match self {
            ChartId::Distribution => "Service Distribution".to_string(),
            ChartId::Category(service) => format!("{} share", service),
        }
    }
}

/// Labelled numeric dataset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

/// Everything a sink needs to build a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub title: String,
    pub dataset: Dataset,
}

/// Rendering capability the reconciler draws through
pub trait ChartSink {
    /// Build a new chart for `id`
    fn create(&mut self, id: ChartId, spec: &ChartSpec);

    /// Replace the dataset of an existing chart and redraw it
    fn update(&mut self, id: ChartId, data: &Dataset);
}

/// Bookkeeping for a chart the sink has built
#[derive(Debug, Clone, Copy)]
pub struct ChartHandle {
    pub created_at: Instant,
    pub updates: u64,
}

/// Live chart handles keyed by identifier
///
/// The sink's `create` runs at most once per identifier for the lifetime of
/// this registry; every later draw is an `update`.
pub struct ChartInstances<S> {
    sink: S,
    handles: HashMap<ChartId, ChartHandle>,
}

impl<S: ChartSink> ChartInstances<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            handles: HashMap::new(),
        }
    }

    /// Create or update the chart for `id`
    pub fn draw(&mut self, id: ChartId, dataset: Dataset) {
        match self.handles.get_mut(&id) {
            Some(handle) => {
                handle.updates += 1;
                self.sink.update(id, &dataset);
            }
            None => {
                let spec = ChartSpec {
                    title: id.title(),
                    dataset,
                };
                self.sink.create(id, &spec);
                self.handles.insert(
                    id,
                    ChartHandle {
                        created_at: Instant::now(),
                        updates: 0,
                    },
                );
            }
        }
    }

    pub fn handle(&self, id: ChartId) -> Option<&ChartHandle> {
        self.handles.get(&id)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Record counts per known category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryCounts {
    counts: [u64; 3],
}

impl CategoryCounts {
    /// Count records by category; unknown categories are ignored
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Cdr>) -> Self {
        let mut counts = Self::default();
        for record in records {
            if let Some(service) = record.category() {
                counts.counts[service.index()] += 1;
            }
        }
        counts
    }

    pub fn get(&self, service: ServiceType) -> u64 {
        self.counts[service.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Share of `service` in percent; 0 when there is nothing to count
    pub fn percent(&self, service: ServiceType) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(service) as f64 / total as f64 * 100.0
    }

    /// Percentage rounded to one decimal, e.g. `42.9%`
    pub fn percent_label(&self, service: ServiceType) -> String {
        format!("{:.1}%", self.percent(service))
    }

    /// Info label shown under a category chart
    pub fn info_label(&self, service: ServiceType) -> String {
        format!(
            "{}: {} ({})",
            service,
            self.get(service),
            self.percent_label(service)
        )
    }

    /// Dataset for a chart
    pub fn dataset(&self, id: ChartId) -> Dataset {
        match id {
            ChartId::Distribution => Dataset {
                labels: ServiceType::ALL.iter().map(|s| s.to_string()).collect(),
                values: ServiceType::ALL.iter().map(|s| self.get(*s)).collect(),
            },
            ChartId::Category(service) => Dataset {
                labels: vec![service.to_string(), "Other".to_string()],
                values: vec![self.get(service), self.total() - self.get(service)],
            },
        }
    }
}

/// Sink that only logs, for headless mode
#[derive(Debug, Default)]
pub struct LogSink;

impl ChartSink for LogSink {
    fn create(&mut self, id: ChartId, spec: &ChartSpec) {
        tracing::debug!("Chart {:?} created: {:?}", id, spec.dataset);
    }

    fn update(&mut self, id: ChartId, data: &Dataset) {
        tracing::debug!("Chart {:?} updated: {:?}", id, data);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::model::fixtures::cdr;

    #[test]
    fn zero_total_gives_zero_percent_everywhere() {
        let counts = CategoryCounts::default();
        for service in ServiceType::ALL {
            assert_eq!(counts.percent_label(service), "0.0%");
            assert!(!counts.percent(service).is_nan());
        }
    }

    #[test]
    fn unknown_categories_do_not_count() {
        let records = vec![cdr(1, "FAX", None)];
        let counts = CategoryCounts::from_records(&records);
        assert_eq!(counts.total(), 0);
        assert_eq!(counts.percent_label(ServiceType::Call), "0.0%");
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let records = vec![
            cdr(1, "CALL", None),
            cdr(2, "CALL", None),
            cdr(3, "CALL", None),
            cdr(4, "sms", None),
            cdr(5, "SMS", None),
            cdr(6, "Data", None),
            cdr(7, "DATA", None),
        ];
        let counts = CategoryCounts::from_records(&records);
        assert_eq!(counts.percent_label(ServiceType::Call), "42.9%");
        assert_eq!(counts.percent_label(ServiceType::Sms), "28.6%");
        assert_eq!(counts.percent_label(ServiceType::Data), "28.6%");
        assert_eq!(counts.info_label(ServiceType::Call), "CALL: 3 (42.9%)");
    }

    #[test]
    fn category_dataset_is_share_against_rest() {
        let records = vec![cdr(1, "CALL", None), cdr(2, "SMS", None), cdr(3, "SMS", None)];
        let counts = CategoryCounts::from_records(&records);
        assert_eq!(
            counts.dataset(ChartId::Category(ServiceType::Sms)).values,
            vec![2, 1]
        );
        assert_eq!(counts.dataset(ChartId::Distribution).values, vec![1, 2, 0]);
    }

    #[test]
    fn second_draw_reuses_handle() {
        let mut charts = ChartInstances::new(RecordingSink::default());
        let counts = CategoryCounts::from_records(&[cdr(1, "CALL", None)]);

        charts.draw(ChartId::Distribution, counts.dataset(ChartId::Distribution));
        charts.draw(ChartId::Distribution, counts.dataset(ChartId::Distribution));

        assert_eq!(charts.sink().creates_for(ChartId::Distribution), 1);
        assert_eq!(charts.sink().updates_for(ChartId::Distribution), 1);
        assert_eq!(charts.handle(ChartId::Distribution).unwrap().updates, 1);
    }
}
