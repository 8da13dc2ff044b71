// Table view construction
//
// Pure function from (records, options) to the rows and columns to show.
// Order of operations:
//   1. service-type filter
//   2. reverse (newest record first)
//   3. callee placeholder rule (callee sort only)
//   4. explicit sort, stable
// The input slice is never modified.

use super::RenderOptions;
use crate::model::{Cdr, ServiceType, SortKey};
use std::cmp::Ordering;

/// Columns the CDR table can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Anum,
    Bnum,
    ServiceType,
    Usage,
    StartDateTime,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Anum => "Caller",
            Column::Bnum => "Callee",
            Column::ServiceType => "Service",
            Column::Usage => "Usage",
            Column::StartDateTime => "Start",
        }
    }

    /// Cell text for a record
    pub fn cell(&self, cdr: &Cdr) -> String {
        match self {
            Column::Id => cdr.id.to_string(),
            Column::Anum => cdr.anum.clone(),
            Column::Bnum => cdr.bnum.clone().unwrap_or_else(|| "—".to_string()),
            Column::ServiceType => cdr.service_type.to_ascii_uppercase(),
            Column::Usage => format!("{}", cdr.usage),
            Column::StartDateTime => cdr.start_date_time.clone(),
        }
    }
}

/// All columns
pub const FULL_COLUMNS: &[Column] = &[
    Column::Id,
    Column::Anum,
    Column::Bnum,
    Column::ServiceType,
    Column::Usage,
    Column::StartDateTime,
];

/// DATA sessions have no callee, so the column is dropped
pub const DATA_COLUMNS: &[Column] = &[
    Column::Id,
    Column::Anum,
    Column::ServiceType,
    Column::Usage,
    Column::StartDateTime,
];

pub const CALLEE_ADVISORY: &str =
    "ℹ️ DATA records have no callee number and are hidden while sorting by callee";

/// Rows and layout for one render
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: &'static [Column],
    pub rows: Vec<Cdr>,
    /// Set when the callee rule dropped records
    pub advisory: Option<String>,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            columns: FULL_COLUMNS,
            rows: Vec::new(),
            advisory: None,
        }
    }
}

pub fn columns_for(service: Option<ServiceType>) -> &'static [Column] {
    match service {
        Some(ServiceType::Data) => DATA_COLUMNS,
        _ => FULL_COLUMNS,
    }
}

/// Build the table for `records` under `options`
pub fn build_table(records: &[Cdr], options: &RenderOptions) -> TableView {
    let mut rows: Vec<Cdr> = records
        .iter()
        .filter(|r| match options.service_type {
            Some(service) => r.is_category(service),
            None => true,
        })
        .rev()
        .cloned()
        .collect();

    let mut advisory = None;
    if options.sort == Some(SortKey::Bnum) && data_callees_all_missing(&rows) {
        rows.retain(|r| !r.is_category(ServiceType::Data));
        advisory = Some(CALLEE_ADVISORY.to_string());
    }

    if let Some(key) = options.sort {
        sort_rows(&mut rows, key);
    }

    TableView {
        columns: columns_for(options.service_type),
        rows,
        advisory,
    }
}

/// True when there is at least one DATA record and none has a real callee
fn data_callees_all_missing(rows: &[Cdr]) -> bool {
    let mut data = rows.iter().filter(|r| r.is_category(ServiceType::Data)).peekable();
    data.peek().is_some() && data.all(|r| r.callee().is_none())
}

/// Sort the same way the backend's filtered endpoint does
pub fn sort_rows(rows: &mut [Cdr], key: SortKey) {
    match key {
        SortKey::Anum => rows.sort_by(|a, b| a.anum.cmp(&b.anum)),
        SortKey::Bnum => rows.sort_by(|a, b| {
            let a = a.bnum.as_deref().unwrap_or("");
            let b = b.bnum.as_deref().unwrap_or("");
            a.cmp(b)
        }),
        SortKey::Usage => {
            rows.sort_by(|a, b| b.usage.partial_cmp(&a.usage).unwrap_or(Ordering::Equal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::cdr;

    fn ids(view: &TableView) -> Vec<i64> {
        view.rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn newest_first_without_options() {
        let records = vec![cdr(1, "CALL", Some("a")), cdr(2, "SMS", Some("b"))];
        let view = build_table(&records, &RenderOptions::default());
        assert_eq!(ids(&view), vec![2, 1]);
        assert_eq!(view.columns, FULL_COLUMNS);
        assert_eq!(view.advisory, None);
    }

    #[test]
    fn data_filter_only_keeps_data_and_drops_callee_column() {
        let records = vec![
            cdr(1, "CALL", Some("a")),
            cdr(2, "data", None),
            cdr(3, "SMS", Some("b")),
            cdr(4, "DATA", None),
        ];
        let options = RenderOptions {
            service_type: Some(ServiceType::Data),
            ..Default::default()
        };
        let view = build_table(&records, &options);

        assert_eq!(ids(&view), vec![4, 2]);
        assert!(view.rows.iter().all(|r| r.is_category(ServiceType::Data)));
        assert!(!view.columns.contains(&Column::Bnum));
    }

    #[test]
    fn callee_sort_drops_data_when_all_callees_missing() {
        let records = vec![
            cdr(1, "CALL", Some("0793")),
            cdr(2, "DATA", None),
            cdr(3, "SMS", Some("0791")),
            cdr(4, "DATA", Some("null")),
        ];
        let snapshot = records.clone();
        let options = RenderOptions {
            sort: Some(SortKey::Bnum),
            ..Default::default()
        };
        let view = build_table(&records, &options);

        assert_eq!(ids(&view), vec![3, 1]);
        assert_eq!(view.advisory.as_deref(), Some(CALLEE_ADVISORY));
        assert_eq!(records, snapshot);
    }

    #[test]
    fn callee_sort_keeps_data_when_any_callee_present() {
        let records = vec![
            cdr(1, "CALL", Some("0793")),
            cdr(2, "DATA", None),
            cdr(3, "DATA", Some("0790")),
        ];
        let options = RenderOptions {
            sort: Some(SortKey::Bnum),
            ..Default::default()
        };
        let view = build_table(&records, &options);

        // Null callee sorts as empty string, first
        assert_eq!(ids(&view), vec![2, 3, 1]);
        assert_eq!(view.advisory, None);
    }

    #[test]
    fn callee_rule_needs_data_records() {
        let records = vec![cdr(1, "CALL", None), cdr(2, "SMS", Some("x"))];
        let options = RenderOptions {
            sort: Some(SortKey::Bnum),
            ..Default::default()
        };
        let view = build_table(&records, &options);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.advisory, None);
    }

    #[test]
    fn other_sorts_never_drop_rows() {
        let records = vec![cdr(1, "DATA", None), cdr(2, "CALL", Some("x"))];
        for sort in [SortKey::Anum, SortKey::Usage] {
            let options = RenderOptions {
                sort: Some(sort),
                ..Default::default()
            };
            let view = build_table(&records, &options);
            assert_eq!(view.rows.len(), 2);
            assert_eq!(view.advisory, None);
        }
    }

    #[test]
    fn usage_sort_is_descending_and_stable() {
        let mut a = cdr(1, "CALL", None);
        let mut b = cdr(2, "CALL", None);
        let mut c = cdr(3, "CALL", None);
        a.usage = 5.0;
        b.usage = 9.0;
        c.usage = 5.0;
        let options = RenderOptions {
            sort: Some(SortKey::Usage),
            ..Default::default()
        };
        let view = build_table(&[a, b, c], &options);
        // Reverse happens first, so among equal usage the newer record leads
        assert_eq!(ids(&view), vec![2, 3, 1]);
    }

    #[test]
    fn anum_sort_is_ascending() {
        let mut a = cdr(1, "CALL", None);
        let mut b = cdr(2, "CALL", None);
        a.anum = "0799".to_string();
        b.anum = "0711".to_string();
        let options = RenderOptions {
            sort: Some(SortKey::Anum),
            ..Default::default()
        };
        assert_eq!(ids(&build_table(&[a, b], &options)), vec![2, 1]);
    }
}
