// Filter controller
//
// Turns selector changes into either a backend re-query or a local re-render
// of the held collection. The date selector never reaches the backend since it
// only narrows what the charts count.

use crate::api::FilteredQuery;
use crate::dashboard::RenderOptions;
use crate::model::{ServiceType, SortKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where filtering and sorting happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Re-sort and re-filter the held collection locally
    #[default]
    Client,
    /// Ask `/api/cdrs/filtered` for the view
    Server,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Client => f.write_str("client"),
            FilterMode::Server => f.write_str("server"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(FilterMode::Client),
            "server" => Ok(FilterMode::Server),
            other => Err(format!("unknown filter mode: {}", other)),
        }
    }
}

/// Date selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    /// Records whose start date is the local calendar day
    Today,
}

impl DateFilter {
    pub fn label(&self) -> &'static str {
        match self {
            DateFilter::All => "All dates",
            DateFilter::Today => "Today",
        }
    }
}

/// A change made in one of the selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSelection {
    FilterBy(Option<SortKey>),
    ServiceType(Option<ServiceType>),
    Date(DateFilter),
}

/// What the dashboard has to do after a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Fetch this view from the backend, then render it
    Requery(FilteredQuery),
    /// Render the held collection again with the new options
    Rerender,
}

#[derive(Debug, Clone, Default)]
pub struct FilterController {
    mode: FilterMode,
    options: RenderOptions,
}

impl FilterController {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            options: RenderOptions::default(),
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Current backend query for the sort and service selectors
    pub fn query(&self) -> FilteredQuery {
        FilteredQuery {
            sort: self.options.sort,
            service_type: self.options.service_type,
        }
    }

    /// Record a selection and decide how to apply it
    pub fn select(&mut self, selection: FilterSelection) -> FilterAction {
        match selection {
            FilterSelection::FilterBy(sort) => self.options.sort = sort,
            FilterSelection::ServiceType(service) => self.options.service_type = service,
            FilterSelection::Date(date) => {
                self.options.date = date;
                return FilterAction::Rerender;
            }
        }

        let query = self.query();
        match self.mode {
            FilterMode::Server if !query.is_empty() => FilterAction::Requery(query),
            _ => FilterAction::Rerender,
        }
    }

    /// Advance the filter-by selector: none, caller, callee, usage
    pub fn cycle_sort(&mut self) -> FilterAction {
        let next = match self.options.sort {
            None => Some(SortKey::Anum),
            Some(SortKey::Anum) => Some(SortKey::Bnum),
            Some(SortKey::Bnum) => Some(SortKey::Usage),
            Some(SortKey::Usage) => None,
        };
        self.select(FilterSelection::FilterBy(next))
    }

    /// Advance the service selector: all, then each category
    pub fn cycle_service(&mut self) -> FilterAction {
        let next = match self.options.service_type {
            None => Some(ServiceType::Call),
            Some(ServiceType::Call) => Some(ServiceType::Sms),
            Some(ServiceType::Sms) => Some(ServiceType::Data),
            Some(ServiceType::Data) => None,
        };
        self.select(FilterSelection::ServiceType(next))
    }

    pub fn toggle_date(&mut self) -> FilterAction {
        let next = match self.options.date {
            DateFilter::All => DateFilter::Today,
            DateFilter::Today => DateFilter::All,
        };
        self.select(FilterSelection::Date(next))
    }

    /// Back to the unfiltered view
    pub fn reset(&mut self) -> FilterAction {
        self.options = RenderOptions::default();
        FilterAction::Rerender
    }
}
