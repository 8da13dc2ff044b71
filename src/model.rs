//! CDR record shape as served by the backend
//!
//! Records are consumed as-is. The only interpretation done here is
//! case-insensitive service categorisation, callee placeholder detection and
//! pulling the date prefix out of `startDateTime`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Callee values the loader writes when a record has no counterpart number
const CALLEE_PLACEHOLDERS: [&str; 4] = ["", "null", "n/a", "-"];

/// A single call detail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdr {
    pub id: i64,
    pub anum: String,
    #[serde(default)]
    pub bnum: Option<String>,
    /// Raw category as sent on the wire (any casing)
    pub service_type: String,
    pub usage: f64,
    pub start_date_time: String,
}

impl Cdr {
    /// Known service category, if the wire value matches one
    pub fn category(&self) -> Option<ServiceType> {
        self.service_type.parse().ok()
    }

    pub fn is_category(&self, service: ServiceType) -> bool {
        self.category() == Some(service)
    }

    /// Callee number, or None when missing or a placeholder
    pub fn callee(&self) -> Option<&str> {
        let bnum = self.bnum.as_deref()?.trim();
        let lower = bnum.to_ascii_lowercase();
        if CALLEE_PLACEHOLDERS.contains(&lower.as_str()) {
            None
        } else {
            Some(bnum)
        }
    }

    /// Calendar date from the ISO prefix of `startDateTime`
    pub fn start_date(&self) -> Option<NaiveDate> {
        let prefix = self.start_date_time.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

/// Service categories the dashboard charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    Call,
    Sms,
    Data,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Call, ServiceType::Sms, ServiceType::Data];

    /// Canonical wire / query-string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Call => "CALL",
            ServiceType::Sms => "SMS",
            ServiceType::Data => "DATA",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ServiceType::Call => 0,
            ServiceType::Sms => 1,
            ServiceType::Data => 2,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" => Ok(ServiceType::Call),
            "SMS" => Ok(ServiceType::Sms),
            "DATA" => Ok(ServiceType::Data),
            other => Err(format!("unknown service type: {}", other)),
        }
    }
}

/// Sort keys understood by both the backend and the local renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Anum,
    Bnum,
    Usage,
}

impl SortKey {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::Anum => "anum",
            SortKey::Bnum => "bnum",
            SortKey::Usage => "usage",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Anum => "Caller",
            SortKey::Bnum => "Callee",
            SortKey::Usage => "Usage",
        }
    }
}
