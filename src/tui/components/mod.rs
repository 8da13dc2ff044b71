// Components module - UI building blocks
//
// Each component renders one region of the dashboard from `App`:
// - Title bar: name, live indicator, last update, user
// - Filter bar: the three selectors
// - CDR table: rows with new-row highlight
// - Charts panel: distribution and per-category share
// - Status bar: status message, key hints, uptime
// - Logs panel: captured log entries
// - Toast: short-lived overlay

pub mod cdr_table;
pub mod charts_panel;
pub mod filter_bar;
pub mod logs_panel;
pub mod status_bar;
pub mod title_bar;
pub mod toast;

pub use toast::Toast;
