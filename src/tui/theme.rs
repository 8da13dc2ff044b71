// Theme for the TUI
//
// One palette for every widget. Category colors are shared by the table's
// service column and the charts so a category reads the same everywhere.

use crate::logging::LogLevel;
use crate::model::ServiceType;
use crate::poller::StatusKind;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

#[derive(Debug, Clone)]
pub struct Theme {
    pub fg: Color,
    pub border: Color,
    pub border_type: BorderType,
    pub title: Color,
    pub muted: Color,

    /// Background of rows seen for the first time
    pub new_row_bg: Color,
    pub header: Color,

    pub info: Color,
    pub success: Color,
    pub error: Color,

    pub live: Color,

    pub call: Color,
    pub sms: Color,
    pub data: Color,

    pub log_error: Color,
    pub log_warn: Color,
    pub log_info: Color,
    pub log_debug: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            border: Color::Gray,
            border_type: BorderType::Rounded,
            title: Color::Cyan,
            muted: Color::DarkGray,
            new_row_bg: Color::Rgb(40, 70, 50),
            header: Color::Yellow,
            info: Color::Cyan,
            success: Color::Green,
            error: Color::Red,
            live: Color::LightGreen,
            call: Color::Rgb(130, 170, 255),
            sms: Color::Rgb(255, 200, 120),
            data: Color::Rgb(190, 140, 255),
            log_error: Color::Red,
            log_warn: Color::Yellow,
            log_info: Color::Gray,
            log_debug: Color::DarkGray,
        }
    }

    pub fn service(&self, service: ServiceType) -> Color {
        match service {
            ServiceType::Call => self.call,
            ServiceType::Sms => self.sms,
            ServiceType::Data => self.data,
        }
    }

    pub fn status(&self, kind: StatusKind) -> Style {
        let color = match kind {
            StatusKind::Info => self.info,
            StatusKind::Success => self.success,
            StatusKind::Error => self.error,
        };
        Style::default().fg(color)
    }

    pub fn log_level(&self, level: LogLevel) -> Style {
        match level {
            LogLevel::Error => Style::default()
                .fg(self.log_error)
                .add_modifier(Modifier::BOLD),
            LogLevel::Warn => Style::default().fg(self.log_warn),
            LogLevel::Info => Style::default().fg(self.log_info),
            LogLevel::Debug | LogLevel::Trace => Style::default().fg(self.log_debug),
        }
    }

    pub fn block_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}
