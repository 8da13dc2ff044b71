/// Width breakpoints for dashboard layout decisions.
///
/// Widgets ask for a breakpoint instead of comparing raw column counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Breakpoint {
    /// < 60 cols: short selector labels, short key hints
    Compact,
    /// 60-99 cols: full selector labels, gauges only
    Normal,
    /// 100+ cols: distribution chart next to the gauges, full key hints
    Wide,
}

impl Breakpoint {
    pub fn from_width(width: u16) -> Self {
        match width {
            0..=59 => Breakpoint::Compact,
            60..=99 => Breakpoint::Normal,
            _ => Breakpoint::Wide,
        }
    }

    /// Check if at least this breakpoint (inclusive)
    pub fn at_least(&self, min: Breakpoint) -> bool {
        *self >= min
    }
}
