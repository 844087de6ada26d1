//! Date and change-history formatters
//!
//! Both are plain values: build one and hand it to whatever renders dates.
//! Neither reads the clock; callers pass `now` where it matters.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::domain::HistoryChange;

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Formats dates for board listings
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatter;

impl DateFormatter {
    pub fn new() -> Self {
        Self
    }

    /// `Jan 15, 2024`
    pub fn format(&self, date: NaiveDate) -> String {
        date.format("%b %-d, %Y").to_string()
    }

    /// `Jan 15`
    pub fn format_short(&self, date: NaiveDate) -> String {
        date.format("%b %-d").to_string()
    }

    /// `15 de enero de 2024`
    pub fn format_long_es(&self, date: NaiveDate) -> String {
        format!(
            "{} de {} de {}",
            date.day(),
            SPANISH_MONTHS[date.month0() as usize],
            date.year()
        )
    }

    pub fn is_overdue(&self, due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        due < now
    }
}

/// Parse an API date: RFC 3339 timestamp or plain `YYYY-MM-DD`
pub fn parse_api_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// Renders card history changes as Spanish sentences
#[derive(Debug, Clone, Default)]
pub struct ChangesFormatter {
    dates: DateFormatter,
}

impl ChangesFormatter {
    pub fn new(dates: DateFormatter) -> Self {
        Self { dates }
    }

    pub fn format(&self, change: &HistoryChange) -> String {
        match change {
            HistoryChange::Comment { .. } => "Comentario eliminado".to_string(),
            HistoryChange::Customer { customer_name, .. } => {
                format!("Cliente cambiado a {}", customer_name)
            }
            HistoryChange::DueDate { old, new } => format!(
                "Fecha límite cambiada de {} a {}",
                self.date(old),
                self.date(new)
            ),
            HistoryChange::Name { old, new } => {
                format!("Nombre cambiado de \"{}\" a \"{}\"", old, new)
            }
            HistoryChange::Description { .. } => "Descripción actualizada".to_string(),
            HistoryChange::Date { old, new } => {
                format!("Fecha cambiada de {} a {}", self.date(old), self.date(new))
            }
            HistoryChange::Column {
                old_column_name,
                new_column_name,
                ..
            } => format!("Movida de \"{}\" a \"{}\"", old_column_name, new_column_name),
            HistoryChange::Priority { old, new } => {
                format!("Prioridad cambiada de \"{}\" a \"{}\"", old, new)
            }
            HistoryChange::Unknown => String::new(),
        }
    }

    fn date(&self, raw: &str) -> String {
        parse_api_date(raw)
            .map(|d| self.dates.format_long_es(d))
            .unwrap_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_formats() {
        let f = DateFormatter::new();
        assert_eq!(f.format(date(2024, 1, 5)), "Jan 5, 2024");
        assert_eq!(f.format_short(date(2024, 12, 25)), "Dec 25");
        assert_eq!(f.format_long_es(date(2024, 9, 30)), "30 de septiembre de 2024");
    }

    #[test]
    fn test_is_overdue() {
        let f = DateFormatter::new();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(f.is_overdue(Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap(), now));
        assert!(!f.is_overdue(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(), now));
    }

    #[test]
    fn test_parse_api_date() {
        assert_eq!(parse_api_date("2024-03-10"), Some(date(2024, 3, 10)));
        assert_eq!(parse_api_date("2024-03-10T23:00:00Z"), Some(date(2024, 3, 10)));
        assert_eq!(parse_api_date("mañana"), None);
    }

    #[test]
    fn test_format_changes() {
        let f = ChangesFormatter::new(DateFormatter::new());

        assert_eq!(
            f.format(&HistoryChange::Comment { comment_id: "c".into() }),
            "Comentario eliminado"
        );
        assert_eq!(
            f.format(&HistoryChange::DueDate {
                old: "2024-01-15".into(),
                new: "2024-02-01T10:00:00Z".into(),
            }),
            "Fecha límite cambiada de 15 de enero de 2024 a 1 de febrero de 2024"
        );
        assert_eq!(
            f.format(&HistoryChange::Name { old: "IVA".into(), new: "IVA T2".into() }),
            "Nombre cambiado de \"IVA\" a \"IVA T2\""
        );
        assert_eq!(
            f.format(&HistoryChange::Column {
                old_column_id: "c1".into(),
                old_column_name: "Pendiente".into(),
                new_column_id: "c2".into(),
                new_column_name: "En curso".into(),
            }),
            "Movida de \"Pendiente\" a \"En curso\""
        );
        assert_eq!(f.format(&HistoryChange::Unknown), "");
    }

    #[test]
    fn test_unparseable_dates_are_echoed() {
        let f = ChangesFormatter::default();
        assert_eq!(
            f.format(&HistoryChange::Date { old: "ayer".into(), new: "2024-01-01".into() }),
            "Fecha cambiada de ayer a 1 de enero de 2024"
        );
    }
}
