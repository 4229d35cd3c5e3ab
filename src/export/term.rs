use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::record::ClassRecord;
use crate::selection::weekday_index;
use crate::settings::TermSettings;

/// The template week every weekly recurrence starts from.
#[derive(Debug, Clone)]
pub struct Term {
    pub calendar_name: String,
    pub timezone: String,
    pub offset: FixedOffset,
    pub monday: NaiveDate,
    pub until: DateTime<Utc>,
    pub reminder_minutes: u32,
}

/// First occurrence of a class, in the term's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Term {
    pub fn new(settings: &TermSettings) -> Self {
        let offset = FixedOffset::east_opt(settings.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        let back = u64::from(settings.week_start.weekday().num_days_from_monday());
        let monday = settings
            .week_start
            .checked_sub_days(Days::new(back))
            .unwrap_or(settings.week_start);
        Self {
            calendar_name: settings.calendar_name.clone(),
            timezone: settings.timezone.clone(),
            offset,
            monday,
            until: settings.until,
            reminder_minutes: settings.reminder_minutes,
        }
    }

    /// Date of `day` within the template week.
    pub fn date_for(&self, day: &str) -> Option<NaiveDate> {
        let idx = weekday_index(day)?;
        self.monday.checked_add_days(Days::new(idx as u64))
    }

    /// `None` for an unknown day or a time that is not `HH:MM-HH:MM`.
    pub fn occurrence(&self, record: &ClassRecord) -> Option<Occurrence> {
        let date = self.date_for(&record.day)?;
        let (start, end) = parse_span(&record.time)?;
        Some(Occurrence { date, start, end })
    }

    pub fn local(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<FixedOffset>> {
        self.offset.from_local_datetime(&date.and_time(time)).single()
    }

    /// `UNTIL` value shared by every exported recurrence.
    pub fn until_stamp(&self) -> String {
        self.until.format("%Y%m%dT%H%M%SZ").to_string()
    }

    pub fn rrule(&self) -> String {
        format!("RRULE:FREQ=WEEKLY;UNTIL={}", self.until_stamp())
    }
}

fn parse_span(time: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = time.trim().split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    (end >= start).then_some((start, end))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn term() -> Term {
        Term::new(&TermSettings::default())
    }

    fn class(day: &str, time: &str) -> ClassRecord {
        ClassRecord {
            day: day.to_string(),
            time: time.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn template_week_dates() {
        let t = term();
        assert_eq!(t.date_for("Monday").unwrap().to_string(), "2026-03-09");
        assert_eq!(t.date_for("Sunday").unwrap().to_string(), "2026-03-15");
        assert!(t.date_for("").is_none());
    }

    #[test]
    fn week_start_aligns_to_monday() {
        let settings = TermSettings {
            week_start: NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            ..Default::default()
        };
        assert_eq!(Term::new(&settings).monday.to_string(), "2026-03-09");
    }

    #[test]
    fn occurrence_parses_span() {
        let occ = term().occurrence(&class("Wednesday", "18:00-18:50")).unwrap();
        assert_eq!(occ.date.to_string(), "2026-03-11");
        assert_eq!(occ.start.format("%H%M").to_string(), "1800");
        assert_eq!(occ.end.format("%H%M").to_string(), "1850");
    }

    #[test]
    fn unusable_times_have_no_occurrence() {
        let t = term();
        assert!(t.occurrence(&class("Monday", "")).is_none());
        assert!(t.occurrence(&class("Monday", "0900")).is_none());
        assert!(t.occurrence(&class("Monday", "09:00-09:50-10:40")).is_none());
        assert!(t.occurrence(&class("Monday", "10:00-09:00")).is_none());
        assert!(t.occurrence(&class("Someday", "09:00-09:50")).is_none());
    }

    #[test]
    fn local_times_carry_offset() {
        let t = term();
        let occ = t.occurrence(&class("Monday", "09:00-09:50")).unwrap();
        let start = t.local(occ.date, occ.start).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-09T09:00:00+05:00");
        assert_eq!(t.rrule(), "RRULE:FREQ=WEEKLY;UNTIL=20260517T180000Z");
    }
}
