//! iCalendar (RFC 5545) rendering of selected classes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::term::Term;
use crate::record::ClassRecord;

const PRODID: &str = "-//AITU Schedule Creator//EN";
const MAX_LINE_OCTETS: usize = 75;

/// One `VEVENT` per usable record. Records without a known day or a
/// parseable `HH:MM-HH:MM` span are skipped.
pub fn render_ics<'a, I>(records: I, term: &Term, stamp: DateTime<Utc>) -> String
where
    I: IntoIterator<Item = &'a ClassRecord>,
{
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".into(),
        "METHOD:PUBLISH".into(),
        format!("X-WR-CALNAME:{}", escape(&term.calendar_name)),
        format!("X-WR-TIMEZONE:{}", term.timezone),
    ];

    for record in records {
        let Some(occ) = term.occurrence(record) else {
            continue;
        };
        let date = occ.date.format("%Y%m%d");
        lines.extend([
            "BEGIN:VEVENT".into(),
            format!("UID:{}", Uuid::new_v4()),
            format!("DTSTAMP:{}", dtstamp),
            format!("DTSTART;TZID={}:{}T{}", term.timezone, date, occ.start.format("%H%M%S")),
            format!("DTEND;TZID={}:{}T{}", term.timezone, date, occ.end.format("%H%M%S")),
            term.rrule(),
            format!("SUMMARY:{}", escape(&record.discipline)),
            format!("LOCATION:{}", escape(&record.classroom)),
            format!("DESCRIPTION:{}", escape(&describe(record))),
            "BEGIN:VALARM".into(),
            "ACTION:DISPLAY".into(),
            "DESCRIPTION:Reminder".into(),
            format!("TRIGGER:-PT{}M", term.reminder_minutes),
            "END:VALARM".into(),
            "END:VEVENT".into(),
        ]);
    }
    lines.push("END:VCALENDAR".into());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold(line));
        out.push_str("\r\n");
    }
    out
}

/// Event body text shared with the remote calendar export.
pub fn describe(record: &ClassRecord) -> String {
    format!(
        "Group: {}\nType: {}\nLecturer: {}",
        record.group, record.kind, record.lecturer
    )
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Split into 75-octet physical lines; continuations start with a space.
/// Never splits inside a UTF-8 sequence.
fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if used + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            // The leading space counts toward the next line.
            used = 1;
        }
        out.push(c);
        used += len;
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TermSettings;
    use chrono::TimeZone;

    fn class(day: &str, time: &str, discipline: &str) -> ClassRecord {
        ClassRecord {
            group: "SE-2501".to_string(),
            day: day.to_string(),
            time: time.to_string(),
            discipline: discipline.to_string(),
            classroom: "C1.1.237".to_string(),
            kind: "Lecture".to_string(),
            lecturer: "Dr. Kim".to_string(),
            program: None,
        }
    }

    fn render(records: &[ClassRecord]) -> String {
        let term = Term::new(&TermSettings::default());
        let stamp = Utc.with_ymd_and_hms(2026, 2, 1, 12, 30, 0).unwrap();
        render_ics(records, &term, stamp)
    }

    #[test]
    fn renders_weekly_event() {
        let ics = render(&[class("Monday", "09:00-09:50", "Calculus")]);
        let lines: Vec<&str> = ics.split("\r\n").collect();

        assert_eq!(lines[0], "BEGIN:VCALENDAR");
        assert!(lines.contains(&"PRODID:-//AITU Schedule Creator//EN"));
        assert!(lines.contains(&"X-WR-CALNAME:AITU Schedule - Trimester 3"));
        assert!(lines.contains(&"DTSTAMP:20260201T123000Z"));
        assert!(lines.contains(&"DTSTART;TZID=Asia/Almaty:20260309T090000"));
        assert!(lines.contains(&"DTEND;TZID=Asia/Almaty:20260309T095000"));
        assert!(lines.contains(&"RRULE:FREQ=WEEKLY;UNTIL=20260517T180000Z"));
        assert!(lines.contains(&"SUMMARY:Calculus"));
        assert!(lines.contains(&"DESCRIPTION:Group: SE-2501\\nType: Lecture\\nLecturer: Dr. Kim"));
        assert!(lines.contains(&"TRIGGER:-PT10M"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("UID:")).count(), 1);
    }

    #[test]
    fn skips_unusable_records() {
        let ics = render(&[
            class("", "09:00-09:50", "No day"),
            class("Friday", "", "No time"),
            class("Friday", "11:00-11:50", "Kept"),
        ]);
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(ics.contains("SUMMARY:Kept"));
        assert!(ics.contains("20260313T110000"));
    }

    #[test]
    fn empty_selection_is_valid_calendar() {
        let ics = render(&[]);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(!ics.contains("VEVENT"));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape("Design, Part 2; a\\b"), "Design\\, Part 2\\; a\\\\b");
        assert_eq!(escape("a\r\nb"), "a\\nb");
    }

    #[test]
    fn long_lines_fold() {
        let long = format!("SUMMARY:{}", "Ä".repeat(60));
        let folded = fold(&long);
        for physical in folded.split("\r\n") {
            assert!(physical.len() <= MAX_LINE_OCTETS, "{} octets", physical.len());
        }
        assert_eq!(folded.replace("\r\n ", ""), long);
    }
}
