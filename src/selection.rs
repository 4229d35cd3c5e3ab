//! Browsing a dataset: program → group → weekly schedule → picked classes.

use std::sync::LazyLock;

use regex::Regex;

use crate::record::ClassRecord;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

static ABBREVIATIONS: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (Regex::new(r"\bM\b").unwrap(), "Masters"),
        (Regex::new(r"\bB\b").unwrap(), "Bachelors"),
        (Regex::new(r"\bTrim\b").unwrap(), "Trimester"),
    ]
});

/// 0-based weekday index, if `day` names one.
pub fn weekday_index(day: &str) -> Option<usize> {
    let day = day.trim();
    WEEKDAYS.iter().position(|d| d.eq_ignore_ascii_case(day))
}

/// Distinct program labels in first-seen order. Unlabelled records are not
/// listed.
pub fn programs(records: &[ClassRecord]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in records.iter().filter_map(|r| r.program.as_deref()) {
        if !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

/// `None` matches every record, labelled or not.
fn in_program(record: &ClassRecord, program: Option<&str>) -> bool {
    program.map_or(true, |p| record.program.as_deref() == Some(p))
}

/// Distinct groups of one program, first-seen order; of the whole dataset
/// when `program` is `None`.
pub fn groups<'a>(records: &'a [ClassRecord], program: Option<&str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for r in records.iter().filter(|r| in_program(r, program)) {
        if !out.contains(&r.group.as_str()) {
            out.push(&r.group);
        }
    }
    out
}

/// One group's classes ordered by weekday then time. Unknown days sort last;
/// ties keep dataset order. `program` of `None` searches every program.
pub fn group_schedule<'a>(
    records: &'a [ClassRecord],
    program: Option<&str>,
    group: &str,
) -> Vec<&'a ClassRecord> {
    let mut schedule: Vec<&ClassRecord> = records
        .iter()
        .filter(|r| in_program(r, program) && r.group == group)
        .collect();
    schedule.sort_by(|a, b| {
        let da = weekday_index(&a.day).unwrap_or(WEEKDAYS.len());
        let db = weekday_index(&b.day).unwrap_or(WEEKDAYS.len());
        da.cmp(&db).then_with(|| a.time.cmp(&b.time))
    });
    schedule
}

/// 1-based picks into `schedule`. Out-of-range and repeated picks are
/// dropped; the result keeps schedule order.
pub fn pick<'a>(schedule: &[&'a ClassRecord], indices: &[usize]) -> Vec<&'a ClassRecord> {
    schedule
        .iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(&(i + 1)))
        .map(|(_, r)| *r)
        .collect()
}

/// Human label for a program file stem:
/// `Schedule_1 course B_3 trim` → `1 Course Bachelors 3 Trimester`.
pub fn display_program_name(label: &str) -> String {
    let clean = label
        .replace("Schedules_", "")
        .replace("Schedule_", "")
        .replace('_', " ");
    let mut name = title_case(&clean);
    for (re, full) in ABBREVIATIONS.iter() {
        name = re.replace_all(&name, *full).into_owned();
    }
    name.trim().to_string()
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

// ── Tests ──
