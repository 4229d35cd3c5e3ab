use crate::record::ClassSlot;

use super::time::normalize_time;

/// Decode one table row: day, time, discipline, classroom, type, lecturer.
/// Missing trailing cells read as blank.
///
/// Returns the slots emitted by the row (possibly none) and the day label to
/// carry into the next row.
pub fn decode_row(row: &[Option<String>], carried_day: &str) -> (Vec<ClassSlot>, String) {
    let cell = |i: usize| row.get(i).and_then(|c| c.as_deref()).unwrap_or("");

    let day_cell = cell(0).trim();
    let day = if day_cell.is_empty() {
        carried_day.to_string()
    } else {
        day_cell.to_string()
    };

    let time = normalize_time(cell(1).trim());
    if time.is_empty() {
        return (Vec::new(), day);
    }

    let disciplines: Vec<&str> = split_lines(cell(2)).filter(|d| !d.is_empty()).collect();
    let classrooms: Vec<&str> = split_lines(cell(3)).collect();
    let kinds: Vec<&str> = split_lines(cell(4)).collect();
    let lecturers: Vec<&str> = split_lines(cell(5)).collect();

    let slots = disciplines
        .iter()
        .enumerate()
        .map(|(i, discipline)| ClassSlot {
            day: day.clone(),
            time: time.clone(),
            discipline: discipline.to_string(),
            classroom: aligned(&classrooms, i),
            kind: aligned(&kinds, i),
            lecturer: aligned(&lecturers, i),
        })
        .collect();

    (slots, day)
}

/// Lines of a cell, trimmed as a whole and then per line.
fn split_lines(cell: &str) -> impl Iterator<Item = &str> {
    cell.trim().lines().map(str::trim)
}

/// The `i`-th line of a parallel column, falling back to its last non-blank
/// line when the column is shorter than the discipline column.
fn aligned(values: &[&str], i: usize) -> String {
    if let Some(v) = values.get(i) {
        return v.to_string();
    }
    values
        .iter()
        .rev()
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Row decoder bound to a single table: owns the carried day between rows.
#[derive(Debug, Default)]
pub struct TableScanner {
    carried_day: String,
}

impl TableScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, row: &[Option<String>]) -> Vec<ClassSlot> {
        let (slots, next) = decode_row(row, &self.carried_day);
        self.carried_day = next;
        slots
    }
}

// ── Tests ──
