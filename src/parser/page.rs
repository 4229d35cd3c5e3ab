use std::sync::LazyLock;

use regex::Regex;

use crate::record::{ClassRecord, UNKNOWN_GROUP};

use super::row::TableScanner;

static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Group\s+([\w\-]+)").unwrap());

/// One table row as extracted: `None` for cells swallowed by a merged cell.
pub type RawRow = Vec<Option<String>>;

/// What the scanner needs from a document page.
pub trait SchedulePage {
    /// Free text of the page, `None` when the page has no extractable text.
    fn text(&self) -> Option<String>;
    /// First detected table, header row included.
    fn first_table(&self) -> Option<Vec<RawRow>>;
}

/// Scan one page into records stamped with the page's group id.
pub fn scan_page(page: &impl SchedulePage) -> (String, Vec<ClassRecord>) {
    let Some(text) = page.text().filter(|t| !t.trim().is_empty()) else {
        return (UNKNOWN_GROUP.to_string(), Vec::new());
    };

    let group = group_id(&text);

    let Some(table) = page.first_table() else {
        return (group, Vec::new());
    };

    let mut scanner = TableScanner::new();
    let records = table
        .iter()
        .skip(1)
        .flat_map(|row| scanner.feed(row))
        .map(|slot| slot.into_record(&group))
        .collect();

    (group, records)
}

pub fn group_id(text: &str) -> String {
    GROUP_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePage {
        text: Option<&'static str>,
        table: Option<Vec<Vec<&'static str>>>,
    }

    impl SchedulePage for FakePage {
        fn text(&self) -> Option<String> {
            self.text.map(str::to_string)
        }

        fn first_table(&self) -> Option<Vec<RawRow>> {
            self.table.as_ref().map(|rows| {
                rows.iter()
                    .map(|r| {
                        r.iter()
                            .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                            .collect()
                    })
                    .collect()
            })
        }
    }

    fn header() -> Vec<&'static str> {
        vec!["Day", "Time", "Discipline", "Room", "Type", "Lecturer"]
    }

    #[test]
    fn group_id_found() {
        assert_eq!(group_id("Schedule for Group SE-2501 (3 trimester)"), "SE-2501");
        assert_eq!(group_id("GROUP\nAAI-2501M"), "AAI-2501M");
        assert_eq!(group_id("group it_22"), "it_22");
    }

    #[test]
    fn group_id_missing() {
        assert_eq!(group_id("Timetable, trimester 3"), "Unknown");
        assert_eq!(group_id("Groups:"), "Unknown");
    }

    #[test]
    fn scans_table_with_carry_and_header_skip() {
        let page = FakePage {
            text: Some("Astana IT University\nGroup CS-2502\nTrimester 3"),
            table: Some(vec![
                header(),
                vec!["Monday", "09:00-09:50", "Calculus", "C1.3", "Lecture", "Smith"],
                vec!["", "1000-1050", "Calculus", "C1.3", "Practice", "Smith"],
                vec!["Tuesday", "11:00-11:50", "Physics\nHistory", "C2.1", "Lecture", "Lee\nKim"],
                vec!["", "bad", "Ignored", "", "", ""],
            ]),
        };
        let (group, records) = scan_page(&page);
        assert_eq!(group, "CS-2502");
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.group == "CS-2502"));
        assert_eq!(records[1].day, "Monday");
        assert_eq!(records[1].time, "10:00-10:50");
        assert_eq!(records[2].day, "Tuesday");
        assert_eq!(records[3].discipline, "History");
        assert_eq!(records[3].lecturer, "Kim");
        assert!(records.iter().all(|r| r.program.is_none()));
    }

    #[test]
    fn header_row_is_never_decoded() {
        let page = FakePage {
            text: Some("Group A-1"),
            table: Some(vec![vec!["Monday", "09:00-09:50", "Header", "", "", ""]]),
        };
        assert!(scan_page(&page).1.is_empty());
    }

    #[test]
    fn page_without_text_contributes_nothing() {
        let page = FakePage {
            text: None,
            table: Some(vec![header(), vec!["Monday", "09:00-09:50", "Math", "", "", ""]]),
        };
        assert!(scan_page(&page).1.is_empty());
    }

    #[test]
    fn page_without_table_contributes_nothing() {
        let page = FakePage { text: Some("Group X-1"), table: None };
        let (group, records) = scan_page(&page);
        assert_eq!(group, "X-1");
        assert!(records.is_empty());
    }

    #[test]
    fn unknown_group_still_scans() {
        let page = FakePage {
            text: Some("No label here"),
            table: Some(vec![header(), vec!["Friday", "14:00-14:50", "Art", "", "", ""]]),
        };
        let (group, records) = scan_page(&page);
        assert_eq!(group, "Unknown");
        assert_eq!(records[0].group, "Unknown");
    }
}
