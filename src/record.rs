use serde::{Deserialize, Serialize};

/// Group label used when a page carries no `Group <id>` token.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// One scheduled class occurrence. Field names in the exchange file follow
/// the serde renames below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    #[serde(rename = "Group", default)]
    pub group: String,
    #[serde(rename = "Day", default)]
    pub day: String,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "Discipline", default)]
    pub discipline: String,
    #[serde(rename = "Classroom", default)]
    pub classroom: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Lecturer", default)]
    pub lecturer: String,
    #[serde(rename = "Program", default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

/// Per-class tuple produced by the row decoder, before the page's group id
/// is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSlot {
    pub day: String,
    pub time: String,
    pub discipline: String,
    pub classroom: String,
    pub kind: String,
    pub lecturer: String,
}

impl ClassSlot {
    pub fn into_record(self, group: &str) -> ClassRecord {
        ClassRecord {
            group: group.to_string(),
            day: self.day,
            time: self.time,
            discipline: self.discipline,
            classroom: self.classroom,
            kind: self.kind,
            lecturer: self.lecturer,
            program: None,
        }
    }
}
