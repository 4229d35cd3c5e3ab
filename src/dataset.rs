use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::ExtractError;
use crate::parser;
use crate::pdf::TableSettings;
use crate::record::ClassRecord;

const BASE_HEADER: [&str; 7] = ["Group", "Day", "Time", "Discipline", "Classroom", "Type", "Lecturer"];
const PROGRAM_HEADER: &str = "Program";

/// One input document and the program label its records get tagged with.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub program: Option<String>,
}

impl SourceDocument {
    /// Label is the file stem, verbatim.
    pub fn labelled(path: PathBuf) -> Self {
        let program = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        Self { path, program }
    }
}

/// Frozen extraction result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<ClassRecord>,
}

impl Dataset {
    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(file)
    }

    /// Header gets a `Program` column when any record carries a label.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<(), ExtractError> {
        let with_program = self.records.iter().any(|r| r.program.is_some());
        let mut writer = csv::Writer::from_writer(out);

        let mut header: Vec<&str> = BASE_HEADER.to_vec();
        if with_program {
            header.push(PROGRAM_HEADER);
        }
        writer.write_record(&header)?;

        for r in &self.records {
            let mut row = vec![
                r.group.as_str(),
                r.day.as_str(),
                r.time.as_str(),
                r.discipline.as_str(),
                r.classroom.as_str(),
                r.kind.as_str(),
                r.lecturer.as_str(),
            ];
            if with_program {
                row.push(r.program.as_deref().unwrap_or(""));
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(input: R) -> Result<Self, ExtractError> {
        let mut reader = csv::Reader::from_reader(input);
        let records = reader
            .deserialize::<ClassRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }
}

impl From<Vec<ClassRecord>> for Dataset {
    fn from(records: Vec<ClassRecord>) -> Self {
        Self { records }
    }
}

/// Result of a batch build.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub dataset: Dataset,
    pub parsed: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Extract every source in order and concatenate the results.
///
/// A document that fails to open, parse, or yield any class is logged and
/// skipped; the batch always completes.
pub fn build(sources: &[SourceDocument], settings: TableSettings) -> BuildOutcome {
    let pb = ProgressBar::new(sources.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut outcome = BuildOutcome::default();
    for source in sources {
        let name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name.clone());
        info!("Parsing: {}", name);

        match parser::extract_document(&source.path, settings) {
            Ok(records) => {
                outcome.parsed += 1;
                outcome.dataset.records.extend(records.into_iter().map(|mut r| {
                    r.program.clone_from(&source.program);
                    r
                }));
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", name, e);
                outcome.skipped.push((source.path.clone(), e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Extracted {} classes from {} documents ({} skipped)",
        outcome.dataset.len(),
        outcome.parsed,
        outcome.skipped.len()
    );
    outcome
}

/// Build from every `.pdf` in `dir`, labelling records with the file stem.
/// A missing directory or one without PDFs yields an empty outcome.
pub fn build_from_directory(dir: &Path, settings: TableSettings) -> BuildOutcome {
    let sources = match discover(dir) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cannot read schedules directory {}: {}", dir.display(), e);
            return BuildOutcome::default();
        }
    };
    if sources.is_empty() {
        warn!("No PDF schedules found in {}", dir.display());
    }
    build(&sources, settings)
}

/// PDFs in `dir`, sorted by file name.
pub fn discover(dir: &Path) -> std::io::Result<Vec<SourceDocument>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        })
        .collect();
    paths.sort();
    Ok(paths.into_iter().map(SourceDocument::labelled).collect())
}

// ── Tests ──
