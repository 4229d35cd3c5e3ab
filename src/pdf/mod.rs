pub mod content;
pub mod fonts;
pub mod resources;
pub mod table;

#[cfg(test)]
pub mod fixture;

use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use tracing::debug;

use crate::error::ExtractError;
use crate::parser::{RawRow, SchedulePage};
use content::PageContent;
use resources::Resources;
pub use table::TableSettings;

/// An opened PDF. The file is read fully into memory by `open`, so no handle
/// is held while pages are scanned.
pub struct PdfSchedule {
    path: PathBuf,
    doc: Document,
    settings: TableSettings,
}

impl PdfSchedule {
    pub fn open(path: &Path, settings: TableSettings) -> Result<Self, ExtractError> {
        let doc = Document::load(path).map_err(|source| ExtractError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("opened {} ({} pages)", path.display(), doc.get_pages().len());
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            settings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pages in document order, each interpreted independently.
    pub fn pages(&self) -> impl Iterator<Item = (u32, Result<PageLayout, ExtractError>)> + '_ {
        self.doc
            .get_pages()
            .into_iter()
            .map(move |(number, id)| (number, self.layout(number, id)))
    }

    fn layout(&self, number: u32, id: ObjectId) -> Result<PageLayout, ExtractError> {
        let page_err = |source| ExtractError::Page { page: number, source };
        let data = self.doc.get_page_content(id).map_err(page_err)?;
        let ops = Content::decode(&data).map_err(page_err)?;
        let resources = Resources::for_page(&self.doc, id);
        let content = content::interpret(&ops.operations, &resources);
        debug!(
            "page {}: {} text runs, {} edges",
            number,
            content.runs.len(),
            content.edges.len()
        );
        Ok(PageLayout {
            content,
            settings: self.settings,
        })
    }
}

/// Interpreted page ready for scanning.
pub struct PageLayout {
    content: PageContent,
    settings: TableSettings,
}

impl SchedulePage for PageLayout {
    fn text(&self) -> Option<String> {
        let text = table::page_text(&self.content.runs);
        (!text.trim().is_empty()).then_some(text)
    }

    fn first_table(&self) -> Option<Vec<RawRow>> {
        table::find_tables(&self.content, &self.settings)
            .into_iter()
            .next()
            .map(|t| t.rows)
    }
}

// ── Tests ──
