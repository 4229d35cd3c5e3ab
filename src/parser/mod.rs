pub mod page;
pub mod row;
pub mod time;

pub use page::{scan_page, RawRow, SchedulePage};

use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::pdf::PdfSchedule;
use crate::record::ClassRecord;

/// Page-by-page pipeline: page → first table → rows → records.
///
/// A page that fails to interpret is logged and skipped; it never aborts the
/// rest of the document.
pub fn scan_document(pdf: &PdfSchedule) -> Vec<ClassRecord> {
    let mut records = Vec::new();
    for (number, layout) in pdf.pages() {
        match layout {
            Ok(layout) => {
                let (group, page_records) = scan_page(&layout);
                debug!("page {}: group {} -> {} classes", number, group, page_records.len());
                records.extend(page_records);
            }
            Err(e) => warn!("Skipping page {} of {}: {}", number, pdf.path().display(), e),
        }
    }
    records
}

/// Open and scan one document. Opening failures and documents without a
/// single class are reported as errors so the caller can skip them.
pub fn extract_document(
    path: &std::path::Path,
    settings: crate::pdf::TableSettings,
) -> Result<Vec<ClassRecord>, ExtractError> {
    let pdf = PdfSchedule::open(path, settings)?;
    let records = scan_document(&pdf);
    if records.is_empty() {
        return Err(ExtractError::Empty(path.to_path_buf()));
    }
    Ok(records)
}
