//! Timetable PDFs generated with the lopdf builder for tests.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const FONT_SIZE: i64 = 8;
/// Page-level translation applied before invoking a fixture form.
const FORM_SHIFT: i64 = 15;
/// Column rules, left to right.
const COLS: [i64; 7] = [40, 110, 200, 330, 400, 470, 560];
/// Row rules, top to bottom: header, Monday x2, Tuesday x2.
const ROWS: [i64; 6] = [760, 740, 720, 690, 670, 650];

#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    operations: Vec<Operation>,
    /// Drawn through a Form XObject instead of directly on the page.
    in_form: bool,
}

impl FixturePage {
    pub const TIMETABLE_ROWS: usize = ROWS.len() - 1;

    /// A ruled six-column timetable. The day column spans two rows per day,
    /// row 2 holds two co-scheduled disciplines, and the last row has no time.
    pub fn timetable(group: &str) -> Self {
        let mut page = Self::default();
        page.text(COLS[0], 790, &format!("Schedule of classes  Group {}", group));

        // Rules; column 0 is left open below each day label.
        for (i, y) in ROWS.iter().enumerate() {
            let x0 = if i == 2 || i == 4 { COLS[1] } else { COLS[0] };
            page.line(x0, *y, COLS[6], *y);
        }
        for x in COLS {
            page.line(x, ROWS[5], x, ROWS[0]);
        }

        let header = ["Day", "Time", "Discipline", "Classroom", "Type", "Lecturer"];
        for (c, label) in header.iter().enumerate() {
            page.cell(c, 746, label);
        }

        page.cell(0, 712, "Monday");
        for (c, value) in ["09:00-09:50", "English", "C1.1", "Practice", "Brown"].iter().enumerate() {
            page.cell(c + 1, 726, value);
        }

        page.cell(1, 701, "1000-1050");
        page.cell(2, 706, "Calculus");
        page.cell(2, 696, "Physics");
        page.cell(3, 701, "C1.2");
        page.cell(4, 701, "Lecture");
        page.cell(5, 706, "Kim");
        page.cell(5, 696, "Lee");

        page.cell(0, 666, "Tuesday");
        for (c, value) in ["19::00-19::50", "History", "Online", "Lecture", "Ahmed"].iter().enumerate() {
            page.cell(c + 1, 676, value);
        }

        page.cell(2, 656, "Break");
        page
    }

    /// Same drawing, invoked through a Form XObject. The page `cm` and the
    /// form `/Matrix` cancel out.
    pub fn in_form(mut self) -> Self {
        self.in_form = true;
        self
    }

    pub fn text_only(text: &str) -> Self {
        let mut page = Self::default();
        page.text(COLS[0], 790, text);
        page
    }

    fn cell(&mut self, col: usize, baseline: i64, text: &str) {
        self.text(COLS[col] + 4, baseline, text);
    }

    fn text(&mut self, x: i64, y: i64, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        self.operations.extend([
            Operation::new("m", vec![x0.into(), y0.into()]),
            Operation::new("l", vec![x1.into(), y1.into()]),
            Operation::new("S", vec![]),
        ]);
    }
}

pub fn write_pdf(path: &Path, pages: &[FixturePage]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let content = Content {
            operations: page.operations.clone(),
        };
        let data = content.encode().unwrap();
        let page_id = if page.in_form {
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), (-FORM_SHIFT).into(), (-FORM_SHIFT).into()],
                },
                data,
            ));
            let invoke = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![1.into(), 0.into(), 0.into(), 1.into(), FORM_SHIFT.into(), FORM_SHIFT.into()],
                    ),
                    Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, invoke.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Fm1" => form_id },
                },
            })
        } else {
            let content_id = doc.add_object(Stream::new(dictionary! {}, data));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
        };
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
