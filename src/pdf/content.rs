//! Content stream interpretation.
//!
//! Walks a page's operators and collects two things: positioned text runs
//! (one per show operator) and the axis-aligned ruling edges drawn by path
//! operators. Form XObjects invoked with `Do` are interpreted in place.
//! Coordinates are PDF user space after the CTM, y growing upward.

use lopdf::content::Operation;
use lopdf::Object;
use tracing::warn;

use super::resources::Resources;

/// Average glyph advance as a fraction of the font size. No font metrics are
/// read, so run widths are estimates.
const GLYPH_WIDTH_RATIO: f32 = 0.5;
/// TJ adjustments below this (thousandths of text space) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;
/// Lines whose ends differ by less than this are treated as axis-aligned.
const AXIS_TOLERANCE: f32 = 0.5;
/// Form XObject nesting limit; also stops forms that invoke themselves.
const MAX_FORM_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Baseline start.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

impl TextRun {
    /// A point comfortably inside the glyph box, used for cell lookup.
    pub fn probe(&self) -> (f32, f32) {
        let dx = (self.width / 2.0).min(self.font_size);
        (self.x + dx, self.y + self.font_size * 0.3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    /// y, x0 <= x1
    Horizontal { y: f32, x0: f32, x1: f32 },
    /// x, y0 <= y1
    Vertical { x: f32, y0: f32, y1: f32 },
}

impl Edge {
    fn between(a: (f32, f32), b: (f32, f32)) -> Option<Edge> {
        if (a.1 - b.1).abs() < AXIS_TOLERANCE && (a.0 - b.0).abs() >= AXIS_TOLERANCE {
            Some(Edge::Horizontal {
                y: (a.1 + b.1) / 2.0,
                x0: a.0.min(b.0),
                x1: a.0.max(b.0),
            })
        } else if (a.0 - b.0).abs() < AXIS_TOLERANCE && (a.1 - b.1).abs() >= AXIS_TOLERANCE {
            Some(Edge::Vertical {
                x: (a.0 + b.0) / 2.0,
                y0: a.1.min(b.1),
                y1: a.1.max(b.1),
            })
        } else {
            None
        }
    }
}

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    fn vertical_scale(&self) -> f32 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    leading: f32,
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 0.0,
            leading: 0.0,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }
}

/// Everything extracted from one page's content stream.
#[derive(Debug, Default)]
pub struct PageContent {
    pub runs: Vec<TextRun>,
    pub edges: Vec<Edge>,
}

pub fn interpret(operations: &[Operation], resources: &Resources) -> PageContent {
    let mut out = PageContent::default();
    run(&mut out, operations, resources, Matrix::IDENTITY, 0);
    out
}

/// One content stream, starting from `base` as its CTM.
fn run(out: &mut PageContent, operations: &[Operation], resources: &Resources, base: Matrix, depth: usize) {
    let mut ctm = base;
    let mut stack: Vec<Matrix> = Vec::new();
    let mut text = TextState::default();

    // Path under construction, committed on paint.
    let mut pending: Vec<Edge> = Vec::new();
    let mut current: Option<(f32, f32)> = None;
    let mut subpath_start: Option<(f32, f32)> = None;

    for op in operations {
        let nums = numbers(&op.operands);
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => {
                if let Some(m) = stack.pop() {
                    ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = matrix(&nums) {
                    ctm = m.then(&ctm);
                }
            }

            // ── Paths ──
            "m" => {
                if let [x, y, ..] = nums[..] {
                    let p = ctm.apply(x, y);
                    current = Some(p);
                    subpath_start = Some(p);
                }
            }
            "l" => {
                if let ([x, y, ..], Some(from)) = (&nums[..], current) {
                    let to = ctm.apply(*x, *y);
                    pending.extend(Edge::between(from, to));
                    current = Some(to);
                }
            }
            "h" => {
                if let (Some(from), Some(to)) = (current, subpath_start) {
                    pending.extend(Edge::between(from, to));
                    current = Some(to);
                }
            }
            "re" => {
                if let [x, y, w, h, ..] = nums[..] {
                    let corners = [
                        ctm.apply(x, y),
                        ctm.apply(x + w, y),
                        ctm.apply(x + w, y + h),
                        ctm.apply(x, y + h),
                    ];
                    for i in 0..4 {
                        pending.extend(Edge::between(corners[i], corners[(i + 1) % 4]));
                    }
                    current = Some(corners[0]);
                    subpath_start = Some(corners[0]);
                }
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                out.edges.append(&mut pending);
                current = None;
                subpath_start = None;
            }
            "n" => {
                pending.clear();
                current = None;
                subpath_start = None;
            }

            // ── Text ──
            "BT" => {
                text.tm = Matrix::IDENTITY;
                text.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    text.font = name.clone();
                }
                if let Some(size) = op.operands.get(1).and_then(number) {
                    text.size = size;
                }
            }
            "TL" => {
                if let [l, ..] = nums[..] {
                    text.leading = l;
                }
            }
            "Td" => {
                if let [tx, ty, ..] = nums[..] {
                    next_line(&mut text, tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty, ..] = nums[..] {
                    text.leading = -ty;
                    next_line(&mut text, tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix(&nums) {
                    text.tm = m;
                    text.tlm = m;
                }
            }
            "T*" => {
                let leading = text.leading;
                next_line(&mut text, 0.0, -leading);
            }
            "Tj" => {
                if let Some(s @ Object::String(..)) = op.operands.first() {
                    show(out, &mut text, &ctm, resources, std::slice::from_ref(s));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    show(out, &mut text, &ctm, resources, items);
                }
            }
            "'" => {
                let leading = text.leading;
                next_line(&mut text, 0.0, -leading);
                if let Some(s @ Object::String(..)) = op.operands.first() {
                    show(out, &mut text, &ctm, resources, std::slice::from_ref(s));
                }
            }
            "\"" => {
                let leading = text.leading;
                next_line(&mut text, 0.0, -leading);
                if let Some(s @ Object::String(..)) = op.operands.get(2) {
                    show(out, &mut text, &ctm, resources, std::slice::from_ref(s));
                }
            }

            // ── XObjects ──
            "Do" => {
                let Some(Object::Name(name)) = op.operands.first() else {
                    continue;
                };
                if depth >= MAX_FORM_DEPTH {
                    warn!(
                        "Form {} nested deeper than {}, skipped",
                        String::from_utf8_lossy(name),
                        MAX_FORM_DEPTH
                    );
                    continue;
                }
                if let Some(form) = resources.form(name) {
                    let m = form.matrix.map(Matrix).unwrap_or(Matrix::IDENTITY);
                    run(out, &form.operations, &form.resources, m.then(&ctm), depth + 1);
                }
            }
            _ => {}
        }
    }
}

fn next_line(text: &mut TextState, tx: f32, ty: f32) {
    text.tlm = Matrix::translate(tx, ty).then(&text.tlm);
    text.tm = text.tlm;
}

/// Emit one run for a Tj/TJ operand list and advance the text matrix.
fn show(out: &mut PageContent, text: &mut TextState, ctm: &Matrix, resources: &Resources, items: &[Object]) {
    let origin = text.tm.then(ctm);
    let mut s = String::new();
    let mut advance = 0.0f32;

    for item in items {
        match item {
            Object::String(bytes, _) => {
                let decoded = resources.decode(&text.font, bytes);
                advance += decoded.chars().count() as f32 * text.size * GLYPH_WIDTH_RATIO;
                s.push_str(&decoded);
            }
            other => {
                if let Some(adj) = number(other) {
                    if adj < TJ_SPACE_THRESHOLD && !s.ends_with(' ') {
                        s.push(' ');
                    }
                    advance -= adj / 1000.0 * text.size;
                }
            }
        }
    }

    text.tm = Matrix::translate(advance, 0.0).then(&text.tm);

    if s.trim().is_empty() {
        return;
    }

    let (x, y) = origin.apply(0.0, 0.0);
    let (x_end, _) = text.tm.then(ctm).apply(0.0, 0.0);
    out.runs.push(TextRun {
        text: s,
        x,
        y,
        width: (x_end - x).abs(),
        font_size: text.size * origin.vertical_scale(),
    });
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

fn matrix(nums: &[f32]) -> Option<Matrix> {
    match nums {
        [a, b, c, d, e, f, ..] => Some(Matrix([*a, *b, *c, *d, *e, *f])),
        _ => None,
    }
}

// ── Tests ──
