//! Heuristic table detection over interpreted page content.
//!
//! Two strategies, tried in order:
//! 1. Lattice: ruling edges are grouped into connected regions, each region
//!    is snapped into a grid, and grid cells with no ruling between them are
//!    merged. Text of a merged cell is attached to its top-left cell.
//! 2. Text: without rulings, runs are clustered into rows by baseline and
//!    into columns by left edge.

use std::cmp::Ordering;

use serde::Deserialize;

use super::content::{Edge, PageContent, TextRun};
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Edges closer than this (points) are snapped to the same grid line.
    pub snap_tolerance: f32,
    /// Text strategy: runs within this baseline distance share a row.
    pub row_tolerance: f32,
    /// Text strategy: left edges within this distance share a column.
    pub col_tolerance: f32,
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            row_tolerance: 5.0,
            col_tolerance: 10.0,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub rows: Vec<RawRow>,
    /// Top edge, PDF user space.
    pub top: f32,
    pub left: f32,
}

/// All tables on a page, topmost first.
pub fn find_tables(content: &PageContent, settings: &TableSettings) -> Vec<DetectedTable> {
    let mut tables: Vec<DetectedTable> = edge_regions(&content.edges, settings.snap_tolerance)
        .iter()
        .filter_map(|region| lattice_table(region, &content.runs, settings))
        .collect();

    if tables.is_empty() {
        tables.extend(text_table(&content.runs, settings));
    }

    tables.sort_by(|a, b| {
        b.top
            .partial_cmp(&a.top)
            .unwrap_or(Ordering::Equal)
            .then(a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal))
    });
    tables
}

/// Page text as lines, top to bottom.
pub fn page_text(runs: &[TextRun]) -> String {
    let refs: Vec<&TextRun> = runs.iter().collect();
    lines_of(&refs)
        .iter()
        .map(|line| join_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Lattice strategy ──

fn edge_regions(edges: &[Edge], tol: f32) -> Vec<Vec<Edge>> {
    let mut parent: Vec<usize> = (0..edges.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            if touches(&edges[i], &edges[j], tol) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[a] = b;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<Edge>)> = Vec::new();
    for (i, edge) in edges.iter().enumerate() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, g)) => g.push(*edge),
            None => groups.push((root, vec![*edge])),
        }
    }
    groups.into_iter().map(|(_, g)| g).collect()
}

fn touches(a: &Edge, b: &Edge, tol: f32) -> bool {
    use Edge::{Horizontal, Vertical};
    match (*a, *b) {
        (Horizontal { y, x0, x1 }, Vertical { x, y0, y1 })
        | (Vertical { x, y0, y1 }, Horizontal { y, x0, x1 }) => {
            x >= x0 - tol && x <= x1 + tol && y >= y0 - tol && y <= y1 + tol
        }
        (Horizontal { y: ya, x0: a0, x1: a1 }, Horizontal { y: yb, x0: b0, x1: b1 }) => {
            (ya - yb).abs() <= tol && a0 <= b1 + tol && b0 <= a1 + tol
        }
        (Vertical { x: xa, y0: a0, y1: a1 }, Vertical { x: xb, y0: b0, y1: b1 }) => {
            (xa - xb).abs() <= tol && a0 <= b1 + tol && b0 <= a1 + tol
        }
    }
}

/// Cluster sorted values; each cluster is represented by its mean.
fn snap(mut values: Vec<f32>, tol: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some(c) if c.last().is_some_and(|last| v - last <= tol) => c.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

fn lattice_table(region: &[Edge], runs: &[TextRun], settings: &TableSettings) -> Option<DetectedTable> {
    let tol = settings.snap_tolerance;
    let xs = snap(
        region
            .iter()
            .filter_map(|e| match e {
                Edge::Vertical { x, .. } => Some(*x),
                _ => None,
            })
            .collect(),
        tol,
    );
    let mut ys = snap(
        region
            .iter()
            .filter_map(|e| match e {
                Edge::Horizontal { y, .. } => Some(*y),
                _ => None,
            })
            .collect(),
        tol,
    );
    ys.reverse();

    if xs.len() < settings.min_cols + 1 || ys.len() < 2 {
        return None;
    }
    let (n_rows, n_cols) = (ys.len() - 1, xs.len() - 1);

    let has_h = |y: f32, x: f32| {
        region.iter().any(|e| {
            matches!(*e, Edge::Horizontal { y: ey, x0, x1 }
                if (ey - y).abs() <= tol && x >= x0 - tol && x <= x1 + tol)
        })
    };
    let has_v = |x: f32, y: f32| {
        region.iter().any(|e| {
            matches!(*e, Edge::Vertical { x: ex, y0, y1 }
                if (ex - x).abs() <= tol && y >= y0 - tol && y <= y1 + tol)
        })
    };

    let mut anchor = vec![vec![(0usize, 0usize); n_cols]; n_rows];
    for r in 0..n_rows {
        for c in 0..n_cols {
            let x_mid = (xs[c] + xs[c + 1]) / 2.0;
            let y_mid = (ys[r] + ys[r + 1]) / 2.0;
            anchor[r][c] = if r > 0 && !has_h(ys[r], x_mid) {
                anchor[r - 1][c]
            } else if c > 0 && !has_v(xs[c], y_mid) {
                anchor[r][c - 1]
            } else {
                (r, c)
            };
        }
    }

    let mut buckets: Vec<Vec<Vec<&TextRun>>> = vec![vec![Vec::new(); n_cols]; n_rows];
    for run in runs {
        let (px, py) = run.probe();
        let col = xs.windows(2).position(|w| px >= w[0] && px < w[1]);
        let row = ys.windows(2).position(|w| py <= w[0] && py > w[1]);
        if let (Some(r), Some(c)) = (row, col) {
            let (ar, ac) = anchor[r][c];
            buckets[ar][ac].push(run);
        }
    }

    let rows = (0..n_rows)
        .map(|r| {
            (0..n_cols)
                .map(|c| (anchor[r][c] == (r, c)).then(|| cell_text(&buckets[r][c])))
                .collect()
        })
        .collect();

    Some(DetectedTable {
        rows,
        top: ys[0],
        left: xs[0],
    })
}

// ── Text strategy ──

fn text_table(runs: &[TextRun], settings: &TableSettings) -> Option<DetectedTable> {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sort_reading_order(&mut sorted);

    // Cluster runs into rows by baseline.
    let mut rows: Vec<Vec<&TextRun>> = Vec::new();
    for run in sorted {
        match rows.iter_mut().find(|row| {
            row.first()
                .is_some_and(|first| (first.y - run.y).abs() <= settings.row_tolerance)
        }) {
            Some(row) => row.push(run),
            None => rows.push(vec![run]),
        }
    }

    // First region of consecutive rows with a similar column count.
    let mut region: Vec<Vec<&TextRun>> = Vec::new();
    let mut expected: Option<usize> = None;
    for row in rows {
        let n = row.len();
        if n < settings.min_cols {
            if region.len() >= settings.min_rows {
                break;
            }
            region.clear();
            expected = None;
            continue;
        }
        match expected {
            Some(e) if n.abs_diff(e) <= 1 => region.push(row),
            Some(_) if region.len() >= settings.min_rows => break,
            _ => {
                region.clear();
                region.push(row);
                expected = Some(n);
            }
        }
    }
    if region.len() < settings.min_rows {
        return None;
    }

    let mut lefts: Vec<f32> = region.iter().flatten().map(|r| r.x).collect();
    lefts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut bounds: Vec<f32> = Vec::new();
    for x in lefts {
        if bounds.last().map_or(true, |last| x - last > settings.col_tolerance) {
            bounds.push(x);
        }
    }
    if bounds.len() < settings.min_cols {
        return None;
    }

    let n_cols = bounds.len();
    let column_of = |x: f32| bounds.iter().rposition(|b| x + settings.col_tolerance / 2.0 >= *b).unwrap_or(0);

    let top = region[0].first().map_or(0.0, |r| r.y + r.font_size);
    let rows = region
        .iter()
        .map(|row| {
            let mut cells: Vec<Vec<&TextRun>> = vec![Vec::new(); n_cols];
            for run in row {
                cells[column_of(run.x)].push(*run);
            }
            cells.iter().map(|c| Some(cell_text(c))).collect()
        })
        .collect();

    Some(DetectedTable {
        rows,
        top,
        left: bounds[0],
    })
}

// ── Text assembly ──

fn sort_reading_order(runs: &mut [&TextRun]) {
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });
}

/// Group runs into visual lines, top to bottom, each sorted left to right.
fn lines_of<'a>(runs: &[&'a TextRun]) -> Vec<Vec<&'a TextRun>> {
    let mut sorted = runs.to_vec();
    sort_reading_order(&mut sorted);

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    for run in sorted {
        let tol = (run.font_size * 0.5).max(1.0);
        match lines.last_mut() {
            Some(line) if line.first().is_some_and(|f| (f.y - run.y).abs() <= tol) => line.push(run),
            _ => lines.push(vec![run]),
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }
    lines
}

fn join_line(line: &[&TextRun]) -> String {
    line.iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cell text with one line per visual line.
fn cell_text(runs: &[&TextRun]) -> String {
    lines_of(runs)
        .iter()
        .map(|line| join_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──
