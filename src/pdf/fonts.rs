use std::collections::HashMap;
use std::sync::LazyLock;

use lopdf::{Dictionary, Document};
use regex::Regex;
use tracing::debug;

use super::resources::resolve;

static CMAP_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<([0-9A-Fa-f]*)>|\[|\]|begincodespacerange|endcodespacerange|beginbfchar|endbfchar|beginbfrange|endbfrange",
    )
    .unwrap()
});

/// Hard cap on a single bfrange expansion.
const MAX_RANGE: u32 = 0xFFFF;

/// ToUnicode mapping of one font.
#[derive(Debug, Clone, Default)]
pub struct ToUnicode {
    code_len: usize,
    map: HashMap<u32, String>,
}

impl ToUnicode {
    pub fn parse(cmap: &str) -> Self {
        #[derive(PartialEq)]
        enum Mode {
            None,
            CodeSpace,
            Char,
            Range,
        }

        let mut mode = Mode::None;
        let mut code_len = 0usize;
        let mut map = HashMap::new();
        let mut pending: Vec<String> = Vec::new();
        let mut in_array = false;
        let mut array: Vec<String> = Vec::new();

        for m in CMAP_TOKEN_RE.captures_iter(cmap) {
            let token = m.get(0).map(|t| t.as_str()).unwrap_or("");
            match token {
                "begincodespacerange" => mode = Mode::CodeSpace,
                "beginbfchar" => mode = Mode::Char,
                "beginbfrange" => mode = Mode::Range,
                "endcodespacerange" | "endbfchar" | "endbfrange" => {
                    mode = Mode::None;
                    pending.clear();
                }
                "[" => {
                    in_array = true;
                    array.clear();
                }
                "]" => {
                    in_array = false;
                    if mode == Mode::Range && pending.len() == 2 {
                        if let (Some(lo), Some(hi)) = (hex_value(&pending[0]), hex_value(&pending[1])) {
                            for (offset, dst) in array.iter().enumerate() {
                                let Some(code) = u32::try_from(offset).ok().and_then(|o| lo.checked_add(o)) else {
                                    break;
                                };
                                if code > hi {
                                    break;
                                }
                                map.insert(code, utf16_hex(dst));
                            }
                        }
                    }
                    pending.clear();
                }
                _ => {
                    let hex = m.get(1).map(|h| h.as_str().to_string()).unwrap_or_default();
                    if in_array {
                        array.push(hex);
                        continue;
                    }
                    match mode {
                        Mode::CodeSpace => {
                            if code_len == 0 {
                                code_len = hex.len().div_ceil(2);
                            }
                        }
                        Mode::Char => {
                            pending.push(hex);
                            if pending.len() == 2 {
                                if code_len == 0 {
                                    code_len = pending[0].len().div_ceil(2);
                                }
                                if let Some(code) = hex_value(&pending[0]) {
                                    map.insert(code, utf16_hex(&pending[1]));
                                }
                                pending.clear();
                            }
                        }
                        Mode::Range => {
                            pending.push(hex);
                            if pending.len() == 3 {
                                if code_len == 0 {
                                    code_len = pending[0].len().div_ceil(2);
                                }
                                insert_range(&mut map, &pending[0], &pending[1], &pending[2]);
                                pending.clear();
                            }
                        }
                        Mode::None => {}
                    }
                }
            }
        }

        Self {
            code_len: code_len.max(1),
            map,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        for chunk in bytes.chunks(self.code_len) {
            let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            match self.map.get(&code) {
                Some(s) => out.push_str(s),
                None if self.code_len == 1 => out.push(char::from(chunk[0])),
                None => {}
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn insert_range(map: &mut HashMap<u32, String>, lo: &str, hi: &str, dst: &str) {
    let (Some(lo), Some(hi)) = (hex_value(lo), hex_value(hi)) else {
        return;
    };
    let units = utf16_units(dst);
    let Some((&last, head)) = units.split_last() else {
        return;
    };
    for code in lo..=hi.min(lo.saturating_add(MAX_RANGE)) {
        let mut u = head.to_vec();
        u.push(last.wrapping_add((code - lo) as u16));
        map.insert(code, String::from_utf16_lossy(&u));
    }
}

fn hex_value(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn utf16_units(hex: &str) -> Vec<u16> {
    hex.as_bytes()
        .chunks(4)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .filter_map(|c| u16::from_str_radix(c, 16).ok())
        .collect()
}

fn utf16_hex(hex: &str) -> String {
    String::from_utf16_lossy(&utf16_units(hex))
}

/// Decode a PDF string without font information: UTF-16BE with BOM, then
/// UTF-8, then Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect())
}

/// ToUnicode maps of the fonts in one resource dictionary, keyed by
/// resource name.
#[derive(Debug, Clone, Default)]
pub struct FontMap {
    fonts: HashMap<Vec<u8>, ToUnicode>,
}

impl FontMap {
    pub fn from_resources(doc: &Document, resources: Option<&Dictionary>) -> Self {
        let mut fonts = HashMap::new();
        let Some(font_dict) = resources
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|f| resolve(doc, f).as_dict().ok())
        else {
            return Self { fonts };
        };

        for (name, font) in font_dict.iter() {
            let Ok(font) = resolve(doc, font).as_dict() else {
                continue;
            };
            let Some(stream) = font
                .get(b"ToUnicode")
                .ok()
                .and_then(|t| resolve(doc, t).as_stream().ok())
            else {
                continue;
            };
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            let cmap = ToUnicode::parse(&String::from_utf8_lossy(&data));
            if !cmap.is_empty() {
                debug!("font {} has {} ToUnicode entries", String::from_utf8_lossy(name), cmap.map.len());
                fonts.insert(name.clone(), cmap);
            }
        }

        Self { fonts }
    }

    pub fn decode(&self, font: &[u8], bytes: &[u8]) -> String {
        match self.fonts.get(font) {
            Some(cmap) => cmap.decode(bytes),
            None => decode_pdf_string(bytes),
        }
    }
}

// ── Tests ──
