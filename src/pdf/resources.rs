//! Resource dictionaries a content stream runs against: fonts for string
//! decoding and Form XObjects for `Do`.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::fonts::FontMap;

/// Named resources visible to one content stream.
#[derive(Debug, Clone, Default)]
pub struct Resources<'a> {
    doc: Option<&'a Document>,
    dict: Option<&'a Dictionary>,
    fonts: FontMap,
}

/// A Form XObject ready to interpret.
#[derive(Debug)]
pub struct Form<'a> {
    pub operations: Vec<Operation>,
    /// `/Matrix`, form space to the user space of the invoking stream.
    pub matrix: Option<[f32; 6]>,
    pub resources: Resources<'a>,
}

impl<'a> Resources<'a> {
    pub fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        Self::from_dict(doc, page_resources(doc, page_id))
    }

    pub fn from_dict(doc: &'a Document, dict: Option<&'a Dictionary>) -> Self {
        Self {
            doc: Some(doc),
            dict,
            fonts: FontMap::from_resources(doc, dict),
        }
    }

    pub fn decode(&self, font: &[u8], bytes: &[u8]) -> String {
        self.fonts.decode(font, bytes)
    }

    /// The Form XObject registered as `name`. Image XObjects and broken
    /// references yield `None`.
    pub fn form(&self, name: &[u8]) -> Option<Form<'a>> {
        let doc = self.doc?;
        let xobjects = self
            .dict?
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve(doc, x).as_dict().ok())?;
        let stream = resolve(doc, xobjects.get(name).ok()?).as_stream().ok()?;
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Form" {
            return None;
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let operations = match Content::decode(&data) {
            Ok(content) => content.operations,
            Err(e) => {
                debug!("form {}: {}", String::from_utf8_lossy(name), e);
                return None;
            }
        };

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(doc, m).as_array().ok())
            .and_then(|items| {
                let nums: Vec<f32> = items.iter().filter_map(|n| n.as_float().ok()).collect();
                <[f32; 6]>::try_from(nums).ok()
            });

        // A form without its own resources uses the invoking stream's.
        let resources = match stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r).as_dict().ok())
        {
            Some(dict) => Self::from_dict(doc, Some(dict)),
            None => self.clone(),
        };

        Some(Form {
            operations,
            matrix,
            resources,
        })
    }
}

pub(super) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Page resources, following `Parent` links for inherited entries.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound guards against reference cycles.
    for _ in 0..32 {
        if let Ok(res) = node.get(b"Resources") {
            return resolve(doc, res).as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

// ── Tests ──
