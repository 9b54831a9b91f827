//! Read-only access to the pages of a source document.
//!
//! [`PageSource`] is the seam between the manifest logic and the PDF
//! backend: anything that can list positioned fragments per page can feed
//! a search or re-derive a passenger row. [`SourceDocument`] implements it
//! on top of lopdf.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use paxmark_core::PositionedFragment;

use crate::error::BackendError;
use crate::text_layer::{PageFrame, extract_fragments};

/// A document whose pages yield positioned text fragments.
pub trait PageSource {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Word-level fragments of a zero-based page, in content order.
    fn fragments(&self, page_index: usize) -> Result<Vec<PositionedFragment>, BackendError>;
}

/// A PDF file loaded with lopdf.
#[derive(Debug)]
pub struct SourceDocument {
    path: PathBuf,
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    /// Load a PDF from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let doc = Document::load(path)
            .map_err(|e| BackendError::Parse(format!("failed to load {}: {e}", path.display())))?;
        Ok(Self::from_document(path.to_path_buf(), doc))
    }

    pub(crate) fn from_document(path: PathBuf, doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self {
            path,
            doc,
            page_ids,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    /// Object id of a zero-based page.
    pub fn page_id(&self, page_index: usize) -> Result<ObjectId, BackendError> {
        self.page_ids
            .get(page_index)
            .copied()
            .ok_or(BackendError::PageOutOfRange {
                index: page_index,
                count: self.page_ids.len(),
            })
    }

    /// Fragments of a page together with its coordinate frame.
    pub(crate) fn page_text(
        &self,
        page_index: usize,
    ) -> Result<(Vec<PositionedFragment>, PageFrame), BackendError> {
        let page_id = self.page_id(page_index)?;
        extract_fragments(&self.doc, page_id)
    }
}

impl PageSource for SourceDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn fragments(&self, page_index: usize) -> Result<Vec<PositionedFragment>, BackendError> {
        self.page_text(page_index).map(|(fragments, _)| fragments)
    }
}

/// Resolve an indirect reference, returning the object itself otherwise.
pub(crate) fn resolve_ref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Numeric value of an object (Integer or Real), following references.
pub(crate) fn number_of(doc: &Document, obj: &Object) -> Option<f64> {
    match resolve_ref(doc, obj) {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

/// Name value of an object as a string.
pub(crate) fn name_of(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// Look up a page key, walking up the page tree via `/Parent`.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut current = page_id;
    loop {
        let dict = doc
            .get_object(current)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        match dict.get(b"Parent") {
            Ok(parent) => {
                current = parent
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
}

/// Page resources, following inheritance. A page without any yields an
/// empty dictionary.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, BackendError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(obj) => resolve_ref(doc, obj)
            .as_dict()
            .cloned()
            .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string())),
        None => Ok(Dictionary::new()),
    }
}

/// Decoded bytes of a stream, decompressing only when a filter is set.
pub(crate) fn decode_stream(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Concatenated content stream bytes of a page.
pub(crate) fn page_content(doc: &Document, page: &Dictionary) -> Result<Vec<u8>, BackendError> {
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let parts: Vec<&Object> = match resolve_ref(doc, contents) {
        Object::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut content = Vec::new();
    for part in parts {
        let stream = resolve_ref(doc, part)
            .as_stream()
            .map_err(|e| BackendError::Parse(format!("/Contents item is not a stream: {e}")))?;
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&decode_stream(stream)?);
    }
    Ok(content)
}
