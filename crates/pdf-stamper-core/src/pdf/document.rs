//! Editable PDF document.
//!
//! # Coordinate System
//!
//! All positions are in PDF user space: (0, 0) is the bottom-left corner of
//! the page, X grows to the right and Y grows upward, in points.
//!
//! # Editing Strategy
//!
//! Drawing calls are buffered per page. On [`StampDocument::save`] each
//! touched page gets its original content wrapped in `q … Q` and a new
//! content stream appended, so the page's own graphics state can never leak
//! into the stamp. Pages that were never drawn on are left untouched.

use std::collections::BTreeMap;
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use super::font::{self, FontHandle};
use super::image::{ImageFormat, ImageXObject};
use super::overlay::{PageOverlay, TextColor};
use super::page_index::PageIndex;

/// Default page size (US Letter) when no MediaBox is found.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Depth limit when walking the Pages tree for inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Handle to an image XObject added to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    object_id: ObjectId,
    resource_name: String,
    /// Intrinsic width in pixels
    pub width: u32,
    /// Intrinsic height in pixels
    pub height: u32,
}

/// Text placement and appearance for [`StampDocument::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Lines are wrapped at word boundaries to stay within this width
    pub max_width: f32,
    pub color: TextColor,
}

/// A parsed PDF that can be stamped and serialized.
pub struct StampDocument {
    inner: Document,
    /// Page object ids in page order
    page_ids: Vec<ObjectId>,
    /// Buffered drawing per touched page
    overlays: BTreeMap<PageIndex, PageOverlay>,
    next_image: u32,
}

impl StampDocument {
    /// Parse a PDF from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_ids = inner.get_pages().into_values().collect();

        Ok(Self {
            inner,
            page_ids,
            overlays: BTreeMap::new(),
            next_image: 0,
        })
    }

    /// Get number of pages
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page: PageIndex) -> Result<ObjectId> {
        self.page_ids
            .get(page.as_usize())
            .copied()
            .ok_or(Error::PdfInvalidPage {
                page: page.as_usize(),
                total: self.page_ids.len(),
            })
    }

    /// Page width and height from its (possibly inherited) MediaBox.
    pub fn page_size(&self, page: PageIndex) -> Result<PageSize> {
        let page_id = self.page_id(page)?;
        let [x0, y0, x1, y1] = self.media_box(page_id);
        Ok(PageSize {
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        })
    }

    /// Add the built-in Helvetica font to the document.
    pub fn embed_font(&mut self) -> FontHandle {
        font::embed_helvetica(&mut self.inner)
    }

    /// Decode and add an image in the declared format.
    pub fn embed_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<ImageHandle> {
        let xobject = ImageXObject::from_bytes(bytes, format)?;

        let smask = xobject
            .mask_stream()?
            .map(|mask| self.inner.add_object(Object::Stream(mask)));
        let stream = xobject.to_pdf_stream(smask)?;
        let object_id = self.inner.add_object(Object::Stream(stream));

        self.next_image += 1;
        Ok(ImageHandle {
            object_id,
            resource_name: format!("ImStamp{}", self.next_image),
            width: xobject.width,
            height: xobject.height,
        })
    }

    /// Draw `text` on `page`, wrapping at `style.max_width`.
    pub fn draw_text(
        &mut self,
        page: PageIndex,
        font: &FontHandle,
        text: &str,
        style: &TextStyle,
    ) -> Result<()> {
        self.page_id(page)?;
        self.overlays
            .entry(page)
            .or_default()
            .push_text(font, text, style);
        Ok(())
    }

    /// Draw an embedded image at `(x, y)` with an explicit size.
    pub fn draw_image(
        &mut self,
        page: PageIndex,
        image: &ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        self.page_id(page)?;
        self.overlays
            .entry(page)
            .or_default()
            .push_image(image.resource_name.clone(), image.object_id, x, y, width, height);
        Ok(())
    }

    /// Apply buffered drawing and serialize the document.
    pub fn save(mut self) -> Result<Vec<u8>> {
        let overlays = std::mem::take(&mut self.overlays);
        for (page, overlay) in overlays {
            let page_id = self.page_id(page)?;
            self.apply_overlay(page_id, &overlay)?;
        }

        let mut output = Vec::new();
        self.inner
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(output)
    }

    fn apply_overlay(&mut self, page_id: ObjectId, overlay: &PageOverlay) -> Result<()> {
        let mut resources = self.resolve_resources(page_id);

        if let Some(font_id) = overlay.font() {
            self.add_resource(&mut resources, b"Font", font::FONT_RESOURCE_NAME, font_id);
        }
        for (name, image_id) in overlay.images() {
            self.add_resource(&mut resources, b"XObject", name, *image_id);
        }

        let prefix_id = self.inner.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let suffix_id = self.inner.add_object(Stream::new(
            Dictionary::new(),
            overlay.content_stream().into_bytes(),
        ));

        let mut contents = vec![Object::Reference(prefix_id)];
        contents.extend(self.existing_contents(page_id));
        contents.push(Object::Reference(suffix_id));

        let page = self
            .inner
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::PdfEdit(format!("Failed to get page: {e}")))?;

        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));

        Ok(())
    }

    /// Content stream references of a page, flattening an indirect array.
    fn existing_contents(&self, page_id: ObjectId) -> Vec<Object> {
        let Some(contents) = self
            .inner
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Contents").ok())
        else {
            return Vec::new();
        };

        match contents {
            Object::Array(streams) => streams.clone(),
            Object::Reference(id) => match self.inner.get_object(*id) {
                Ok(Object::Array(streams)) => streams.clone(),
                Ok(Object::Stream(_)) => vec![Object::Reference(*id)],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Add `name -> object_id` to the `category` sub-dictionary of `resources`.
    fn add_resource(
        &self,
        resources: &mut Dictionary,
        category: &[u8],
        name: &str,
        object_id: ObjectId,
    ) {
        let mut entries = resources
            .get(category)
            .ok()
            .and_then(|obj| self.resolve_dict_object(obj))
            .unwrap_or_default();

        entries.set(name, Object::Reference(object_id));
        resources.set(category, Object::Dictionary(entries));
    }

    /// Resolve the Resources dictionary for a page, handling indirect
    /// references and inheritance from parent Pages nodes.
    fn resolve_resources(&self, page_id: ObjectId) -> Dictionary {
        self.inherited_attribute(page_id, b"Resources")
            .and_then(|obj| self.resolve_dict_object(&obj))
            .unwrap_or_default()
    }

    fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let Some(Object::Array(arr)) = self
            .inherited_attribute(page_id, b"MediaBox")
            .map(|obj| self.resolve(obj))
        else {
            return DEFAULT_MEDIA_BOX;
        };

        let values: Vec<f32> = arr
            .iter()
            .filter_map(|o| match self.resolve(o.clone()) {
                #[allow(clippy::cast_precision_loss)]
                Object::Integer(i) => Some(i as f32),
                Object::Real(r) => Some(r),
                _ => None,
            })
            .collect();

        match values.as_slice() {
            [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// Look up `key` on the page, then up the Pages tree.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut node_id = page_id;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            let node = self.inner.get_dictionary(node_id).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
            node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    fn resolve(&self, obj: Object) -> Object {
        match obj {
            Object::Reference(id) => self.inner.get_object(id).cloned().unwrap_or(Object::Null),
            other => other,
        }
    }

    fn resolve_dict_object(&self, obj: &Object) -> Option<Dictionary> {
        match self.resolve(obj.clone()) {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Decoded content of a page (all content streams concatenated).
    pub fn page_content(&self, page: PageIndex) -> Result<Vec<u8>> {
        let page_id = self.page_id(page)?;
        self.inner
            .get_page_content(page_id)
            .map_err(|e| Error::PdfEdit(format!("Failed to read page content: {e}")))
    }
}

impl std::fmt::Debug for StampDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut touched = String::new();
        for page in self.overlays.keys() {
            let _ = write!(touched, "{page} ");
        }
        f.debug_struct("StampDocument")
            .field("page_count", &self.page_ids.len())
            .field("touched_pages", &touched.trim_end())
            .finish()
    }
}
