//! Stamp request model and wire-format conversion.
//!
//! The wire format mixes title-block metadata into `fieldPositions` under
//! underscore-prefixed keys (`_titleblockWidth`, `_titleblockX`,
//! `_titleblockY`). [`StampPayload::into_request`] lifts those keys into a
//! structured [`TitleBlockSpec`] so that [`FieldLayout::fields`] only ever
//! holds drawable fields.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pdf::PageSelector;

/// Prefix marking a `fieldPositions` key as metadata rather than a field.
pub const META_KEY_PREFIX: char = '_';

/// Default horizontal field position (points).
pub const DEFAULT_FIELD_X: f32 = 10.0;
/// Default vertical field position (points, from the bottom edge).
pub const DEFAULT_FIELD_Y: f32 = 10.0;
/// Default field font size (points).
pub const DEFAULT_FONT_SIZE: f32 = 8.0;
/// Default wrapping width for field text (points).
pub const DEFAULT_MAX_WIDTH: f32 = 300.0;

/// Default drawn width of the title-block image (points).
pub const DEFAULT_TITLE_BLOCK_WIDTH: f32 = 600.0;

const TITLE_BLOCK_WIDTH_KEY: &str = "_titleblockWidth";
const TITLE_BLOCK_X_KEY: &str = "_titleblockX";
const TITLE_BLOCK_Y_KEY: &str = "_titleblockY";

const FILE_URL_REQUIRED: &str = "fileUrl required";

// =============================================================================
// Model
// =============================================================================

/// Where and how large a single field is drawn.
///
/// Unset values fall back to the `DEFAULT_*` constants. A zero on the wire
/// counts as unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementSpec {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub size: Option<f32>,
    pub max_width: Option<f32>,
}

/// A [`PlacementSpec`] with every default applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub max_width: f32,
}

impl PlacementSpec {
    pub fn resolve(&self) -> Placement {
        Placement {
            x: self.x.unwrap_or(DEFAULT_FIELD_X),
            y: self.y.unwrap_or(DEFAULT_FIELD_Y),
            size: self.size.unwrap_or(DEFAULT_FONT_SIZE),
            max_width: self.max_width.unwrap_or(DEFAULT_MAX_WIDTH),
        }
    }

    fn from_value(value: &Value) -> Self {
        Self {
            x: number_field(value, "x"),
            y: number_field(value, "y"),
            size: number_field(value, "size"),
            max_width: number_field(value, "maxWidth"),
        }
    }
}

/// Title-block image placement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TitleBlockSpec {
    /// Target drawn width; height follows the image's aspect ratio
    pub width: Option<f32>,
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl TitleBlockSpec {
    pub fn width(&self) -> f32 {
        self.width.unwrap_or(DEFAULT_TITLE_BLOCK_WIDTH)
    }

    pub fn x(&self) -> f32 {
        self.x.unwrap_or(0.0)
    }

    pub fn y(&self) -> f32 {
        self.y.unwrap_or(0.0)
    }

    /// Drawn `(width, height)` for an image of the given intrinsic size.
    ///
    /// Both dimensions share one scale factor so the aspect ratio is kept.
    /// Returns `None` for a zero-width image.
    #[allow(clippy::cast_precision_loss)]
    pub fn scaled_size(&self, intrinsic_width: u32, intrinsic_height: u32) -> Option<(f32, f32)> {
        if intrinsic_width == 0 {
            return None;
        }
        let scale = self.width() / intrinsic_width as f32;
        Some((
            intrinsic_width as f32 * scale,
            intrinsic_height as f32 * scale,
        ))
    }
}

/// Field placements plus title-block metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldLayout {
    pub title_block: TitleBlockSpec,
    /// Drawable fields, in caller-supplied order
    pub fields: IndexMap<String, PlacementSpec>,
}

/// A validated stamping request.
#[derive(Debug, Clone, PartialEq)]
pub struct StampRequest {
    pub source_url: String,
    /// Field values, already coerced to strings
    pub field_values: IndexMap<String, String>,
    pub title_block_url: Option<String>,
    pub layout: FieldLayout,
    pub pages: PageSelector,
}

impl StampRequest {
    /// Create a request for `source_url` with no fields, stamping page 0.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            field_values: IndexMap::new(),
            title_block_url: None,
            layout: FieldLayout::default(),
            pages: PageSelector::default(),
        }
    }

    /// Text to draw for `field`, or `None` when the value is absent or empty.
    pub fn text_for(&self, field: &str) -> Option<&str> {
        self.field_values
            .get(field)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    /// `(text, placement)` pairs that will actually be drawn, in layout order.
    pub fn drawable_fields(&self) -> impl Iterator<Item = (&str, Placement)> {
        self.layout
            .fields
            .iter()
            .filter_map(|(name, spec)| self.text_for(name).map(|text| (text, spec.resolve())))
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// Optional structured title-block settings on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleBlockPayload {
    #[serde(default, deserialize_with = "lenient_number")]
    pub width: Option<f32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f32>,
}

/// JSON request body as posted by callers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_url: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub parsed_fields: IndexMap<String, Value>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub template_image_url: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub field_positions: IndexMap<String, Value>,

    #[serde(default = "default_true", deserialize_with = "lenient_flag")]
    pub stamp_first_page_only: bool,

    /// Structured alternative to the `_titleblock*` keys
    #[serde(default)]
    pub title_block: Option<TitleBlockPayload>,

    /// Explicit 0-based page indices; overrides `stampFirstPageOnly`
    #[serde(default)]
    pub pages: Option<Vec<usize>>,
}

impl Default for StampPayload {
    fn default() -> Self {
        Self {
            file_url: None,
            parsed_fields: IndexMap::new(),
            template_image_url: None,
            field_positions: IndexMap::new(),
            stamp_first_page_only: true,
            title_block: None,
            pages: None,
        }
    }
}

impl StampPayload {
    /// Validate the payload and convert it into a [`StampRequest`].
    pub fn into_request(self) -> Result<StampRequest> {
        let source_url = self
            .file_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Validation(FILE_URL_REQUIRED.to_string()))?;

        let mut title_block = TitleBlockSpec::default();
        let mut fields = IndexMap::with_capacity(self.field_positions.len());

        for (name, value) in &self.field_positions {
            if name.starts_with(META_KEY_PREFIX) {
                match name.as_str() {
                    TITLE_BLOCK_WIDTH_KEY => title_block.width = coerce_number(value),
                    TITLE_BLOCK_X_KEY => title_block.x = coerce_number(value),
                    TITLE_BLOCK_Y_KEY => title_block.y = coerce_number(value),
                    _ => tracing::debug!("Ignoring unknown layout metadata key {}", name),
                }
                continue;
            }
            fields.insert(name.clone(), PlacementSpec::from_value(value));
        }

        if let Some(explicit) = self.title_block {
            title_block.width = explicit.width.or(title_block.width);
            title_block.x = explicit.x.or(title_block.x);
            title_block.y = explicit.y.or(title_block.y);
        }

        let field_values = self
            .parsed_fields
            .into_iter()
            .map(|(name, value)| (name, coerce_text(value)))
            .collect();

        let pages = match self.pages {
            Some(indices) => PageSelector::Indices(indices),
            None if self.stamp_first_page_only => PageSelector::FirstPageOnly,
            None => PageSelector::AllPages,
        };

        Ok(StampRequest {
            source_url,
            field_values,
            title_block_url: self.template_image_url.filter(|url| !url.is_empty()),
            layout: FieldLayout { title_block, fields },
            pages,
        })
    }
}

/// Whether a JSON value counts as set: `null`, `false`, `0` and `""` do not.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a field value to the text that gets drawn; unset values are empty.
fn coerce_text(value: Value) -> String {
    if !is_truthy(&value) {
        return String::new();
    }
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Accept non-zero JSON numbers and numeric strings; anything else is unset.
#[allow(clippy::cast_possible_truncation)]
fn coerce_number(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite() && *f != 0.0)
}

fn number_field(value: &Value, key: &str) -> Option<f32> {
    value.get(key).and_then(coerce_number)
}

const fn default_true() -> bool {
    true
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` keeps the default of `true`; other values follow [`is_truthy`].
fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.is_null() || is_truthy(&value))
}

/// Non-string values are treated as absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<StampRequest> {
        serde_json::from_value::<StampPayload>(body).unwrap().into_request()
    }

    #[test]
    fn test_missing_file_url_rejected() {
        let err = parse(json!({ "parsedFields": { "name": "Alice" } })).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "fileUrl required");
    }

    #[test]
    fn test_empty_file_url_rejected() {
        assert!(parse(json!({ "fileUrl": "" })).unwrap_err().is_validation());
        assert!(parse(json!({ "fileUrl": null })).unwrap_err().is_validation());
    }

    #[test]
    fn test_non_string_file_url_rejected() {
        for url in [json!(false), json!(0), json!(42), json!({"href": "u"})] {
            let err = parse(json!({ "fileUrl": url })).unwrap_err();
            assert_eq!(err.to_string(), "fileUrl required");
        }
        let req = parse(json!({ "fileUrl": "u", "templateImageUrl": 7 })).unwrap();
        assert_eq!(req.title_block_url, None);
    }

    #[test]
    fn test_first_page_flag_truthiness() {
        for (flag, expected) in [
            (json!(0), PageSelector::AllPages),
            (json!(""), PageSelector::AllPages),
            (json!(1), PageSelector::FirstPageOnly),
            (json!("false"), PageSelector::FirstPageOnly),
            (json!("yes"), PageSelector::FirstPageOnly),
        ] {
            let req = parse(json!({ "fileUrl": "u", "stampFirstPageOnly": flag })).unwrap();
            assert_eq!(req.pages, expected);
        }
    }

    #[test]
    fn test_defaults() {
        let req = parse(json!({ "fileUrl": "https://x/doc.pdf" })).unwrap();
        assert_eq!(req.source_url, "https://x/doc.pdf");
        assert!(req.field_values.is_empty());
        assert!(req.layout.fields.is_empty());
        assert_eq!(req.title_block_url, None);
        assert_eq!(req.pages, PageSelector::FirstPageOnly);
        assert_eq!(req.layout.title_block.width(), DEFAULT_TITLE_BLOCK_WIDTH);
    }

    #[test]
    fn test_stamp_all_pages() {
        let req = parse(json!({ "fileUrl": "u", "stampFirstPageOnly": false })).unwrap();
        assert_eq!(req.pages, PageSelector::AllPages);
    }

    #[test]
    fn test_explicit_pages_override_flag() {
        let req = parse(json!({ "fileUrl": "u", "stampFirstPageOnly": true, "pages": [2, 0] }))
            .unwrap();
        assert_eq!(req.pages, PageSelector::Indices(vec![2, 0]));
    }

    #[test]
    fn test_meta_keys_lifted_into_title_block() {
        let req = parse(json!({
            "fileUrl": "u",
            "fieldPositions": {
                "_titleblockWidth": 400,
                "_titleblockX": "20",
                "_titleblockY": 30,
                "_somethingElse": { "x": 1 },
                "name": { "x": 50 }
            }
        }))
        .unwrap();

        assert_eq!(req.layout.fields.len(), 1);
        assert!(req.layout.fields.contains_key("name"));
        assert!(req.layout.fields.keys().all(|k| !k.starts_with(META_KEY_PREFIX)));
        assert_eq!(req.layout.title_block.width(), 400.0);
        assert_eq!(req.layout.title_block.x(), 20.0);
        assert_eq!(req.layout.title_block.y(), 30.0);
    }

    #[test]
    fn test_structured_title_block_wins() {
        let req = parse(json!({
            "fileUrl": "u",
            "fieldPositions": { "_titleblockWidth": 400, "_titleblockX": 5 },
            "titleBlock": { "width": 250 }
        }))
        .unwrap();
        assert_eq!(req.layout.title_block.width(), 250.0);
        assert_eq!(req.layout.title_block.x(), 5.0);
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let req = parse(json!({
            "fileUrl": "u",
            "fieldPositions": {
                "a": { "x": 0, "y": 0, "size": 0, "maxWidth": 0 },
                "b": { "x": "0", "size": 0.0 },
                "_titleblockWidth": 0
            }
        }))
        .unwrap();

        let a = req.layout.fields["a"].resolve();
        assert_eq!((a.x, a.y, a.size, a.max_width), (10.0, 10.0, 8.0, 300.0));
        let b = req.layout.fields["b"].resolve();
        assert_eq!((b.x, b.size), (10.0, 8.0));
        assert_eq!(req.layout.title_block.width(), DEFAULT_TITLE_BLOCK_WIDTH);
    }

    #[test]
    fn test_placement_defaults_and_coercion() {
        let req = parse(json!({
            "fileUrl": "u",
            "fieldPositions": {
                "a": { "x": "50", "y": 700, "size": 10 },
                "b": {},
                "c": "not an object",
                "d": { "x": "abc", "maxWidth": 120 }
            }
        }))
        .unwrap();

        let a = req.layout.fields["a"].resolve();
        assert_eq!((a.x, a.y, a.size, a.max_width), (50.0, 700.0, 10.0, 300.0));

        let b = req.layout.fields["b"].resolve();
        assert_eq!((b.x, b.y, b.size, b.max_width), (10.0, 10.0, 8.0, 300.0));

        let c = req.layout.fields["c"].resolve();
        assert_eq!(c, b);

        let d = req.layout.fields["d"].resolve();
        assert_eq!((d.x, d.max_width), (10.0, 120.0));
    }

    #[test]
    fn test_field_order_preserved() {
        let req = parse(json!({
            "fileUrl": "u",
            "fieldPositions": { "zeta": {}, "alpha": {}, "mid": {} }
        }))
        .unwrap();
        let names: Vec<_> = req.layout.fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_field_value_coercion() {
        let req = parse(json!({
            "fileUrl": "u",
            "parsedFields": {
                "n": 42, "b": true, "z": null, "s": "text", "e": "",
                "zero": 0, "no": false, "neg": -1.5, "str0": "0"
            }
        }))
        .unwrap();
        assert_eq!(req.text_for("n"), Some("42"));
        assert_eq!(req.text_for("b"), Some("true"));
        assert_eq!(req.text_for("zero"), None);
        assert_eq!(req.text_for("no"), None);
        assert_eq!(req.text_for("neg"), Some("-1.5"));
        assert_eq!(req.text_for("str0"), Some("0"));
        assert_eq!(req.text_for("z"), None);
        assert_eq!(req.text_for("s"), Some("text"));
        assert_eq!(req.text_for("e"), None);
        assert_eq!(req.text_for("missing"), None);
    }

    #[test]
    fn test_drawable_fields_skip_empty_values() {
        let req = parse(json!({
            "fileUrl": "u",
            "parsedFields": { "name": "Alice", "date": "" },
            "fieldPositions": {
                "name": { "x": 50, "y": 700, "size": 10 },
                "date": { "x": 1 },
                "title": { "x": 2 }
            }
        }))
        .unwrap();

        let drawn: Vec<_> = req.drawable_fields().collect();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].0, "Alice");
        assert_eq!(drawn[0].1.x, 50.0);
        assert_eq!(drawn[0].1.y, 700.0);
        assert_eq!(drawn[0].1.size, 10.0);
    }

    #[test]
    fn test_null_collections_default() {
        let req = parse(json!({
            "fileUrl": "u",
            "parsedFields": null,
            "fieldPositions": null,
            "stampFirstPageOnly": null
        }))
        .unwrap();
        assert!(req.field_values.is_empty());
        assert_eq!(req.pages, PageSelector::FirstPageOnly);
    }

    #[test]
    fn test_empty_template_url_ignored() {
        let req = parse(json!({ "fileUrl": "u", "templateImageUrl": "" })).unwrap();
        assert_eq!(req.title_block_url, None);
    }

    #[test]
    fn test_title_block_scaling_preserves_aspect() {
        let spec = TitleBlockSpec::default();
        let (w, h) = spec.scaled_size(1200, 300).unwrap();
        assert_eq!(w, 600.0);
        assert_eq!(h, 150.0);

        let spec = TitleBlockSpec {
            width: Some(200.0),
            ..Default::default()
        };
        let (w, h) = spec.scaled_size(100, 50).unwrap();
        assert_eq!((w, h), (200.0, 100.0));

        assert!(spec.scaled_size(0, 50).is_none());
    }
}
