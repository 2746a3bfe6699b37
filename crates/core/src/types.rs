//! Domain types for the remote presentation snapshot and the mutation
//! operations sent back to it.
//!
//! Field names follow the Slides v1 JSON shapes so a snapshot can be
//! deserialized straight from a `presentations.get` response and a batch
//! serialized straight into a `batchUpdate` body.

use serde::{Deserialize, Serialize};

/// A full, immutable, point-in-time copy of a remote presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Remote document identifier.
    #[serde(default)]
    pub presentation_id: String,

    /// Document title, if the service sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Slides in presentation order.
    #[serde(default)]
    pub slides: Vec<Page>,
}

impl Presentation {
    /// Parse a snapshot from a `presentations.get` JSON body.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a page element anywhere in the document.
    pub fn element(&self, object_id: &str) -> Option<&PageElement> {
        self.slides
            .iter()
            .flat_map(|s| s.page_elements.iter())
            .find(|e| e.object_id == object_id)
    }

    /// Identifiers of every slide and page element, in document order.
    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.slides.iter().flat_map(|s| {
            std::iter::once(s.object_id.as_str())
                .chain(s.page_elements.iter().map(|e| e.object_id.as_str()))
        })
    }
}

/// A slide: identifier plus its page elements in z-order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub object_id: String,

    #[serde(default)]
    pub page_elements: Vec<PageElement>,
}

/// Any object placed on a slide.
///
/// Only the shape variant is modeled; images, tables, lines and the rest
/// deserialize with `shape: None` and are skipped by the extractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    #[serde(default)]
    pub object_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<AffineTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
}

/// Borrowed view of which variant a [`PageElement`] is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageElementKind<'a> {
    Shape(&'a Shape),
    Other,
}

impl PageElement {
    /// Which variant this element is.
    pub fn kind(&self) -> PageElementKind<'_> {
        match &self.shape {
            Some(shape) => PageElementKind::Shape(shape),
            None => PageElementKind::Other,
        }
    }
}

/// Shape payload of a page element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default)]
    pub shape_type: ShapeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
}

/// Text attached to a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    #[serde(default)]
    pub text_elements: Vec<TextElement>,
}

impl TextContent {
    /// Concatenate every run's content in order. Paragraph markers and
    /// auto-text carry no run and contribute nothing.
    pub fn plain_text(&self) -> String {
        self.text_elements
            .iter()
            .filter_map(|te| te.text_run.as_ref())
            .map(|run| run.content.as_str())
            .collect()
    }
}

/// One structural piece of a text body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

/// A run of characters sharing one style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

/// Kinds of shape the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    TextBox,
    Rectangle,
    RoundRectangle,
    Ellipse,
    Triangle,
    #[serde(rename = "STAR_5")]
    Star5,
    Cloud,
    #[default]
    #[serde(other)]
    TypeUnspecified,
}

impl ShapeType {
    /// Wire name, also used when composing identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::TextBox => "TEXT_BOX",
            ShapeType::Rectangle => "RECTANGLE",
            ShapeType::RoundRectangle => "ROUND_RECTANGLE",
            ShapeType::Ellipse => "ELLIPSE",
            ShapeType::Triangle => "TRIANGLE",
            ShapeType::Star5 => "STAR_5",
            ShapeType::Cloud => "CLOUD",
            ShapeType::TypeUnspecified => "TYPE_UNSPECIFIED",
        }
    }

    /// Parse a wire name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_uppercase().as_str() {
            "TEXT_BOX" => ShapeType::TextBox,
            "RECTANGLE" => ShapeType::Rectangle,
            "ROUND_RECTANGLE" => ShapeType::RoundRectangle,
            "ELLIPSE" => ShapeType::Ellipse,
            "TRIANGLE" => ShapeType::Triangle,
            "STAR_5" => ShapeType::Star5,
            "CLOUD" => ShapeType::Cloud,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Emu,
    Pt,
    #[default]
    #[serde(other)]
    UnitUnspecified,
}

/// A magnitude in a single direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub magnitude: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl Dimension {
    /// A dimension in points.
    pub fn pt(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: Unit::Pt,
        }
    }
}

/// Width and height of a page element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub width: Dimension,
    #[serde(default)]
    pub height: Dimension,
}

impl Size {
    /// A size in points.
    pub fn pt(width: f64, height: f64) -> Self {
        Self {
            width: Dimension::pt(width),
            height: Dimension::pt(height),
        }
    }
}

fn one() -> f64 {
    1.0
}

/// 2D affine transform of a page element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffineTransform {
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default)]
    pub shear_x: f64,
    #[serde(default)]
    pub shear_y: f64,
    #[serde(default)]
    pub translate_x: f64,
    #[serde(default)]
    pub translate_y: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::translate_pt(0.0, 0.0)
    }
}

impl AffineTransform {
    /// Unscaled translation in points.
    pub fn translate_pt(x: f64, y: f64) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            translate_x: x,
            translate_y: y,
            unit: Unit::Pt,
        }
    }
}

/// One primitive mutation inside a `batchUpdate` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    CreateShape(CreateShapeRequest),
    InsertText(InsertTextRequest),
    UpdateTextStyle(UpdateTextStyleRequest),
    UpdatePageElementTransform(UpdatePageElementTransformRequest),
}

impl Request {
    /// Identifier this operation creates, if any.
    pub fn created_id(&self) -> Option<&str> {
        match self {
            Request::CreateShape(r) => Some(&r.object_id),
            _ => None,
        }
    }

    /// Identifier of an existing object this operation requires.
    ///
    /// For create-shape this is the owning page.
    pub fn referenced_id(&self) -> &str {
        match self {
            Request::CreateShape(r) => &r.element_properties.page_object_id,
            Request::InsertText(r) => &r.object_id,
            Request::UpdateTextStyle(r) => &r.object_id,
            Request::UpdatePageElementTransform(r) => &r.object_id,
        }
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateShape(_) => "createShape",
            Request::InsertText(_) => "insertText",
            Request::UpdateTextStyle(_) => "updateTextStyle",
            Request::UpdatePageElementTransform(_) => "updatePageElementTransform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShapeRequest {
    pub object_id: String,
    pub shape_type: ShapeType,
    pub element_properties: PageElementProperties,
}

/// Placement of a newly created element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElementProperties {
    pub page_object_id: String,
    pub size: Size,
    pub transform: AffineTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextRequest {
    pub object_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyleRequest {
    pub object_id: String,
    pub text_range: TextRange,
    pub style: TextStyle,
    /// Comma-joined mask naming which style fields to apply.
    pub fields: String,
}

/// Character range inside a text body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    #[serde(rename = "type")]
    pub range_type: RangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
}

impl TextRange {
    /// Half-open `[start, end)` range.
    pub fn fixed(start: u32, end: u32) -> crate::Result<Self> {
        if end < start {
            return Err(crate::Error::InvalidRange { start, end });
        }
        Ok(Self {
            range_type: RangeType::FixedRange,
            start_index: Some(start),
            end_index: Some(end),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeType {
    FixedRange,
    FromStartIndex,
    All,
}

/// Style fields; only the ones named in the request's mask are applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<OptionalColor>,
}

impl TextStyle {
    /// Field mask listing every field that is set.
    pub fn field_mask(&self) -> String {
        let mut fields = Vec::new();
        if self.foreground_color.is_some() {
            fields.push("foregroundColor");
        }
        if self.font_family.is_some() {
            fields.push("fontFamily");
        }
        if self.font_size.is_some() {
            fields.push("fontSize");
        }
        fields.join(",")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalColor {
    pub opaque_color: OpaqueColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueColor {
    pub rgb_color: RgbColor,
}

/// Color channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RgbColor {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

impl From<RgbColor> for OptionalColor {
    fn from(rgb_color: RgbColor) -> Self {
        Self {
            opaque_color: OpaqueColor { rgb_color },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageElementTransformRequest {
    pub object_id: String,
    pub transform: AffineTransform,
    pub apply_mode: ApplyMode,
}

/// How an update-transform combines with the current transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyMode {
    /// Replace the current transform.
    Absolute,
    /// Compose with the current transform.
    Relative,
}

/// Body of a `batchUpdate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

/// Reply to a `batchUpdate` call. Replies are kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub presentation_id: String,
    #[serde(default)]
    pub replies: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_with_missing_fields() {
        let json = r#"{
            "presentationId": "p1",
            "slides": [
                {"objectId": "s1", "pageElements": [
                    {"objectId": "e1", "shape": {"shapeType": "TEXT_BOX",
                        "text": {"textElements": [
                            {"paragraphMarker": {}},
                            {"textRun": {"content": "Hi"}},
                            {"textRun": {}}
                        ]}}},
                    {"objectId": "img", "image": {}}
                ]},
                {"objectId": "s2"}
            ]
        }"#;

        let p = Presentation::from_json(json).unwrap();
        assert_eq!(p.slides.len(), 2);
        assert!(p.slides[1].page_elements.is_empty());

        let e1 = p.element("e1").unwrap();
        match e1.kind() {
            PageElementKind::Shape(shape) => {
                assert_eq!(shape.shape_type, ShapeType::TextBox);
                assert_eq!(shape.text.as_ref().unwrap().plain_text(), "Hi");
            }
            PageElementKind::Other => panic!("expected shape"),
        }
        assert_eq!(p.element("img").unwrap().kind(), PageElementKind::Other);
    }

    #[test]
    fn test_parse_elements_without_object_id() {
        let json = r#"{"slides": [
            {"pageElements": [
                {"shape": {"shapeType": "RECTANGLE"}},
                {"objectId": "e2", "shape": {"shapeType": "ELLIPSE"}}
            ]}
        ]}"#;

        let p = Presentation::from_json(json).unwrap();
        assert_eq!(p.slides[0].object_id, "");
        assert_eq!(p.slides[0].page_elements[0].object_id, "");
        assert_eq!(p.element("e2").unwrap().shape.as_ref().unwrap().shape_type, ShapeType::Ellipse);
    }

    #[test]
    fn test_unknown_shape_type_and_unit() {
        let json = r#"{"shapeType": "WAVE"}"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.shape_type, ShapeType::TypeUnspecified);

        let dim: Dimension = serde_json::from_str(r#"{"magnitude": 3000000, "unit": "EMU"}"#).unwrap();
        assert_eq!(dim.unit, Unit::Emu);

        let t: AffineTransform = serde_json::from_str(r#"{"translateX": 5}"#).unwrap();
        assert_eq!(t.scale_x, 1.0);
        assert_eq!(t.translate_x, 5.0);
        assert_eq!(t.unit, Unit::UnitUnspecified);
    }

    #[test]
    fn test_request_wire_shape() {
        let req = Request::UpdatePageElementTransform(UpdatePageElementTransformRequest {
            object_id: "a".to_string(),
            transform: AffineTransform::translate_pt(100.0, 0.0),
            apply_mode: ApplyMode::Relative,
        });
        let value = serde_json::to_value(&req).unwrap();
        let inner = &value["updatePageElementTransform"];
        assert_eq!(inner["objectId"], "a");
        assert_eq!(inner["applyMode"], "RELATIVE");
        assert_eq!(inner["transform"]["translateX"], 100.0);
        assert_eq!(inner["transform"]["unit"], "PT");
    }

    #[test]
    fn test_text_range_and_field_mask() {
        assert!(TextRange::fixed(10, 5).is_err());
        let range = TextRange::fixed(5, 10).unwrap();
        let value = serde_json::to_value(range).unwrap();
        assert_eq!(value["type"], "FIXED_RANGE");
        assert_eq!(value["startIndex"], 5);

        let style = TextStyle {
            font_family: Some("Times New Roman".to_string()),
            font_size: Some(Dimension::pt(14.0)),
            foreground_color: Some(RgbColor { red: 0.0, green: 0.0, blue: 1.0 }.into()),
        };
        assert_eq!(style.field_mask(), "foregroundColor,fontFamily,fontSize");
    }

    #[test]
    fn test_object_ids_in_document_order() {
        let p = Presentation {
            presentation_id: "p".to_string(),
            title: None,
            slides: vec![Page {
                object_id: "s1".to_string(),
                page_elements: vec![PageElement {
                    object_id: "e1".to_string(),
                    ..Default::default()
                }],
            }],
        };
        let ids: Vec<&str> = p.object_ids().collect();
        assert_eq!(ids, vec!["s1", "e1"]);
    }
}
