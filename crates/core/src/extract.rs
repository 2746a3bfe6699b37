//! Derived views over a presentation snapshot.
//!
//! Every view here is a pure function of one [`Presentation`]. Output order
//! always follows slide order, then element order, so keyed rendering in the
//! consuming layer stays stable across refreshes.

use crate::ids::{label_id_for, shape_id_for_label};
use crate::types::{AffineTransform, PageElementKind, Presentation, ShapeType, Size};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Slide position (0-based) to the text of each text-bearing shape on it.
pub type SlideTextIndex = BTreeMap<usize, Vec<String>>;

/// Render-oriented projection of a remote shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDescriptor {
    pub object_id: String,
    pub page_object_id: String,
    pub size: Option<Size>,
    pub transform: Option<AffineTransform>,
    pub shape_type: ShapeType,
}

impl ShapeDescriptor {
    /// Overlay rectangle in the snapshot's own units. Missing size or
    /// transform fields count as zero.
    pub fn overlay_rect(&self) -> OverlayRect {
        let transform = self.transform.unwrap_or_default();
        let size = self.size.unwrap_or_default();
        OverlayRect {
            object_id: self.object_id.clone(),
            left: transform.translate_x,
            top: transform.translate_y,
            width: size.width.magnitude,
            height: size.height.magnitude,
        }
    }
}

/// Absolutely positioned box an overlay draws over the embedded viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRect {
    pub object_id: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Text of each text-bearing shape, grouped by slide position.
///
/// Slides without text-bearing shapes still get an (empty) entry. A shape
/// whose text body is present but empty contributes an empty string.
pub fn extract_text(presentation: &Presentation) -> SlideTextIndex {
    presentation
        .slides
        .iter()
        .enumerate()
        .map(|(idx, slide)| {
            let texts: Vec<String> = slide
                .page_elements
                .iter()
                .filter_map(|element| match element.kind() {
                    PageElementKind::Shape(shape) => shape.text.as_ref(),
                    PageElementKind::Other => None,
                })
                .map(|text| text.plain_text())
                .collect();

            for text in texts.iter().filter(|t| !t.is_empty()) {
                log::trace!("Slide {}, text: {:?}", idx + 1, text);
            }

            (idx, texts)
        })
        .collect()
}

/// One descriptor per shape, in slide-then-element order.
pub fn extract_shapes(presentation: &Presentation) -> Vec<ShapeDescriptor> {
    let mut shapes = Vec::new();

    for slide in &presentation.slides {
        for element in &slide.page_elements {
            if let PageElementKind::Shape(shape) = element.kind() {
                shapes.push(ShapeDescriptor {
                    object_id: element.object_id.clone(),
                    page_object_id: slide.object_id.clone(),
                    size: element.size,
                    transform: element.transform,
                    shape_type: shape.shape_type,
                });
            }
        }
    }

    shapes
}

/// All views derived from a single snapshot.
///
/// Built in one pass from one [`Presentation`], so the text index, the
/// descriptors and the label map can never come from different fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentViews {
    pub slide_texts: SlideTextIndex,
    pub shapes: Vec<ShapeDescriptor>,

    /// Shape id to label id, for every shape whose label exists.
    pub labels: BTreeMap<String, String>,

    /// Slide ids in presentation order.
    pub slide_ids: Vec<String>,

    #[serde(skip)]
    object_ids: HashSet<String>,
}

impl DocumentViews {
    /// Derive every view from `presentation`.
    pub fn from_presentation(presentation: &Presentation) -> Self {
        let object_ids: HashSet<String> =
            presentation.object_ids().map(str::to_string).collect();

        let labels = object_ids
            .iter()
            .filter_map(|id| {
                let shape_id = shape_id_for_label(id)?;
                object_ids
                    .contains(shape_id)
                    .then(|| (shape_id.to_string(), label_id_for(shape_id)))
            })
            .collect();

        Self {
            slide_texts: extract_text(presentation),
            shapes: extract_shapes(presentation),
            labels,
            slide_ids: presentation.slides.iter().map(|s| s.object_id.clone()).collect(),
            object_ids,
        }
    }

    /// Whether any slide or element in the snapshot has this id.
    pub fn contains(&self, object_id: &str) -> bool {
        self.object_ids.contains(object_id)
    }

    /// Descriptor for a shape id.
    pub fn shape(&self, object_id: &str) -> Option<&ShapeDescriptor> {
        self.shapes.iter().find(|s| s.object_id == object_id)
    }

    /// Label id of a shape, if the label exists in the snapshot.
    pub fn label_for(&self, shape_id: &str) -> Option<&str> {
        self.labels.get(shape_id).map(String::as_str)
    }

    /// First slide id, used as the default target for new shapes.
    pub fn first_slide(&self) -> Option<&str> {
        self.slide_ids.first().map(String::as_str)
    }

    /// Overlay boxes for every shape, in descriptor order.
    pub fn overlay(&self) -> Vec<OverlayRect> {
        self.shapes.iter().map(ShapeDescriptor::overlay_rect).collect()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::types::{Page, PageElement, Shape, TextContent, TextElement, TextRun};
    use proptest::prelude::*;

    fn shape_type_strategy() -> impl Strategy<Value = ShapeType> {
        prop_oneof![
            Just(ShapeType::TextBox),
            Just(ShapeType::Rectangle),
            Just(ShapeType::Ellipse),
            Just(ShapeType::Star5),
            Just(ShapeType::TypeUnspecified),
        ]
    }

    /// `None` for a non-shape element, otherwise a shape with optional text runs.
    fn element_body_strategy() -> impl Strategy<Value = Option<Shape>> {
        let text = prop::option::of(prop::collection::vec("[a-z ]{0,8}", 0..4));
        prop::option::of((shape_type_strategy(), text)).prop_map(|body| {
            body.map(|(shape_type, runs)| Shape {
                shape_type,
                text: runs.map(|runs| TextContent {
                    text_elements: runs
                        .into_iter()
                        .map(|content| TextElement {
                            text_run: Some(TextRun { content }),
                        })
                        .collect(),
                }),
            })
        })
    }

    /// Decks with unique ids: slide `s<i>`, element `s<i>-e<j>`.
    fn presentation_strategy() -> impl Strategy<Value = Presentation> {
        prop::collection::vec(prop::collection::vec(element_body_strategy(), 0..6), 0..6).prop_map(
            |slides| Presentation {
                presentation_id: "deck".to_string(),
                title: None,
                slides: slides
                    .into_iter()
                    .enumerate()
                    .map(|(i, bodies)| Page {
                        object_id: format!("s{}", i),
                        page_elements: bodies
                            .into_iter()
                            .enumerate()
                            .map(|(j, shape)| PageElement {
                                object_id: format!("s{}-e{}", i, j),
                                shape,
                                ..Default::default()
                            })
                            .collect(),
                    })
                    .collect(),
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_shapes_follow_slide_then_element_order(p in presentation_strategy()) {
            let expected: Vec<(String, String)> = p
                .slides
                .iter()
                .flat_map(|s| {
                    s.page_elements
                        .iter()
                        .filter(|e| e.shape.is_some())
                        .map(move |e| (s.object_id.clone(), e.object_id.clone()))
                })
                .collect();
            let actual: Vec<(String, String)> = extract_shapes(&p)
                .into_iter()
                .map(|d| (d.page_object_id, d.object_id))
                .collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_text_index_covers_every_slide(p in presentation_strategy()) {
            let index = extract_text(&p);
            let keys: Vec<usize> = index.keys().copied().collect();
            prop_assert_eq!(keys, (0..p.slides.len()).collect::<Vec<_>>());

            for (idx, slide) in p.slides.iter().enumerate() {
                let with_text = slide
                    .page_elements
                    .iter()
                    .filter(|e| e.shape.as_ref().is_some_and(|s| s.text.is_some()))
                    .count();
                prop_assert_eq!(index[&idx].len(), with_text);
            }
        }

        #[test]
        fn prop_views_are_deterministic(p in presentation_strategy()) {
            let views = DocumentViews::from_presentation(&p);
            prop_assert_eq!(&views, &DocumentViews::from_presentation(&p.clone()));

            let json = serde_json::to_string(&p).unwrap();
            let reparsed = Presentation::from_json(&json).unwrap();
            prop_assert_eq!(&views, &DocumentViews::from_presentation(&reparsed));

            prop_assert_eq!(views.slide_ids.len(), p.slides.len());
            prop_assert_eq!(views.overlay().len(), views.shapes.len());
        }
    }
}
