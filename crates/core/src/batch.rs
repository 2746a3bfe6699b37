//! Mutation batch construction.
//!
//! A batch is applied atomically and in order by the remote service, so the
//! order of operations is the only thing guaranteeing an object exists
//! before something refers to it.

use crate::error::{Error, ObjectKind, Result};
use crate::extract::DocumentViews;
use crate::ids::{label_id_for, IdAllocator, RandomSuffix, SuffixSource};
use crate::types::{
    AffineTransform, ApplyMode, CreateShapeRequest, Dimension, InsertTextRequest,
    PageElementProperties, Request, RgbColor, ShapeType, Size, TextRange, TextStyle,
    UpdatePageElementTransformRequest, UpdateTextStyleRequest,
};
use std::collections::HashSet;

/// Placement and styling used for new shapes and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTemplate {
    pub shape_size: Size,
    pub shape_transform: AffineTransform,
    pub label_size: Size,
    pub label_transform: AffineTransform,
    /// Character range `[start, end)` of the label that receives `label_style`.
    pub label_style_range: (u32, u32),
    pub label_style: TextStyle,
}

impl Default for ShapeTemplate {
    fn default() -> Self {
        Self {
            shape_size: Size::pt(300.0, 100.0),
            shape_transform: AffineTransform::translate_pt(100.0, 100.0),
            label_size: Size::pt(150.0, 30.0),
            label_transform: AffineTransform::translate_pt(100.0, 70.0),
            label_style_range: (5, 10),
            label_style: TextStyle {
                font_family: Some("Times New Roman".to_string()),
                font_size: Some(Dimension::pt(14.0)),
                foreground_color: Some(
                    RgbColor {
                        red: 0.0,
                        green: 0.0,
                        blue: 1.0,
                    }
                    .into(),
                ),
            },
        }
    }
}

impl ShapeTemplate {
    /// Create the default template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the main shape at `(x, y)` points.
    pub fn with_shape_position(mut self, x: f64, y: f64) -> Self {
        self.shape_transform = AffineTransform::translate_pt(x, y);
        self
    }

    /// Place the label at `(x, y)` points.
    pub fn with_label_position(mut self, x: f64, y: f64) -> Self {
        self.label_transform = AffineTransform::translate_pt(x, y);
        self
    }

    /// Style a different character range of the label.
    pub fn with_label_style_range(mut self, start: u32, end: u32) -> Self {
        self.label_style_range = (start, end);
        self
    }

    /// Apply a different style to the label range.
    pub fn with_label_style(mut self, style: TextStyle) -> Self {
        self.label_style = style;
        self
    }
}

/// Builds internally consistent mutation batches.
#[derive(Debug, Clone)]
pub struct BatchBuilder<S = RandomSuffix> {
    template: ShapeTemplate,
    allocator: IdAllocator<S>,
}

impl Default for BatchBuilder<RandomSuffix> {
    fn default() -> Self {
        Self::with_allocator(IdAllocator::new())
    }
}

impl BatchBuilder<RandomSuffix> {
    /// Create a builder with the default template and random identifiers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SuffixSource> BatchBuilder<S> {
    /// Create a builder that allocates identifiers with `allocator`.
    pub fn with_allocator(allocator: IdAllocator<S>) -> Self {
        Self {
            template: ShapeTemplate::default(),
            allocator,
        }
    }

    /// Use a custom shape template.
    pub fn with_template(mut self, template: ShapeTemplate) -> Self {
        self.template = template;
        self
    }

    /// Build the batch that creates a shape plus its label on `slide_id`.
    ///
    /// Emits, in order: create shape, create label, insert the shape id as
    /// the label's text, style a range of the label, and (only when
    /// `label_text` is non-empty) insert `label_text` into the shape.
    pub fn create_shape_batch(
        &mut self,
        views: &DocumentViews,
        slide_id: &str,
        color: &str,
        kind: ShapeType,
        label_text: Option<&str>,
    ) -> Result<Vec<Request>> {
        if !views.slide_ids.iter().any(|s| s == slide_id) {
            return Err(Error::not_found(ObjectKind::Slide, slide_id));
        }

        let (start, end) = self.template.label_style_range;
        let text_range = TextRange::fixed(start, end)?;

        let shape_id = self
            .allocator
            .allocate(color, kind, |id| views.contains(id))?;
        let label_id = label_id_for(&shape_id);

        let mut requests = vec![
            Request::CreateShape(CreateShapeRequest {
                object_id: shape_id.clone(),
                shape_type: kind,
                element_properties: PageElementProperties {
                    page_object_id: slide_id.to_string(),
                    size: self.template.shape_size,
                    transform: self.template.shape_transform,
                },
            }),
            Request::CreateShape(CreateShapeRequest {
                object_id: label_id.clone(),
                shape_type: ShapeType::TextBox,
                element_properties: PageElementProperties {
                    page_object_id: slide_id.to_string(),
                    size: self.template.label_size,
                    transform: self.template.label_transform,
                },
            }),
            Request::InsertText(InsertTextRequest {
                object_id: label_id.clone(),
                text: shape_id.clone(),
                insertion_index: None,
            }),
            Request::UpdateTextStyle(UpdateTextStyleRequest {
                object_id: label_id,
                text_range,
                fields: self.template.label_style.field_mask(),
                style: self.template.label_style.clone(),
            }),
        ];

        if let Some(text) = label_text.filter(|t| !t.is_empty()) {
            requests.push(Request::InsertText(InsertTextRequest {
                object_id: shape_id.clone(),
                text: text.to_string(),
                insertion_index: None,
            }));
        }

        log::debug!(
            "Built create batch for {} on {} ({} operations)",
            shape_id,
            slide_id,
            requests.len()
        );

        Ok(requests)
    }

    /// Build the batch that moves a shape and its label by `(dx, dy)` points.
    ///
    /// Both transforms are applied relative to the current ones. Fails with
    /// `NotFound` (and builds nothing) when the shape or its label is
    /// missing from the snapshot.
    pub fn move_shape_batch(
        &self,
        views: &DocumentViews,
        shape_id: &str,
        dx: f64,
        dy: f64,
    ) -> Result<Vec<Request>> {
        if views.shape(shape_id).is_none() {
            return Err(Error::not_found(ObjectKind::Shape, shape_id));
        }
        let label_id = views
            .label_for(shape_id)
            .ok_or_else(|| Error::not_found(ObjectKind::Label, label_id_for(shape_id)))?;

        let delta = AffineTransform::translate_pt(dx, dy);
        let requests = [shape_id, label_id]
            .into_iter()
            .map(|id| {
                Request::UpdatePageElementTransform(UpdatePageElementTransformRequest {
                    object_id: id.to_string(),
                    transform: delta,
                    apply_mode: ApplyMode::Relative,
                })
            })
            .collect();

        Ok(requests)
    }
}

/// Check a batch against the snapshot it will be applied to.
///
/// Every referenced id must either exist in `views` or be created by an
/// earlier operation of the same batch, and no created id may already exist.
pub fn verify_references(batch: &[Request], views: &DocumentViews) -> Result<()> {
    let mut created: HashSet<&str> = HashSet::new();

    for (index, request) in batch.iter().enumerate() {
        let referenced = request.referenced_id();
        if !created.contains(referenced) && !views.contains(referenced) {
            return Err(Error::DanglingReference {
                index,
                id: referenced.to_string(),
            });
        }

        if let Some(id) = request.created_id() {
            if views.contains(id) || !created.insert(id) {
                return Err(Error::IdCollision(id.to_string()));
            }
        }
    }

    Ok(())
}
