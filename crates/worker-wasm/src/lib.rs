//! WASM bindings for running the sync engine inside a browser page.
//!
//! The JavaScript host owns sign-in and the network (it already has the
//! authorized API client). Rust owns everything between: applying fetched
//! snapshots in generation order, deriving views, and building checked
//! mutation batches the host then submits verbatim.

use serde::{Deserialize, Serialize};
use slides_core::intent::normalize_transcript;
use slides_core::types::BatchUpdateResponse;
use slides_core::{
    verify_references, BatchBuilder, DocumentViews, Error, FetchOutcome, FetchTicket,
    Presentation, Request, ShapeType, SlidesClient, SyncController,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Client stand-in: requests are issued by the JavaScript host, so the
/// controller's own network entry points are never used here.
struct HostClient;

impl SlidesClient for HostClient {
    fn get_presentation(&self, _presentation_id: &str) -> slides_core::Result<Presentation> {
        Err(Error::RemoteUnavailable("fetches are issued by the host".to_string()))
    }

    fn batch_update(
        &self,
        _presentation_id: &str,
        _requests: &[Request],
    ) -> slides_core::Result<BatchUpdateResponse> {
        Err(Error::RemoteUnavailable("batches are submitted by the host".to_string()))
    }
}

/// Result of applying a snapshot, as seen by JavaScript.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// False when a newer snapshot was already applied.
    pub applied: bool,
    pub generation: u64,
    /// Key to force the embedded viewer to reload.
    pub refresh_key: u64,
}

/// Result of handing a transcript to the dispatcher.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpokenResult {
    pub recognized: bool,
    pub text: String,
}

// Maps become plain objects so hosts can index `slideTexts[0]` or `labels[id]`.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn js_error(e: Error) -> JsValue {
    log::error!("{}", e);
    JsValue::from_str(&e.to_string())
}

/// Derive slide texts, shape descriptors and labels from a raw
/// `presentations.get` result.
#[wasm_bindgen]
pub fn extract_views(snapshot: JsValue) -> Result<JsValue, JsValue> {
    let presentation: Presentation = from_js(snapshot, "presentation")?;
    to_js(&DocumentViews::from_presentation(&presentation))
}

/// Views of the held snapshot, failing when signed out or not yet synced.
fn synced_views(controller: &SyncController<HostClient>) -> slides_core::Result<&DocumentViews> {
    controller.ensure_ready()?;
    controller.views().ok_or_else(|| {
        Error::not_found(slides_core::ObjectKind::Snapshot, controller.presentation_id())
    })
}

/// One signed-in browser session against one presentation.
#[wasm_bindgen]
pub struct SlidesSession {
    controller: SyncController<HostClient>,
    builder: BatchBuilder,
    pending: Vec<FetchTicket>,
}

#[wasm_bindgen]
impl SlidesSession {
    #[wasm_bindgen(constructor)]
    pub fn new(presentation_id: &str) -> SlidesSession {
        SlidesSession {
            controller: SyncController::new(HostClient, presentation_id),
            builder: BatchBuilder::new(),
            pending: Vec::new(),
        }
    }

    /// Feed the host's signed-in listener.
    #[wasm_bindgen(js_name = setSignedIn)]
    pub fn set_signed_in(&mut self, signed_in: bool) {
        self.controller.on_auth_changed(signed_in);
        if !signed_in {
            self.pending.clear();
        }
    }

    /// Start a fetch; pass the returned generation to `applySnapshot`.
    #[wasm_bindgen(js_name = beginFetch)]
    pub fn begin_fetch(&mut self) -> Result<u64, JsValue> {
        self.begin_fetch_impl().map_err(js_error)
    }

    /// Forget a fetch the host gave up on (network error, timeout).
    #[wasm_bindgen(js_name = abandonFetch)]
    pub fn abandon_fetch(&mut self, generation: u64) -> bool {
        self.abandon_fetch_impl(generation)
    }

    /// Install the snapshot fetched under `generation`.
    #[wasm_bindgen(js_name = applySnapshot)]
    pub fn apply_snapshot(&mut self, generation: u64, snapshot: JsValue) -> Result<JsValue, JsValue> {
        let presentation: Presentation = from_js(snapshot, "presentation")?;
        let result = self.apply_snapshot_impl(generation, presentation)?;
        to_js(&result)
    }

    /// Views of the last applied snapshot, or `undefined`.
    pub fn views(&self) -> Result<JsValue, JsValue> {
        match self.controller.views() {
            Some(views) => to_js(views),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Overlay boxes of the last applied snapshot.
    pub fn overlay(&self) -> Result<JsValue, JsValue> {
        let overlay = self.controller.views().map(|v| v.overlay()).unwrap_or_default();
        to_js(&overlay)
    }

    #[wasm_bindgen(js_name = refreshKey)]
    pub fn refresh_key(&self) -> u64 {
        self.controller.refresh_key()
    }

    /// Requests for a `batchUpdate` that adds a labeled shape.
    #[wasm_bindgen(js_name = buildAddShape)]
    pub fn build_add_shape(
        &mut self,
        slide_id: Option<String>,
        color: &str,
        kind: &str,
        text: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let kind = ShapeType::from_name(kind)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown shape kind: {}", kind)))?;
        let batch = self
            .build_add_shape_impl(slide_id.as_deref(), color, kind, text.as_deref())
            .map_err(js_error)?;
        to_js(&batch)
    }

    /// Requests for a `batchUpdate` that moves a shape and its label.
    #[wasm_bindgen(js_name = buildMoveShape)]
    pub fn build_move_shape(&mut self, shape_id: &str, dx: f64, dy: f64) -> Result<JsValue, JsValue> {
        let batch = self
            .build_move_shape_impl(shape_id, dx, dy)
            .map_err(js_error)?;
        to_js(&batch)
    }

    /// Hand a finalized transcript to the dispatcher.
    #[wasm_bindgen(js_name = handleSpoken)]
    pub fn handle_spoken(&self, transcript: &str) -> Result<JsValue, JsValue> {
        to_js(&self.handle_spoken_impl(transcript))
    }
}

impl SlidesSession {
    fn begin_fetch_impl(&mut self) -> slides_core::Result<u64> {
        let ticket = self.controller.begin_fetch()?;
        self.pending.push(ticket);
        Ok(ticket.generation())
    }

    fn abandon_fetch_impl(&mut self, generation: u64) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.generation() != generation);
        self.pending.len() < before
    }

    fn apply_snapshot_impl(
        &mut self,
        generation: u64,
        presentation: Presentation,
    ) -> Result<ApplyResult, String> {
        let outcome = match self.pending.iter().position(|t| t.generation() == generation) {
            Some(pos) => {
                let ticket = self.pending.remove(pos);
                self.controller.apply_fetch(ticket, presentation)
            }
            // Pruned by a newer snapshot.
            None if generation <= self.controller.applied_generation() => {
                FetchOutcome::Discarded {
                    generation,
                    current: self.controller.applied_generation(),
                }
            }
            None => return Err(format!("No fetch pending for generation {}", generation)),
        };

        let applied = match outcome {
            FetchOutcome::Applied { generation } => {
                // Older tickets can never apply now.
                self.pending.retain(|t| t.generation() > generation);
                true
            }
            FetchOutcome::Discarded { .. } => false,
        };

        Ok(ApplyResult {
            applied,
            generation,
            refresh_key: self.controller.refresh_key(),
        })
    }

    fn build_add_shape_impl(
        &mut self,
        slide_id: Option<&str>,
        color: &str,
        kind: ShapeType,
        text: Option<&str>,
    ) -> slides_core::Result<Vec<Request>> {
        let views = synced_views(&self.controller)?;
        let slide_id = match slide_id {
            Some(id) => id,
            None => views.first_slide().ok_or_else(|| {
                Error::not_found(slides_core::ObjectKind::Slide, "<first slide>")
            })?,
        };

        let batch = self
            .builder
            .create_shape_batch(views, slide_id, color, kind, text)?;
        verify_references(&batch, views)?;
        Ok(batch)
    }

    fn build_move_shape_impl(
        &mut self,
        shape_id: &str,
        dx: f64,
        dy: f64,
    ) -> slides_core::Result<Vec<Request>> {
        let views = synced_views(&self.controller)?;
        let batch = self.builder.move_shape_batch(views, shape_id, dx, dy)?;
        verify_references(&batch, views)?;
        Ok(batch)
    }

    fn handle_spoken_impl(&self, transcript: &str) -> SpokenResult {
        let text = normalize_transcript(transcript);
        if !text.is_empty() {
            log::warn!("User request: {:?} (no command recognized)", text);
        }
        SpokenResult {
            recognized: false,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Presentation {
        Presentation::from_json(
            r#"{"presentationId": "deck", "slides": [
                {"objectId": "slide1", "pageElements": [
                    {"objectId": "blue-RECTANGLE-41", "shape": {"shapeType": "RECTANGLE"}},
                    {"objectId": "idtext-blue-RECTANGLE-41", "shape": {"shapeType": "TEXT_BOX"}}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    fn synced() -> SlidesSession {
        let mut session = SlidesSession::new("deck");
        session.set_signed_in(true);
        let generation = session.begin_fetch_impl().unwrap();
        session.apply_snapshot_impl(generation, snapshot()).unwrap();
        session
    }

    #[test]
    fn test_requires_sign_in() {
        let mut session = SlidesSession::new("deck");
        assert_eq!(session.begin_fetch_impl(), Err(Error::AuthRequired));
    }

    #[test]
    fn test_out_of_order_snapshots() {
        let mut session = SlidesSession::new("deck");
        session.set_signed_in(true);
        let first = session.begin_fetch_impl().unwrap();
        let second = session.begin_fetch_impl().unwrap();

        let newer = session.apply_snapshot_impl(second, snapshot()).unwrap();
        assert!(newer.applied);
        let older = session
            .apply_snapshot_impl(first, Presentation::default())
            .unwrap();
        assert!(!older.applied);
        assert_eq!(older.refresh_key, 1);

        assert!(session.apply_snapshot_impl(99, snapshot()).is_err());
    }

    #[test]
    fn test_applied_snapshot_prunes_older_tickets() {
        let mut session = SlidesSession::new("deck");
        session.set_signed_in(true);
        let first = session.begin_fetch_impl().unwrap();
        let second = session.begin_fetch_impl().unwrap();
        let third = session.begin_fetch_impl().unwrap();

        assert!(session.apply_snapshot_impl(second, snapshot()).unwrap().applied);
        let pending: Vec<u64> = session.pending.iter().map(|t| t.generation()).collect();
        assert_eq!(pending, vec![third]);

        // A late response for a pruned ticket is stale, not an error.
        let late = session.apply_snapshot_impl(first, snapshot()).unwrap();
        assert!(!late.applied);
        assert_eq!(late.refresh_key, 1);
    }

    #[test]
    fn test_abandon_fetch() {
        let mut session = SlidesSession::new("deck");
        session.set_signed_in(true);
        let generation = session.begin_fetch_impl().unwrap();

        assert!(session.abandon_fetch_impl(generation));
        assert!(!session.abandon_fetch_impl(generation));
        assert!(session.pending.is_empty());
        assert!(session.apply_snapshot_impl(generation, snapshot()).is_err());
    }

    #[test]
    fn test_late_snapshot_after_sign_out_is_stale() {
        let mut session = synced();
        let generation = session.begin_fetch_impl().unwrap();
        session.set_signed_in(false);

        let late = session.apply_snapshot_impl(generation, snapshot()).unwrap();
        assert!(!late.applied);
    }

    #[test]
    fn test_build_add_shape_defaults_to_first_slide() {
        let mut session = synced();
        let batch = session
            .build_add_shape_impl(None, "green", ShapeType::Ellipse, Some("note"))
            .unwrap();
        assert_eq!(batch.len(), 5);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            json[0]["createShape"]["elementProperties"]["pageObjectId"],
            "slide1"
        );
        assert_eq!(json[0]["createShape"]["shapeType"], "ELLIPSE");
    }

    #[test]
    fn test_build_move_shape() {
        let mut session = synced();
        let batch = session
            .build_move_shape_impl("blue-RECTANGLE-41", 100.0, 0.0)
            .unwrap();
        assert_eq!(batch.len(), 2);

        assert!(session.build_move_shape_impl("missing-RECTANGLE-1", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_spoken_is_noop() {
        let session = synced();
        let result = session.handle_spoken_impl(" add  a box ");
        assert_eq!(
            result,
            SpokenResult {
                recognized: false,
                text: "add a box".to_string()
            }
        );
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_views_marshal_as_plain_objects() {
        let snapshot = Presentation::from_json(
            r#"{"presentationId": "deck", "slides": [
                {"objectId": "slide1", "pageElements": [
                    {"objectId": "blue-RECTANGLE-41", "shape": {"shapeType": "RECTANGLE"}},
                    {"objectId": "idtext-blue-RECTANGLE-41", "shape": {"shapeType": "TEXT_BOX",
                        "text": {"textElements": [{"textRun": {"content": "blue-RECTANGLE-41"}}]}}}
                ]}
            ]}"#,
        )
        .unwrap();
        let views = to_js(&DocumentViews::from_presentation(&snapshot)).unwrap();

        let labels = js_sys::Reflect::get(&views, &"labels".into()).unwrap();
        assert!(!labels.is_instance_of::<js_sys::Map>());
        let label = js_sys::Reflect::get(&labels, &"blue-RECTANGLE-41".into()).unwrap();
        assert_eq!(label.as_string().as_deref(), Some("idtext-blue-RECTANGLE-41"));

        let texts = js_sys::Reflect::get(&views, &"slideTexts".into()).unwrap();
        assert!(!texts.is_instance_of::<js_sys::Map>());
        let first = js_sys::Reflect::get(&texts, &"0".into()).unwrap();
        assert!(js_sys::Array::is_array(&first));
    }
}
