//! Intent dispatch.
//!
//! Every user-triggered action enters here. This is the action boundary:
//! errors are logged and handed back inside [`DispatchOutcome::Failed`],
//! never propagated further.

use crate::batch::BatchBuilder;
use crate::error::{Error, ObjectKind, Result};
use crate::extract::DocumentViews;
use crate::ids::{RandomSuffix, SuffixSource};
use crate::sync::{Authenticator, FetchOutcome, SlidesClient, SyncController};
use crate::types::ShapeType;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A discrete user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SignIn,
    SignOut,
    Fetch,
    /// Add a shape with the default color and kind to the first slide.
    AddDefaultShape,
    /// Move the default target shape by the default offset.
    MoveDefaultShape,
    AddShape {
        slide_id: Option<String>,
        color: String,
        kind: ShapeType,
        text: Option<String>,
    },
    MoveShape {
        shape_id: String,
        dx: f64,
        dy: f64,
    },
    /// A finalized transcript from the speech collaborator.
    Spoken(String),
}

/// Result of dispatching one intent.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A fetch ran (directly, or after sign-in).
    Fetched(FetchOutcome),
    /// A batch was accepted and the snapshot refetched.
    Mutated {
        operations: usize,
        refresh: FetchOutcome,
    },
    SignedOut,
    /// Spoken text was empty after cleanup.
    Ignored,
    /// Spoken text matched no command; nothing was done.
    Unrecognized(String),
    /// The action failed; state is unchanged.
    Failed(Error),
}

/// Parameters of the fixed UI actions.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentDefaults {
    pub color: String,
    pub kind: ShapeType,
    pub move_target: String,
    pub move_offset: (f64, f64),
}

impl Default for IntentDefaults {
    fn default() -> Self {
        Self {
            color: "blue".to_string(),
            kind: ShapeType::Rectangle,
            move_target: "blue-RECTANGLE-41".to_string(),
            move_offset: (100.0, 0.0),
        }
    }
}

/// Clean up a transcript: Unicode NFC, whitespace collapsed and trimmed.
pub fn normalize_transcript(text: &str) -> String {
    let composed: String = text.nfc().collect();
    WHITESPACE_REGEX
        .replace_all(composed.trim(), " ")
        .into_owned()
}

/// Routes intents to the batch builder and the sync controller.
pub struct IntentDispatcher<A, S = RandomSuffix> {
    auth: A,
    builder: BatchBuilder<S>,
    defaults: IntentDefaults,
}

impl<A: Authenticator> IntentDispatcher<A, RandomSuffix> {
    /// Create a dispatcher with default parameters.
    pub fn new(auth: A) -> Self {
        Self::with_builder(auth, BatchBuilder::new())
    }
}

impl<A: Authenticator, S: SuffixSource> IntentDispatcher<A, S> {
    /// Create a dispatcher that builds batches with `builder`.
    pub fn with_builder(auth: A, builder: BatchBuilder<S>) -> Self {
        Self {
            auth,
            builder,
            defaults: IntentDefaults::default(),
        }
    }

    /// Override the fixed action parameters.
    pub fn with_defaults(mut self, defaults: IntentDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run one intent to completion.
    pub fn dispatch<C: SlidesClient>(
        &mut self,
        controller: &mut SyncController<C>,
        intent: Intent,
    ) -> DispatchOutcome {
        match self.run(controller, intent) {
            Ok(outcome) => outcome,
            Err(Error::AuthRequired) => {
                log::warn!("Sign-in required before this action");
                DispatchOutcome::Failed(Error::AuthRequired)
            }
            Err(e) => {
                log::error!("Action failed: {}", e);
                DispatchOutcome::Failed(e)
            }
        }
    }

    fn run<C: SlidesClient>(
        &mut self,
        controller: &mut SyncController<C>,
        intent: Intent,
    ) -> Result<DispatchOutcome> {
        match intent {
            Intent::SignIn => {
                self.auth.sign_in()?;
                controller.on_auth_changed(self.auth.is_signed_in());
                Ok(DispatchOutcome::Fetched(controller.fetch()?))
            }
            Intent::SignOut => {
                self.auth.sign_out()?;
                controller.sign_out();
                Ok(DispatchOutcome::SignedOut)
            }
            Intent::Fetch => Ok(DispatchOutcome::Fetched(controller.fetch()?)),
            Intent::AddDefaultShape => {
                let color = self.defaults.color.clone();
                let kind = self.defaults.kind;
                self.add_shape(controller, None, &color, kind, None)
            }
            Intent::MoveDefaultShape => {
                let target = self.defaults.move_target.clone();
                let (dx, dy) = self.defaults.move_offset;
                self.move_shape(controller, &target, dx, dy)
            }
            Intent::AddShape {
                slide_id,
                color,
                kind,
                text,
            } => self.add_shape(controller, slide_id.as_deref(), &color, kind, text.as_deref()),
            Intent::MoveShape { shape_id, dx, dy } => {
                self.move_shape(controller, &shape_id, dx, dy)
            }
            Intent::Spoken(transcript) => {
                let text = normalize_transcript(&transcript);
                if text.is_empty() {
                    return Ok(DispatchOutcome::Ignored);
                }
                log::warn!("User request: {:?} (no command recognized)", text);
                Ok(DispatchOutcome::Unrecognized(text))
            }
        }
    }

    fn add_shape<C: SlidesClient>(
        &mut self,
        controller: &mut SyncController<C>,
        slide_id: Option<&str>,
        color: &str,
        kind: ShapeType,
        text: Option<&str>,
    ) -> Result<DispatchOutcome> {
        controller.ensure_ready()?;
        let views = controller
            .views()
            .ok_or_else(|| Error::not_found(ObjectKind::Snapshot, controller.presentation_id()))?;
        let slide_id = match slide_id {
            Some(id) => id,
            None => views
                .first_slide()
                .ok_or_else(|| Error::not_found(ObjectKind::Slide, "<first slide>"))?,
        };

        let batch = self
            .builder
            .create_shape_batch(views, slide_id, color, kind, text)?;
        let refresh = controller.submit_and_refresh(&batch)?;
        Ok(DispatchOutcome::Mutated {
            operations: batch.len(),
            refresh,
        })
    }

    fn move_shape<C: SlidesClient>(
        &mut self,
        controller: &mut SyncController<C>,
        shape_id: &str,
        dx: f64,
        dy: f64,
    ) -> Result<DispatchOutcome> {
        controller.ensure_ready()?;
        let empty = DocumentViews::default();
        let views = controller.views().unwrap_or(&empty);

        let batch = self.builder.move_shape_batch(views, shape_id, dx, dy)?;
        let refresh = controller.submit_and_refresh(&batch)?;
        Ok(DispatchOutcome::Mutated {
            operations: batch.len(),
            refresh,
        })
    }
}
