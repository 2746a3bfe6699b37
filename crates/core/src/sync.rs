//! Remote sync controller.
//!
//! Drives the fetch → derive → mutate → refetch cycle against a
//! [`SlidesClient`] handle passed in at construction. Snapshots and their
//! derived views are replaced together, never patched.

use crate::batch::verify_references;
use crate::error::{Error, Result};
use crate::extract::DocumentViews;
use crate::types::{BatchUpdateResponse, Presentation, Request};

/// Access to the remote presentation service.
pub trait SlidesClient {
    /// Whether the client is loaded and initialized.
    fn is_ready(&self) -> bool {
        true
    }

    /// Fetch the full presentation.
    fn get_presentation(&self, presentation_id: &str) -> Result<Presentation>;

    /// Apply `requests` atomically, in order.
    fn batch_update(&self, presentation_id: &str, requests: &[Request])
        -> Result<BatchUpdateResponse>;
}

/// External sign-in collaborator. Only the boolean state and the two
/// actions are consumed; token material never passes through here.
pub trait Authenticator {
    fn is_signed_in(&self) -> bool;
    fn sign_in(&mut self) -> Result<()>;
    fn sign_out(&mut self) -> Result<()>;
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Synced,
}

/// Proof that a fetch was started, carrying its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a fetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The snapshot replaced the held state.
    Applied { generation: u64 },
    /// A newer snapshot was already applied, or the session ended.
    Discarded { generation: u64, current: u64 },
}

/// A snapshot together with everything derived from it.
#[derive(Debug, Clone)]
pub struct SyncedDocument {
    pub generation: u64,
    pub presentation: Presentation,
    pub views: DocumentViews,
}

/// Controller owning the last snapshot and its derived views.
pub struct SyncController<C> {
    client: C,
    presentation_id: String,
    state: SessionState,
    issued_generation: u64,
    applied_generation: u64,
    current: Option<SyncedDocument>,
    refresh_key: u64,
}

impl<C: SlidesClient> SyncController<C> {
    /// Create a controller for `presentation_id` using `client`.
    pub fn new(client: C, presentation_id: impl Into<String>) -> Self {
        Self {
            client,
            presentation_id: presentation_id.into(),
            state: SessionState::Unauthenticated,
            issued_generation: 0,
            applied_generation: 0,
            current: None,
            refresh_key: 0,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn presentation_id(&self) -> &str {
        &self.presentation_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last applied snapshot and views.
    pub fn document(&self) -> Option<&SyncedDocument> {
        self.current.as_ref()
    }

    /// Views derived from the last applied snapshot.
    pub fn views(&self) -> Option<&DocumentViews> {
        self.current.as_ref().map(|d| &d.views)
    }

    /// Bumped on every applied snapshot; an embedded viewer keyed on this
    /// reloads whenever the document changes.
    pub fn refresh_key(&self) -> u64 {
        self.refresh_key
    }

    /// Generation of the last applied snapshot. Tickets at or below it
    /// are stale.
    pub fn applied_generation(&self) -> u64 {
        self.applied_generation
    }

    /// Feed the external signed-in flag (sign-in listener).
    pub fn on_auth_changed(&mut self, signed_in: bool) {
        match (signed_in, self.state) {
            (true, SessionState::Unauthenticated) => {
                log::info!("Signed in");
                self.state = SessionState::Authenticated;
            }
            (false, SessionState::Authenticated | SessionState::Synced) => self.sign_out(),
            _ => {}
        }
    }

    /// Drop the session and everything fetched under it. In-flight fetches
    /// started before this call will be discarded.
    pub fn sign_out(&mut self) {
        log::info!("Signed out");
        self.state = SessionState::Unauthenticated;
        self.current = None;
        self.applied_generation = self.issued_generation;
    }

    /// Fail unless signed in with a usable client.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.state == SessionState::Unauthenticated {
            return Err(Error::AuthRequired);
        }
        if !self.client.is_ready() {
            return Err(Error::RemoteUnavailable(
                "Slides API client not loaded".to_string(),
            ));
        }
        Ok(())
    }

    /// Start a fetch. Hosts that perform the request themselves (e.g. from
    /// JavaScript) pair this with [`apply_fetch`](Self::apply_fetch).
    pub fn begin_fetch(&mut self) -> Result<FetchTicket> {
        self.ensure_ready()?;
        self.issued_generation += 1;
        Ok(FetchTicket {
            generation: self.issued_generation,
        })
    }

    /// Install a fetched snapshot unless something newer is already applied.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, presentation: Presentation) -> FetchOutcome {
        if self.state == SessionState::Unauthenticated
            || ticket.generation <= self.applied_generation
        {
            log::warn!(
                "Discarding stale snapshot (generation {}, current {})",
                ticket.generation,
                self.applied_generation
            );
            return FetchOutcome::Discarded {
                generation: ticket.generation,
                current: self.applied_generation,
            };
        }

        let views = DocumentViews::from_presentation(&presentation);
        log::info!(
            "Applied snapshot generation {}: {} slides, {} shapes",
            ticket.generation,
            presentation.slides.len(),
            views.shapes.len()
        );

        self.current = Some(SyncedDocument {
            generation: ticket.generation,
            presentation,
            views,
        });
        self.applied_generation = ticket.generation;
        self.state = SessionState::Synced;
        self.refresh_key += 1;

        FetchOutcome::Applied {
            generation: ticket.generation,
        }
    }

    /// Fetch the presentation and replace the held snapshot. On failure the
    /// previous snapshot and views stay as they were.
    pub fn fetch(&mut self) -> Result<FetchOutcome> {
        let ticket = self.begin_fetch()?;
        let presentation = self.client.get_presentation(&self.presentation_id)?;
        log::debug!("Fetched {} slides", presentation.slides.len());
        Ok(self.apply_fetch(ticket, presentation))
    }

    /// Check `batch` against the held snapshot and submit it as one request.
    pub fn submit(&mut self, batch: &[Request]) -> Result<BatchUpdateResponse> {
        self.ensure_ready()?;

        let empty = DocumentViews::default();
        let views = self.views().unwrap_or(&empty);
        verify_references(batch, views)?;

        if batch.is_empty() {
            log::debug!("Empty batch, nothing to submit");
            return Ok(BatchUpdateResponse::default());
        }

        for request in batch {
            log::debug!("  {} -> {}", request.name(), request.referenced_id());
        }
        let response = self.client.batch_update(&self.presentation_id, batch)?;
        log::info!("Submitted batch of {} operations", batch.len());
        Ok(response)
    }

    /// Submit `batch`, then refetch to pick up the confirmed state. A failed
    /// submit skips the refetch.
    pub fn submit_and_refresh(&mut self, batch: &[Request]) -> Result<FetchOutcome> {
        self.submit(batch)?;
        self.fetch()
    }
}
