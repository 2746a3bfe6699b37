//! Error types for presentation sync and mutation batching.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// What kind of object a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// The presentation itself.
    Presentation,
    /// A slide (page) identifier.
    Slide,
    /// A shape page element.
    Shape,
    /// The text-box label attached to a shape.
    Label,
    /// No snapshot has been fetched yet.
    Snapshot,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Presentation => "presentation",
            ObjectKind::Slide => "slide",
            ObjectKind::Shape => "shape",
            ObjectKind::Label => "label",
            ObjectKind::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while syncing or mutating a presentation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An action was attempted while not signed in.
    #[error("Sign-in required")]
    AuthRequired,

    /// The API client is not loaded or not initialized.
    #[error("Slides API unavailable: {0}")]
    RemoteUnavailable(String),

    /// A referenced object is absent from the last snapshot.
    #[error("{kind} not found: {id}")]
    NotFound { kind: ObjectKind, id: String },

    /// The remote service refused a batch (bad range, duplicate id, ...).
    #[error("Batch rejected by remote: {0}")]
    RemoteRejected(String),

    /// No free identifier could be allocated.
    #[error("Identifier collision: {0}")]
    IdCollision(String),

    /// The composed identifier is not acceptable to the remote service.
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    /// A batch references an object that nothing creates.
    #[error("Dangling reference at operation {index}: {id}")]
    DanglingReference { index: usize, id: String },

    /// A character range with end before start.
    #[error("Invalid text range [{start}, {end})")]
    InvalidRange { start: u32, end: u32 },

    /// The request could not reach the remote service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
