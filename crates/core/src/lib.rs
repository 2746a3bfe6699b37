//! Snapshot model, derived views, mutation batching and sync control for a
//! remote Google Slides presentation.

pub mod batch;
pub mod error;
pub mod extract;
pub mod ids;
pub mod intent;
pub mod sync;
pub mod types;

pub use batch::{verify_references, BatchBuilder, ShapeTemplate};
pub use error::{Error, ObjectKind, Result};
pub use extract::{extract_shapes, extract_text, DocumentViews, ShapeDescriptor, SlideTextIndex};
pub use ids::{label_id_for, IdAllocator};
pub use intent::{DispatchOutcome, Intent, IntentDefaults, IntentDispatcher};
pub use sync::{
    Authenticator, FetchOutcome, FetchTicket, SessionState, SlidesClient, SyncController,
};
pub use types::{Presentation, Request, ShapeType};
