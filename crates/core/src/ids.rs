//! Object identifier allocation.
//!
//! Shape identifiers are composed as `<color>-<kind>-<suffix>`. A shape's
//! label is always `idtext-<shape id>`, so the pair can be correlated by
//! eye on the canvas and in the overlay.

use crate::error::{Error, Result};
use crate::types::ShapeType;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix that turns a shape identifier into its label identifier.
pub const LABEL_PREFIX: &str = "idtext-";

/// Object ids the service accepts: 5 to 50 chars, word chars, `-` and `:`.
static OBJECT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_:\-]{4,49}$").unwrap());

/// Label identifier for a shape. Pure and deterministic.
pub fn label_id_for(shape_id: &str) -> String {
    format!("{}{}", LABEL_PREFIX, shape_id)
}

/// Inverse of [`label_id_for`].
pub fn shape_id_for_label(label_id: &str) -> Option<&str> {
    label_id.strip_prefix(LABEL_PREFIX)
}

/// Whether the remote service would accept `id` as an object identifier.
pub fn is_valid_object_id(id: &str) -> bool {
    OBJECT_ID_REGEX.is_match(id)
}

/// Source of the random part of a shape identifier.
pub trait SuffixSource {
    fn next_suffix(&mut self) -> String;
}

/// 32 random bits rendered as 8 hex chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&mut self) -> String {
        let mut suffix = uuid::Uuid::new_v4().simple().to_string();
        suffix.truncate(8);
        suffix
    }
}

/// Allocates shape identifiers that do not clash with a known set of ids.
#[derive(Debug, Clone)]
pub struct IdAllocator<S = RandomSuffix> {
    source: S,
    max_attempts: usize,
}

impl Default for IdAllocator<RandomSuffix> {
    fn default() -> Self {
        Self::with_source(RandomSuffix)
    }
}

impl IdAllocator<RandomSuffix> {
    /// Create an allocator with random suffixes.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SuffixSource> IdAllocator<S> {
    /// Create an allocator drawing suffixes from `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            max_attempts: 8,
        }
    }

    /// Set how many suffixes to try before giving up.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Compose a fresh identifier without any collision check.
    pub fn new_shape_id(&mut self, color: &str, kind: ShapeType) -> String {
        format!("{}-{}-{}", color, kind.as_str(), self.source.next_suffix())
    }

    /// Allocate an identifier whose shape id and label id are both absent
    /// from `taken`.
    pub fn allocate<F>(&mut self, color: &str, kind: ShapeType, taken: F) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut last = String::new();
        for attempt in 0..self.max_attempts {
            let id = self.new_shape_id(color, kind);
            let label = label_id_for(&id);

            if let Some(invalid) = [&id, &label].into_iter().find(|i| !is_valid_object_id(i)) {
                return Err(Error::InvalidObjectId(invalid.clone()));
            }
            if !taken(&id) && !taken(&label) {
                return Ok(id);
            }

            log::debug!("Identifier {} already in use (attempt {})", id, attempt + 1);
            last = id;
        }

        Err(Error::IdCollision(last))
    }
}
