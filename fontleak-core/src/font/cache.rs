//! Memoizes synthesized fonts by their build parameters, mirroring the
//! original generator's `@lru_cache` on `gen_font(...)` (spec.md §10:
//! identical `(alphabet, idx_max, strip, prefix, prefix_idx, offset)` tuples
//! are synthesized once per process).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{FontArtifact, FontBuilderOptions};

#[derive(PartialEq, Eq, Hash, Clone)]
struct CacheKey {
    alphabet: String,
    idx_max: usize,
    strip: bool,
    prefix: String,
    prefix_idx: bool,
    offset: usize,
}

impl From<&FontBuilderOptions> for CacheKey {
    fn from(opts: &FontBuilderOptions) -> Self {
        Self {
            alphabet: opts.alphabet.chars().iter().collect(),
            idx_max: opts.idx_max,
            strip: opts.strip,
            prefix: opts.prefix.iter().collect(),
            prefix_idx: opts.prefix_idx,
            offset: opts.offset,
        }
    }
}

/// A process-wide memoization table for synthesized fonts, keyed on the
/// exact build parameters. Cheap to share: callers hold one `Arc<FontCache>`
/// per process and clone it into every session.
#[derive(Default)]
pub struct FontCache {
    entries: Mutex<HashMap<CacheKey, Arc<FontArtifact>>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached artifact for `opts` if present, building and
    /// storing it via `build` otherwise.
    pub fn get_or_build(
        &self,
        opts: &FontBuilderOptions,
        build: impl FnOnce() -> Arc<FontArtifact>,
    ) -> Arc<FontArtifact> {
        let key = CacheKey::from(opts);
        if let Some(hit) = self.entries.lock().get(&key) {
            return Arc::clone(hit);
        }
        let artifact = build();
        self.entries.lock().insert(key, Arc::clone(&artifact));
        artifact
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
