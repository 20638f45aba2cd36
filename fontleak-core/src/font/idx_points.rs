//! The global `IDX_POINTS` table (spec.md §6.1): an ordered, deterministic
//! sequence of Unicode code points whose names contain `LATIN ` or
//! `MATHEMATICAL ` and exclude a handful of scripts. Generated at build time
//! by `build.rs` from the Unicode Character Database so no name-lookup
//! dependency ships in the running binary.

include!(concat!(env!("OUT_DIR"), "/idx_points_data.rs"));

/// Returns the first `idx_max` entries of [`IDX_POINTS`], clamped to the
/// table's length. This is a session's `step_map`.
pub fn step_map(idx_max: usize) -> &'static [u32] {
    let n = idx_max.min(IDX_POINTS.len());
    &IDX_POINTS[..n]
}
