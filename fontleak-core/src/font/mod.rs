//! Font synthesis: turns an alphabet and a handful of leak parameters into
//! a complete, self-contained OpenType font (spec.md §4.2).

mod cache;
mod glyphs;
mod gsub;
mod idx_points;
mod sfnt;

pub use cache::FontCache;
pub use glyphs::LEAK_PUA_BASE;
pub use idx_points::step_map;

use crate::alphabet::AlphabetModel;
use crate::error::FontError;
use glyphs::{GlyphPlan, GlyphPlanInput};

/// Upper bound on combined alphabet + prefix glyphs a single font build may
/// allocate (mirrors [`AlphabetModel::validate_len`]'s cap, applied here to
/// the actual glyph budget FontBuilder spends).
const MAX_COMBINED_LEN: usize = 128;

/// Parameters for one font synthesis run (spec.md §4.2's `gen_font`
/// arguments, and the `prefix`/`prefix_idx`/`offset` resolution in
/// DESIGN.md).
#[derive(Clone)]
pub struct FontBuilderOptions {
    pub alphabet: AlphabetModel,
    /// Number of index glyphs (`i0..i{idx_max-1}`) to allocate; clamped to
    /// the size of the global `IDX_POINTS` table.
    pub idx_max: usize,
    /// Whether to emit the inert strip placeholder rule (spec.md §4.2 step
    /// 4, used by the Firefox animation template's CSS `content` reset).
    pub strip: bool,
    /// Literal prefix characters the font must observe, in order, before
    /// the final leak substitution can fire.
    pub prefix: Vec<char>,
    /// Whether `prefix` should be compiled into the font at all (when
    /// `false`, `prefix` is ignored and no prefix chain is built — this is
    /// the "verify reconstruction so far" toggle from spec.md §4.5).
    pub prefix_idx: bool,
    /// Shifts the leak/unknown PUA block by `offset` code points, so that
    /// successive Safari per-position font rebuilds occupy disjoint PUA
    /// ranges addressable via distinct `unicode-range` declarations.
    pub offset: usize,
}

/// The output of one font synthesis run: a data: URL ready to drop into a
/// CSS `@font-face { src: url(...) }` declaration, plus the `step_map` used
/// to build it (the caller needs this to translate an observed advance
/// width back into the next index code point).
pub struct FontArtifact {
    pub data_url: String,
    pub step_map: Vec<u32>,
}

pub struct FontBuilder;

impl FontBuilder {
    /// Synthesizes a font for `opts`. Pure function of its input: the same
    /// `opts` always yields byte-identical output, which is what makes
    /// [`FontCache`] sound.
    pub fn generate(opts: &FontBuilderOptions) -> Result<FontArtifact, FontError> {
        let available = idx_points::step_map(usize::MAX).len();
        if opts.idx_max > available {
            return Err(FontError::CodepointExhausted {
                idx_max: opts.idx_max,
                available,
            });
        }

        let combined_len = opts.alphabet.len()
            + if opts.prefix_idx { opts.prefix.len() } else { 0 };
        if combined_len > MAX_COMBINED_LEN {
            return Err(FontError::AlphabetTooLarge {
                len: combined_len,
                max: MAX_COMBINED_LEN,
            });
        }

        let step_map = idx_points::step_map(opts.idx_max);
        let prefix: &[char] = if opts.prefix_idx { &opts.prefix } else { &[] };

        let plan = GlyphPlan::build(GlyphPlanInput {
            alphabet: &opts.alphabet,
            idx_max: opts.idx_max,
            step_map,
            offset: opts.offset,
            prefix,
        });

        let lookups = gsub::build_lookups(&plan, opts.strip);
        let gsub_table = gsub::build_gsub_table(&lookups);

        let font_bytes = sfnt::build_font(sfnt::SfntInput {
            num_glyphs: plan.num_glyphs,
            advances: &plan.advances,
            cmap: &plan.cmap,
            gsub: &gsub_table,
        });

        let data_url = format!(
            "data:font/opentype;base64,{}",
            base64_encode(&font_bytes)
        );

        Ok(FontArtifact {
            data_url,
            step_map: step_map.to_vec(),
        })
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_opts() -> FontBuilderOptions {
        FontBuilderOptions {
            alphabet: AlphabetModel::normalise("abc").unwrap(),
            idx_max: 10,
            strip: false,
            prefix: Vec::new(),
            prefix_idx: false,
            offset: 0,
        }
    }

    #[test]
    fn generate_is_deterministic() {
        let opts = base_opts();
        let a = FontBuilder::generate(&opts).unwrap();
        let b = FontBuilder::generate(&opts).unwrap();
        assert_eq!(a.data_url, b.data_url);
    }

    #[test]
    fn generate_emits_a_data_url_with_the_expected_mime_type() {
        let artifact = FontBuilder::generate(&base_opts()).unwrap();
        assert!(artifact.data_url.starts_with("data:font/opentype;base64,"));
    }

    #[test]
    fn idx_max_beyond_the_table_is_rejected() {
        let mut opts = base_opts();
        opts.idx_max = usize::MAX;
        assert!(matches!(
            FontBuilder::generate(&opts),
            Err(FontError::CodepointExhausted { .. })
        ));
    }

    #[test]
    fn combined_alphabet_and_prefix_over_budget_is_rejected() {
        let raw: String = (0x20u8..=0x7E).map(|b| b as char).collect(); // 95 chars
        let mut opts = base_opts();
        opts.alphabet = AlphabetModel::normalise(&raw).unwrap();
        opts.prefix_idx = true;
        opts.prefix = raw.chars().take(40).collect(); // 95 + 40 > 128
        assert!(matches!(
            FontBuilder::generate(&opts),
            Err(FontError::AlphabetTooLarge { .. })
        ));
    }

    #[test]
    fn offset_changes_the_synthesized_font() {
        let mut a = base_opts();
        a.offset = 0;
        let mut b = base_opts();
        b.offset = 7;
        let artifact_a = FontBuilder::generate(&a).unwrap();
        let artifact_b = FontBuilder::generate(&b).unwrap();
        assert_ne!(artifact_a.data_url, artifact_b.data_url);
    }
}
