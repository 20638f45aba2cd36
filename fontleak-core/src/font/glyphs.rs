//! Glyph inventory: assigns glyph ids, horizontal advances, and cmap
//! mappings for one font build. Pure data — no binary encoding here (see
//! `sfnt.rs`/`gsub.rs`).

use crate::alphabet::AlphabetModel;

/// Base of the Private Use Area block the builder allocates leak/unknown
/// glyphs from. Shifted by `offset` so that successive per-position Safari
/// font rebuilds occupy disjoint PUA ranges (spec.md §4.2 step 2-3, and the
/// `offset` input resolved in DESIGN.md).
pub const LEAK_PUA_BASE: u32 = 0xF0000;

pub type GlyphId = u16;

pub struct GlyphPlan {
    pub num_glyphs: u16,
    /// Per-glyph-id horizontal advance, in font design units.
    pub advances: Vec<u16>,
    /// `(codepoint, glyph id)` pairs, unsorted on input; callers sort before
    /// handing to the cmap builder.
    pub cmap: Vec<(u32, GlyphId)>,
    pub notdef: GlyphId,
    pub u0: GlyphId,
    /// `c[i]` is the glyph id for alphabet character at index `i`.
    pub c: Vec<GlyphId>,
    /// `l[i]` is the glyph id for the leak glyph of alphabet index `i`.
    pub l: Vec<GlyphId>,
    pub lu: GlyphId,
    /// `idx[k]` is the glyph id for index glyph `i{k}`.
    pub idx: Vec<GlyphId>,
    /// `prefix[j]` is the glyph id for the `j`-th literal prefix-chain glyph
    /// (`p{j}` in spec.md §4.2's resolved prefix/prefix_idx semantics).
    /// Empty unless `prefix_idx` was requested with a non-empty prefix.
    pub prefix: Vec<GlyphId>,
    /// `prefix_chars[j]` is the glyph id the `j`-th prefix-chain lookup must
    /// see to fire: the alphabet member glyph for that literal character, or
    /// `u0` if the prefix contains a character outside the alphabet.
    pub prefix_chars: Vec<GlyphId>,
}

pub struct GlyphPlanInput<'a> {
    pub alphabet: &'a AlphabetModel,
    pub idx_max: usize,
    pub step_map: &'a [u32],
    pub offset: usize,
    /// Literal characters the font must see, in order, before the final
    /// leak substitution can fire (spec.md §4.2's `prefix`/`prefix_idx`).
    pub prefix: &'a [char],
}

impl GlyphPlan {
    pub fn build(input: GlyphPlanInput<'_>) -> Self {
        let n = input.alphabet.len();
        let mut next_gid: GlyphId = 0;
        let mut advances = Vec::new();
        let mut cmap = Vec::new();

        let mut alloc = |advance: u16| -> GlyphId {
            let gid = next_gid;
            next_gid += 1;
            advances.push(advance);
            gid
        };

        let notdef = alloc(0);
        let u0 = alloc(0);

        let c: Vec<GlyphId> = (0..n).map(|_| alloc(0)).collect();

        // Codepoints 0..256: alphabet members map to their c{i} glyph,
        // everything else shares the u0 placeholder.
        for cp in 0u32..256 {
            if let Some(ch) = char::from_u32(cp) {
                let idx = input.alphabet.index_of(ch);
                if idx < n {
                    cmap.push((cp, c[idx]));
                    continue;
                }
            }
            cmap.push((cp, u0));
        }

        let leak_base = LEAK_PUA_BASE + input.offset as u32;
        let l: Vec<GlyphId> = (0..n)
            .map(|i| {
                let gid = alloc((i + 1) as u16);
                cmap.push((leak_base + i as u32, gid));
                gid
            })
            .collect();

        let lu = alloc((n + 1) as u16);
        cmap.push((leak_base + n as u32, lu));

        let idx: Vec<GlyphId> = input
            .step_map
            .iter()
            .take(input.idx_max)
            .map(|&cp| {
                let gid = alloc(0);
                cmap.push((cp, gid));
                gid
            })
            .collect();

        let prefix: Vec<GlyphId> = (0..input.prefix.len()).map(|_| alloc(0)).collect();
        let prefix_chars: Vec<GlyphId> = input
            .prefix
            .iter()
            .map(|&ch| {
                let idx = input.alphabet.index_of(ch);
                if idx < n {
                    c[idx]
                } else {
                    u0
                }
            })
            .collect();

        Self {
            num_glyphs: next_gid,
            advances,
            cmap,
            notdef,
            u0,
            c,
            l,
            lu,
            idx,
            prefix,
            prefix_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_distinct_contiguous_glyph_ids() {
        let alphabet = AlphabetModel::normalise("ab").unwrap();
        let plan = GlyphPlan::build(GlyphPlanInput {
            alphabet: &alphabet,
            idx_max: 3,
            step_map: &[0x1E00, 0x1E01, 0x1E02],
            offset: 0,
            prefix: &[],
        });
        // notdef, u0, c0, c1, l0, l1, lu, i0, i1, i2 = 10 glyphs
        assert_eq!(plan.num_glyphs, 10);
        assert_eq!(plan.advances[plan.l[0] as usize], 1);
        assert_eq!(plan.advances[plan.l[1] as usize], 2);
        assert_eq!(plan.advances[plan.lu as usize], 3);
        assert_eq!(plan.advances[plan.notdef as usize], 0);
    }

    #[test]
    fn unmapped_ascii_codepoints_fall_back_to_u0() {
        let alphabet = AlphabetModel::normalise("a").unwrap();
        let plan = GlyphPlan::build(GlyphPlanInput {
            alphabet: &alphabet,
            idx_max: 1,
            step_map: &[0x1E00],
            offset: 0,
            prefix: &[],
        });
        let gid_for = |cp: u32| plan.cmap.iter().find(|(c, _)| *c == cp).unwrap().1;
        assert_eq!(gid_for('a' as u32), plan.c[0]);
        assert_eq!(gid_for('b' as u32), plan.u0);
    }

    #[test]
    fn offset_shifts_the_leak_pua_block() {
        let alphabet = AlphabetModel::normalise("ab").unwrap();
        let plan = GlyphPlan::build(GlyphPlanInput {
            alphabet: &alphabet,
            idx_max: 1,
            step_map: &[0x1E00],
            offset: 3,
            prefix: &[],
        });
        let leak_cps: Vec<u32> = plan
            .cmap
            .iter()
            .filter(|(cp, _)| *cp >= LEAK_PUA_BASE)
            .map(|(cp, _)| *cp)
            .collect();
        assert!(leak_cps.iter().all(|&cp| cp >= LEAK_PUA_BASE + 3));
    }
}
