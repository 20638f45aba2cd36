//! Compiles the `liga` feature's ligature substitutions (spec.md §4.2 step
//! 5) directly into GSUB binary tables — no textual `.fea` file, no
//! external feature compiler (the REDESIGN FLAG in spec.md §9).

use super::glyphs::GlyphId;

/// One GSUB lookup. Every lookup this builder ever emits has exactly one
/// coverage glyph, which keeps Coverage/LigatureSet encoding trivial.
pub enum Lookup {
    /// Lookup type 1 (Single Substitution), format 1: `glyph -> glyph`
    /// (here always the identity, used only for the strip-mode `u0 by
    /// NULL` rule — see DESIGN.md for why true glyph deletion is not
    /// modeled).
    Single { glyph: GlyphId },
    /// Lookup type 4 (Ligature Substitution): `first second -> result`,
    /// for every `(second, result)` pair sharing the same `first` coverage
    /// glyph.
    Ligature {
        first: GlyphId,
        entries: Vec<(GlyphId, GlyphId)>,
    },
}

/// Builds the `liga` feature program (spec.md §4.2 step 5):
/// - `strip`: prepend the inert single-substitution placeholder rule.
/// - decrement-on-skip lookups for `k = idx_max-1 downto 1`.
/// - the literal prefix chain, if any (see [`build_prefix_chain`]).
/// - the final `i0 (or last prefix glyph) + c{i} -> l{i}` substitution.
///
/// Lookups are emitted in descending-`k` order so a single GSUB pass
/// cascades the decrement across the whole index-glyph chain before the
/// final substitution can fire (mirrors `reversed(rule_groups.items())` in
/// the original generator).
pub fn build_lookups(plan: &super::glyphs::GlyphPlan, strip: bool) -> Vec<Lookup> {
    let mut lookups = Vec::new();

    if strip {
        lookups.push(Lookup::Single { glyph: plan.u0 });
    }

    let mut any_members: Vec<GlyphId> = Vec::with_capacity(1 + plan.c.len());
    any_members.push(plan.u0);
    any_members.extend_from_slice(&plan.c);

    let idx_max = plan.idx.len();
    for k in (1..idx_max).rev() {
        let first = plan.idx[k];
        let result = plan.idx[k - 1];
        let entries = any_members.iter().map(|&m| (m, result)).collect();
        lookups.push(Lookup::Ligature { first, entries });
    }

    lookups.extend(build_prefix_chain_lookups(plan));

    let chain_tail = plan.prefix.last().copied().unwrap_or_else(|| {
        *plan
            .idx
            .first()
            .expect("idx_max must be at least 1 for a usable font")
    });
    let final_entries = plan
        .c
        .iter()
        .zip(plan.l.iter())
        .map(|(&c, &l)| (c, l))
        .collect();
    lookups.push(Lookup::Ligature {
        first: chain_tail,
        entries: final_entries,
    });

    lookups
}

/// The literal-prefix consuming chain: `idx[0] -> p0 -> p1 -> ... ->
/// p{L-1}`, one ligature lookup per prefix character. `plan.prefix_chars`
/// gives the glyph id each step consumes (the alphabet member glyph for
/// prefix characters in the alphabet, `u0` otherwise).
fn build_prefix_chain_lookups(plan: &super::glyphs::GlyphPlan) -> Vec<Lookup> {
    let mut lookups = Vec::new();
    let mut source = match plan.idx.first() {
        Some(&i0) => i0,
        None => return lookups,
    };
    for (j, &char_glyph) in plan.prefix_chars.iter().enumerate() {
        let result = plan.prefix[j];
        lookups.push(Lookup::Ligature {
            first: source,
            entries: vec![(char_glyph, result)],
        });
        source = result;
    }
    lookups
}

const HEADER_LEN: usize = 10;
const SCRIPT_TAG_DFLT: [u8; 4] = *b"DFLT";
const FEATURE_TAG_LIGA: [u8; 4] = *b"liga";

/// Assembles a complete GSUB table: one script (`DFLT`), one feature
/// (`liga`) referencing every lookup in order, and the lookup list itself.
pub fn build_gsub_table(lookups: &[Lookup]) -> Vec<u8> {
    let lookup_list = build_lookup_list(lookups);
    let feature_list = build_feature_list(lookups.len());
    let script_list = build_script_list();

    let script_list_offset = HEADER_LEN as u16;
    let feature_list_offset = script_list_offset + script_list.len() as u16;
    let lookup_list_offset = feature_list_offset + feature_list.len() as u16;

    let mut out = Vec::with_capacity(
        HEADER_LEN + script_list.len() + feature_list.len() + lookup_list.len(),
    );
    out.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
    out.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
    out.extend_from_slice(&script_list_offset.to_be_bytes());
    out.extend_from_slice(&feature_list_offset.to_be_bytes());
    out.extend_from_slice(&lookup_list_offset.to_be_bytes());
    out.extend_from_slice(&script_list);
    out.extend_from_slice(&feature_list);
    out.extend_from_slice(&lookup_list);
    out
}

fn build_script_list() -> Vec<u8> {
    // ScriptList { scriptCount=1, [ScriptRecord{tag, offset}] }
    // Script { defaultLangSysOffset, langSysCount=0 }
    // LangSys { lookupOrder=0, requiredFeatureIndex=0xFFFF, featureIndexCount=1, [0] }
    let lang_sys: Vec<u8> = {
        let mut b = Vec::new();
        b.extend_from_slice(&0u16.to_be_bytes()); // lookupOrder (NULL)
        b.extend_from_slice(&0xFFFFu16.to_be_bytes()); // requiredFeatureIndex
        b.extend_from_slice(&1u16.to_be_bytes()); // featureIndexCount
        b.extend_from_slice(&0u16.to_be_bytes()); // featureIndices[0]
        b
    };
    let script_header_len = 4u16; // defaultLangSysOffset(2) + langSysCount(2)
    let script_table: Vec<u8> = {
        let mut b = Vec::new();
        b.extend_from_slice(&script_header_len.to_be_bytes()); // defaultLangSys right after header
        b.extend_from_slice(&0u16.to_be_bytes()); // langSysRecordCount = 0
        b.extend_from_slice(&lang_sys);
        b
    };

    let script_list_header_len = 2 + 6; // scriptCount(2) + one ScriptRecord(4+2)
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes()); // scriptCount
    out.extend_from_slice(&SCRIPT_TAG_DFLT);
    out.extend_from_slice(&(script_list_header_len as u16).to_be_bytes()); // scriptOffset
    out.extend_from_slice(&script_table);
    out
}

fn build_feature_list(lookup_count: usize) -> Vec<u8> {
    // FeatureList { featureCount=1, [FeatureRecord{tag, offset}] }
    // Feature { featureParams=0, lookupIndexCount, [lookupListIndices...] }
    let feature_table: Vec<u8> = {
        let mut b = Vec::new();
        b.extend_from_slice(&0u16.to_be_bytes()); // featureParams (NULL)
        b.extend_from_slice(&(lookup_count as u16).to_be_bytes());
        for i in 0..lookup_count as u16 {
            b.extend_from_slice(&i.to_be_bytes());
        }
        b
    };
    let feature_list_header_len = 2 + 6; // featureCount(2) + one FeatureRecord(4+2)
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes()); // featureCount
    out.extend_from_slice(&FEATURE_TAG_LIGA);
    out.extend_from_slice(&(feature_list_header_len as u16).to_be_bytes());
    out.extend_from_slice(&feature_table);
    out
}

fn build_lookup_list(lookups: &[Lookup]) -> Vec<u8> {
    let header_len = 2 + 2 * lookups.len();
    let mut bodies = Vec::with_capacity(lookups.len());
    for lookup in lookups {
        bodies.push(build_lookup_table(lookup));
    }

    let mut offsets = Vec::with_capacity(lookups.len());
    let mut running = header_len;
    for body in &bodies {
        offsets.push(running as u16);
        running += body.len();
    }

    let mut out = Vec::with_capacity(running);
    out.extend_from_slice(&(lookups.len() as u16).to_be_bytes());
    for off in &offsets {
        out.extend_from_slice(&off.to_be_bytes());
    }
    for body in &bodies {
        out.extend_from_slice(body);
    }
    out
}

fn build_lookup_table(lookup: &Lookup) -> Vec<u8> {
    match lookup {
        Lookup::Single { glyph } => {
            let subtable = build_single_subst(*glyph, *glyph);
            wrap_lookup(1, &[subtable])
        }
        Lookup::Ligature { first, entries } => {
            let subtable = build_ligature_subst(*first, entries);
            wrap_lookup(4, &[subtable])
        }
    }
}

fn wrap_lookup(lookup_type: u16, subtables: &[Vec<u8>]) -> Vec<u8> {
    let header_len = 2 + 2 + 2 + 2 * subtables.len();
    let mut offsets = Vec::with_capacity(subtables.len());
    let mut running = header_len;
    for s in subtables {
        offsets.push(running as u16);
        running += s.len();
    }
    let mut out = Vec::with_capacity(running);
    out.extend_from_slice(&lookup_type.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // lookupFlag
    out.extend_from_slice(&(subtables.len() as u16).to_be_bytes());
    for off in &offsets {
        out.extend_from_slice(&off.to_be_bytes());
    }
    for s in subtables {
        out.extend_from_slice(s);
    }
    out
}

fn build_coverage_format1(glyphs: &[GlyphId]) -> Vec<u8> {
    let mut sorted = glyphs.to_vec();
    sorted.sort_unstable();
    let mut out = Vec::with_capacity(4 + 2 * sorted.len());
    out.extend_from_slice(&1u16.to_be_bytes()); // coverageFormat
    out.extend_from_slice(&(sorted.len() as u16).to_be_bytes());
    for g in sorted {
        out.extend_from_slice(&g.to_be_bytes());
    }
    out
}

fn build_single_subst(from: GlyphId, to: GlyphId) -> Vec<u8> {
    let coverage = build_coverage_format1(&[from]);
    let header_len = 2 + 2 + 2; // format, coverageOffset, deltaGlyphID
    let delta = to.wrapping_sub(from) as i16;
    let mut out = Vec::with_capacity(header_len + coverage.len());
    out.extend_from_slice(&1u16.to_be_bytes()); // substFormat
    out.extend_from_slice(&(header_len as u16).to_be_bytes()); // coverageOffset
    out.extend_from_slice(&delta.to_be_bytes());
    out.extend_from_slice(&coverage);
    out
}

fn build_ligature_subst(first: GlyphId, entries: &[(GlyphId, GlyphId)]) -> Vec<u8> {
    // Single coverage glyph => a single LigatureSet.
    let ligatures: Vec<Vec<u8>> = entries
        .iter()
        .map(|&(second, result)| {
            let mut b = Vec::with_capacity(6);
            b.extend_from_slice(&result.to_be_bytes()); // ligGlyph
            b.extend_from_slice(&2u16.to_be_bytes()); // componentCount (incl. first)
            b.extend_from_slice(&second.to_be_bytes()); // componentGlyphIDs[1]
            b
        })
        .collect();

    let ligset_header_len = 2 + 2 * ligatures.len();
    let mut ligset_offsets = Vec::with_capacity(ligatures.len());
    let mut running = ligset_header_len;
    for l in &ligatures {
        ligset_offsets.push(running as u16);
        running += l.len();
    }
    let mut ligature_set = Vec::with_capacity(running);
    ligature_set.extend_from_slice(&(ligatures.len() as u16).to_be_bytes());
    for off in &ligset_offsets {
        ligature_set.extend_from_slice(&off.to_be_bytes());
    }
    for l in &ligatures {
        ligature_set.extend_from_slice(l);
    }

    let coverage = build_coverage_format1(&[first]);
    let header_len = 2 + 2 + 2 + 2; // format, coverageOffset, ligSetCount, one offset
    let coverage_offset = header_len as u16;
    let ligset_offset = coverage_offset + coverage.len() as u16;

    let mut out = Vec::with_capacity(header_len + coverage.len() + ligature_set.len());
    out.extend_from_slice(&1u16.to_be_bytes()); // substFormat
    out.extend_from_slice(&coverage_offset.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // ligSetCount
    out.extend_from_slice(&ligset_offset.to_be_bytes());
    out.extend_from_slice(&coverage);
    out.extend_from_slice(&ligature_set);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::glyphs::{GlyphPlan, GlyphPlanInput};

    fn sample_plan() -> GlyphPlan {
        let alphabet = crate::AlphabetModel::normalise("ab").unwrap();
        GlyphPlan::build(GlyphPlanInput {
            alphabet: &alphabet,
            idx_max: 3,
            step_map: &[0x1E00, 0x1E01, 0x1E02],
            offset: 0,
            prefix: &[],
        })
    }

    #[test]
    fn decrement_lookups_count_matches_idx_max_minus_one() {
        let plan = sample_plan();
        let lookups = build_lookups(&plan, true);
        // 1 (strip) + (idx_max - 1) decrement lookups + 1 final
        assert_eq!(lookups.len(), 1 + 2 + 1);
    }

    #[test]
    fn gsub_table_round_trips_header_offsets() {
        let plan = sample_plan();
        let lookups = build_lookups(&plan, false);
        let table = build_gsub_table(&lookups);
        let script_list_offset = u16::from_be_bytes([table[4], table[5]]);
        let feature_list_offset = u16::from_be_bytes([table[6], table[7]]);
        let lookup_list_offset = u16::from_be_bytes([table[8], table[9]]);
        assert_eq!(script_list_offset as usize, HEADER_LEN);
        assert!(feature_list_offset > script_list_offset);
        assert!(lookup_list_offset > feature_list_offset);
        assert!((lookup_list_offset as usize) < table.len());
    }

    #[test]
    fn ligature_subtable_lists_one_entry_per_any_member() {
        let plan = sample_plan();
        // any = u0 + c0 + c1 = 3 members
        let entries: Vec<_> = plan
            .c
            .iter()
            .map(|&c| (c, plan.idx[0]))
            .chain(std::iter::once((plan.u0, plan.idx[0])))
            .collect();
        let bytes = build_ligature_subst(plan.idx[1], &entries);
        let lig_set_count = u16::from_be_bytes([bytes[4], bytes[5]]);
        assert_eq!(lig_set_count, 1);
    }
}
