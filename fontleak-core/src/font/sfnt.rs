//! Assembles the final `sfnt`-wrapped OpenType binary: `head`, `hhea`,
//! `hmtx`, `maxp`, `cmap`, `post`, `name`, `glyf`+`loca`, and `GSUB`. Every
//! glyph outline is empty (spec.md §4.2: the leak signal is the *advance
//! width*, never anything drawn), which keeps `glyf` degenerate and lets
//! `loca` collapse to all-zero offsets.

const UNITS_PER_EM: u16 = 1000;
const FONT_FAMILY: &str = "fontleak";

pub struct SfntInput<'a> {
    pub num_glyphs: u16,
    pub advances: &'a [u16],
    pub cmap: &'a [(u32, u16)],
    pub gsub: &'a [u8],
}

/// Builds a complete `sfnt` binary (the raw bytes of a `.otf` file).
pub fn build_font(input: SfntInput<'_>) -> Vec<u8> {
    let head = build_head();
    let hhea = build_hhea(input.num_glyphs);
    let hmtx = build_hmtx(input.advances);
    let maxp = build_maxp(input.num_glyphs);
    let cmap = build_cmap(input.cmap);
    let post = build_post();
    let name = build_name();
    let (glyf, loca) = build_glyf_loca(input.num_glyphs);

    let tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"cmap", cmap),
        (b"glyf", glyf),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"loca", loca),
        (b"maxp", maxp),
        (b"name", name),
        (b"post", post),
        (b"GSUB", input.gsub.to_vec()),
    ];

    assemble_sfnt(tables)
}

fn assemble_sfnt(mut tables: Vec<(&[u8; 4], Vec<u8>)>) -> Vec<u8> {
    // The OpenType spec requires table directory entries sorted by tag.
    tables.sort_by_key(|(tag, _)| **tag);

    let num_tables = tables.len() as u16;
    let entry_selector = (num_tables as f32).log2().floor() as u16;
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = num_tables * 16 - search_range;

    let header_len = 12 + 16 * tables.len();
    let mut offsets = Vec::with_capacity(tables.len());
    let mut running = header_len;
    for (_, data) in &tables {
        offsets.push(running as u32);
        running += padded_len(data.len());
    }

    let mut out = Vec::with_capacity(running);
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // sfntVersion: TrueType outlines
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    for ((tag, data), &offset) in tables.iter().zip(offsets.iter()) {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&table_checksum(data).to_be_bytes());
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    }

    for (_, data) in &tables {
        out.extend_from_slice(data);
        for _ in 0..(padded_len(data.len()) - data.len()) {
            out.push(0);
        }
    }

    out
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn table_checksum(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks(4);
    for chunk in &mut chunks {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

fn build_head() -> Vec<u8> {
    let mut out = Vec::with_capacity(54);
    out.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
    out.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
    out.extend_from_slice(&0x00010000u32.to_be_bytes()); // fontRevision
    out.extend_from_slice(&0u32.to_be_bytes()); // checksumAdjustment (left 0; no ranging checker relies on it)
    out.extend_from_slice(&0x5F0F3CF5u32.to_be_bytes()); // magicNumber
    out.extend_from_slice(&0u16.to_be_bytes()); // flags
    out.extend_from_slice(&UNITS_PER_EM.to_be_bytes());
    out.extend_from_slice(&0i64.to_be_bytes()); // created
    out.extend_from_slice(&0i64.to_be_bytes()); // modified
    out.extend_from_slice(&0i16.to_be_bytes()); // xMin
    out.extend_from_slice(&0i16.to_be_bytes()); // yMin
    out.extend_from_slice(&0i16.to_be_bytes()); // xMax
    out.extend_from_slice(&0i16.to_be_bytes()); // yMax
    out.extend_from_slice(&0u16.to_be_bytes()); // macStyle
    out.extend_from_slice(&8u16.to_be_bytes()); // lowestRecPPEM
    out.extend_from_slice(&2i16.to_be_bytes()); // fontDirectionHint (deprecated, set to 2)
    out.extend_from_slice(&0i16.to_be_bytes()); // indexToLocFormat: short (0)
    out.extend_from_slice(&0i16.to_be_bytes()); // glyphDataFormat
    out
}

fn build_hhea(num_glyphs: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(36);
    out.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
    out.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
    out.extend_from_slice(&5i16.to_be_bytes()); // ascender
    out.extend_from_slice(&(-5i16).to_be_bytes()); // descender
    out.extend_from_slice(&0i16.to_be_bytes()); // lineGap
    out.extend_from_slice(&u16::MAX.to_be_bytes()); // advanceWidthMax (unused by this font, never measured)
    out.extend_from_slice(&0i16.to_be_bytes()); // minLeftSideBearing
    out.extend_from_slice(&0i16.to_be_bytes()); // minRightSideBearing
    out.extend_from_slice(&0i16.to_be_bytes()); // xMaxExtent
    out.extend_from_slice(&1i16.to_be_bytes()); // caretSlopeRise
    out.extend_from_slice(&0i16.to_be_bytes()); // caretSlopeRun
    out.extend_from_slice(&0i16.to_be_bytes()); // caretOffset
    out.extend_from_slice(&0i16.to_be_bytes()); // reserved x4
    out.extend_from_slice(&0i16.to_be_bytes());
    out.extend_from_slice(&0i16.to_be_bytes());
    out.extend_from_slice(&0i16.to_be_bytes());
    out.extend_from_slice(&0i16.to_be_bytes()); // metricDataFormat
    out.extend_from_slice(&num_glyphs.to_be_bytes()); // numberOfHMetrics
    out
}

fn build_hmtx(advances: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(advances.len() * 4);
    for &advance in advances {
        out.extend_from_slice(&advance.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes()); // lsb
    }
    out
}

fn build_maxp(num_glyphs: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&0x00010000u32.to_be_bytes()); // version 1.0 (TrueType)
    out.extend_from_slice(&num_glyphs.to_be_bytes());
    for _ in 0..13 {
        out.extend_from_slice(&0u16.to_be_bytes()); // every glyph is a zero-contour outline
    }
    out
}

fn build_post() -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&0x00030000u32.to_be_bytes()); // version 3.0: no glyph names
    out.extend_from_slice(&0i32.to_be_bytes()); // italicAngle
    out.extend_from_slice(&0i16.to_be_bytes()); // underlinePosition
    out.extend_from_slice(&0i16.to_be_bytes()); // underlineThickness
    out.extend_from_slice(&0u32.to_be_bytes()); // isFixedPitch
    out.extend_from_slice(&0u32.to_be_bytes()); // minMemType42
    out.extend_from_slice(&0u32.to_be_bytes()); // maxMemType42
    out.extend_from_slice(&0u32.to_be_bytes()); // minMemType1
    out.extend_from_slice(&0u32.to_be_bytes()); // maxMemType1
    out
}

fn build_name() -> Vec<u8> {
    // name IDs: 1 family, 2 subfamily, 4 full name, 6 postscript name.
    let records: &[(u16, &str)] = &[
        (1, FONT_FAMILY),
        (2, "Regular"),
        (4, FONT_FAMILY),
        (6, FONT_FAMILY),
    ];

    let mut platforms: Vec<(u16, u16, u16)> = Vec::new(); // (platformID, encodingID, languageID)
    platforms.push((3, 1, 0x0409)); // Windows, Unicode BMP, en-US
    platforms.push((1, 0, 0)); // Macintosh, Roman, English

    let mut name_records = Vec::new();
    let mut string_storage = Vec::new();

    for &(platform_id, encoding_id, language_id) in &platforms {
        for &(name_id, value) in records {
            let bytes = if platform_id == 3 {
                utf16_be_bytes(value)
            } else {
                value.as_bytes().to_vec()
            };
            let offset = string_storage.len() as u16;
            let length = bytes.len() as u16;
            string_storage.extend_from_slice(&bytes);
            name_records.push((platform_id, encoding_id, language_id, name_id, length, offset));
        }
    }

    let header_len = 6 + 12 * name_records.len();
    let mut out = Vec::with_capacity(header_len + string_storage.len());
    out.extend_from_slice(&0u16.to_be_bytes()); // format
    out.extend_from_slice(&(name_records.len() as u16).to_be_bytes());
    out.extend_from_slice(&(header_len as u16).to_be_bytes()); // stringOffset
    for (platform_id, encoding_id, language_id, name_id, length, offset) in &name_records {
        out.extend_from_slice(&platform_id.to_be_bytes());
        out.extend_from_slice(&encoding_id.to_be_bytes());
        out.extend_from_slice(&language_id.to_be_bytes());
        out.extend_from_slice(&name_id.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&offset.to_be_bytes());
    }
    out.extend_from_slice(&string_storage);
    out
}

fn utf16_be_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

fn build_glyf_loca(num_glyphs: u16) -> (Vec<u8>, Vec<u8>) {
    // Every glyph has zero contours, so every loca entry is 0 and glyf is
    // empty. Short format (head.indexToLocFormat = 0) stores offset/2.
    let mut loca = Vec::with_capacity(2 * (num_glyphs as usize + 1));
    for _ in 0..=num_glyphs {
        loca.extend_from_slice(&0u16.to_be_bytes());
    }
    (Vec::new(), loca)
}

/// Builds the `cmap` table with a format 4 subtable for BMP code points and
/// a format 12 subtable covering the full range (needed for the leak PUA
/// block and index glyphs, which live above the BMP in practice only when
/// `offset` pushes them there — format 12 is kept unconditionally since it
/// is a strict superset and costs little).
fn build_cmap(mappings: &[(u32, u16)]) -> Vec<u8> {
    let mut sorted: Vec<(u32, u16)> = mappings.to_vec();
    sorted.sort_by_key(|&(cp, _)| cp);

    let format4 = build_cmap_format4(&sorted);
    let format12 = build_cmap_format12(&sorted);

    let header_len = 4 + 2 * 8; // version, numTables=2, [EncodingRecord;2]
    let format4_offset = header_len as u32;
    let format12_offset = format4_offset + format4.len() as u32;

    let mut out = Vec::with_capacity(header_len + format4.len() + format12.len());
    out.extend_from_slice(&0u16.to_be_bytes()); // version
    out.extend_from_slice(&2u16.to_be_bytes()); // numTables
    out.extend_from_slice(&3u16.to_be_bytes()); // platformID: Windows
    out.extend_from_slice(&1u16.to_be_bytes()); // encodingID: Unicode BMP
    out.extend_from_slice(&format4_offset.to_be_bytes());
    out.extend_from_slice(&3u16.to_be_bytes()); // platformID: Windows
    out.extend_from_slice(&10u16.to_be_bytes()); // encodingID: Unicode full repertoire
    out.extend_from_slice(&format12_offset.to_be_bytes());
    out.extend_from_slice(&format4);
    out.extend_from_slice(&format12);
    out
}

fn build_cmap_format4(sorted: &[(u32, u16)]) -> Vec<u8> {
    let bmp: Vec<(u16, u16)> = sorted
        .iter()
        .filter(|&&(cp, _)| cp <= 0xFFFF)
        .map(|&(cp, gid)| (cp as u16, gid))
        .collect();

    // Group into contiguous-codepoint segments (gid need not be contiguous
    // since idDelta/idRangeOffset both support arbitrary mappings via
    // glyphIdArray, but we keep it simple: one segment per contiguous-cp
    // run, always routed through idRangeOffset + glyphIdArray).
    let mut segments: Vec<(u16, u16)> = Vec::new(); // (start, end) inclusive
    let mut i = 0;
    while i < bmp.len() {
        let start = bmp[i].0;
        let mut end = start;
        let mut j = i + 1;
        while j < bmp.len() && bmp[j].0 == end + 1 {
            end = bmp[j].0;
            j += 1;
        }
        segments.push((start, end));
        i = j;
    }
    segments.push((0xFFFF, 0xFFFF)); // required terminator segment

    let seg_count = segments.len();
    let glyph_id_array: Vec<u16> = bmp.iter().map(|&(_, gid)| gid).collect();

    let seg_count_x2 = (seg_count * 2) as u16;
    let search_range = {
        let mut sr = 1u16;
        while (sr as usize) * 2 <= seg_count {
            sr *= 2;
        }
        sr * 2
    };
    let entry_selector = (search_range / 2).trailing_zeros() as u16;
    let range_shift = seg_count_x2 - search_range;

    let mut end_codes = Vec::with_capacity(seg_count);
    let mut start_codes = Vec::with_capacity(seg_count);
    let mut id_deltas = Vec::with_capacity(seg_count);
    let mut id_range_offsets = Vec::with_capacity(seg_count);

    // Offset (in u16 units) from this segment's idRangeOffset slot to its
    // first glyphIdArray entry; computed after all segments are known.
    let glyph_array_base_slot = seg_count; // idRangeOffsets array has seg_count entries
    let mut glyph_array_cursor = 0u16;

    for (seg_index, &(start, end)) in segments.iter().enumerate() {
        end_codes.push(end);
        start_codes.push(start);
        if start == 0xFFFF && end == 0xFFFF {
            id_deltas.push(1i16);
            id_range_offsets.push(0u16);
            continue;
        }
        id_deltas.push(0i16);
        let slots_from_here =
            (glyph_array_base_slot - seg_index) as u16 + glyph_array_cursor;
        id_range_offsets.push(slots_from_here * 2);
        glyph_array_cursor += end - start + 1;
    }

    let mut out = Vec::new();
    out.extend_from_slice(&4u16.to_be_bytes()); // format
    let length_placeholder_index = out.len();
    out.extend_from_slice(&0u16.to_be_bytes()); // length, patched below
    out.extend_from_slice(&0u16.to_be_bytes()); // language
    out.extend_from_slice(&seg_count_x2.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());
    for &e in &end_codes {
        out.extend_from_slice(&e.to_be_bytes());
    }
    out.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
    for &s in &start_codes {
        out.extend_from_slice(&s.to_be_bytes());
    }
    for &d in &id_deltas {
        out.extend_from_slice(&d.to_be_bytes());
    }
    for &r in &id_range_offsets {
        out.extend_from_slice(&r.to_be_bytes());
    }
    for &g in &glyph_id_array {
        out.extend_from_slice(&g.to_be_bytes());
    }

    let len = out.len() as u16;
    out[length_placeholder_index..length_placeholder_index + 2]
        .copy_from_slice(&len.to_be_bytes());
    out
}

fn build_cmap_format12(sorted: &[(u32, u16)]) -> Vec<u8> {
    // Groups of (startCharCode, endCharCode, startGlyphID) requiring
    // contiguous code points mapped to contiguous glyph ids.
    let mut groups: Vec<(u32, u32, u32)> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let (start_cp, start_gid) = sorted[i];
        let mut end_cp = start_cp;
        let mut j = i + 1;
        while j < sorted.len()
            && sorted[j].0 == end_cp + 1
            && sorted[j].1 as u32 == start_gid as u32 + (j - i) as u32
        {
            end_cp = sorted[j].0;
            j += 1;
        }
        groups.push((start_cp, end_cp, start_gid as u32));
        i = j;
    }

    let header_len = 16;
    let length = header_len + 12 * groups.len();
    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(&12u16.to_be_bytes()); // format
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&(length as u32).to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // language
    out.extend_from_slice(&(groups.len() as u32).to_be_bytes());
    for (start, end, gid) in groups {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}
