//! Rich-text run splitting and inline run markup.
//!
//! A [`RichText`] carries a list of formatting runs, each naming the
//! character index where its font takes over. [`split_runs`] cuts the string
//! at those boundaries; [`run_node`] turns one slice into markup, using
//! `<sup>`/`<sub>` for baseline offsets and an inline-styled `<span>` when the
//! slice's font differs from the cell's own.

use std::borrow::Cow;

use crate::html::{Element, Node};
use crate::model::{RichText, TypeOffset};

/// A contiguous slice of a rich string sharing one font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    /// Font index; text before the first run uses the cell's font.
    pub font: u16,
}

/// Split `rich` into runs in text order.
///
/// `cell_font` applies to the text before the first boundary and to the
/// whole string when there are no runs. Boundaries past the end of the text
/// and boundaries that do not advance are ignored; empty slices are dropped.
pub fn split_runs(rich: &RichText, cell_font: u16) -> Vec<TextRun<'_>> {
    let text = rich.text.as_str();
    let char_count = text.chars().count();

    let mut bounds: Vec<(usize, u16)> = Vec::with_capacity(rich.runs.len() + 1);
    bounds.push((0, cell_font));
    for run in &rich.runs {
        let start = run.start.min(char_count);
        match bounds.last_mut() {
            // A run at the same position replaces the font of the previous one.
            Some(last) if last.0 == start => last.1 = run.font,
            Some(last) if last.0 > start => {}
            _ => bounds.push((start, run.font)),
        }
    }

    let mut runs = Vec::with_capacity(bounds.len());
    for (i, &(start, font)) in bounds.iter().enumerate() {
        let end = bounds.get(i + 1).map_or(char_count, |b| b.0);
        let slice = char_slice(text, start, end);
        if !slice.is_empty() {
            runs.push(TextRun { text: slice, font });
        }
    }
    runs
}

/// Byte slice of `text` between two character indices.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |idx: usize| {
        text.char_indices()
            .nth(idx)
            .map_or(text.len(), |(byte, _)| byte)
    };
    let (from, to) = (byte_at(start), byte_at(end));
    &text[from..to]
}

/// Replace each leading ASCII space with U+00A0 so it survives whitespace
/// collapsing.
pub fn leading_spaces_to_nbsp(text: &str) -> Cow<'_, str> {
    let rest = text.trim_start_matches(' ');
    if rest.len() == text.len() {
        return Cow::Borrowed(text);
    }
    let count = text.len() - rest.len();
    let mut out = String::with_capacity(text.len() + count);
    out.extend(std::iter::repeat('\u{a0}').take(count));
    out.push_str(rest);
    Cow::Owned(out)
}

/// Markup for one run: plain text, `<sup>` or `<sub>` by baseline offset,
/// wrapped in `<span style>` when `inline_style` is given.
pub fn run_node(text: impl Into<String>, offset: TypeOffset, inline_style: Option<&str>) -> Node {
    let text = text.into();
    let inner: Node = match offset {
        TypeOffset::Normal => Node::Text(text),
        TypeOffset::Superscript => Element::new("sup").with_text(text).into(),
        TypeOffset::Subscript => Element::new("sub").with_text(text).into(),
    };
    match inline_style {
        Some(css) if !css.is_empty() => Element::new("span")
            .with_attr("style", css)
            .with_child(inner)
            .into(),
        _ => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormatRun;

    fn rich(text: &str, runs: &[(usize, u16)]) -> RichText {
        RichText {
            text: text.into(),
            runs: runs
                .iter()
                .map(|&(start, font)| FormatRun { start, font })
                .collect(),
        }
    }

    fn texts<'a>(runs: &[TextRun<'a>]) -> Vec<(&'a str, u16)> {
        runs.iter().map(|r| (r.text, r.font)).collect()
    }

    // ── split_runs ───────────────────────────────────────────────

    #[test]
    fn no_runs_is_whole_string() {
        let r = rich("hello", &[]);
        assert_eq!(texts(&split_runs(&r, 3)), [("hello", 3)]);
    }

    #[test]
    fn leading_slice_uses_cell_font() {
        let r = rich("plain bold", &[(6, 2)]);
        assert_eq!(texts(&split_runs(&r, 0)), [("plain ", 0), ("bold", 2)]);
    }

    #[test]
    fn run_font_applies_from_its_boundary() {
        let r = rich("abcdef", &[(0, 1), (2, 2), (4, 3)]);
        assert_eq!(
            texts(&split_runs(&r, 0)),
            [("ab", 1), ("cd", 2), ("ef", 3)]
        );
    }

    #[test]
    fn boundaries_are_character_indices() {
        let r = rich("héllo wörld", &[(6, 4)]);
        assert_eq!(texts(&split_runs(&r, 0)), [("héllo ", 0), ("wörld", 4)]);
    }

    #[test]
    fn out_of_range_and_backwards_boundaries() {
        let r = rich("abc", &[(2, 1), (1, 2), (10, 3)]);
        assert_eq!(texts(&split_runs(&r, 0)), [("ab", 0), ("c", 1)]);
    }

    #[test]
    fn empty_text_has_no_runs() {
        assert!(split_runs(&rich("", &[(0, 1)]), 0).is_empty());
    }

    // ── leading_spaces_to_nbsp ───────────────────────────────────

    #[test]
    fn leading_spaces_converted() {
        assert_eq!(leading_spaces_to_nbsp("   abc"), "\u{a0}\u{a0}\u{a0}abc");
        assert_eq!(leading_spaces_to_nbsp("a  b "), "a  b ");
        assert_eq!(leading_spaces_to_nbsp("  "), "\u{a0}\u{a0}");
    }

    #[test]
    fn no_leading_space_borrows() {
        assert!(matches!(leading_spaces_to_nbsp("abc"), Cow::Borrowed(_)));
    }

    // ── run_node ─────────────────────────────────────────────────

    #[test]
    fn normal_run_is_text() {
        assert_eq!(run_node("x", TypeOffset::Normal, None), Node::text("x"));
    }

    #[test]
    fn superscript_and_subscript() {
        let sup = run_node("2", TypeOffset::Superscript, None);
        assert_eq!(sup.as_element().map(|e| e.name), Some("sup"));
        let sub = run_node("2", TypeOffset::Subscript, None);
        assert_eq!(sub.as_element().map(|e| e.name), Some("sub"));
        assert_eq!(sub.text_content(), "2");
    }

    #[test]
    fn styled_run_wraps_in_span() {
        let node = run_node("red", TypeOffset::Superscript, Some("color:#ff0000; "));
        let span = node.as_element().unwrap();
        assert_eq!(span.name, "span");
        assert_eq!(span.attr("style"), Some("color:#ff0000; "));
        assert_eq!(span.children_named("sup").count(), 1);
    }
}
