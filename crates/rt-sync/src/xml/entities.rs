//! Entity handling before tokenization.
//!
//! Storage-format bodies routinely carry HTML named entities (`&nbsp;`) and
//! bare ampersands, neither of which is legal XML. Both are rewritten here so
//! the tokenizer only ever sees the five predefined entities and character
//! references. Comments and CDATA sections are left alone.

use std::sync::LazyLock;

use regex::Regex;

/// Named HTML entity.
static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// An ampersand, with the reference it starts if that reference is valid XML.
static AMPERSAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|amp;|lt;|gt;|quot;|apos;)?")
        .expect("invalid ampersand regex")
});

/// Rewrite entities so the result is tokenizable XML.
pub(crate) fn prepare(input: &str) -> String {
    map_markup(input, |segment| {
        escape_bare_ampersands(&convert_html_entities(segment))
    })
}

/// Convert HTML entities to Unicode characters.
///
/// Predefined XML entities (amp, lt, gt, quot, apos) and unknown names are
/// left unchanged.
pub(crate) fn convert_html_entities(html: &str) -> String {
    ENTITY_PATTERN
        .replace_all(html, |caps: &regex::Captures| {
            entity_to_unicode(&caps[1]).map_or_else(|| caps[0].to_owned(), str::to_owned)
        })
        .into_owned()
}

/// Escape every `&` that does not start a predefined entity or a character
/// reference.
pub(crate) fn escape_bare_ampersands(text: &str) -> String {
    AMPERSAND_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            if caps.get(1).is_some() {
                caps[0].to_owned()
            } else {
                "&amp;".to_owned()
            }
        })
        .into_owned()
}

/// Apply `f` to the parts of `input` outside comments and CDATA sections.
fn map_markup(input: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        let next = [("<!--", "-->"), ("<![CDATA[", "]]>")]
            .into_iter()
            .filter_map(|(open, close)| rest.find(open).map(|at| (at, close)))
            .min_by_key(|(at, _)| *at);

        let Some((start, close)) = next else {
            out.push_str(&f(rest));
            return out;
        };

        out.push_str(&f(&rest[..start]));
        let literal = &rest[start..];
        match literal.find(close) {
            Some(end) => {
                let end = end + close.len();
                out.push_str(&literal[..end]);
                rest = &literal[end..];
            }
            None => {
                // Unterminated; let the tokenizer report it.
                out.push_str(literal);
                return out;
            }
        }
    }
}

/// Map HTML entity name to Unicode character.
fn entity_to_unicode(name: &str) -> Option<&'static str> {
    Some(match name {
        // Spacing and punctuation
        "nbsp" => "\u{00a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "shy" => "\u{00ad}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bdquo" => "\u{201e}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "sbquo" => "\u{201a}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "middot" => "\u{00b7}",
        "iexcl" => "\u{00a1}",
        "iquest" => "\u{00bf}",

        // Arrows
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        "harr" => "\u{2194}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        "rArr" => "\u{21d2}",
        "lArr" => "\u{21d0}",
        "hArr" => "\u{21d4}",

        // Math
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "asymp" => "\u{2248}",
        "plusmn" => "\u{00b1}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "minus" => "\u{2212}",
        "infin" => "\u{221e}",
        "deg" => "\u{00b0}",
        "micro" => "\u{00b5}",
        "frac14" => "\u{00bc}",
        "frac12" => "\u{00bd}",
        "frac34" => "\u{00be}",
        "sup1" => "\u{00b9}",
        "sup2" => "\u{00b2}",
        "sup3" => "\u{00b3}",

        // Legal, currency, and marks
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "yen" => "\u{00a5}",
        "cent" => "\u{00a2}",
        "para" => "\u{00b6}",
        "sect" => "\u{00a7}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "acute" => "\u{00b4}",
        "cedil" => "\u{00b8}",
        "ordf" => "\u{00aa}",
        "ordm" => "\u{00ba}",

        // Latin letters common in page titles and prose
        "auml" => "\u{00e4}",
        "ouml" => "\u{00f6}",
        "uuml" => "\u{00fc}",
        "Auml" => "\u{00c4}",
        "Ouml" => "\u{00d6}",
        "Uuml" => "\u{00dc}",
        "szlig" => "\u{00df}",
        "eacute" => "\u{00e9}",
        "egrave" => "\u{00e8}",
        "aacute" => "\u{00e1}",
        "agrave" => "\u{00e0}",
        "ccedil" => "\u{00e7}",
        "ntilde" => "\u{00f1}",

        _ => return None,
    })
}
