//! Asset discovery: pure pattern scans over untrusted descriptor text.
//!
//! Everything here is `&str → data` with no I/O so each rule can be tested
//! without a network or a runtime. The download stages in
//! [`crate::pipeline::download`] and [`crate::pipeline::resolve`] consume the
//! `(seq, url)` task lists produced here.
//!
//! ## Numbering
//!
//! Direct images are numbered `1..=n` in first-occurrence order. Secondary
//! descriptors are numbered after them (`n + 1..`), in payload order, so
//! sorting slots by number yields direct pages first and each phase keeps its
//! discovery order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// One unit of download work: the page's sequence number and its URL.
pub type Task = (u32, String);

static RE_DIRECT_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https://[^\s"'<>]+?\.(?:jpg|png)"#).unwrap());

static RE_CONTENT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"contentUrl:\s*"([^"]+)""#).unwrap());

static RE_JSONP_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\(\s*\[\s*"(.+)"\s*\]\s*\);"#).unwrap());

static RE_ORIG_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"orig="([^"]*\.[^"]*)""#).unwrap());

/// Image URLs linked directly from the payload, deduplicated, first occurrence wins.
pub fn direct_image_urls(payload: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RE_DIRECT_IMAGE
        .find_iter(payload)
        .map(|m| m.as_str())
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}

/// Secondary per-page descriptor URLs, in payload order.
pub fn content_urls(payload: &str) -> Vec<String> {
    RE_CONTENT_URL
        .captures_iter(payload)
        .map(|c| c[1].to_string())
        .collect()
}

/// Number the direct images `1..=n`.
pub fn direct_tasks(payload: &str) -> Vec<Task> {
    number_from(direct_image_urls(payload), 0)
}

/// Number the secondary descriptors after `offset` direct slots.
///
/// `offset` must be the final direct count; callers compute it only once the
/// direct phase has been planned.
pub fn indirect_tasks(payload: &str, offset: usize) -> Vec<Task> {
    number_from(content_urls(payload), offset)
}

/// Numbering stops at the first sequence number that does not fit in a `u32`,
/// so numbers never wrap into ones already assigned.
fn number_from(urls: Vec<String>, offset: usize) -> Vec<Task> {
    urls.into_iter()
        .enumerate()
        .map_while(|(i, url)| {
            let seq = offset.checked_add(i)?.checked_add(1)?;
            u32::try_from(seq).ok().map(|seq| (seq, url))
        })
        .collect()
}

/// Why a page descriptor yielded no image URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentMiss {
    /// The body has no `(["..."]);` wrapper.
    Wrapper,
    /// The unescaped fragment has no `orig="..."` attribute.
    Original,
}

/// Extract the full-resolution image URL from a page descriptor body.
///
/// The attribute value is HTML, so `&amp;` is decoded to `&`.
pub fn original_image_url(descriptor: &str) -> Result<String, FragmentMiss> {
    let escaped = RE_JSONP_WRAPPER
        .captures(descriptor)
        .map(|c| c.get(1).map_or("", |m| m.as_str()).to_string())
        .ok_or(FragmentMiss::Wrapper)?;

    let html = unescape_fragment(&escaped);

    RE_ORIG_ATTR
        .captures(&html)
        .map(|c| c[1].replace("&amp;", "&"))
        .ok_or(FragmentMiss::Original)
}

/// Resolve backslash escapes in a JS/JSON string literal body.
///
/// Handles `\n \r \t \b \f \0 \\ \/ \' \"`, `\xHH`, `\uXXXX` (including
/// surrogate pairs) and `\UXXXXXXXX`. Unknown or truncated escapes are kept
/// verbatim.
pub fn unescape_fragment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '0' => out.push('\0'),
            '\\' | '/' | '\'' | '"' => out.push(esc),
            'x' => match take_hex(&mut chars, 2) {
                Some(v) => out.push(char::from(v as u8)),
                None => out.push_str("\\x"),
            },
            'u' => match take_hex(&mut chars, 4) {
                Some(hi) if (0xD800..0xDC00).contains(&hi) => {
                    // High surrogate: only valid when followed by \uDC00..\uDFFF.
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => take_hex(&mut lookahead, 4)
                            .filter(|v| (0xDC00..0xE000).contains(v)),
                        _ => None,
                    };
                    match low {
                        Some(lo) => {
                            chars = lookahead;
                            let cp = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                            out.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
                        }
                        None => out.push('\u{FFFD}'),
                    }
                }
                Some(v) => out.push(char::from_u32(v).unwrap_or('\u{FFFD}')),
                None => out.push_str("\\u"),
            },
            'U' => match take_hex(&mut chars, 8) {
                Some(v) => out.push(char::from_u32(v).unwrap_or('\u{FFFD}')),
                None => out.push_str("\\U"),
            },
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

/// Consume exactly `n` hex digits. On failure nothing is consumed.
fn take_hex<I>(chars: &mut std::iter::Peekable<I>, n: usize) -> Option<u32>
where
    I: Iterator<Item = char> + Clone,
{
    let mut probe = chars.clone();
    let mut value = 0u32;
    for _ in 0..n {
        let d = probe.next()?.to_digit(16)?;
        value = value * 16 + d;
    }
    *chars = probe;
    Some(value)
}
