//! Permissive markup structure check.
//!
//! Browsers recover from almost anything, so this only reports what a
//! recovering parser would still have to guess at: a tag or comment that
//! never terminates, and a closing tag with no matching open element.
//! Elements left open at end of input are fine; so are void elements and
//! `<p>`-style implicit closes (closing an outer element closes every inner
//! one).

use std::fmt;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupIssue {
    UnterminatedTag { offset: usize },
    UnterminatedComment { offset: usize },
    StrayClosingTag { name: String, offset: usize },
}

impl fmt::Display for MarkupIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedTag { offset } => write!(f, "unterminated tag at byte {offset}"),
            Self::UnterminatedComment { offset } => write!(f, "unterminated comment at byte {offset}"),
            Self::StrayClosingTag { name, offset } => write!(f, "stray </{name}> at byte {offset}"),
        }
    }
}

/// Scan `html` and return every structural issue, in document order.
#[must_use]
pub fn check_structure(html: &str) -> Vec<MarkupIssue> {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut open: Vec<String> = Vec::new();
    let mut issues = Vec::new();
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find('<') {
        let start = pos + rel;
        let rest = &lower[start..];

        if rest.starts_with("<!--") {
            match rest[4..].find("-->") {
                Some(end) => pos = start + 4 + end + 3,
                None => {
                    issues.push(MarkupIssue::UnterminatedComment { offset: start });
                    break;
                }
            }
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            match rest.find('>') {
                Some(end) => pos = start + end + 1,
                None => {
                    issues.push(MarkupIssue::UnterminatedTag { offset: start });
                    break;
                }
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix("</") {
            let name = tag_name(after);
            if name.is_empty() {
                pos = start + 2;
                continue;
            }
            let Some(end) = tag_end(bytes, start + 2 + name.len()) else {
                issues.push(MarkupIssue::UnterminatedTag { offset: start });
                break;
            };
            match open.iter().rposition(|n| n == name) {
                Some(at) => open.truncate(at),
                None => issues.push(MarkupIssue::StrayClosingTag { name: name.to_owned(), offset: start }),
            }
            pos = end + 1;
            continue;
        }

        let name = tag_name(&rest[1..]);
        if name.is_empty() {
            // A bare `<` in text, e.g. `a < b`.
            pos = start + 1;
            continue;
        }
        let Some(end) = tag_end(bytes, start + 1 + name.len()) else {
            issues.push(MarkupIssue::UnterminatedTag { offset: start });
            break;
        };
        pos = end + 1;

        let self_closing = bytes[end - 1] == b'/';
        if self_closing || VOID_ELEMENTS.contains(&name) {
            continue;
        }
        open.push(name.to_owned());

        if RAW_TEXT_ELEMENTS.contains(&name) {
            match lower[pos..].find(&format!("</{name}")) {
                Some(close) => pos += close,
                // Unclosed raw text runs to end of input.
                None => break,
            }
        }
    }

    issues
}

/// Leading tag name: an ASCII letter followed by letters, digits or `-`.
fn tag_name(s: &str) -> &str {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return "";
    }
    let len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(s.len());
    &s[..len]
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "markup_test.rs"]
mod tests;
