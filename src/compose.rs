//! Document composer: previewable code blocks → one runnable document.
//!
//! DESIGN
//! ======
//! Selection policy:
//! - the last `html` block is the base document, if there is one;
//! - every `css` block is concatenated into one `<style>` element;
//! - every script-family block is concatenated into one `<script>` element.
//!
//! A full base document gets the style injected before `</head>` and the
//! script before `</body>`. A fragment base, or no base at all, is wrapped in
//! a minimal shell. When a reply carries previewable blocks of no known kind
//! (e.g. ```` ```svg:preview ````), the latest one is wrapped by sniffing its
//! content instead.
//!
//! Composition is a pure function of the block list, so composing the same
//! blocks twice yields byte-identical output.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::blocks::{CodeBlock, latest_previewable};
use crate::error::ErrorCode;

const BASE_STYLE: &str = "body { font-family: system-ui; padding: 20px; background: #1a1a2e; color: #eee; }";
const OUTPUT_STYLE: &str = "#output { white-space: pre-wrap; font-family: monospace; }";

/// Echoes console calls into `#output` so script-only previews show their
/// output without opening the console panel.
const CONSOLE_ECHO_SHIM: &str = r"<script>
  (function () {
    var output = document.getElementById('output');
    ['log', 'info', 'warn', 'error'].forEach(function (level) {
      var original = console[level];
      console[level] = function () {
        var args = Array.prototype.slice.call(arguments);
        var line = args.map(function (arg) {
          if (typeof arg === 'object') {
            try { return JSON.stringify(arg); } catch (e) { return String(arg); }
          }
          return String(arg);
        }).join(' ');
        output.textContent += (level === 'log' ? '' : '[' + level + '] ') + line + '\n';
        original.apply(console, args);
      };
    });
  })();
</script>
";

// =============================================================================
// TYPES
// =============================================================================

/// A complete, self-contained markup document ready for the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposedDocument(String);

impl ComposedDocument {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ComposedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComposedDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ComposedDocument> for String {
    fn from(doc: ComposedDocument) -> Self {
        doc.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("no previewable code blocks")]
    Empty,
    /// Injected content would terminate its own wrapper element early.
    #[error("{language} content contains a closing </{tag}> tag")]
    EmbeddedClosingTag { language: &'static str, tag: &'static str },
}

impl ErrorCode for ComposeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_COMPOSE_EMPTY",
            Self::EmbeddedClosingTag { .. } => "E_COMPOSE_EMBEDDED_TAG",
        }
    }
}

// =============================================================================
// COMPOSITION
// =============================================================================

/// Compose the previewable blocks of one reply into a single document.
///
/// # Errors
///
/// [`ComposeError::Empty`] when nothing is previewable, and
/// [`ComposeError::EmbeddedClosingTag`] when CSS content would break out of
/// its injected element. A `</script` inside script code is escaped instead.
pub fn compose(blocks: &[CodeBlock]) -> Result<ComposedDocument, ComposeError> {
    let previewable: Vec<&CodeBlock> = blocks.iter().filter(|b| b.is_previewable).collect();
    let Some(latest) = previewable.last() else {
        return Err(ComposeError::Empty);
    };

    let base = previewable.iter().rev().find(|b| b.is_html());
    let css = join_code(previewable.iter().copied().filter(|b| b.is_css()));
    let script = escape_script_close(&join_code(previewable.iter().copied().filter(|b| b.is_script())));

    if contains_ci(&css, "</style") {
        return Err(ComposeError::EmbeddedClosingTag { language: "css", tag: "style" });
    }

    let html = match base {
        Some(base) if looks_like_full_document(&base.code) => inject_into_document(&base.code, &css, &script),
        Some(base) => fragment_shell(&base.code, &css, &script),
        None => match (css.is_empty(), script.is_empty()) {
            (false, true) => css_shell(&css),
            (true, false) => script_shell(&script),
            (false, false) => mounted_shell(&css, &script),
            (true, true) => return Ok(wrap_in_document(&latest.code)),
        },
    };
    Ok(ComposedDocument(html))
}

/// Compose, falling back to the latest previewable block's raw code.
///
/// Previews never fail hard: an empty string means there is nothing to show.
#[must_use]
pub fn compose_or_raw(blocks: &[CodeBlock]) -> String {
    match compose(blocks) {
        Ok(doc) => doc.into_string(),
        Err(ComposeError::Empty) => String::new(),
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "compose: falling back to raw code");
            latest_previewable(blocks)
                .map(|b| b.code.clone())
                .unwrap_or_default()
        }
    }
}

/// Wrap a single untagged snippet, sniffing whether it is a full document,
/// bare CSS, bare script, or a markup fragment.
#[must_use]
pub fn wrap_in_document(code: &str) -> ComposedDocument {
    let html = if looks_like_full_document(code) {
        code.to_owned()
    } else if looks_like_css(code) {
        css_shell(code)
    } else if looks_like_script(code) {
        script_shell(code)
    } else {
        fragment_shell(code, "", "")
    };
    ComposedDocument(html)
}

// =============================================================================
// HEURISTICS
// =============================================================================

/// A document-type declaration or an `<html` root tag, case-insensitive.
#[must_use]
pub fn looks_like_full_document(code: &str) -> bool {
    contains_ci(code, "<!doctype html") || contains_ci(code, "<html")
}

fn css_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^[.#@\w\s{}\-:;,()'"%!*/>+~\[\]=]+$"#).expect("css charset regex"))
}

fn script_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(script)").expect("script close regex"))
}

fn script_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:function|const|let)\b|=>").expect("script keyword regex"))
}

fn looks_like_css(code: &str) -> bool {
    let trimmed = code.trim();
    !trimmed.contains('<')
        && trimmed.contains('{')
        && css_charset_regex().is_match(trimmed)
        && !script_keyword_regex().is_match(trimmed)
}

fn looks_like_script(code: &str) -> bool {
    !code.contains('<') && script_keyword_regex().is_match(code)
}

// =============================================================================
// SHELLS
// =============================================================================

fn join_code<'a>(blocks: impl Iterator<Item = &'a CodeBlock>) -> String {
    blocks
        .map(|b| b.code.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `</script` ends the element even inside a string literal; `<\/script`
/// reads the same to the script.
fn escape_script_close(script: &str) -> String {
    script_close_regex().replace_all(script, r"<\/$1").into_owned()
}

fn style_element(css: &str) -> String {
    format!("<style>\n{css}\n</style>\n")
}

fn script_element(script: &str) -> String {
    format!("<script>\n{script}\n</script>\n")
}

fn shell(head_extra: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{BASE_STYLE}\n</style>\n{head_extra}</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn css_shell(css: &str) -> String {
    shell(&style_element(css), "<div id=\"preview\">CSS Preview</div>\n")
}

fn script_shell(script: &str) -> String {
    let body = format!("<div id=\"output\"></div>\n{CONSOLE_ECHO_SHIM}{}", script_element(script));
    shell(&style_element(OUTPUT_STYLE), &body)
}

fn mounted_shell(css: &str, script: &str) -> String {
    let body = format!("<div id=\"root\"></div>\n{}", script_element(script));
    shell(&style_element(css), &body)
}

fn fragment_shell(fragment: &str, css: &str, script: &str) -> String {
    let head_extra = if css.is_empty() { String::new() } else { style_element(css) };
    let mut body = format!("{fragment}\n");
    if !script.is_empty() {
        body.push_str(&script_element(script));
    }
    shell(&head_extra, &body)
}

fn inject_into_document(doc: &str, css: &str, script: &str) -> String {
    let mut out = doc.to_owned();
    if !css.is_empty() {
        let element = style_element(css);
        match find_ci(&out, "</head>") {
            Some(at) => out.insert_str(at, &element),
            None => out.insert_str(0, &element),
        }
    }
    if !script.is_empty() {
        let element = script_element(script);
        match rfind_ci(&out, "</body>") {
            Some(at) => out.insert_str(at, &element),
            None => out.push_str(&element),
        }
    }
    out
}

// ASCII lower-casing keeps byte offsets stable, so indices found in the
// lowered copy are valid in the original.

pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn rfind_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

#[cfg(test)]
#[path = "compose_test.rs"]
mod tests;
