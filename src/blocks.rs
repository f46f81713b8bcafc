//! Code block extraction and classification.
//!
//! DESIGN
//! ======
//! A fence is three backticks, an optional language tag, an optional
//! `:modifier`, a newline, the body, and a closing three backticks. Matching
//! is lazy, so an unclosed fence at the end of a streaming reply produces no
//! block until its closing backticks arrive.
//!
//! Extraction is a pure function of the text apart from block ids, which come
//! from an injectable [`IdSource`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language recorded for fences without a tag.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// Modifier that makes any fence previewable (e.g. ```` ```svg:preview ````).
pub const PREVIEW_MODIFIER: &str = "preview";

/// Replacement for fenced regions in plain-text previews.
pub const CODE_BLOCK_PLACEHOLDER: &str = "[Code Block]";

/// Languages rendered live without an explicit `:preview` modifier.
pub const PREVIEWABLE_LANGUAGES: &[&str] = &["html", "css", "javascript", "js", "jsx", "ts", "tsx"];

/// Script-family languages, injected into a `<script>` element by the composer.
pub const SCRIPT_LANGUAGES: &[&str] = &["javascript", "js", "jsx", "ts", "tsx"];

// =============================================================================
// TYPES
// =============================================================================

/// One fenced region of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub id: String,
    /// Lower-cased fence tag, or [`DEFAULT_LANGUAGE`].
    pub language: String,
    /// Fence body with surrounding whitespace trimmed.
    pub code: String,
    pub is_previewable: bool,
}

impl CodeBlock {
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.language == "html"
    }

    #[must_use]
    pub fn is_css(&self) -> bool {
        self.language == "css"
    }

    #[must_use]
    pub fn is_script(&self) -> bool {
        SCRIPT_LANGUAGES.contains(&self.language.as_str())
    }
}

/// Source of opaque block identifiers. Swapped out in tests for stable ids.
pub trait IdSource {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

// =============================================================================
// PATTERNS
// =============================================================================

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_]+)?(?::([A-Za-z0-9_]+))?\r?\n(.*?)```").expect("fence regex")
    })
}

fn any_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("any fence regex"))
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Whether a fence with this (already normalized) language and modifier can
/// be rendered live.
#[must_use]
pub fn is_previewable(language: &str, modifier: Option<&str>) -> bool {
    modifier == Some(PREVIEW_MODIFIER) || PREVIEWABLE_LANGUAGES.contains(&language)
}

/// Extract every fenced block from `text`, in order, with random ids.
#[must_use]
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    extract_code_blocks_with(text, &UuidIds)
}

/// Extract every fenced block from `text`, drawing ids from `ids`.
#[must_use]
pub fn extract_code_blocks_with(text: &str, ids: &dyn IdSource) -> Vec<CodeBlock> {
    fence_regex()
        .captures_iter(text)
        .map(|caps| {
            let language = caps
                .get(1)
                .map_or_else(|| DEFAULT_LANGUAGE.to_owned(), |m| m.as_str().to_ascii_lowercase());
            let modifier = caps.get(2).map(|m| m.as_str());
            let code = caps.get(3).map_or("", |m| m.as_str()).trim().to_owned();
            let is_previewable = is_previewable(&language, modifier);
            CodeBlock { id: ids.next_id(), language, code, is_previewable }
        })
        .collect()
}

/// Replace every fenced region with [`CODE_BLOCK_PLACEHOLDER`].
#[must_use]
pub fn strip_code_blocks(text: &str) -> String {
    any_fence_regex()
        .replace_all(text, CODE_BLOCK_PLACEHOLDER)
        .into_owned()
}

/// The last previewable block, if any.
#[must_use]
pub fn latest_previewable(blocks: &[CodeBlock]) -> Option<&CodeBlock> {
    blocks.iter().rev().find(|b| b.is_previewable)
}

#[cfg(test)]
#[path = "blocks_test.rs"]
mod tests;
