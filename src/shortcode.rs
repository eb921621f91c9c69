//! Downstream shortcode parsing seam
//!
//! Custom element substitution runs as a pre-pass; the corrected text is then
//! handed to the existing shortcode engine, which resolves bracket directives
//! such as `[sitetree_link,id=1]`. This crate does not implement shortcode
//! syntax; it only defines the seam and an identity implementation.

/// A text-substitution engine that runs after custom element substitution
pub trait ShortcodeParser: Send + Sync {
    /// Substitute shortcodes in `content`
    fn parse(&self, content: &str) -> String;
}

/// Shortcode parser that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughShortcodes;

impl ShortcodeParser for PassthroughShortcodes {
    fn parse(&self, content: &str) -> String {
        content.to_string()
    }
}

impl<F> ShortcodeParser for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn parse(&self, content: &str) -> String {
        self(content)
    }
}
