//! Custom elements parser - the public entry point
//!
//! [`CustomElementsParser`] is a drop-in superset of a plain shortcode parser:
//! [`CustomElementsParser::parse`] first substitutes registered custom
//! elements, then hands the corrected text to the downstream
//! [`ShortcodeParser`].
//!
//! # Pipeline
//!
//! 1. Resolve the context (once per call; `None` without a context source)
//! 2. Expand self-closed registered tags, then parse the content into a full
//!    HTML document
//! 3. Tag walk, then class scan (see [`crate::engine`])
//! 4. Serialize and correct the output against the original content
//! 5. Run the shortcode parser on the result
//!
//! # Examples
//!
//! ```rust
//! use custom_elements_parser::{CustomElementsParser, Substitution, dom, handler};
//!
//! let mut parser = CustomElementsParser::new()
//!     .with_shortcodes(|content: &str| content.replace("[company]", "ACME"));
//!
//! parser.register_by_tag(
//!     "testelement",
//!     handler::from_fn(|node, parser, _context| {
//!         let markup = dom::get_attr(node, "data-attr").unwrap_or_default();
//!         Ok(Substitution::markup(parser.parse(&markup)?))
//!     }),
//! );
//!
//! assert_eq!(
//!     parser.parse(r#"<testelement data-attr="abc">def</testelement>"#).unwrap(),
//!     "abc"
//! );
//! assert_eq!(parser.parse("no shortcode").unwrap(), "no shortcode");
//! assert_eq!(parser.parse("<p>[company]</p>").unwrap(), "<p>ACME</p>");
//! ```

use markup5ever_rcdom::Handle;
use std::any::Any;
use std::cell::Cell;
use std::fmt;

use crate::engine;
use crate::error::SubstitutionError;
use crate::handler::CustomElementHandler;
use crate::registry::ElementRegistry;
use crate::roundtrip;
use crate::shortcode::{PassthroughShortcodes, ShortcodeParser};

/// Default limit for nested `parse` / `reduce_children` calls
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Zero-argument lookup of the ambient rendering context (e.g. the current page)
pub type ContextSource = dyn Fn() -> Option<Box<dyn Any>> + Send + Sync;

/// Parser options
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Treat parse errors in handler-returned markup as fatal
    pub strict_fragments: bool,
    /// Maximum nesting of `parse` / `reduce_children` calls (None disables the guard)
    pub max_nesting_depth: Option<usize>,
    /// Restore `[` and `]` in percent-encoded `<a href>` shortcodes
    pub restore_shortcode_urls: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strict_fragments: true,
            max_nesting_depth: Some(DEFAULT_MAX_NESTING_DEPTH),
            restore_shortcode_urls: true,
        }
    }
}

/// Shortcode parser with custom element substitution
///
/// Owns its [`ElementRegistry`]; build the registry once and share it between
/// parsers with [`CustomElementsParser::with_registry`] when several threads
/// need their own parser. A parser instance is meant for one thread at a time
/// (it tracks nesting depth in a `Cell`).
pub struct CustomElementsParser {
    options: ParserOptions,
    registry: ElementRegistry,
    shortcodes: Box<dyn ShortcodeParser>,
    context_source: Option<Box<ContextSource>>,
    depth: Cell<usize>,
}

impl CustomElementsParser {
    /// Create a parser with no registrations, passthrough shortcodes and no context source
    pub fn new() -> Self {
        Self {
            options: ParserOptions::default(),
            registry: ElementRegistry::new(),
            shortcodes: Box::new(PassthroughShortcodes),
            context_source: None,
            depth: Cell::new(0),
        }
    }

    /// Replace the parser options
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the registry
    pub fn with_registry(mut self, registry: ElementRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the downstream shortcode parser
    pub fn with_shortcodes<S>(mut self, shortcodes: S) -> Self
    where
        S: ShortcodeParser + 'static,
    {
        self.shortcodes = Box::new(shortcodes);
        self
    }

    /// Set the context source consulted once per `parse` call
    pub fn with_context_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Option<Box<dyn Any>> + Send + Sync + 'static,
    {
        self.context_source = Some(Box::new(source));
        self
    }

    /// Register a handler by tag name (see [`ElementRegistry::register_by_tag`])
    pub fn register_by_tag<H>(&mut self, tag_name: &str, handler: H)
    where
        H: CustomElementHandler + 'static,
    {
        self.registry.register_by_tag(tag_name, handler);
    }

    /// Register a handler by class name (see [`ElementRegistry::register_by_class`])
    pub fn register_by_class<H>(&mut self, class_name: &str, handler: H)
    where
        H: CustomElementHandler + 'static,
    {
        self.registry.register_by_class(class_name, handler);
    }

    /// The handler registry
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Mutable access to the handler registry
    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    /// Parser options
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Substitute custom elements, then shortcodes
    ///
    /// # Errors
    ///
    /// Malformed content never fails. Errors come from handlers, from
    /// malformed handler markup in strict mode, and from the nesting guard.
    pub fn parse(&self, content: &str) -> Result<String, SubstitutionError> {
        let substituted = self.substitute_custom_elements(content)?;
        Ok(self.shortcodes.parse(&substituted))
    }

    /// Substitute custom elements only, without running shortcodes
    pub fn substitute_custom_elements(&self, content: &str) -> Result<String, SubstitutionError> {
        let _guard = self.enter()?;

        let context = self.resolve_context();
        let context = context.as_deref();

        let expanded =
            roundtrip::expand_self_closing(content, |tag| self.registry.handler_for_tag(tag).is_some());
        let dom = roundtrip::parse_content(&expanded);
        engine::substitute(&dom.document, self, context)?;
        engine::substitute_by_class(&dom.document, self, context)?;

        let serialized = roundtrip::serialize_document(&dom)?;
        Ok(roundtrip::correct_markup(
            &serialized,
            content,
            self.options.restore_shortcode_urls,
        ))
    }

    /// Substitute custom elements among the children of `node`
    ///
    /// Handlers call this on content they return when nested custom elements
    /// should be processed; the engine never does it for them.
    pub fn reduce_children(
        &self,
        node: &Handle,
        context: Option<&dyn Any>,
    ) -> Result<(), SubstitutionError> {
        let _guard = self.enter()?;
        engine::reduce_children(node, self, context)
    }

    /// Parse markup into a fragment container for building `Tree` results
    ///
    /// Follows [`ParserOptions::strict_fragments`] like markup returned by
    /// handlers.
    pub fn parse_fragment(&self, markup: &str) -> Result<Handle, SubstitutionError> {
        if self.options.strict_fragments {
            return roundtrip::parse_fragment_strict(markup, "#fragment");
        }
        Ok(roundtrip::parse_fragment(markup).fragment)
    }

    fn resolve_context(&self) -> Option<Box<dyn Any>> {
        self.context_source.as_ref().and_then(|source| source())
    }

    fn enter(&self) -> Result<DepthGuard<'_>, SubstitutionError> {
        let depth = self.depth.get() + 1;
        if let Some(limit) = self.options.max_nesting_depth
            && depth > limit
        {
            return Err(SubstitutionError::NestingTooDeep { limit });
        }
        self.depth.set(depth);
        Ok(DepthGuard { depth: &self.depth })
    }
}

impl Default for CustomElementsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CustomElementsParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomElementsParser")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("has_context_source", &self.context_source.is_some())
            .finish_non_exhaustive()
    }
}

/// Decrements the nesting depth when dropped
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;
    use crate::handler::{Substitution, from_fn};
    use proptest::prelude::*;

    fn attribute_handler() -> impl CustomElementHandler {
        from_fn(|node, parser, _| {
            let mode = dom::get_attr(node, "data-test-mode").unwrap_or_else(|| "attribute".into());
            let markup = match mode.as_str() {
                "attribute" => dom::get_attr(node, "data-attr").unwrap_or_default(),
                "nested" => "<testelement>def</testelement>".to_string(),
                _ => String::new(),
            };
            Ok(Substitution::markup(parser.parse(&markup)?))
        })
    }

    #[test]
    fn test_no_substitution_with_paragraph() {
        let parser = CustomElementsParser::new();
        assert_eq!(parser.parse("<p>no shortcode</p>").unwrap(), "<p>no shortcode</p>");
    }

    #[test]
    fn test_no_substitution_plain_text() {
        let parser = CustomElementsParser::new();
        assert_eq!(parser.parse("no shortcode").unwrap(), "no shortcode");
    }

    #[test]
    fn test_empty_content() {
        let parser = CustomElementsParser::new();
        assert_eq!(parser.parse("").unwrap(), "");
    }

    #[test]
    fn test_attribute_substitution() {
        let mut parser = CustomElementsParser::new();
        parser.register_by_tag("testelement", attribute_handler());
        assert_eq!(
            parser
                .parse(r#"<testelement data-test-mode="attribute" data-attr="abc">def</testelement>"#)
                .unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_nested_mode_renders_inner_element() {
        let mut parser = CustomElementsParser::new();
        parser.register_by_tag("testelement", attribute_handler());

        // Nested mode re-emits <testelement> without data-test-mode, so the
        // inner one falls back to attribute mode with an empty data-attr.
        assert_eq!(
            parser
                .parse(r#"<testelement data-test-mode="nested">x</testelement>"#)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_self_referential_handler_trips_guard() {
        let mut parser = CustomElementsParser::new().with_options(ParserOptions {
            max_nesting_depth: Some(5),
            ..Default::default()
        });
        parser.register_by_tag(
            "loop",
            from_fn(|_, parser, _| Ok(Substitution::markup(parser.parse("<loop></loop>")?))),
        );

        match parser.parse("<loop></loop>") {
            Err(SubstitutionError::NestingTooDeep { limit }) => assert_eq!(limit, 5),
            other => panic!("Expected NestingTooDeep, got {other:?}"),
        }
        // The depth counter unwinds after the failure
        assert_eq!(parser.depth.get(), 0);
        assert_eq!(parser.parse("<p>ok</p>").unwrap(), "<p>ok</p>");
    }

    #[test]
    fn test_context_resolved_and_passed() {
        let mut parser = CustomElementsParser::new()
            .with_context_source(|| Some(Box::new("About us".to_string()) as Box<dyn Any>));
        parser.register_by_tag(
            "page-title",
            from_fn(|_, _, context| {
                let title = context
                    .and_then(|c| c.downcast_ref::<String>())
                    .cloned()
                    .unwrap_or_default();
                Ok(Substitution::markup(title))
            }),
        );

        assert_eq!(
            parser.parse("<h1><page-title></page-title></h1>").unwrap(),
            "<h1>About us</h1>"
        );
    }

    #[test]
    fn test_missing_context_is_none() {
        let mut parser = CustomElementsParser::new();
        parser.register_by_tag(
            "page-title",
            from_fn(|_, _, context| {
                Ok(Substitution::markup(if context.is_none() { "none" } else { "some" }))
            }),
        );
        assert_eq!(parser.parse("<page-title></page-title>").unwrap(), "none");
    }

    #[test]
    fn test_shortcodes_run_after_substitution() {
        let mut parser = CustomElementsParser::new()
            .with_shortcodes(|content: &str| content.replace("[name]", "Ada"));
        parser.register_by_tag(
            "greeting",
            from_fn(|_, _, _| Ok(Substitution::markup("Hello [name]"))),
        );
        assert_eq!(
            parser.parse("<p><greeting></greeting></p>").unwrap(),
            "<p>Hello Ada</p>"
        );
    }

    #[test]
    fn test_substitute_custom_elements_skips_shortcodes() {
        let parser = CustomElementsParser::new()
            .with_shortcodes(|content: &str| content.replace("[name]", "Ada"));
        assert_eq!(
            parser.substitute_custom_elements("<p>[name]</p>").unwrap(),
            "<p>[name]</p>"
        );
    }

    #[test]
    fn test_parse_fragment_respects_strictness() {
        let strict = CustomElementsParser::new();
        assert!(strict.parse_fragment("<div>ok</div>").is_ok());
        assert!(strict.parse_fragment("<div>a</span>").is_err());

        let lenient = CustomElementsParser::new().with_options(ParserOptions {
            strict_fragments: false,
            ..Default::default()
        });
        assert!(lenient.parse_fragment("<div>a</span>").is_ok());
    }

    #[test]
    fn test_shared_registry() {
        let mut registry = ElementRegistry::new();
        registry.register_by_tag("x-a", from_fn(|_, _, _| Ok(Substitution::markup("A"))));

        let first = CustomElementsParser::new().with_registry(registry.clone());
        let second = CustomElementsParser::new().with_registry(registry);
        assert_eq!(first.parse("<x-a></x-a>").unwrap(), "A");
        assert_eq!(second.parse("<x-a></x-a>").unwrap(), "A");
    }

    proptest! {
        #[test]
        fn prop_unregistered_content_matches_shortcodes_only(
            tag in prop::sample::select(vec!["p", "div", "span", "em", "unknown"]),
            text in "[a-zA-Z0-9 ]{0,40}",
        ) {
            let parser = CustomElementsParser::new()
                .with_shortcodes(|content: &str| content.to_uppercase());
            let content = format!("<{0}>{1}</{0}>", tag, text);
            prop_assert_eq!(parser.parse(&content).unwrap(), content.to_uppercase());
        }
    }
}
