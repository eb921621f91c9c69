//! Handler contract for custom element renderers
//!
//! A handler turns one matched custom element into replacement content. It is
//! given the element node, the parser that is running (so it can recursively
//! parse generated markup or reduce the element's children) and the optional
//! context resolved for this `parse` call.
//!
//! # Re-descent
//!
//! The engine never descends into a replacement on its own. A handler that
//! keeps the element's children (or builds content that may contain custom
//! elements) must call [`CustomElementsParser::reduce_children`] on that
//! content before returning it, or [`CustomElementsParser::parse`] on markup.
//! A handler that emits its own tag and re-descends into it without a bound
//! recurses until the parser's nesting guard trips.
//!
//! # Examples
//!
//! ```rust
//! use custom_elements_parser::{CustomElementsParser, Substitution, dom, handler};
//!
//! let mut parser = CustomElementsParser::new();
//! parser.register_by_tag(
//!     "shout",
//!     handler::from_fn(|node, _parser, _context| {
//!         Ok(Substitution::markup(dom::text_content(node).to_uppercase()))
//!     }),
//! );
//!
//! assert_eq!(parser.parse("<p><shout>hey</shout></p>").unwrap(), "<p>HEY</p>");
//! ```
//!
//! [`CustomElementsParser::reduce_children`]: crate::CustomElementsParser::reduce_children
//! [`CustomElementsParser::parse`]: crate::CustomElementsParser::parse

use markup5ever_rcdom::Handle;
use std::any::Any;
use std::fmt;

use crate::error::SubstitutionError;
use crate::parser::CustomElementsParser;

/// Replacement produced by a handler for one element
pub enum Substitution {
    /// Leave the element and its subtree untouched
    NoSubstitution,
    /// Markup parsed as a fragment and spliced in place of the element
    Markup(String),
    /// Pre-built node spliced in directly
    ///
    /// A fragment container (see [`crate::dom::new_fragment`]) is spliced as
    /// its children.
    Tree(Handle),
}

impl Substitution {
    /// Create a markup substitution
    pub fn markup(markup: impl Into<String>) -> Self {
        Substitution::Markup(markup.into())
    }

    /// Create a tree substitution
    pub fn tree(node: Handle) -> Self {
        Substitution::Tree(node)
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::NoSubstitution => write!(f, "NoSubstitution"),
            Substitution::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            Substitution::Tree(node) => f
                .debug_tuple("Tree")
                .field(&crate::dom::tag_name(node).unwrap_or_else(|| "#fragment".to_string()))
                .finish(),
        }
    }
}

/// Renderer for a registered custom element
pub trait CustomElementHandler: Send + Sync {
    /// Render `node` into its replacement
    ///
    /// `node` is still attached to the tree when this is called. Handlers may
    /// move its children elsewhere (e.g. into a new wrapper element); the
    /// engine only needs the node itself to stay in place until it returns.
    fn render(
        &self,
        node: &Handle,
        parser: &CustomElementsParser,
        context: Option<&dyn Any>,
    ) -> Result<Substitution, SubstitutionError>;
}

impl<F> CustomElementHandler for F
where
    F: Fn(&Handle, &CustomElementsParser, Option<&dyn Any>) -> Result<Substitution, SubstitutionError>
        + Send
        + Sync,
{
    fn render(
        &self,
        node: &Handle,
        parser: &CustomElementsParser,
        context: Option<&dyn Any>,
    ) -> Result<Substitution, SubstitutionError> {
        self(node, parser, context)
    }
}

/// Wrap a closure as a handler
///
/// Pins down the closure's argument and return types so that they need no
/// annotations at the call site.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&Handle, &CustomElementsParser, Option<&dyn Any>) -> Result<Substitution, SubstitutionError>
        + Send
        + Sync,
{
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    struct Echo;

    impl CustomElementHandler for Echo {
        fn render(
            &self,
            node: &Handle,
            _parser: &CustomElementsParser,
            _context: Option<&dyn Any>,
        ) -> Result<Substitution, SubstitutionError> {
            Ok(Substitution::markup(dom::text_content(node)))
        }
    }

    #[test]
    fn test_struct_handler() {
        let parser = CustomElementsParser::new();
        let node = dom::create_element("echo", &[]);
        dom::append_child(&node, &dom::create_text("hi"));

        match Echo.render(&node, &parser, None) {
            Ok(Substitution::Markup(markup)) => assert_eq!(markup, "hi"),
            other => panic!("Expected markup, got {other:?}"),
        }
    }

    #[test]
    fn test_closure_handler_sees_context() {
        let handler = from_fn(|_node, _parser, context| {
            let page = context
                .and_then(|c| c.downcast_ref::<String>())
                .cloned()
                .unwrap_or_default();
            Ok(Substitution::markup(page))
        });

        let parser = CustomElementsParser::new();
        let node = dom::create_element("page-title", &[]);
        let page = "Home".to_string();

        match handler.render(&node, &parser, Some(&page)) {
            Ok(Substitution::Markup(markup)) => assert_eq!(markup, "Home"),
            other => panic!("Expected markup, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", Substitution::NoSubstitution), "NoSubstitution");
        assert_eq!(
            format!("{:?}", Substitution::markup("<b>x</b>")),
            r#"Markup("<b>x</b>")"#
        );
        assert_eq!(
            format!("{:?}", Substitution::tree(dom::new_fragment())),
            r##"Tree("#fragment")"##
        );
        assert_eq!(
            format!("{:?}", Substitution::tree(dom::create_element("div", &[]))),
            r#"Tree("div")"#
        );
    }
}
