//! Custom Elements Parser
//!
//! Substitutes custom HTML elements embedded in rich-text content with
//! rendered markup, as a pre-pass before shortcode substitution.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `registry`: tag and class registrations for custom element handlers
//! - `handler`: the handler trait and the `Substitution` result type
//! - `dom`: inspection and mutation helpers over html5ever rcdom nodes
//! - `roundtrip`: HTML5 parsing, serialization and output correction
//! - `engine`: the tag walk and class scan that splice in replacements
//! - `parser`: `CustomElementsParser`, the public entry point
//! - `shortcode`: the downstream shortcode parser seam
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use custom_elements_parser::{CustomElementsParser, Substitution, dom, handler};
//!
//! let mut parser = CustomElementsParser::new();
//! parser.register_by_tag(
//!     "parentTag",
//!     handler::from_fn(|node, parser, context| {
//!         let fragment = parser.parse_fragment(r#"<div class="parent"></div>"#)?;
//!         let container = dom::children(&fragment).remove(0);
//!         dom::reparent_children(node, &container);
//!         parser.reduce_children(&fragment, context)?;
//!         Ok(Substitution::tree(fragment))
//!     }),
//! );
//! parser.register_by_tag(
//!     "childTag",
//!     handler::from_fn(|node, parser, _context| {
//!         let markup = dom::get_attr(node, "data-attr").unwrap_or_default();
//!         Ok(Substitution::markup(parser.parse(&markup)?))
//!     }),
//! );
//!
//! let html = r#"<parentTag>hello, <childTag data-attr="fred">def</childTag></parentTag>"#;
//! assert_eq!(parser.parse(html).unwrap(), r#"<div class="parent">hello, fred</div>"#);
//! ```

// Module declarations
pub mod dom;
pub mod engine;
pub mod error;
pub mod handler;
pub mod parser;
pub mod registry;
pub mod roundtrip;
pub mod shortcode;

// Re-export main types for convenience
pub use error::SubstitutionError;
pub use handler::{CustomElementHandler, Substitution};
pub use parser::{CustomElementsParser, ParserOptions};
pub use registry::{ElementRegistry, MatchKind};
pub use shortcode::{PassthroughShortcodes, ShortcodeParser};
