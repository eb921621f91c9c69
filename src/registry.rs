//! Custom element registry
//!
//! Two structures are kept side by side:
//!
//! - an ordered list of every registration, scanned once per parse for
//!   class-based matches;
//! - a tag-name map for the O(1) fast path of the recursive tag walk.
//!
//! Every tag registration lives in both; class registrations live only in the
//! list. Registrations are never removed individually. A later tag
//! registration silently takes over the map entry for that tag, while the
//! earlier entry stays in the list.
//!
//! Tag names are stored ASCII-lowercased, matching the names html5ever gives
//! parsed elements.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::CustomElementHandler;

/// Shared handler reference
pub type SharedHandler = Arc<dyn CustomElementHandler>;

/// How a registration selects elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Match on element tag name
    TagName,
    /// Match on the exact value of the `class` attribute
    ClassName,
}

/// One registry entry
#[derive(Clone)]
pub struct Registration {
    /// Selection mode
    pub match_kind: MatchKind,
    /// Tag or class name to match
    pub match_value: String,
    /// Handler invoked for matching elements
    pub handler: SharedHandler,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("match_kind", &self.match_kind)
            .field("match_value", &self.match_value)
            .finish_non_exhaustive()
    }
}

/// Registry of custom element handlers
///
/// Built once (typically at startup) and then only read. Cloning is cheap:
/// handlers are shared.
#[derive(Clone, Default)]
pub struct ElementRegistry {
    registrations: Vec<Registration>,
    tag_map: HashMap<String, SharedHandler>,
}

impl ElementRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for elements with the given tag name
    pub fn register_by_tag<H>(&mut self, tag_name: &str, handler: H)
    where
        H: CustomElementHandler + 'static,
    {
        self.register_shared_by_tag(tag_name, Arc::new(handler));
    }

    /// Register an already shared handler by tag name
    pub fn register_shared_by_tag(&mut self, tag_name: &str, handler: SharedHandler) {
        let key = tag_name.to_ascii_lowercase();
        self.registrations.push(Registration {
            match_kind: MatchKind::TagName,
            match_value: key.clone(),
            handler: Arc::clone(&handler),
        });
        if self.tag_map.insert(key, handler).is_some() {
            tracing::debug!(tag = tag_name, "Replacing fast-path handler for tag");
        }
    }

    /// Register a handler for elements whose `class` attribute equals `class_name`
    pub fn register_by_class<H>(&mut self, class_name: &str, handler: H)
    where
        H: CustomElementHandler + 'static,
    {
        self.register_shared_by_class(class_name, Arc::new(handler));
    }

    /// Register an already shared handler by class name
    pub fn register_shared_by_class(&mut self, class_name: &str, handler: SharedHandler) {
        self.registrations.push(Registration {
            match_kind: MatchKind::ClassName,
            match_value: class_name.to_string(),
            handler,
        });
    }

    /// Fast-path lookup by tag name
    pub fn handler_for_tag(&self, tag_name: &str) -> Option<&SharedHandler> {
        self.tag_map.get(tag_name)
    }

    /// All registrations in registration order
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Class registrations in registration order
    pub fn class_registrations(&self) -> impl Iterator<Item = &Registration> {
        self.registrations
            .iter()
            .filter(|r| r.match_kind == MatchKind::ClassName)
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Number of registrations, including overwritten tag entries
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Drop every registration
    ///
    /// Intended for test harnesses that share one registry between runs.
    pub fn clear(&mut self) {
        self.registrations.clear();
        self.tag_map.clear();
    }
}

impl std::fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubstitutionError;
    use crate::handler::Substitution;
    use crate::parser::CustomElementsParser;
    use markup5ever_rcdom::Handle;
    use std::any::Any;

    struct Fixed(&'static str);

    impl CustomElementHandler for Fixed {
        fn render(
            &self,
            _node: &Handle,
            _parser: &CustomElementsParser,
            _context: Option<&dyn Any>,
        ) -> Result<Substitution, SubstitutionError> {
            Ok(Substitution::markup(self.0))
        }
    }

    fn render_fixed(handler: &SharedHandler) -> String {
        let parser = CustomElementsParser::new();
        let node = crate::dom::create_element("x", &[]);
        match handler.render(&node, &parser, None) {
            Ok(Substitution::Markup(markup)) => markup,
            other => panic!("Expected markup, got {other:?}"),
        }
    }

    #[test]
    fn test_tag_registration_in_both_structures() {
        let mut registry = ElementRegistry::new();
        registry.register_by_tag("gallery", Fixed("g"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.registrations()[0].match_kind, MatchKind::TagName);
        assert!(registry.handler_for_tag("gallery").is_some());
        assert_eq!(registry.class_registrations().count(), 0);
    }

    #[test]
    fn test_class_registration_not_fast_indexed() {
        let mut registry = ElementRegistry::new();
        registry.register_by_class("gallery", Fixed("g"));

        assert!(registry.handler_for_tag("gallery").is_none());
        assert_eq!(registry.class_registrations().count(), 1);
    }

    #[test]
    fn test_later_tag_registration_wins() {
        let mut registry = ElementRegistry::new();
        registry.register_by_tag("widget", Fixed("first"));
        registry.register_by_tag("widget", Fixed("second"));

        // Both stay in the ordered list, the map only keeps the last one
        assert_eq!(registry.len(), 2);
        let handler = registry.handler_for_tag("widget").expect("registered");
        assert_eq!(render_fixed(handler), "second");
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let mut registry = ElementRegistry::new();
        registry.register_by_tag("parentTag", Fixed("p"));
        assert!(registry.handler_for_tag("parenttag").is_some());
        assert_eq!(registry.registrations()[0].match_value, "parenttag");
    }

    #[test]
    fn test_class_names_keep_case() {
        let mut registry = ElementRegistry::new();
        registry.register_by_class("Gallery-Item", Fixed("g"));
        let registration = registry.class_registrations().next().expect("registered");
        assert_eq!(registration.match_value, "Gallery-Item");
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = ElementRegistry::new();
        registry.register_by_class("b", Fixed("b"));
        registry.register_by_tag("t", Fixed("t"));
        registry.register_by_class("a", Fixed("a"));

        let classes: Vec<&str> = registry
            .class_registrations()
            .map(|r| r.match_value.as_str())
            .collect();
        assert_eq!(classes, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_tag_registered_but_never_matched() {
        let mut parser = CustomElementsParser::new();
        parser.register_by_tag("", Fixed("never"));

        assert_eq!(parser.registry().len(), 1);
        assert!(parser.registry().handler_for_tag("").is_some());

        let content = "<p>kept <span>as is</span></p>";
        assert_eq!(parser.parse(content).unwrap(), content);
        assert_eq!(parser.parse("<p>a <br/> b</p>").unwrap(), "<p>a <br> b</p>");
    }

    #[test]
    fn test_clear() {
        let mut registry = ElementRegistry::new();
        registry.register_by_tag("t", Fixed("t"));
        registry.register_by_class("c", Fixed("c"));
        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.handler_for_tag("t").is_none());
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ElementRegistry>();
    }
}
