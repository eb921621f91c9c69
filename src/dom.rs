//! DOM inspection and mutation helpers over `markup5ever_rcdom` handles
//!
//! Handlers receive the matched element as an rcdom [`Handle`]. The functions
//! here cover what a handler typically needs: reading the tag name and
//! attributes, building replacement nodes, moving children between nodes and
//! splicing a replacement into the tree.
//!
//! # Fragments
//!
//! A *fragment container* is a detached [`NodeData::Document`] node used as a
//! holder for a list of sibling nodes. When a fragment container is spliced
//! into the tree, its children are inserted in its place and the container
//! itself is dropped, the same way a DOM `DocumentFragment` behaves.
//!
//! # Examples
//!
//! ```rust
//! use custom_elements_parser::dom;
//!
//! let fragment = dom::new_fragment();
//! let div = dom::create_element("div", &[("class", "parent")]);
//! dom::append_child(&fragment, &div);
//! dom::append_child(&div, &dom::create_text("hello"));
//!
//! assert_eq!(dom::tag_name(&div).as_deref(), Some("div"));
//! assert_eq!(dom::get_attr(&div, "class").as_deref(), Some("parent"));
//! assert_eq!(dom::text_content(&fragment), "hello");
//! ```

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData};
use std::cell::RefCell;
use std::rc::Rc;

/// The HTML namespace URI
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Create an empty fragment container
pub fn new_fragment() -> Handle {
    Node::new(NodeData::Document)
}

/// Returns true if `node` is a fragment container (or a document root)
pub fn is_fragment(node: &Handle) -> bool {
    matches!(node.data, NodeData::Document)
}

/// Create a detached HTML element with the given attributes
///
/// Tag and attribute names are used verbatim; callers producing HTML should
/// pass lowercase names, as the HTML parser does.
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(*name)),
            value: StrTendril::from_slice(value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Create a detached text node
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// Local tag name of an element, or `None` for non-element nodes
pub fn tag_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

/// Get attribute value from an element
pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Set (or add) an attribute on an element; no-op for non-elements
pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let mut attrs = attrs.borrow_mut();
        if let Some(attr) = attrs.iter_mut().find(|a| a.name.local.as_ref() == name) {
            attr.value = StrTendril::from_slice(value);
        } else {
            attrs.push(Attribute {
                name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
                value: StrTendril::from_slice(value),
            });
        }
    }
}

/// All attributes of an element as `(name, value)` pairs in source order
pub fn attributes(node: &Handle) -> Vec<(String, String)> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Returns true if the element's `class` attribute equals `class_name` exactly
///
/// This is whole-attribute equality, not class-list membership:
/// `class="a b"` does not match `a`.
pub fn has_exact_class(node: &Handle, class_name: &str) -> bool {
    get_attr(node, "class").is_some_and(|class| class == class_name)
}

/// Concatenated text of a node and all its descendants
pub fn text_content(node: &Handle) -> String {
    let mut output = String::new();
    collect_text(node, &mut output);
    output
}

fn collect_text(node: &Handle, output: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => output.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, output);
            }
        }
        _ => {}
    }
}

/// Parent of `node`, if attached
pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

/// Snapshot of a node's children
///
/// Traversals that may mutate the tree iterate over this copy, never over the
/// live child list.
pub fn children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

/// Remove `node` from its parent; no-op if already detached
pub fn detach(node: &Handle) {
    let Some(weak) = node.parent.take() else {
        return;
    };
    if let Some(parent) = weak.upgrade() {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// Append `child` to `parent`, detaching it from any previous parent first
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(Rc::clone(child));
}

/// Move every child of `from` to the end of `to`, preserving order
pub fn reparent_children(from: &Handle, to: &Handle) {
    let moved = std::mem::take(&mut *from.children.borrow_mut());
    for child in &moved {
        child.parent.set(Some(Rc::downgrade(to)));
    }
    to.children.borrow_mut().extend(moved);
}

/// Nodes to splice in for `replacement`
///
/// A fragment container contributes its children; any other node contributes
/// itself.
pub fn splice_nodes(replacement: &Handle) -> Vec<Handle> {
    if is_fragment(replacement) {
        children(replacement)
    } else {
        vec![Rc::clone(replacement)]
    }
}

/// Where a node sits in its parent's child list
#[derive(Debug, Clone)]
pub struct Position {
    /// The node's parent
    pub parent: Handle,
    /// Index in the parent's child list
    pub index: usize,
}

/// Current position of `node`, or `None` if it is detached
pub fn position(node: &Handle) -> Option<Position> {
    let parent = parent(node)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .position(|child| Rc::ptr_eq(child, node))?;
    Some(Position { parent, index })
}

/// Returns true if `candidate` is `node` or one of its ancestors
pub fn is_ancestor_or_self(candidate: &Handle, node: &Handle) -> bool {
    let mut current = Some(Rc::clone(node));
    while let Some(handle) = current {
        if Rc::ptr_eq(&handle, candidate) {
            return true;
        }
        current = parent(&handle);
    }
    false
}

/// Insert `nodes` into `parent` at `index`, detaching them first
///
/// The insertion point follows the sibling that was at `index` when it
/// moves because one of `nodes` was detached from before it. An index past
/// the end appends.
pub fn insert_at(parent: &Handle, index: usize, nodes: &[Handle]) {
    let next = parent.children.borrow().get(index).cloned();
    for node in nodes {
        detach(node);
    }

    let mut siblings = parent.children.borrow_mut();
    let mut index = next
        .and_then(|next| siblings.iter().position(|child| Rc::ptr_eq(child, &next)))
        .unwrap_or_else(|| index.min(siblings.len()));
    for node in nodes {
        node.parent.set(Some(Rc::downgrade(parent)));
        siblings.insert(index, Rc::clone(node));
        index += 1;
    }
}

/// Replace `node` in its parent's child list with `replacements`
///
/// The replacement nodes are detached from wherever they currently live.
/// Replacing a node with itself leaves it in place. Returns `false` (and
/// changes nothing) if `node` has no parent, or if a replacement is the
/// parent or one of its ancestors.
pub fn replace_with(node: &Handle, replacements: &[Handle]) -> bool {
    let Some(Position { parent, index }) = position(node) else {
        return false;
    };

    if let [only] = replacements
        && Rc::ptr_eq(only, node)
    {
        return true;
    }
    if replacements
        .iter()
        .any(|replacement| is_ancestor_or_self(replacement, &parent))
    {
        return false;
    }

    parent.children.borrow_mut().remove(index);
    node.parent.set(None);
    insert_at(&parent, index, replacements);
    true
}
