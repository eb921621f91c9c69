//! Substitution engine - finds custom elements and splices in their replacements
//!
//! # Passes
//!
//! Substitution runs as two independent passes over the parsed document:
//!
//! 1. **Tag walk** ([`substitute`]): a depth-first, pre-order descent. An
//!    element whose tag has a fast-path handler is rendered and replaced; the
//!    walk does not enter the element's subtree or the replacement. Any other
//!    node is descended into.
//! 2. **Class scan** ([`substitute_by_class`]): for each class registration, a
//!    flat document-wide search for elements whose `class` attribute equals
//!    the registered value, each rendered and replaced in document order.
//!
//! # Mutation During Traversal
//!
//! Replacing a node rewrites its parent's child list. Both passes iterate over
//! snapshots (a cloned `Vec<Handle>`), so a replacement never makes the walk
//! skip or revisit a sibling.
//!
//! # Splicing
//!
//! The replacement takes the element's place. A handler may return the element
//! itself (edited in place), or move it into a wrapper it returns; the wrapper
//! then goes where the element was. Returning the element's parent or another
//! ancestor fails with [`SubstitutionError::InvalidReplacement`].
//!
//! # Re-descent
//!
//! Handlers decide whether their replacement gets processed further, by
//! calling [`reduce_children`] through
//! [`CustomElementsParser::reduce_children`].

use markup5ever_rcdom::Handle;
use std::any::Any;
use std::rc::Rc;

use crate::dom;
use crate::error::SubstitutionError;
use crate::handler::{CustomElementHandler, Substitution};
use crate::parser::CustomElementsParser;
use crate::roundtrip;

/// Substitute custom elements at or below `node` using the tag fast path
pub fn substitute(
    node: &Handle,
    parser: &CustomElementsParser,
    context: Option<&dyn Any>,
) -> Result<(), SubstitutionError> {
    if let Some(tag) = dom::tag_name(node)
        && let Some(handler) = parser.registry().handler_for_tag(&tag)
    {
        return render_and_splice(node, &tag, handler.as_ref(), parser, context);
    }

    reduce_children(node, parser, context)
}

/// Run [`substitute`] over each child of `node`, in document order
pub fn reduce_children(
    node: &Handle,
    parser: &CustomElementsParser,
    context: Option<&dyn Any>,
) -> Result<(), SubstitutionError> {
    for child in dom::children(node) {
        substitute(&child, parser, context)?;
    }
    Ok(())
}

/// Substitute elements matched by class registrations
///
/// `root` is the document (or subtree) searched. Elements that were removed
/// from under `root` by an earlier replacement in the same pass are skipped.
pub fn substitute_by_class(
    root: &Handle,
    parser: &CustomElementsParser,
    context: Option<&dyn Any>,
) -> Result<(), SubstitutionError> {
    for registration in parser.registry().class_registrations() {
        let mut matches = Vec::new();
        find_by_exact_class(root, &registration.match_value, &mut matches);

        tracing::debug!(
            class = %registration.match_value,
            matches = matches.len(),
            "Class scan"
        );

        for node in matches {
            if !is_attached_under(&node, root) {
                continue;
            }
            let tag = dom::tag_name(&node).unwrap_or_default();
            render_and_splice(&node, &tag, registration.handler.as_ref(), parser, context)?;
        }
    }
    Ok(())
}

fn render_and_splice(
    node: &Handle,
    tag: &str,
    handler: &dyn CustomElementHandler,
    parser: &CustomElementsParser,
    context: Option<&dyn Any>,
) -> Result<(), SubstitutionError> {
    tracing::trace!(tag, "Rendering custom element");
    // Handlers may move the element (e.g. into a wrapper they return)
    let anchor = dom::position(node);
    let result = handler.render(node, parser, context)?;
    splice(node, tag, anchor, result, parser)
}

/// Replace `node` with a handler's result
///
/// `anchor` is where `node` was before its handler ran. If the handler moved
/// the element out of that parent, the replacement goes in at the anchor.
fn splice(
    node: &Handle,
    tag: &str,
    anchor: Option<dom::Position>,
    result: Substitution,
    parser: &CustomElementsParser,
) -> Result<(), SubstitutionError> {
    let replacement = match result {
        Substitution::NoSubstitution => {
            tracing::trace!(tag, "Handler declined substitution");
            return Ok(());
        }
        Substitution::Markup(markup) => markup_fragment(&markup, tag, parser)?,
        Substitution::Tree(tree) => tree,
    };

    let nodes = dom::splice_nodes(&replacement);
    let Some(anchor) = anchor else {
        tracing::debug!(tag, "Custom element is not attached; nothing replaced");
        return Ok(());
    };

    if nodes
        .iter()
        .any(|replacement| dom::is_ancestor_or_self(replacement, &anchor.parent))
    {
        return Err(SubstitutionError::InvalidReplacement {
            tag: tag.to_string(),
        });
    }

    let in_place = dom::parent(node).is_some_and(|parent| Rc::ptr_eq(&parent, &anchor.parent));
    if in_place {
        dom::replace_with(node, &nodes);
    } else {
        dom::insert_at(&anchor.parent, anchor.index, &nodes);
    }
    tracing::trace!(tag, nodes = nodes.len(), in_place, "Spliced replacement");
    Ok(())
}

fn markup_fragment(
    markup: &str,
    tag: &str,
    parser: &CustomElementsParser,
) -> Result<Handle, SubstitutionError> {
    if parser.options().strict_fragments {
        return roundtrip::parse_fragment_strict(markup, tag);
    }

    let parsed = roundtrip::parse_fragment(markup);
    if !parsed.errors.is_empty() {
        tracing::warn!(
            tag,
            errors = ?parsed.errors,
            "Accepting malformed markup returned by handler"
        );
    }
    Ok(parsed.fragment)
}

fn find_by_exact_class(node: &Handle, class_name: &str, output: &mut Vec<Handle>) {
    if dom::has_exact_class(node, class_name) {
        output.push(Rc::clone(node));
    }
    for child in node.children.borrow().iter() {
        find_by_exact_class(child, class_name, output);
    }
}

fn is_attached_under(node: &Handle, root: &Handle) -> bool {
    let mut current = Rc::clone(node);
    loop {
        if Rc::ptr_eq(&current, root) {
            return true;
        }
        match dom::parent(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
