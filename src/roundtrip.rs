//! Markup round-trip: content → DOM tree → content
//!
//! This module bridges raw rich-text content and a mutable html5ever tree,
//! and corrects the structural side effects of going through a full HTML5
//! document parse and serialization.
//!
//! # Overview
//!
//! Content stored in a rich-text field is a *fragment*: some paragraphs, maybe
//! plain text, maybe custom elements. html5ever only builds full documents, so
//! parsing `no shortcode` and serializing the result yields
//!
//! ```text
//! <!--?xml encoding="UTF-8"--><html><head></head><body>no shortcode</body></html>
//! ```
//!
//! [`correct_markup`] undoes those wrappers so that content without custom
//! elements comes back exactly as it went in.
//!
//! # Lossy Cases
//!
//! The output is the serializer's canonical form of the tree, so some inputs
//! do not survive byte for byte:
//!
//! - bare `&`, `<` and `>` in text come back escaped (`Fish & Chips` becomes
//!   `Fish &amp; Chips`)
//! - leading whitespace of plain-text content is dropped by the tree builder
//! - attribute quoting and tag case are normalized (`<P CLASS=a>` becomes
//!   `<p class="a">`)
//!
//! # Error Handling
//!
//! Input content is never rejected: html5ever recovers from any malformed
//! markup following the WHATWG algorithm, and the errors it collects are only
//! logged. Markup produced by handlers goes through [`parse_fragment`], which
//! reports the collected errors to the caller so that strict mode can reject
//! them.
//!
//! # Examples
//!
//! ```rust
//! use custom_elements_parser::roundtrip::{correct_markup, parse_content, serialize_document};
//!
//! let content = "<p>Hello</p>";
//! let dom = parse_content(content);
//! let serialized = serialize_document(&dom).expect("serialize");
//! assert_eq!(correct_markup(&serialized, content, true), content);
//! ```

use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, QualName, parse_document, parse_fragment as parse_html_fragment};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::dom::{self, HTML_NAMESPACE};
use crate::error::SubstitutionError;

/// Encoding declaration prepended to content before parsing
pub const UTF8_DECLARATION: &str = r#"<?xml encoding="UTF-8">"#;

/// How html5ever serializes [`UTF8_DECLARATION`]: the `<?` opens a bogus comment
const SERIALIZED_DECLARATION: &str = r#"<!--?xml encoding="UTF-8"-->"#;

const WRAPPER_OPEN: &str = "<html><head>";
const HEAD_BODY_SEPARATOR: &str = "</head><body>";
const WRAPPER_CLOSE: &str = "</body></html>";

/// Parse content into a full HTML document tree
///
/// The content is prefixed with [`UTF8_DECLARATION`] and parsed as a complete
/// document. Parse errors are never fatal; they are logged at debug level and
/// the recovered tree is returned.
pub fn parse_content(content: &str) -> RcDom {
    let mut input = String::with_capacity(UTF8_DECLARATION.len() + content.len());
    input.push_str(UTF8_DECLARATION);
    input.push_str(content);

    let dom = parse_document(RcDom::default(), Default::default()).one(input);

    let errors = &dom.errors;
    if !errors.is_empty() {
        tracing::debug!(
            error_count = errors.len(),
            first_error = %errors[0],
            "Ignoring parse errors in content"
        );
    }

    dom
}

/// Rewrite `<tag .../>` as `<tag ...></tag>` for tags accepted by `is_custom`
///
/// HTML5 ignores the self-closing flag on non-void elements, so a
/// self-closed custom element would otherwise swallow the content that
/// follows it. `is_custom` receives the ASCII-lowercased tag name.
pub fn expand_self_closing<'a, F>(content: &'a str, is_custom: F) -> Cow<'a, str>
where
    F: Fn(&str) -> bool,
{
    static SELF_CLOSING_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let self_closing_regex = SELF_CLOSING_REGEX.get_or_init(|| {
        Regex::new(r#"<([A-Za-z][A-Za-z0-9_:-]*)((?:\s(?:[^<>"']|"[^"]*"|'[^']*')*?)?)\s*/>"#).ok()
    });

    let Some(regex) = self_closing_regex else {
        return Cow::Borrowed(content);
    };
    if !content.contains("/>") {
        return Cow::Borrowed(content);
    }

    regex.replace_all(content, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        if is_custom(&name.to_ascii_lowercase()) {
            format!("<{name}{}></{name}>", caps[2].trim_end())
        } else {
            caps[0].to_string()
        }
    })
}

/// A parsed handler fragment and the errors the parser reported for it
#[derive(Debug)]
pub struct ParsedFragment {
    /// Fragment container holding the parsed nodes
    pub fragment: Handle,
    /// Parse errors, empty for clean markup
    pub errors: Vec<String>,
}

/// Parse markup as an HTML fragment in `<body>` context
///
/// The nodes are returned inside a fragment container (see [`crate::dom`]),
/// without any document wrapper, ready to be spliced into another tree.
pub fn parse_fragment(markup: &str) -> ParsedFragment {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    let dom = parse_html_fragment(
        RcDom::default(),
        Default::default(),
        context,
        Vec::new(),
    )
    .one(markup);

    let errors = dom
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect();

    // The fragment parser roots its output in a synthetic <html> element.
    let fragment = dom::new_fragment();
    for root in dom::children(&dom.document) {
        if dom::tag_name(&root).as_deref() == Some("html") {
            dom::reparent_children(&root, &fragment);
        } else {
            dom::append_child(&fragment, &root);
        }
    }

    ParsedFragment { fragment, errors }
}

/// Parse markup as a fragment, failing on any parse error
///
/// `tag` names the element whose handler produced the markup and is only used
/// for the error message.
pub fn parse_fragment_strict(markup: &str, tag: &str) -> Result<Handle, SubstitutionError> {
    let parsed = parse_fragment(markup);
    if parsed.errors.is_empty() {
        Ok(parsed.fragment)
    } else {
        Err(SubstitutionError::MalformedMarkup {
            tag: tag.to_string(),
            errors: parsed.errors,
        })
    }
}

/// Serialize a whole document back to HTML text
pub fn serialize_document(dom: &RcDom) -> Result<String, SubstitutionError> {
    serialize_node_children(&dom.document)
}

/// Serialize the children of any node (a document, element or fragment)
pub fn serialize_node_children(node: &Handle) -> Result<String, SubstitutionError> {
    let mut buf = Vec::with_capacity(256);
    let handle = SerializableHandle::from(node.clone());
    serialize(&mut buf, &handle, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Apply the correction pipeline to serialized output
///
/// Steps, in order:
///
/// 1. Strip the synthetic `<html><head>`…`</head><body>`…`</body></html>`
///    wrapper, keeping hoisted head children and anything serialized before
///    the wrapper (such as leading comments).
/// 2. Restore shortcode brackets in `<a href="%5B...%5D">` when
///    `restore_urls` is set.
/// 3. Remove the encoding declaration unless `original` began with it.
/// 4. Unwrap a single `<p>`…`</p>` pair if `original` was plain text.
/// 5. Drop one trailing newline that `original` did not have.
pub fn correct_markup(serialized: &str, original: &str, restore_urls: bool) -> String {
    let mut s = strip_document_wrapper(serialized);

    if restore_urls {
        s = restore_shortcode_urls(&s).into_owned();
    }

    if !original.starts_with(UTF8_DECLARATION) {
        s = s
            .replace(SERIALIZED_DECLARATION, "")
            .replace(UTF8_DECLARATION, "");
    }

    if !original.trim().starts_with('<') {
        s = strip_paragraph_wrapper(s);
    }

    if s.ends_with('\n') && !original.ends_with('\n') {
        s.pop();
    }

    s
}

fn strip_document_wrapper(serialized: &str) -> String {
    let Some(open) = serialized.find(WRAPPER_OPEN) else {
        return serialized.to_string();
    };
    // Comments placed before <html> (including the serialized declaration)
    let prefix = &serialized[..open];
    let rest = &serialized[open + WRAPPER_OPEN.len()..];

    // Content that brought its own <body attrs> is a full document; keep it.
    let Some(separator) = rest.find(HEAD_BODY_SEPARATOR) else {
        return serialized.to_string();
    };

    let head = &rest[..separator];
    let mut body = &rest[separator + HEAD_BODY_SEPARATOR.len()..];
    if let Some(close) = body.rfind(WRAPPER_CLOSE) {
        body = &body[..close];
    }

    let mut s = String::with_capacity(prefix.len() + head.len() + body.len());
    s.push_str(prefix);
    s.push_str(head);
    s.push_str(body);
    s
}

/// Replace `href="%5B...%5D"` with `href="[...]"` inside `<a>` tags
///
/// Serializers that percent-encode URLs break shortcodes such as
/// `<a href="[sitetree_link,id=1]">`, which the downstream shortcode parser
/// expects to see with literal brackets.
pub fn restore_shortcode_urls(s: &str) -> Cow<'_, str> {
    static HREF_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let href_regex = HREF_REGEX
        .get_or_init(|| Regex::new(r#"(?i)(<a\s(?:[^>]*?\s)?href=")%5B([^"]*?)%5D""#).ok());

    match href_regex {
        Some(regex) => regex.replace_all(s, r#"${1}[${2}]""#),
        None => Cow::Borrowed(s),
    }
}

fn strip_paragraph_wrapper(s: String) -> String {
    let trimmed = s.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
        && !inner.contains("</p>")
        && !inner.contains("<p>")
        && !inner.contains("<p ")
    {
        return inner.to_string();
    }
    s
}
