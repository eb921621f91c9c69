#![no_main]

use custom_elements_parser::handler::from_fn;
use custom_elements_parser::{CustomElementsParser, ParserOptions, Substitution, dom};
use libfuzzer_sys::fuzz_target;
use markup5ever_rcdom::Handle;

fn wrap_children(node: &Handle, parser: &CustomElementsParser) -> Handle {
    let wrapper = dom::create_element("div", &[("class", "wrapped")]);
    dom::reparent_children(node, &wrapper);
    let _ = parser.reduce_children(&wrapper, None);
    wrapper
}

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    let mut parser = CustomElementsParser::new().with_options(ParserOptions {
        strict_fragments: false,
        ..Default::default()
    });
    parser.register_by_tag(
        "x-attr",
        from_fn(|node, parser, _| {
            let markup = dom::get_attr(node, "data-attr").unwrap_or_default();
            Ok(Substitution::markup(parser.parse(&markup)?))
        }),
    );
    parser.register_by_tag(
        "x-wrap",
        from_fn(|node, parser, _| Ok(Substitution::tree(wrap_children(node, parser)))),
    );
    parser.register_by_class(
        "x-class",
        from_fn(|_, _, _| Ok(Substitution::NoSubstitution)),
    );

    // Malformed content must never fail or panic
    let _ = parser.parse(content);
});
