use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> Arc<Config> {
    Arc::new(Config::default())
}

fn kinds(tree: &Tree) -> Vec<NodeKind> {
    tree.descendants(tree.root())
        .into_iter()
        .map(|n| tree.kind(n))
        .collect()
}

const DOCUMENTS: &[&str] = &[
    "",
    "plain text",
    "a\0b\x7Fc",
    "\01t\x7F",
    "<!-- c -->a<!-- open",
    "<ref name=x>{{cite|a=b}}</ref><references/>",
    "<noinclude>a</noinclude><includeonly>b</includeonly>",
    "{{a|b|c=d|{{e}}}}{{{f|g}}}",
    "{{#if: x | [[y]] | z}}{{PAGENAME}}{{subst:a}}",
    "{{{{{a}}}}}}}{{",
    "== h ==<!-- c -->\n=x=\n======= deep =======",
    "<div class=\"a\" style='b'>x</div><br/><span",
    "{|class=x\n|+ cap\n|-\n! h !! h2\n| a || b\n|-\n| c\n{|\n|d\n|}\n|}",
    "{|\n|a",
    "* a\n*# b\n; t : d\n:: e\n----\n__TOC__ __nope__",
    "[[a|b]] [[Category:C|key]] [[File:F.png|thumb|[[x]] y]] [[:File:G]]",
    "[https://a.org b] [//c.org] http://d.org/e). ISBN 0-306-40615-2 RFC 1",
    "''a'' '''b''' '''''c''''' ''d'''\n''''e",
    "-{zh-hans:a;zh-hant:b}- -{H|x}- -{",
    "{{a|[[b|{{c|''d''}}]]}}\n{|\n|[http://e.org f]\n|}",
    "ü ĳ 日本語 {{ü|ĳ=日}}",
];

#[rstest]
fn every_stage_round_trips(#[values(0, 1, 2, 3, 4, 5, 6, 7, 8)] max_stage: usize) {
    init_logging();
    for doc in DOCUMENTS {
        let tree = parse(doc, false, max_stage, config()).unwrap();
        assert_eq!(tree.to_string(tree.root()), *doc, "stage {max_stage}: {doc:?}");
    }
}

#[test]
fn include_mode_round_trips() {
    for doc in DOCUMENTS {
        let tree = parse(doc, true, MAX_STAGE, config()).unwrap();
        assert_eq!(tree.to_string(tree.root()), *doc);
    }
}

const FRAGMENTS: &[&str] = &[
    "{{", "}}", "{{{", "}}}", "[[", "]]", "[", "]", "|", "||", "!!", "=", "==", "\n", " ", "a", "b:c",
    "<!--", "-->", "<ref>", "</ref>", "<ref/>", "<span", "</span>", "<div id=x>", ">", "''", "'''",
    "{|", "|}", "|-", "|+", "-{", "}-", ";", ":", "*", "#", "----", "__TOC__", "\0", "\x7F", "\01t\x7F",
    "http://", "//x.org", "ISBN ", "0-306-40615-2", "<noinclude>", "</includeonly>", "ü", "日",
];

/// Deterministic documents stitched together from markup fragments.
fn generated_documents(count: usize) -> Vec<String> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..count)
        .map(|_| {
            let len = next() % 40;
            (0..len)
                .map(|_| FRAGMENTS[(next() % FRAGMENTS.len() as u64) as usize])
                .collect()
        })
        .collect()
}

#[rstest]
fn generated_documents_round_trip(
    #[values(0, 1, 2, 3, 4, 5, 6, 7, 8)] max_stage: usize,
    #[values(false, true)] include: bool,
) {
    init_logging();
    for doc in generated_documents(300) {
        let tree = parse(&doc, include, max_stage, config()).unwrap();
        assert_eq!(tree.to_string(tree.root()), doc, "stage {max_stage}, include {include}");
    }
}

#[test]
fn sentinels_never_reach_text_leaves() {
    for doc in DOCUMENTS {
        let tree = parse(doc, false, MAX_STAGE, config()).unwrap();
        let raw = doc.contains([sentinel::LOW, sentinel::HIGH]);
        for node in tree.descendants(tree.root()) {
            if let Some(text) = tree.text_data(node) {
                if !raw {
                    assert!(
                        !text.contains([sentinel::LOW, sentinel::HIGH]),
                        "{doc:?} leaked into {text:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn raw_control_characters_stay_literal() {
    let tree = parse("\01t\x7F{{a}}", false, MAX_STAGE, config()).unwrap();
    assert_eq!(tree.to_string(tree.root()), "\01t\x7F{{a}}");
    assert_eq!(
        kinds(&tree).iter().filter(|k| **k == NodeKind::Template).count(),
        1
    );
}

#[test]
fn max_stage_stops_the_pipeline() {
    let text = "{{a}} [[b]] ''c''";
    let early = parse(text, false, 2, config()).unwrap();
    assert!(kinds(&early).contains(&NodeKind::Template));
    assert!(!kinds(&early).contains(&NodeKind::Link));
    assert!(!kinds(&early).contains(&NodeKind::Quote));

    let full = parse(text, false, MAX_STAGE, config()).unwrap();
    assert!(kinds(&full).contains(&NodeKind::Link));
    assert!(kinds(&full).contains(&NodeKind::Quote));
}

#[test]
fn stage_zero_is_one_text_leaf() {
    let tree = parse("{{a}} [[b]]", false, 0, config()).unwrap();
    assert_eq!(tree.children(tree.root()).len(), 1);
    assert_eq!(tree.kind(tree.children(tree.root())[0]), NodeKind::Text);
}

#[test]
fn nested_constructs_keep_their_stages() {
    let tree = parse("{{a|[[b|''c'']]}}", false, MAX_STAGE, config()).unwrap();
    let link = tree
        .descendants(tree.root())
        .into_iter()
        .find(|n| tree.kind(*n) == NodeKind::Link)
        .unwrap();
    let template = tree.first_child(tree.root()).unwrap();
    assert_eq!(tree.kind(template), NodeKind::Template);
    assert!(tree.is_ancestor_of(template, link));
    assert!(
        tree.descendants(link)
            .into_iter()
            .any(|n| tree.kind(n) == NodeKind::Quote)
    );
}

#[test]
fn missing_configuration_table_is_an_error() {
    let tree = parse("plain", false, MAX_STAGE, Arc::new(Config::empty()));
    assert!(tree.is_ok());
    let err = parse("<ref>a</ref>", false, MAX_STAGE, Arc::new(Config::empty())).unwrap_err();
    assert!(matches!(err, ParseError::Config(_)));
}

#[test]
fn quote_tie_break_scenario() {
    let tree = parse("''bold'''", false, MAX_STAGE, config()).unwrap();
    assert_eq!(tree.to_string(tree.root()), "''bold'''");
    assert_eq!(tree.to_text(tree.root()), "bold'");
    let quotes = kinds(&tree).iter().filter(|k| **k == NodeKind::Quote).count();
    assert_eq!(quotes, 2);
}
