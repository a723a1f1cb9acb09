//! Built-in snapshot of an English-language wiki.

use crate::{Config, HtmlTags, MagicWords};
use std::collections::BTreeMap;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn map<K: Clone + Ord, V: ToString>(items: &[(K, V)]) -> BTreeMap<K, String> {
    items
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

const EXT: &[&str] = &[
    "pre",
    "nowiki",
    "gallery",
    "indicator",
    "langconvert",
    "math",
    "ref",
    "references",
    "poem",
    "syntaxhighlight",
    "source",
    "templatedata",
    "timeline",
    "categorytree",
    "chem",
    "ce",
    "graph",
    "hiero",
    "imagemap",
    "inputbox",
    "score",
    "section",
    "charinsert",
    "templatestyles",
    "mapframe",
    "maplink",
    "tabber",
];

const HTML_NORMAL: &[&str] = &[
    "b", "bdi", "bdo", "del", "i", "ins", "u", "font", "big", "small", "sub", "sup", "cite",
    "code", "em", "s", "strike", "strong", "tt", "var", "ruby", "rb", "rp", "rt", "rtc", "span",
    "abbr", "dfn", "kbd", "samp", "data", "time", "mark", "q",
];

const HTML_VOID: &[&str] = &["br", "wbr", "hr", "meta", "link", "img"];

const HTML_DISPLAY: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "div",
    "center",
    "blockquote",
    "ol",
    "ul",
    "dl",
    "table",
    "caption",
    "pre",
    "p",
    "li",
    "dt",
    "dd",
    "td",
    "th",
    "tr",
];

const NAMESPACES: &[(i32, &str)] = &[
    (-2, "Media"),
    (-1, "Special"),
    (0, ""),
    (1, "Talk"),
    (2, "User"),
    (3, "User talk"),
    (4, "Project"),
    (5, "Project talk"),
    (6, "File"),
    (7, "File talk"),
    (8, "MediaWiki"),
    (9, "MediaWiki talk"),
    (10, "Template"),
    (11, "Template talk"),
    (12, "Help"),
    (13, "Help talk"),
    (14, "Category"),
    (15, "Category talk"),
];

const NS_ALIASES: &[(&str, i32)] = &[
    ("image", 6),
    ("image talk", 7),
    ("wikipedia", 4),
    ("wikipedia talk", 5),
    ("wp", 4),
];

const FUNCTIONS_INSENSITIVE: &[&str] = &[
    "#if",
    "#ifeq",
    "#iferror",
    "#ifexist",
    "#ifexpr",
    "#switch",
    "#expr",
    "#time",
    "#timel",
    "#invoke",
    "#tag",
    "#language",
    "#special",
    "#rel2abs",
    "#titleparts",
    "#property",
    "lc",
    "uc",
    "lcfirst",
    "ucfirst",
    "urlencode",
    "anchorencode",
    "fullurl",
    "localurl",
    "ns",
    "padleft",
    "padright",
    "formatnum",
    "plural",
    "grammar",
    "int",
    "filepath",
    "displaytitle",
    "defaultsort",
    "defaultsortkey",
    "defaultcategorysort",
    "subst",
    "safesubst",
    "msgnw",
];

const FUNCTIONS_SENSITIVE: &[&str] = &[
    "PAGENAME",
    "FULLPAGENAME",
    "BASEPAGENAME",
    "SUBPAGENAME",
    "NAMESPACE",
    "SITENAME",
    "SERVER",
    "CURRENTYEAR",
    "CURRENTMONTH",
    "CURRENTDAY",
    "REVISIONID",
    "PAGESIZE",
    "DISPLAYTITLE",
    "DEFAULTSORT",
    "!",
    "!!",
    "=",
    "(!",
    "!)",
    "!-",
];

const FUNCTION_ALIASES: &[(&str, &str)] = &[
    ("defaultsortkey", "defaultsort"),
    ("defaultcategorysort", "defaultsort"),
    ("DEFAULTSORT", "defaultsort"),
    ("DISPLAYTITLE", "displaytitle"),
    ("#timel", "#time"),
];

const SWITCHES_INSENSITIVE: &[&str] = &[
    "notoc",
    "forcetoc",
    "toc",
    "noeditsection",
    "newsectionlink",
    "nonewsectionlink",
    "nogallery",
    "hiddencat",
    "nocontentconvert",
    "nocc",
    "notitleconvert",
    "notc",
    "index",
    "noindex",
    "staticredirect",
    "expectunusedcategory",
];

const SWITCHES_SENSITIVE: &[&str] = &["DISAMBIG", "EXPECTED_UNCONNECTED_PAGE"];

const SWITCH_ALIASES: &[(&str, &str)] = &[
    ("nocc", "nocontentconvert"),
    ("notc", "notitleconvert"),
];

const PROTOCOLS: &[&str] = &[
    "bitcoin:",
    "ftp://",
    "ftps://",
    "geo:",
    "git://",
    "gopher://",
    "http://",
    "https://",
    "irc://",
    "ircs://",
    "magnet:",
    "mailto:",
    "mms://",
    "news:",
    "nntp://",
    "redis://",
    "sftp://",
    "sip:",
    "sips:",
    "sms:",
    "ssh://",
    "svn://",
    "tel:",
    "telnet://",
    "urn:",
    "worldwind://",
    "xmpp:",
    "//",
];

const IMG: &[(&str, &str)] = &[
    ("thumbnail", "thumbnail"),
    ("thumb", "thumbnail"),
    ("thumbnail=$1", "manualthumb"),
    ("thumb=$1", "manualthumb"),
    ("frame", "framed"),
    ("framed", "framed"),
    ("frameless", "frameless"),
    ("border", "border"),
    ("left", "left"),
    ("right", "right"),
    ("center", "center"),
    ("centre", "center"),
    ("none", "none"),
    ("upright", "upright"),
    ("upright=$1", "upright"),
    ("upright $1", "upright"),
    ("$1px", "width"),
    ("alt=$1", "alt"),
    ("link=$1", "link"),
    ("page=$1", "page"),
    ("page $1", "page"),
    ("lang=$1", "lang"),
    ("class=$1", "class"),
    ("baseline", "baseline"),
    ("sub", "sub"),
    ("super", "super"),
    ("sup", "super"),
    ("top", "top"),
    ("text-top", "text-top"),
    ("middle", "middle"),
    ("bottom", "bottom"),
    ("text-bottom", "text-bottom"),
];

const VARIANTS: &[&str] = &[
    "zh", "zh-hans", "zh-hant", "zh-cn", "zh-tw", "zh-hk", "zh-sg", "zh-mo", "zh-my",
];

const INTERWIKI: &[&str] = &[
    "wikipedia",
    "wiktionary",
    "wikiquote",
    "wikisource",
    "commons",
    "meta",
    "mw",
    "w",
    "wikt",
    "q",
    "s",
    "de",
    "en",
    "es",
    "fr",
    "ja",
    "zh",
];

pub(crate) fn english() -> Config {
    let namespaces = map(NAMESPACES);
    let mut ns_ids: BTreeMap<String, i32> = NAMESPACES
        .iter()
        .map(|(id, name)| (name.to_lowercase(), *id))
        .collect();
    ns_ids.extend(NS_ALIASES.iter().map(|(name, id)| (name.to_string(), *id)));

    Config {
        ext: Some(strings(EXT)),
        html: Some(HtmlTags {
            normal: strings(HTML_NORMAL),
            void: strings(HTML_VOID),
            display: strings(HTML_DISPLAY),
        }),
        namespaces: Some(namespaces),
        ns_ids: Some(ns_ids),
        parser_functions: Some(MagicWords {
            insensitive: strings(FUNCTIONS_INSENSITIVE),
            sensitive: strings(FUNCTIONS_SENSITIVE),
            aliases: map(FUNCTION_ALIASES)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }),
        double_underscore: Some(MagicWords {
            insensitive: strings(SWITCHES_INSENSITIVE),
            sensitive: strings(SWITCHES_SENSITIVE),
            aliases: map(SWITCH_ALIASES)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }),
        protocol: Some(strings(PROTOCOLS)),
        img: Some(
            map(IMG)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        ),
        variants: Some(strings(VARIANTS)),
        interwiki: Some(strings(INTERWIKI)),
    }
}
