//! NodeKind enum for every node in the wikitext tree.
//!
//! One closed enum covers leaves, constructs and the slots that hold their
//! sub-parts. Kind-specific behavior (serialization, visible text, accepted
//! children) is a `match` over this tag rather than a type per construct.

use std::fmt;

/// Extensions whose body is itself wikitext.
pub(crate) const PARSED_EXT: &[&str] = &["ref", "references", "poem", "indicator", "tabber"];

/// All node kinds in the wikitext tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    // === Document ===
    /// Document root
    Root,
    /// Text leaf, the only kind carrying a string payload
    Text,

    // === Comments, extension tags and inclusion markers ===
    /// `<!-- ... -->`, possibly unclosed
    Comment,
    /// Extension tag such as `<ref>...</ref>` or `<nowiki/>`
    Ext,
    ExtAttrs,
    ExtAttr,
    /// Body of an extension tag
    ExtInner,
    /// A span hidden in the current include mode, e.g. `<includeonly>...</includeonly>`
    Include,
    /// A bare inclusion marker such as `<noinclude>` or `</onlyinclude>`
    Noinclude,

    // === Headings ===
    /// `== title ==`
    Heading,
    HeadingTitle,
    /// Whitespace and comments after the closing `=` run
    HeadingTrail,

    // === Double-brace constructs ===
    /// `{{name|...}}`
    Template,
    TemplateName,
    /// Parser function or variable, e.g. `{{#if:...}}` or `{{PAGENAME}}`
    MagicWord,
    MagicWordName,
    Parameter,
    ParameterKey,
    ParameterValue,
    /// `{{{name|default}}}`
    Arg,
    ArgName,
    ArgDefault,
    /// Content that is never rendered, like extra `|` parts of an argument
    Hidden,

    // === HTML tags and attributes ===
    /// An opening, closing or self-closing HTML tag
    Html,
    HtmlAttrs,
    HtmlAttr,
    AttrKey,
    AttrValue,

    // === Tables ===
    /// `{| ... |}`
    Table,
    /// `|-` row
    Tr,
    /// `|`, `!` or `|+` cell
    Td,
    TdInner,
    /// Table punctuation such as `{|`, `\n|-` or `||`
    TableSyntax,
    TableAttrs,
    TableAttr,
    /// Lines inside a table that belong to no cell
    TableInter,

    // === Line-anchored markers ===
    /// List prefix such as `*#`
    List,
    /// `:` that ends a definition term on the same line
    Dd,
    /// `----`
    Hr,
    /// Behavior switch such as `__TOC__`
    DoubleUnderscore,

    // === Links ===
    /// `[[target|text]]`
    Link,
    /// `[[Category:Name|sortkey]]`
    Category,
    /// `[[File:Name.png|thumb|caption]]`
    File,
    LinkTarget,
    LinkText,
    ImageParameter,
    /// `[url text]`
    ExtLink,
    ExtLinkUrl,
    ExtLinkText,
    /// A bare URL in running text
    FreeExtLink,
    /// `ISBN ...`, `RFC ...` or `PMID ...`
    MagicLink,

    // === Inline formatting ===
    /// A run of `''`, `'''` or `'''''`
    Quote,

    // === Language conversion ===
    /// `-{flags|rules}-`
    Converter,
    ConverterFlags,
    ConverterFlag,
    ConverterRule,
    ConverterRuleFrom,
    ConverterRuleVariant,
    ConverterRuleTo,
}

use NodeKind::*;

const ALL: &[NodeKind] = &[
    Root,
    Text,
    Comment,
    Ext,
    ExtAttrs,
    ExtAttr,
    ExtInner,
    Include,
    Noinclude,
    Heading,
    HeadingTitle,
    HeadingTrail,
    Template,
    TemplateName,
    MagicWord,
    MagicWordName,
    Parameter,
    ParameterKey,
    ParameterValue,
    Arg,
    ArgName,
    ArgDefault,
    Hidden,
    Html,
    HtmlAttrs,
    HtmlAttr,
    AttrKey,
    AttrValue,
    Table,
    Tr,
    Td,
    TdInner,
    TableSyntax,
    TableAttrs,
    TableAttr,
    TableInter,
    List,
    Dd,
    Hr,
    DoubleUnderscore,
    Link,
    Category,
    File,
    LinkTarget,
    LinkText,
    ImageParameter,
    ExtLink,
    ExtLinkUrl,
    ExtLinkText,
    FreeExtLink,
    MagicLink,
    Quote,
    Converter,
    ConverterFlags,
    ConverterFlag,
    ConverterRule,
    ConverterRuleFrom,
    ConverterRuleVariant,
    ConverterRuleTo,
];

impl NodeKind {
    /// The kebab-case type name used by selectors and JSON dumps.
    pub fn name(self) -> &'static str {
        match self {
            Root => "root",
            Text => "text",
            Comment => "comment",
            Ext => "ext",
            ExtAttrs => "ext-attrs",
            ExtAttr => "ext-attr",
            ExtInner => "ext-inner",
            Include => "include",
            Noinclude => "noinclude",
            Heading => "heading",
            HeadingTitle => "heading-title",
            HeadingTrail => "heading-trail",
            Template => "template",
            TemplateName => "template-name",
            MagicWord => "magic-word",
            MagicWordName => "magic-word-name",
            Parameter => "parameter",
            ParameterKey => "parameter-key",
            ParameterValue => "parameter-value",
            Arg => "arg",
            ArgName => "arg-name",
            ArgDefault => "arg-default",
            Hidden => "hidden",
            Html => "html",
            HtmlAttrs => "html-attrs",
            HtmlAttr => "html-attr",
            AttrKey => "attr-key",
            AttrValue => "attr-value",
            Table => "table",
            Tr => "tr",
            Td => "td",
            TdInner => "td-inner",
            TableSyntax => "table-syntax",
            TableAttrs => "table-attrs",
            TableAttr => "table-attr",
            TableInter => "table-inter",
            List => "list",
            Dd => "dd",
            Hr => "hr",
            DoubleUnderscore => "double-underscore",
            Link => "link",
            Category => "category",
            File => "file",
            LinkTarget => "link-target",
            LinkText => "link-text",
            ImageParameter => "image-parameter",
            ExtLink => "ext-link",
            ExtLinkUrl => "ext-link-url",
            ExtLinkText => "ext-link-text",
            FreeExtLink => "free-ext-link",
            MagicLink => "magic-link",
            Quote => "quote",
            Converter => "converter",
            ConverterFlags => "converter-flags",
            ConverterFlag => "converter-flag",
            ConverterRule => "converter-rule",
            ConverterRuleFrom => "converter-rule-from",
            ConverterRuleVariant => "converter-rule-variant",
            ConverterRuleTo => "converter-rule-to",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Kinds that may appear in running wikitext.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            Text | Comment
                | Ext
                | Include
                | Noinclude
                | Heading
                | Template
                | MagicWord
                | Arg
                | Hidden
                | Html
                | Table
                | List
                | Dd
                | Hr
                | DoubleUnderscore
                | Link
                | Category
                | File
                | ExtLink
                | FreeExtLink
                | MagicLink
                | Quote
                | Converter
        )
    }

    /// Containers whose whole content is wikitext.
    pub fn holds_wikitext(self) -> bool {
        matches!(
            self,
            Root | ExtInner
                | Hidden
                | HeadingTitle
                | HeadingTrail
                | TemplateName
                | MagicWordName
                | ParameterKey
                | ParameterValue
                | ArgName
                | ArgDefault
                | AttrKey
                | AttrValue
                | TdInner
                | TableSyntax
                | TableInter
                | LinkTarget
                | LinkText
                | ImageParameter
                | ExtLinkUrl
                | ExtLinkText
                | ConverterFlag
                | ConverterRuleFrom
                | ConverterRuleVariant
                | ConverterRuleTo
        )
    }

    /// Leaf-like markers holding nothing but text.
    pub fn holds_text_only(self) -> bool {
        matches!(
            self,
            Comment
                | Include
                | Noinclude
                | List
                | Dd
                | Hr
                | DoubleUnderscore
                | FreeExtLink
                | MagicLink
                | Quote
        )
    }

    pub fn is_attrs(self) -> bool {
        matches!(self, ExtAttrs | HtmlAttrs | TableAttrs)
    }

    pub fn is_attr(self) -> bool {
        matches!(self, ExtAttr | HtmlAttr | TableAttr)
    }

    /// The attribute kind held by an attribute container.
    pub fn attr_kind(self) -> Option<Self> {
        match self {
            ExtAttrs => Some(ExtAttr),
            HtmlAttrs => Some(HtmlAttr),
            TableAttrs => Some(TableAttr),
            _ => None,
        }
    }

    pub fn is_link_like(self) -> bool {
        matches!(self, Link | Category | File)
    }

    /// Whether a node of this kind accepts `child` at position `index`.
    pub fn accepts(self, child: NodeKind, index: usize) -> bool {
        match self {
            Text => false,
            k if k.holds_text_only() => child == Text,
            k if k.holds_wikitext() => child.is_inline(),
            Ext => matches!((index, child), (0, ExtAttrs) | (1, ExtInner)),
            ExtAttrs | HtmlAttrs | TableAttrs => {
                Some(child) == self.attr_kind()
                    || matches!(child, Text | Comment | Template | MagicWord | Arg)
            }
            ExtAttr | HtmlAttr | TableAttr => {
                matches!((index, child), (0, AttrKey) | (1, AttrValue))
            }
            Heading => matches!((index, child), (0, HeadingTitle) | (1, HeadingTrail)),
            Template => match index {
                0 => child == TemplateName,
                _ => child == Parameter,
            },
            MagicWord => match index {
                0 => child == MagicWordName,
                _ => child == Parameter,
            },
            Parameter => matches!((index, child), (0, ParameterKey) | (1, ParameterValue)),
            Arg => match index {
                0 => child == ArgName,
                1 => matches!(child, ArgDefault | Hidden),
                _ => child == Hidden,
            },
            Html => index == 0 && child == HtmlAttrs,
            Table => match index {
                0 => child == TableSyntax,
                1 => child == TableAttrs,
                _ => matches!(child, Tr | Td | TableInter | TableSyntax),
            },
            Tr => match index {
                0 => child == TableSyntax,
                1 => child == TableAttrs,
                _ => matches!(child, Td | TableInter),
            },
            Td => matches!(
                (index, child),
                (0, TableSyntax) | (1, TableAttrs) | (2, TableSyntax) | (3, TdInner)
            ),
            Link | Category => matches!((index, child), (0, LinkTarget) | (1, LinkText)),
            File => match index {
                0 => child == LinkTarget,
                _ => child == ImageParameter,
            },
            ExtLink => matches!((index, child), (0, ExtLinkUrl) | (1, ExtLinkText)),
            Converter => match child {
                ConverterFlags => index == 0,
                ConverterRule => true,
                _ => false,
            },
            ConverterFlags => child == ConverterFlag,
            ConverterRule => matches!(
                child,
                ConverterRuleFrom | ConverterRuleVariant | ConverterRuleTo
            ),
            _ => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
