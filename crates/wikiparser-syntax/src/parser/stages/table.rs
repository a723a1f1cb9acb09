//! Stage 3: tables.
//!
//! Line oriented. Each line of a slot is classified by its first token; open
//! tables live on a stack so a `{|` inside a cell nests. Text lines go to the
//! open cell, or to a `TableInter` when no cell is open. Row, cell and closing
//! syntax carries the newline before it, which keeps every byte in exactly one
//! node.
//!
//! `{{!}}`, `{{!!}}`, `{{(!}}`, `{{!)}}` and `{{!-}}` count as the syntax they
//! expand to.

use wikiparser_config::ConfigError;

use super::attributes;
use crate::kind::NodeKind;
use crate::parser::sentinel::{self, kind};
use crate::parser::{ParseContext, SlotInfo};
use crate::tree::NodeId;

/// Stage that parses cell content.
const CELL_STAGE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Open,
    Close,
    Row,
    Caption,
    Td,
    Th,
}

impl Syntax {
    fn subtype(self) -> &'static str {
        match self {
            Syntax::Caption => "caption",
            Syntax::Th => "th",
            _ => "td",
        }
    }
}

fn sentinel_kind(text: &str) -> Option<(char, usize)> {
    sentinel::parse_at(text).map(|(_, kind, len)| (kind, len))
}

/// Length of a `|` at the start of `text`, literal or `{{!}}`.
fn pipe_at(text: &str) -> Option<usize> {
    if text.starts_with('|') {
        return Some(1);
    }
    match sentinel_kind(text) {
        Some((kind::PIPE, len)) => Some(len),
        _ => None,
    }
}

/// Classifies a line with its leading whitespace removed.
fn classify(line: &str) -> Option<(Syntax, usize)> {
    if line.starts_with("{|") {
        return Some((Syntax::Open, 2));
    }
    match sentinel_kind(line) {
        Some((kind::TABLE_OPEN, len)) => return Some((Syntax::Open, len)),
        Some((kind::TABLE_CLOSE, len)) => return Some((Syntax::Close, len)),
        Some((kind::ROW, len)) => {
            let dashes = line[len..].len() - line[len..].trim_start_matches('-').len();
            return Some((Syntax::Row, len + dashes));
        }
        _ => {}
    }
    if line.starts_with('!') {
        return Some((Syntax::Th, 1));
    }
    let pipe = pipe_at(line)?;
    let rest = &line[pipe..];
    Some(match rest.chars().next() {
        Some('}') => (Syntax::Close, pipe + 1),
        Some('-') => {
            let dashes = rest.len() - rest.trim_start_matches('-').len();
            (Syntax::Row, pipe + dashes)
        }
        Some('+') => (Syntax::Caption, pipe + 1),
        _ => (Syntax::Td, pipe),
    })
}

/// Next cell separator in `text`: `||`, `{{!!}}`, or `!!` on header lines.
fn next_cell_sep(text: &str, header: bool) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some(p) = pipe_at(rest) {
            if let Some(q) = pipe_at(&rest[p..]) {
                return Some((i, p + q));
            }
        }
        if header && rest.starts_with("!!") {
            return Some((i, 2));
        }
        match sentinel_kind(rest) {
            Some((kind::DOUBLE_PIPE, len)) => return Some((i, len)),
            Some((_, len)) => i += len,
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    None
}

/// The `|` between cell attributes and content, unless a link comes first.
fn attr_sep(text: &str) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some(p) = pipe_at(rest) {
            return (!text[..i].contains("[[")).then_some((i, p));
        }
        i += match sentinel_kind(rest) {
            Some((_, len)) => len,
            None => rest.chars().next().map_or(1, char::len_utf8),
        };
    }
    None
}

struct Cell {
    node: NodeId,
    text: String,
}

struct OpenTable {
    node: NodeId,
    row: Option<NodeId>,
    cell: Option<Cell>,
    inter: Option<String>,
}

impl OpenTable {
    fn container(&self) -> NodeId {
        self.row.unwrap_or(self.node)
    }

    fn sink(&mut self) -> &mut String {
        match &mut self.cell {
            Some(cell) => &mut cell.text,
            None => self.inter.get_or_insert_with(String::new),
        }
    }
}

struct Tables<'c> {
    ctx: &'c mut ParseContext,
    stack: Vec<OpenTable>,
    out: String,
}

impl Tables<'_> {
    fn syntax(&mut self, text: &str) -> NodeId {
        self.ctx.leaf(NodeKind::TableSyntax, text)
    }

    /// Text for whatever encloses the innermost table.
    fn outer_sink(&mut self) -> &mut String {
        match self.stack.last_mut() {
            Some(table) => table.sink(),
            None => &mut self.out,
        }
    }

    fn finish_cell(&mut self) {
        let Some(table) = self.stack.last_mut() else { return };
        if let Some(cell) = table.cell.take() {
            let inner = self.ctx.slot(NodeKind::TdInner, &cell.text, CELL_STAGE, false);
            self.ctx.add(cell.node, inner);
        }
        if let Some(text) = table.inter.take() {
            let container = table.container();
            let inter = self.ctx.slot(NodeKind::TableInter, &text, CELL_STAGE, false);
            self.ctx.add(container, inter);
        }
    }

    fn open(&mut self, syntax: &str, attrs: &str) {
        let node = self.ctx.node(NodeKind::Table);
        let syntax = self.syntax(syntax);
        let attrs = attributes::build(self.ctx, NodeKind::TableAttrs, attrs);
        self.ctx.add(node, syntax);
        self.ctx.add(node, attrs);
        self.stack.push(OpenTable {
            node,
            row: None,
            cell: None,
            inter: None,
        });
    }

    fn close(&mut self, syntax: Option<&str>) {
        self.finish_cell();
        let Some(table) = self.stack.pop() else { return };
        self.ctx.put(table.node, "closed", syntax.is_some());
        if let Some(syntax) = syntax {
            let node = self.syntax(syntax);
            self.ctx.add(table.node, node);
        }
        let sentinel = self.ctx.push(table.node, kind::TABLE);
        self.outer_sink().push_str(&sentinel);
    }

    fn row(&mut self, syntax: &str, attrs: &str) {
        self.finish_cell();
        let row = self.ctx.node(NodeKind::Tr);
        let syntax = self.syntax(syntax);
        let attrs = attributes::build(self.ctx, NodeKind::TableAttrs, attrs);
        self.ctx.add(row, syntax);
        self.ctx.add(row, attrs);
        if let Some(table) = self.stack.last_mut() {
            let node = table.node;
            table.row = Some(row);
            self.ctx.add(node, row);
        }
    }

    fn cells(&mut self, kind: Syntax, syntax: &str, content: &str) {
        let header = kind == Syntax::Th;
        let mut syntax = syntax.to_string();
        let mut rest = content;
        loop {
            let (cell, next) = match next_cell_sep(rest, header) {
                Some((at, len)) => (&rest[..at], Some((&rest[at..at + len], &rest[at + len..]))),
                None => (rest, None),
            };
            self.cell(kind, &syntax, cell);
            match next {
                Some((sep, after)) => {
                    syntax = sep.to_string();
                    rest = after;
                }
                None => break,
            }
        }
    }

    fn cell(&mut self, kind: Syntax, syntax: &str, text: &str) {
        self.finish_cell();
        let (attrs, sep, inner) = match attr_sep(text) {
            Some((at, len)) => (&text[..at], &text[at..at + len], &text[at + len..]),
            None => ("", "", text),
        };
        let td = self.ctx.node(NodeKind::Td);
        self.ctx.put(td, "subtype", kind.subtype());
        let syntax = self.syntax(syntax);
        let attrs = attributes::build(self.ctx, NodeKind::TableAttrs, attrs);
        let sep = self.syntax(sep);
        for child in [syntax, attrs, sep] {
            self.ctx.add(td, child);
        }
        if let Some(table) = self.stack.last_mut() {
            let container = table.container();
            table.cell = Some(Cell {
                node: td,
                text: inner.to_string(),
            });
            self.ctx.add(container, td);
        }
    }

    /// Handles one line; `newline` is the `\n` that precedes it, if any.
    fn line(&mut self, newline: &str, line: &str, at_line_start: bool) {
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        let trimmed = &line[indent..];

        if at_line_start {
            let colons = trimmed.len() - trimmed.trim_start_matches(':').len();
            let after_colons = &trimmed[colons..];
            let spaces = after_colons.len() - after_colons.trim_start_matches([' ', '\t']).len();
            let candidate = &after_colons[spaces..];
            if let Some((Syntax::Open, len)) = classify(candidate) {
                let prefix = &line[..line.len() - candidate.len()];
                let sink = self.outer_sink();
                sink.push_str(newline);
                sink.push_str(prefix);
                self.open(&candidate[..len], &candidate[len..]);
                return;
            }
        }

        let classified = if at_line_start && !self.stack.is_empty() {
            classify(trimmed)
        } else {
            None
        };
        let Some((syntax, len)) = classified else {
            let sink = self.outer_sink();
            sink.push_str(newline);
            sink.push_str(line);
            return;
        };
        let token = format!("{newline}{}", &line[..indent + len]);
        let rest = &trimmed[len..];
        match syntax {
            Syntax::Open => {
                let sink = self.outer_sink();
                sink.push_str(&token);
                sink.push_str(rest);
            }
            Syntax::Close => {
                self.close(Some(&token));
                self.outer_sink().push_str(rest);
            }
            Syntax::Row => self.row(&token, rest),
            Syntax::Caption | Syntax::Td | Syntax::Th => self.cells(syntax, &token, rest),
        }
    }
}

pub(crate) fn parse(text: &str, slot: &SlotInfo, ctx: &mut ParseContext) -> Result<String, ConfigError> {
    let has_open = text.contains("{|")
        || sentinel::pieces(text)
            .iter()
            .any(|p| matches!(p, sentinel::Piece::Sentinel { kind: kind::TABLE_OPEN, .. }));
    if !has_open {
        return Ok(text.to_string());
    }
    let mut tables = Tables {
        ctx,
        stack: Vec::new(),
        out: String::with_capacity(text.len()),
    };
    for (i, line) in text.split('\n').enumerate() {
        let newline = if i == 0 { "" } else { "\n" };
        tables.line(newline, line, i > 0 || slot.line_start);
    }
    while !tables.stack.is_empty() {
        tables.close(None);
    }
    Ok(tables.out)
}
