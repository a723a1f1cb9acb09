//! Recursive-descent parser from tokens to a [`Selector`].
//!
//! ```text
//! selector  := complex ("," complex)*
//! complex   := compound (combinator compound)*
//! compound  := (type | "*")? (attribute | pseudo)*
//! attribute := "[" key (op value ("i")?)? "]"
//! pseudo    := ":" name ("(" argument ")")?
//! ```
//!
//! Whitespace is a descendant combinator between compounds and is ignored
//! everywhere else.

use super::lexer::{Token, TokenKind, lex, unquote};
use super::{AttrOp, AttrPredicate, Combinator, Complex, Compound, Pseudo, Selector};
use crate::error::SelectorError;
use crate::kind::NodeKind;
use crate::range::Ranges;

pub(crate) fn parse_selector(input: &str) -> Result<Selector, SelectorError> {
    let tokens = lex(input);
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let selector = parser.selector()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(selector),
        Some(_) => Err(parser.unexpected()),
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_whitespace(&mut self) -> bool {
        let skipped = self.at(TokenKind::Whitespace);
        while self.at(TokenKind::Whitespace) {
            self.pos += 1;
        }
        skipped
    }

    fn unexpected(&self) -> SelectorError {
        match self.tokens.get(self.pos) {
            Some(token) => SelectorError::Unexpected {
                pos: token.span.start,
                found: format!("{} `{}`", token.kind.describe(), token.text),
            },
            None => SelectorError::Unexpected {
                pos: self.input.len(),
                found: "end of selector".to_string(),
            },
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>, SelectorError> {
        if self.at(kind) {
            self.bump().ok_or_else(|| self.unexpected())
        } else {
            Err(self.unexpected())
        }
    }

    fn selector(&mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = vec![self.complex()?];
        loop {
            self.skip_whitespace();
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.pos += 1;
            alternatives.push(self.complex()?);
        }
        Ok(Selector { alternatives })
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                Some(TokenKind::Gt) => Combinator::Child,
                Some(TokenKind::Plus) => Combinator::Adjacent,
                Some(TokenKind::Tilde) => Combinator::Sibling,
                Some(TokenKind::Comma | TokenKind::RParen) | None => break,
                Some(_) if spaced => {
                    combinators.push(Combinator::Descendant);
                    compounds.push(self.compound()?);
                    continue;
                }
                Some(_) => return Err(self.unexpected()),
            };
            self.pos += 1;
            self.skip_whitespace();
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut empty = true;
        match self.peek() {
            Some(TokenKind::Star) => {
                self.pos += 1;
                empty = false;
            }
            Some(TokenKind::Ident) => {
                let token = self.expect(TokenKind::Ident)?;
                let kind = NodeKind::from_name(token.text)
                    .ok_or_else(|| SelectorError::UnknownType(token.text.to_string()))?;
                compound.kind = Some(kind);
                empty = false;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some(TokenKind::LBracket) => compound.attrs.push(self.attribute()?),
                Some(TokenKind::Colon) => compound.pseudos.push(self.pseudo()?),
                _ => break,
            }
            empty = false;
        }
        if empty {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrPredicate, SelectorError> {
        self.expect(TokenKind::LBracket)?;
        self.skip_whitespace();
        let key = self.expect(TokenKind::Ident)?.text.to_string();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(TokenKind::RBracket) => {
                self.pos += 1;
                return Ok(AttrPredicate { key, test: None });
            }
            Some(TokenKind::Eq) => AttrOp::Equals,
            Some(TokenKind::NotEq) => AttrOp::NotEquals,
            Some(TokenKind::PrefixEq) => AttrOp::Prefix,
            Some(TokenKind::SuffixEq) => AttrOp::Suffix,
            Some(TokenKind::ContainsEq) => AttrOp::Contains,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(TokenKind::Quoted) => unquote(self.expect(TokenKind::Quoted)?.text),
            Some(TokenKind::Ident | TokenKind::Number) => self.bump().map(|t| t.text.to_string()).unwrap_or_default(),
            _ => return Err(self.unexpected()),
        };
        self.skip_whitespace();
        let mut insensitive = false;
        if let Some(token) = self.tokens.get(self.pos) {
            if token.kind == TokenKind::Ident && token.text.eq_ignore_ascii_case("i") {
                insensitive = true;
                self.pos += 1;
                self.skip_whitespace();
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(AttrPredicate {
            key,
            test: Some((op, value, insensitive)),
        })
    }

    /// Raw source text up to the matching `)`, which is consumed.
    fn raw_argument(&mut self) -> Result<&'a str, SelectorError> {
        let start = self.tokens.get(self.pos).map_or(self.input.len(), |t| t.span.start);
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => {
                    let end = token.span.start;
                    self.pos += 1;
                    return Ok(&self.input[start..end]);
                }
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.unexpected())
    }

    fn pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        self.expect(TokenKind::Colon)?;
        let name = self.expect(TokenKind::Ident)?.text.to_ascii_lowercase();
        let has_argument = self.at(TokenKind::LParen);
        if has_argument {
            self.pos += 1;
        }
        let ranges = |parser: &mut Self| -> Result<Ranges, SelectorError> {
            if !has_argument {
                return Err(SelectorError::MissingArgument(name.clone()));
            }
            Ok(Ranges::new(parser.raw_argument()?)?)
        };
        let pseudo = match name.as_str() {
            "nth-child" => Pseudo::NthChild(ranges(self)?),
            "nth-last-child" => Pseudo::NthLastChild(ranges(self)?),
            "nth-of-type" => Pseudo::NthOfType(ranges(self)?),
            "nth-last-of-type" => Pseudo::NthLastOfType(ranges(self)?),
            "not" => {
                if !has_argument {
                    return Err(SelectorError::MissingArgument(name.clone()));
                }
                let inner = self.selector()?;
                self.skip_whitespace();
                self.expect(TokenKind::RParen)?;
                Pseudo::Not(inner)
            }
            "first-child" | "last-child" | "only-child" | "root" | "empty" if has_argument => {
                return Err(self.unexpected());
            }
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "root" => Pseudo::Root,
            "empty" => Pseudo::Empty,
            _ => return Err(SelectorError::UnknownPseudo(name.clone())),
        };
        Ok(pseudo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn parses_alternatives_and_combinators() {
        let selector = parse_selector("table > tr td, link ~ *").unwrap();
        assert_eq!(selector.alternatives.len(), 2);
        let first = &selector.alternatives[0];
        assert_eq!(
            first.combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
        assert_eq!(first.compounds[2].kind, Some(NodeKind::Td));
        let second = &selector.alternatives[1];
        assert_eq!(second.combinators, vec![Combinator::Sibling]);
        assert_eq!(second.compounds[1].kind, None);
    }

    #[test]
    fn parses_attribute_predicates() {
        let selector = parse_selector(r#"template[name="Template:A" i][anon][x!=2]"#).unwrap();
        let attrs = &selector.alternatives[0].compounds[0].attrs;
        assert_eq!(
            attrs,
            &vec![
                AttrPredicate {
                    key: "name".into(),
                    test: Some((AttrOp::Equals, "Template:A".into(), true)),
                },
                AttrPredicate {
                    key: "anon".into(),
                    test: None,
                },
                AttrPredicate {
                    key: "x".into(),
                    test: Some((AttrOp::NotEquals, "2".into(), false)),
                },
            ]
        );
    }

    #[test]
    fn parses_pseudo_classes() {
        let selector = parse_selector("tr:nth-child(2n+1):not(:first-child, td):root").unwrap();
        let pseudos = &selector.alternatives[0].compounds[0].pseudos;
        assert_eq!(pseudos.len(), 3);
        assert!(matches!(pseudos[0], Pseudo::NthChild(_)));
        match &pseudos[1] {
            Pseudo::Not(inner) => assert_eq!(inner.alternatives.len(), 2),
            other => panic!("expected :not, got {other:?}"),
        }
        assert_eq!(pseudos[2], Pseudo::Root);
    }

    #[test]
    fn nth_argument_is_read_from_source() {
        let selector = parse_selector("td:nth-child(-n+3, 5)").unwrap();
        match &selector.alternatives[0].compounds[0].pseudos[0] {
            Pseudo::NthChild(ranges) => assert_eq!(ranges, &Ranges::new("-n+3, 5").unwrap()),
            other => panic!("expected :nth-child, got {other:?}"),
        }
    }

    #[rstest]
    #[case("", 0)]
    #[case("td >", 4)]
    #[case("td[", 3)]
    #[case("td[a=]", 5)]
    #[case("td,,tr", 3)]
    #[case("td ? tr", 3)]
    #[case("td[a=b c]", 7)]
    #[case("td:nth-child(1", 14)]
    fn syntax_errors_carry_positions(#[case] input: &str, #[case] pos: usize) {
        match parse_selector(input) {
            Err(SelectorError::Unexpected { pos: found, .. }) => assert_eq!(found, pos, "{input}"),
            other => panic!("{input}: expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn semantic_errors() {
        assert_eq!(
            parse_selector("tabel"),
            Err(SelectorError::UnknownType("tabel".into()))
        );
        assert_eq!(
            parse_selector("td:hover"),
            Err(SelectorError::UnknownPseudo("hover".into()))
        );
        assert_eq!(
            parse_selector("td:nth-child"),
            Err(SelectorError::MissingArgument("nth-child".into()))
        );
        assert!(matches!(
            parse_selector("td:nth-child(0n+1)"),
            Err(SelectorError::Range(RangeError::ZeroStep(_)))
        ));
    }
}
