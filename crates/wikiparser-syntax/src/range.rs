//! Index selection expressions.
//!
//! A [`Range`] accepts three spellings, all addressing 0-based indices:
//!
//! - Python slices: `start:end:step`, with negative bounds counted from the end;
//! - the CSS `an+b` form, e.g. `2n+1` or `-n+3`;
//! - the keywords `odd` (`1::2`) and `even` (`::2`).
//!
//! [`Ranges`] is a comma-separated list mixing ranges and plain integers.

use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::RangeError;

static AN_PLUS_B: OnceLock<Regex> = OnceLock::new();

fn an_plus_b_regex() -> &'static Regex {
    AN_PLUS_B.get_or_init(|| {
        Regex::new(r"^([+-])?(\d+)?n(?:\s*([+-])\s*(\d+))?$").expect("Invalid an+b regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: i64,
    /// `None` is an unbounded end.
    end: Option<i64>,
    step: usize,
}

impl Range {
    pub fn new(expr: &str) -> Result<Self, RangeError> {
        let trimmed = expr.trim();
        let normalized = match trimmed {
            "odd" => "1::2",
            "even" => "::2",
            other => other,
        };
        if normalized.contains(':') {
            Self::from_slice(normalized, expr)
        } else {
            Self::from_an_plus_b(normalized, expr)
        }
    }

    fn from_slice(slice: &str, expr: &str) -> Result<Self, RangeError> {
        let mut parts = slice.splitn(3, ':');
        let parse_bound = |part: Option<&str>| -> Result<Option<i64>, RangeError> {
            match part.map(str::trim) {
                None | Some("") => Ok(None),
                Some(n) => n
                    .parse()
                    .map(Some)
                    .map_err(|_| RangeError::Syntax(expr.to_string())),
            }
        };
        let start = parse_bound(parts.next())?.unwrap_or(0);
        let end = parse_bound(parts.next())?;
        let step = match parse_bound(parts.next())? {
            None => 1,
            Some(s) if s >= 1 => s as usize,
            Some(_) => return Err(RangeError::InvalidStep(expr.to_string())),
        };
        Ok(Self { start, end, step })
    }

    fn from_an_plus_b(form: &str, expr: &str) -> Result<Self, RangeError> {
        let caps = an_plus_b_regex()
            .captures(form)
            .ok_or_else(|| RangeError::Syntax(expr.to_string()))?;
        let negative_a = caps.get(1).is_some_and(|m| m.as_str() == "-");
        let a: i64 = caps
            .get(2)
            .map_or(Ok(1), |m| m.as_str().parse())
            .map_err(|_| RangeError::Syntax(expr.to_string()))?;
        let negative_b = caps.get(3).is_some_and(|m| m.as_str() == "-");
        let b: i64 = caps
            .get(4)
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| RangeError::Syntax(expr.to_string()))?;
        let b = if negative_b { -b } else { b };

        if a == 0 {
            return Err(RangeError::ZeroStep(expr.to_string()));
        }
        if !negative_a {
            Ok(Self {
                start: if b >= 0 { b } else { b.rem_euclid(a) },
                end: None,
                step: a as usize,
            })
        } else if b < 0 {
            Err(RangeError::NegativeOffset(expr.to_string()))
        } else {
            Ok(Self {
                start: b % a,
                end: Some(b.checked_add(1).ok_or_else(|| RangeError::Syntax(expr.to_string()))?),
                step: a as usize,
            })
        }
    }

    /// Resolves bounds against a sequence of `len` items.
    fn bounds(&self, len: usize) -> (usize, usize) {
        let len_i = len as i64;
        let resolve = |n: i64| -> usize {
            if n < 0 {
                (len_i + n).max(0) as usize
            } else {
                n.min(len_i) as usize
            }
        };
        let start = resolve(self.start);
        let end = self.end.map_or(len, resolve);
        (start, end.max(start))
    }

    /// Indices selected from a sequence of `len` items, ascending.
    pub fn apply_to(&self, len: usize) -> Vec<usize> {
        let (start, end) = self.bounds(len);
        (start..end).step_by(self.step).collect()
    }

    pub fn contains(&self, index: usize, len: usize) -> bool {
        let (start, end) = self.bounds(len);
        index >= start && index < end && (index - start) % self.step == 0
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeItem {
    Index(i64),
    Range(Range),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranges(Vec<RangeItem>);

impl Ranges {
    pub fn new(expr: &str) -> Result<Self, RangeError> {
        expr.split(',')
            .map(|item| {
                let item = item.trim();
                match item.parse::<i64>() {
                    Ok(index) => Ok(RangeItem::Index(index)),
                    Err(_) => Range::new(item).map(RangeItem::Range),
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn items(&self) -> &[RangeItem] {
        &self.0
    }

    /// Sorted, de-duplicated indices selected from `len` items.
    pub fn apply_to(&self, len: usize) -> Vec<usize> {
        let mut selected: Vec<usize> = self
            .0
            .iter()
            .flat_map(|item| match item {
                RangeItem::Index(i) => {
                    let i = if *i < 0 { len as i64 + i } else { *i };
                    if i >= 0 && (i as usize) < len {
                        vec![i as usize]
                    } else {
                        Vec::new()
                    }
                }
                RangeItem::Range(r) => r.apply_to(len),
            })
            .collect();
        selected.sort_unstable();
        selected.dedup();
        selected
    }

    /// Whether `index` is selected among `len` items.
    pub fn contains(&self, index: usize, len: usize) -> bool {
        self.0.iter().any(|item| match item {
            RangeItem::Index(i) => {
                let i = if *i < 0 { len as i64 + i } else { *i };
                i == index as i64
            }
            RangeItem::Range(r) => r.contains(index, len),
        })
    }

    /// Whether `expr` selects the 0-based `index` in a sequence that ends there.
    pub fn nth(expr: &str, index: usize) -> Result<bool, RangeError> {
        Ok(Self::new(expr)?.contains(index, index + 1))
    }
}

impl FromStr for Ranges {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
