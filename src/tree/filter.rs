//! Filter expressions over lookup strings.
//!
//! A [`LookupFilter`] is written against user lookups (`title__salary`) and
//! rewritten through [`Tree::resolve_lookup`] into root-relative ones before
//! being handed to a query builder. Conditions combine with `&`, `|` and `!`.

use serde_json::Value;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use super::errors::TreeResult;
use super::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterChild {
    Condition { lookup: String, value: Value },
    Group(LookupFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupFilter {
    pub connector: Connector,
    pub negated: bool,
    pub children: Vec<FilterChild>,
}

impl LookupFilter {
    /// Single condition `lookup = value`.
    pub fn condition(lookup: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            connector: Connector::And,
            negated: false,
            children: vec![FilterChild::Condition {
                lookup: lookup.into(),
                value: value.into(),
            }],
        }
    }

    /// All conditions ANDed, in the given order.
    pub fn all<I, K, V>(conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            connector: Connector::And,
            negated: false,
            children: conditions
                .into_iter()
                .map(|(lookup, value)| FilterChild::Condition {
                    lookup: lookup.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    fn combine(self, other: Self, connector: Connector) -> Self {
        let mut combined = Self {
            connector,
            negated: false,
            children: Vec::new(),
        };
        combined.absorb(self);
        combined.absorb(other);
        combined
    }

    /// Flatten `other` into this group when that does not change meaning.
    fn absorb(&mut self, other: Self) {
        if !other.negated && (other.connector == self.connector || other.children.len() == 1) {
            self.children.extend(other.children);
        } else {
            self.children.push(FilterChild::Group(other));
        }
    }

    /// Copy with every lookup rewritten relative to `tree`'s root.
    pub fn resolve(&self, tree: &Tree) -> TreeResult<Self> {
        let children = self
            .children
            .iter()
            .map(|child| match child {
                FilterChild::Condition { lookup, value } => Ok(FilterChild::Condition {
                    lookup: tree.resolve_lookup(lookup)?,
                    value: value.clone(),
                }),
                FilterChild::Group(group) => Ok(FilterChild::Group(group.resolve(tree)?)),
            })
            .collect::<TreeResult<Vec<_>>>()?;
        Ok(Self {
            connector: self.connector,
            negated: self.negated,
            children,
        })
    }

    /// Every lookup in the filter, depth-first.
    pub fn lookups(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                FilterChild::Condition { lookup, .. } => out.push(lookup.as_str()),
                FilterChild::Group(group) => out.extend(group.lookups()),
            }
        }
        out
    }
}

impl BitAnd for LookupFilter {
    type Output = LookupFilter;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.combine(rhs, Connector::And)
    }
}

impl BitOr for LookupFilter {
    type Output = LookupFilter;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.combine(rhs, Connector::Or)
    }
}

impl Not for LookupFilter {
    type Output = LookupFilter;

    fn not(mut self) -> Self::Output {
        self.negated = !self.negated;
        self
    }
}

impl fmt::Display for LookupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "(NOT ")?;
        }
        write!(f, "({}: ", self.connector)?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match child {
                FilterChild::Condition { lookup, value } => {
                    write!(f, "('{}', {})", lookup, DisplayValue(value))?
                }
                FilterChild::Group(group) => write!(f, "{}", group)?,
            }
        }
        write!(f, ")")?;
        if self.negated {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Literal rendering: strings single-quoted, null as `None`, booleans
/// capitalised.
struct DisplayValue<'a>(&'a Value);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", DisplayValue(item))?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "{}", self.0),
        }
    }
}
