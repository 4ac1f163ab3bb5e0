//! Store-agnostic mutation statements.
//!
//! A [`Statement`] is an ordered list of [`Clause`]s referring to parameters by
//! name. It is only turned into query text by [`Statement::to_cypher`] when it
//! reaches a sink that speaks Cypher.

use std::fmt;

use serde_json::{Map, Value};

pub type Parameters = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The relationship points at the primary node.
    In,
    /// The relationship starts at the primary node.
    Out,
}

impl Direction {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "IN" => Some(Direction::In),
            "OUT" => Some(Direction::Out),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Binds `alias` to an existing node whose `key` equals `$param`.
    MatchNode {
        alias: String,
        label: String,
        key: String,
        param: String,
    },
    /// Binds `alias` to the node whose `key` equals `$param`, creating it if needed.
    MergeNode {
        alias: String,
        label: String,
        key: String,
        param: String,
    },
    SetProperty {
        alias: String,
        property: String,
        param: String,
    },
    MergeRelationship {
        alias: String,
        other: String,
        rel_type: String,
        direction: Direction,
    },
    CreateUniqueConstraint {
        label: String,
        property: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    clauses: Vec<Clause>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn extend(&mut self, clauses: impl IntoIterator<Item = Clause>) {
        self.clauses.extend(clauses);
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn to_cypher(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::MatchNode {
                alias,
                label,
                key,
                param,
            } => write!(
                f,
                "MATCH ({}:{} {{{}: ${}}})",
                ident(alias),
                ident(label),
                ident(key),
                ident(param)
            ),
            Clause::MergeNode {
                alias,
                label,
                key,
                param,
            } => write!(
                f,
                "MERGE ({}:{} {{{}: ${}}})",
                ident(alias),
                ident(label),
                ident(key),
                ident(param)
            ),
            Clause::SetProperty {
                alias,
                property,
                param,
            } => write!(
                f,
                "SET {}.{} = ${}",
                ident(alias),
                ident(property),
                ident(param)
            ),
            Clause::MergeRelationship {
                alias,
                other,
                rel_type,
                direction,
            } => match direction {
                Direction::Out => write!(
                    f,
                    "MERGE ({})-[:{}]->({})",
                    ident(alias),
                    ident(rel_type),
                    ident(other)
                ),
                Direction::In => write!(
                    f,
                    "MERGE ({})<-[:{}]-({})",
                    ident(alias),
                    ident(rel_type),
                    ident(other)
                ),
            },
            Clause::CreateUniqueConstraint { label, property } => write!(
                f,
                "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                ident(label),
                ident(property)
            ),
        }
    }
}

/// A statement together with the parameters its clauses refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    pub statement: Statement,
    pub parameters: Parameters,
}

impl Mutation {
    pub fn new(statement: Statement, parameters: Parameters) -> Self {
        Self {
            statement,
            parameters,
        }
    }
}

/// Backtick-quotes anything that is not a plain Cypher identifier.
fn ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}
