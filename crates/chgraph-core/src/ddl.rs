//! Write-destination extraction from materialized view DDL
//!
//! A materialized view created with `TO <db>.<table>` (or `TO <table>`) writes
//! into an explicit table. This module recovers that table from the view's
//! `CREATE` statement by walking the ClickHouse token stream from `sqlparser`,
//! so comments, string literals and quoted identifiers never look like a
//! clause. Callers get a typed `Option` and decide on a fallback themselves.
//!
//! Only the statement header is inspected: the view's own name is skipped,
//! and everything after the first top-level `AS` belongs to the view's query.

use serde::{Deserialize, Serialize};
use sqlparser::dialect::ClickHouseDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// A `database.table` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Database name
    pub database: String,

    /// Table name
    pub table: String,
}

impl QualifiedName {
    /// Create a new qualified name
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Get fully qualified name
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Compare against a `(database, table)` pair
    pub fn is(&self, database: &str, table: &str) -> bool {
        self.database == database && self.table == table
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

fn significant_tokens(sql: &str) -> Option<Vec<Token>> {
    let tokens = Tokenizer::new(&ClickHouseDialect {}, sql).tokenize().ok()?;

    Some(
        tokens
            .into_iter()
            .filter(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
            .collect(),
    )
}

/// Unquoted word matching `keyword`; `` `to` `` and `"as"` are identifiers
fn is_keyword(token: Option<&Token>, keyword: &str) -> bool {
    matches!(token, Some(Token::Word(word)) if word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword))
}

fn identifier(token: Option<&Token>) -> Option<&str> {
    match token {
        Some(Token::Word(word)) => Some(&word.value),
        _ => None,
    }
}

/// Forward-only walk over the statement header
struct Header<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Header<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = is_keyword(self.peek(), keyword);
        if matched {
            self.pos += 1;
        }
        matched
    }

    /// `<table>` or `<database>.<table>`
    fn object_name(&mut self, default_database: &str) -> Option<QualifiedName> {
        let first = identifier(self.bump())?;

        if self.peek() == Some(&Token::Period) {
            self.pos += 1;
            let table = identifier(self.bump())?;
            Some(QualifiedName::new(first, table))
        } else {
            Some(QualifiedName::new(default_database, first))
        }
    }

    /// A cluster is a word, a string or a `{macro}`
    fn skip_cluster(&mut self) {
        if self.bump() == Some(&Token::LBrace) {
            while let Some(token) = self.bump() {
                if *token == Token::RBrace {
                    break;
                }
            }
        }
    }
}

/// Extract the explicit write destination of a materialized view.
///
/// `default_database` qualifies an unqualified `TO <table>`, normally the
/// view's own database. Returns `None` when the statement has no `TO` clause
/// in its header, which callers treat as "fall back to heuristics".
pub fn parse_write_destination(create_sql: &str, default_database: &str) -> Option<QualifiedName> {
    let tokens = significant_tokens(create_sql)?;
    let mut header = Header { tokens: &tokens, pos: 0 };

    // CREATE [OR REPLACE] MATERIALIZED VIEW [IF NOT EXISTS] <name>
    while !header.eat_keyword("VIEW") {
        header.bump()?;
    }
    if header.eat_keyword("IF") {
        header.eat_keyword("NOT");
        header.eat_keyword("EXISTS");
    }
    header.object_name(default_database)?;

    if header.eat_keyword("UUID") {
        header.bump();
    }
    if header.eat_keyword("ON") && header.eat_keyword("CLUSTER") {
        header.skip_cluster();
    }

    let mut depth = 0usize;
    while let Some(token) = header.bump() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            // `x.to` and `x.as` are name parts
            Token::Period => {
                header.bump();
            }
            _ if depth > 0 => {}
            _ if is_keyword(Some(token), "AS") => return None,
            _ if is_keyword(Some(token), "TO") => return header.object_name(default_database),
            _ => {}
        }
    }

    None
}
