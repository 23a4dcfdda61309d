use super::{
    plan::{Plan, ROOT_ALIAS},
    token::{tokenize, Token, TokenKind},
};
use crate::{Error, Result};

use std::ops::Range;

/// Words that are never treated as column references.
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "COLLATE", "DESC", "DISTINCT",
    "ELSE", "END", "ESCAPE", "EXISTS", "FALSE", "FROM", "GLOB", "GROUP", "HAVING", "IN", "INNER",
    "IS", "ISNULL", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NOTNULL", "NULL", "NULLS", "OFFSET",
    "ON", "OR", "ORDER", "OUTER", "REGEXP", "SELECT", "THEN", "TRUE", "UNION", "WHEN", "WHERE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
}

/// A caller's statement or fragment, rewritten against a plan.
#[derive(Debug)]
pub(crate) struct Rewritten {
    /// The select list
    pub(crate) select: String,

    /// Number of parameters bound by the select list
    pub(crate) select_params: usize,

    /// Everything after the `FROM` clause, starting with a space when
    /// non-empty
    pub(crate) tail: String,

    /// The rewritten `ORDER BY` clause, starting with a space
    pub(crate) order_by: Option<String>,

    /// Positions of the parameters bound by the `ORDER BY` clause
    pub(crate) order_by_params: Range<usize>,

    /// The statement has a top-level `LIMIT` or `OFFSET`
    pub(crate) paginated: bool,

    /// The statement refers to a joined table outside its select list
    pub(crate) references_joins: bool,
}

impl Rewritten {
    pub(crate) fn new(plan: &Plan<'_>, sql: &str) -> Result<Self> {
        let tokens = tokenize(sql)?;
        let rewriter = Rewriter {
            plan,
            tokens: &tokens,
        };

        let first = next_significant(&tokens, 0);
        let is_select = first.is_some_and(|i| tokens[i].is_keyword("SELECT"));

        let (select, tail_start) = if is_select {
            rewriter.select_statement(first.map_or(0, |i| i + 1))?
        } else {
            (plan.select_items(), 0)
        };

        let select_params = count_placeholders(&tokens[..tail_start]);
        let clauses = split_clauses(&tokens, tail_start);

        let mut tail = String::new();
        let mut order_by = None;
        let mut order_by_params = 0..0;
        let mut references_joins = false;

        // In a statement, whatever follows the table (caller joins, comma
        // joins) is kept in place. A fragment that starts with a condition
        // rather than a clause keyword is a `WHERE` condition.
        let first_clause = clauses.first().map_or(tokens.len(), |(_, range)| range.start);
        if next_significant(&tokens, tail_start).is_some_and(|i| i < first_clause) {
            let mut leading = String::new();
            references_joins |= rewriter.rewrite(tail_start..first_clause, &mut leading);
            tail.push_str(if is_select { " " } else { " WHERE " });
            tail.push_str(leading.trim());
        }

        for (kind, range) in &clauses {
            trim_end(&mut tail);
            let start = tail.len();
            tail.push(' ');
            references_joins |= rewriter.rewrite(range.clone(), &mut tail);

            if *kind == ClauseKind::OrderBy {
                let before = count_placeholders(&tokens[..range.start]);
                let within = count_placeholders(&tokens[range.clone()]);
                order_by = Some(tail[start..].trim_end().to_string());
                order_by_params = before..before + within;
            }
        }

        trim_end(&mut tail);

        let paginated = clauses
            .iter()
            .any(|(kind, _)| matches!(kind, ClauseKind::Limit | ClauseKind::Offset));

        Ok(Self {
            select,
            select_params,
            tail,
            order_by,
            order_by_params,
            paginated,
            references_joins,
        })
    }
}

struct Rewriter<'p, 'a, 't> {
    plan: &'p Plan<'a>,
    tokens: &'t [Token<'t>],
}

impl Rewriter<'_, '_, '_> {
    /// Handles `SELECT <list> FROM <table>`, returning the select list and
    /// the position following the table name.
    fn select_statement(&self, start: usize) -> Result<(String, usize)> {
        let tokens = self.tokens;
        let table = &self.plan.root().mapping.table;

        let from = (start..tokens.len())
            .find(|&i| depth_at(tokens, i) == 0 && tokens[i].is_keyword("FROM"))
            .ok_or_else(|| Error::invalid_statement("SELECT statement has no FROM clause"))?;

        let name = next_significant(tokens, from + 1)
            .filter(|&i| tokens[i].kind == TokenKind::Word && tokens[i].text == table.as_str())
            .ok_or_else(|| {
                Error::invalid_statement(format!("statement must select from `{table}`"))
            })?;

        let list: Vec<usize> = (start..from).filter(|&i| !tokens[i].is_trivia()).collect();

        let select = if let [star] = list[..] {
            if tokens[star].is_punct('*') {
                self.plan.select_items()
            } else {
                self.rewritten(start..from)
            }
        } else {
            self.rewritten(start..from)
        };

        // Skip a caller-provided table alias; the root alias replaces it.
        let mut tail_start = name + 1;
        if let Some(i) = next_significant(tokens, tail_start) {
            let token = &tokens[i];
            if token.is_keyword("AS") {
                tail_start = next_significant(tokens, i + 1).map_or(tokens.len(), |i| i + 1);
            } else if token.kind == TokenKind::Word && !is_keyword(token.text) {
                tail_start = i + 1;
            }
        }

        Ok((select.trim().to_string(), tail_start))
    }

    fn rewritten(&self, range: Range<usize>) -> String {
        let mut dst = String::new();
        self.rewrite(range, &mut dst);
        dst
    }

    /// Writes the tokens in `range` with column references qualified.
    /// Returns true if any reference resolved to a joined table.
    fn rewrite(&self, range: Range<usize>, dst: &mut String) -> bool {
        let mut references_joins = false;

        for i in range {
            let token = &self.tokens[i];

            match self.qualify(i) {
                Some((alias, column)) => {
                    references_joins |= alias != ROOT_ALIAS;
                    dst.push_str(alias);
                    dst.push('.');
                    dst.push_str(column);
                }
                None => dst.push_str(token.text),
            }
        }

        references_joins
    }

    /// Resolves the word at `i` to `(alias, column)` if it is a column
    /// reference.
    fn qualify(&self, i: usize) -> Option<(&str, &str)> {
        let token = &self.tokens[i];

        if token.kind != TokenKind::Word || is_keyword(token.text) {
            return None;
        }

        // Function names and result aliases
        if next_significant(self.tokens, i + 1).is_some_and(|n| self.tokens[n].is_punct('(')) {
            return None;
        }

        if previous_significant(self.tokens, i).is_some_and(|p| self.tokens[p].is_keyword("AS")) {
            return None;
        }

        let root = self.plan.root();

        match token.text.rsplit_once('.') {
            None if root.mapping.has_column(token.text) => Some((ROOT_ALIAS, token.text)),
            None => None,
            Some((prefix, column)) => {
                if let Some(alias) = self.plan.alias_for_path(prefix) {
                    Some((alias, column))
                } else if prefix == root.mapping.table {
                    Some((ROOT_ALIAS, column))
                } else {
                    None
                }
            }
        }
    }
}

fn trim_end(sql: &mut String) {
    let len = sql.trim_end().len();
    sql.truncate(len);
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(word))
}

/// Splits `tokens[start..]` at its top-level clause keywords. Each range
/// starts at the clause keyword and ends where the next clause begins.
fn split_clauses(tokens: &[Token<'_>], start: usize) -> Vec<(ClauseKind, Range<usize>)> {
    let mut starts = vec![];
    let mut depth = 0usize;

    for i in start..tokens.len() {
        let token = &tokens[i];

        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth = depth.saturating_sub(1);
        }

        if depth > 0 || token.kind != TokenKind::Word {
            continue;
        }

        let followed_by_by = || next_significant(tokens, i + 1).is_some_and(|n| tokens[n].is_keyword("BY"));

        let kind = if token.is_keyword("WHERE") {
            ClauseKind::Where
        } else if token.is_keyword("GROUP") && followed_by_by() {
            ClauseKind::GroupBy
        } else if token.is_keyword("HAVING") {
            ClauseKind::Having
        } else if token.is_keyword("ORDER") && followed_by_by() {
            ClauseKind::OrderBy
        } else if token.is_keyword("LIMIT") {
            ClauseKind::Limit
        } else if token.is_keyword("OFFSET") {
            ClauseKind::Offset
        } else {
            continue;
        };

        starts.push((kind, i));
    }

    let mut clauses = Vec::with_capacity(starts.len());
    for (n, (kind, begin)) in starts.iter().enumerate() {
        let end = starts.get(n + 1).map_or(tokens.len(), |(_, next)| *next);
        clauses.push((*kind, *begin..end));
    }

    clauses
}

/// Parenthesis depth before the token at `index`.
fn depth_at(tokens: &[Token<'_>], index: usize) -> usize {
    tokens[..index].iter().fold(0usize, |depth, token| {
        if token.is_punct('(') {
            depth + 1
        } else if token.is_punct(')') {
            depth.saturating_sub(1)
        } else {
            depth
        }
    })
}

fn next_significant(tokens: &[Token<'_>], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

fn previous_significant(tokens: &[Token<'_>], before: usize) -> Option<usize> {
    (0..before).rev().find(|&i| !tokens[i].is_trivia())
}

fn count_placeholders(tokens: &[Token<'_>]) -> usize {
    tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Placeholder)
        .count()
}
