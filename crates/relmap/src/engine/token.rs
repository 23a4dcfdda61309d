use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword, possibly dotted (`children.name`)
    Word,

    /// `"quoted"` or `` `quoted` `` identifier
    Quoted,

    /// `'string'` literal
    String,

    Number,

    /// `?` or `?NNN`
    Placeholder,

    Whitespace,

    Comment,

    /// Any other single character
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
}

impl Token<'_> {
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub(crate) fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.starts_with(c)
    }

    pub(crate) fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Splits SQL into tokens. Concatenating the token texts yields the input.
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = vec![];
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        let (kind, len) = match c {
            c if c.is_whitespace() => (TokenKind::Whitespace, scan_while(rest, char::is_whitespace)),
            '-' if rest.starts_with("--") => (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len())),
            '/' if rest.starts_with("/*") => match rest[2..].find("*/") {
                Some(end) => (TokenKind::Comment, end + 4),
                None => return Err(unterminated("comment", sql)),
            },
            '\'' => match scan_quoted(rest, '\'') {
                Some(len) => (TokenKind::String, len),
                None => return Err(unterminated("string literal", sql)),
            },
            '"' | '`' => match scan_quoted(rest, c) {
                Some(len) => (TokenKind::Quoted, len),
                None => return Err(unterminated("quoted identifier", sql)),
            },
            '?' => (TokenKind::Placeholder, 1 + scan_while(&rest[1..], |c| c.is_ascii_digit())),
            c if c.is_ascii_digit() => (TokenKind::Number, scan_number(rest)),
            c if is_word_start(c) => (TokenKind::Word, scan_word(rest)),
            c => (TokenKind::Punct, c.len_utf8()),
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
        });
        rest = &rest[len..];
    }

    Ok(tokens)
}

fn unterminated(what: &str, sql: &str) -> Error {
    Error::invalid_statement(format!("unterminated {what}; sql={sql}"))
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn scan_while(s: &str, f: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !f(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Length of a quoted token starting at `s`, where a doubled quote is an
/// escaped quote.
fn scan_quoted(s: &str, quote: char) -> Option<usize> {
    let mut chars = s.char_indices().skip(1).peekable();

    while let Some((i, c)) = chars.next() {
        if c != quote {
            continue;
        }

        match chars.peek() {
            Some((_, next)) if *next == quote => {
                chars.next();
            }
            _ => return Some(i + c.len_utf8()),
        }
    }

    None
}

fn scan_number(s: &str) -> usize {
    let mut len = scan_while(s, |c| c.is_ascii_digit() || c == '.');

    // Exponent
    let rest = &s[len..];
    if rest.starts_with(['e', 'E']) {
        let sign = usize::from(rest[1..].starts_with(['+', '-']));
        let digits = scan_while(&rest[1 + sign..], |c| c.is_ascii_digit());
        if digits > 0 {
            len += 1 + sign + digits;
        }
    }

    len
}

/// An identifier, followed by any number of `.identifier` segments.
fn scan_word(s: &str) -> usize {
    let mut len = scan_while(s, is_word_char);

    loop {
        let rest = &s[len..];
        let mut chars = rest.chars();

        match (chars.next(), chars.next()) {
            (Some('.'), Some(c)) if is_word_start(c) => {
                len += 1 + scan_while(&rest[1..], is_word_char);
            }
            _ => return len,
        }
    }
}
