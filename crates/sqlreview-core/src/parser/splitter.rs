//! Statement splitter - cuts a script at top-level semicolons

use crate::dialect::Family;

/// Lexical features that decide where a `;` is really a terminator
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Lexicon {
    pub backslash_escapes: bool,
    pub hash_comments: bool,
    pub dollar_quotes: bool,
    pub backticks: bool,
    pub brackets: bool,
}

impl Lexicon {
    pub fn for_family(family: Family) -> Self {
        match family {
            Family::MySql => Self {
                backslash_escapes: true,
                hash_comments: true,
                backticks: true,
                ..Self::default()
            },
            Family::Postgres => Self {
                dollar_quotes: true,
                ..Self::default()
            },
            Family::MsSql => Self {
                brackets: true,
                ..Self::default()
            },
            Family::Snowflake => Self {
                dollar_quotes: true,
                ..Self::default()
            },
            Family::Sqlite => Self {
                backticks: true,
                brackets: true,
                ..Self::default()
            },
            Family::Generic => Self::default(),
        }
    }
}

/// One statement's slice of the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    /// Byte offset right after the previous terminator
    pub start: usize,
    /// Byte offset of the first code character
    pub code_start: usize,
    /// Byte offset right after the last code character, before any
    /// trailing comment
    pub code_end: usize,
    /// Byte offset of the terminator (or end of script)
    pub end: usize,
}

/// Split SQL text into statement chunks by semicolons, respecting string
/// literals, quoted identifiers, dollar-quoted bodies and comments.
/// Chunks holding only whitespace and comments are dropped.
pub(crate) fn split_statements(sql: &str, lexicon: &Lexicon) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut start = 0;
    let mut code_start: Option<usize> = None;
    let mut code_end = 0;
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == b'-' && i + 1 < len && bytes[i + 1] == b'-' || b == b'#' && lexicon.hash_comments
        {
            // Skip line comment
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if b == b'/' && i + 1 < len && bytes[i + 1] == b'*' {
            // Skip block comment
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(len);
            continue;
        }
        if b == b';' {
            if let Some(code) = code_start.take() {
                chunks.push(Chunk {
                    start,
                    code_start: code,
                    code_end,
                    end: i,
                });
            }
            i += 1;
            start = i;
            continue;
        }

        if code_start.is_none() && !b.is_ascii_whitespace() {
            code_start = Some(i);
        }

        i = match b {
            b'\'' => skip_quoted(bytes, i, b'\'', lexicon.backslash_escapes),
            b'"' => skip_quoted(bytes, i, b'"', lexicon.backslash_escapes),
            b'`' if lexicon.backticks => skip_quoted(bytes, i, b'`', false),
            b'[' if lexicon.brackets => skip_quoted(bytes, i, b']', false),
            b'$' if lexicon.dollar_quotes => match find_dollar_tag_end(sql, i) {
                Some(tag_end) => {
                    let tag = &sql[i..=tag_end];
                    let body = tag_end + 1;
                    // Find the closing tag; unterminated bodies consume the rest
                    match sql[body..].find(tag) {
                        Some(close) => body + close + tag.len(),
                        None => len,
                    }
                }
                None => i + 1,
            },
            _ => i + 1,
        };
        if !b.is_ascii_whitespace() {
            code_end = i;
        }
    }

    // Handle last statement (without trailing semicolon)
    if let Some(code) = code_start {
        chunks.push(Chunk {
            start,
            code_start: code,
            code_end,
            end: len,
        });
    }

    chunks
}

/// Return the offset just past a quoted section opened at `open`.
/// A doubled closing quote is an escaped quote.
fn skip_quoted(bytes: &[u8], open: usize, close: u8, backslash_escapes: bool) -> usize {
    let len = bytes.len();
    let mut i = open + 1;
    while i < len {
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == close {
            if i + 1 < len && bytes[i + 1] == close {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    len
}

/// Find the end of a dollar-quote tag starting at position `start`.
/// Returns the index of the closing `$` if a valid tag is found.
fn find_dollar_tag_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    // Tag is $<identifier>$ or just $$
    let mut i = start + 1;
    if i < len && bytes[i] == b'$' {
        return Some(i);
    }
    // Positional parameters like $1 are not tags
    if i < len && bytes[i].is_ascii_digit() {
        return None;
    }
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < len && bytes[i] == b'$' && i > start + 1 {
        Some(i)
    } else {
        None
    }
}

/// Maps byte offsets to 1-based line numbers
pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(sql: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(next) => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(sql: &'a str, family: Family) -> Vec<&'a str> {
        split_statements(sql, &Lexicon::for_family(family))
            .iter()
            .map(|c| &sql[c.code_start..c.end])
            .collect()
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        let stmts = texts(sql, Family::MySql);
        assert_eq!(stmts, vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);
    }

    #[test]
    fn test_split_preserves_string_literals() {
        let sql = "SELECT 'hello; world'; SELECT 'it''s; fine'; SELECT 'a\\'; b'";
        let stmts = texts(sql, Family::MySql);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].contains("hello; world"));
        assert!(stmts[2].contains("a\\'; b"));
    }

    #[test]
    fn test_split_skips_comments() {
        let sql = "-- leading; comment\n# mysql; comment\nSELECT 1; /* trailing; */";
        let chunks = split_statements(sql, &Lexicon::for_family(Family::MySql));
        assert_eq!(chunks.len(), 1);
        assert_eq!(&sql[chunks[0].code_start..chunks[0].end], "SELECT 1");
    }

    #[test]
    fn test_code_end_excludes_trailing_comments() {
        let sql = "UPDATE t SET a = 1 LIMIT 5 -- trim\n  /* note */;\nSELECT 'x' # tail";
        let chunks = split_statements(sql, &Lexicon::for_family(Family::MySql));
        let code: Vec<&str> = chunks
            .iter()
            .map(|c| &sql[c.code_start..c.code_end])
            .collect();
        assert_eq!(code, vec!["UPDATE t SET a = 1 LIMIT 5", "SELECT 'x'"]);
    }

    #[test]
    fn test_split_backtick_identifiers() {
        let sql = "CREATE TABLE `a;b` (id INT); SELECT 1";
        assert_eq!(texts(sql, Family::MySql).len(), 2);
    }

    #[test]
    fn test_split_dollar_quoted_body() {
        let sql = r#"
            CREATE FUNCTION f() RETURNS TRIGGER AS $$
            BEGIN
                NEW.updated_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;
            SELECT $1;
        "#;
        let stmts = texts(sql, Family::Postgres);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "SELECT $1");
    }

    #[test]
    fn test_line_index() {
        let sql = "a\nbb\n\nc";
        let index = LineIndex::new(sql);
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(3), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }
}
