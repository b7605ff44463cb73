//! Dialect parser - raw SQL text to engine-specific parse trees with lines

mod splitter;

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlparser::ast::Statement as AstStatement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;

use crate::dialect::Engine;
use crate::error::{AdvisorError, Result};

use splitter::{split_statements, Lexicon, LineIndex};

/// 1-based, inclusive line span of a statement in the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// Facts the adapter recovered while rewriting dialect syntax the grammar
/// crate does not accept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseHints {
    /// Row limit of `UPDATE ... LIMIT n`
    pub update_limit: Option<String>,
    /// Names dropped with `ALTER TABLE ... DROP INDEX|KEY`
    pub dropped_indexes: Vec<String>,
}

/// One statement as produced by a dialect parser
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// 0-based sequence number in source order
    pub index: usize,
    pub lines: LineRange,
    /// Script line that parse-tree line 1 corresponds to
    pub line_base: usize,
    /// Statement source without the terminator
    pub text: String,
    pub ast: AstStatement,
    pub hints: ParseHints,
}

impl ParsedStatement {
    /// Translate a parse-tree line (0 = unknown) to a script line
    pub fn script_line(&self, tree_line: u64) -> Option<usize> {
        if tree_line == 0 {
            return None;
        }
        Some(self.line_base + tree_line as usize - 1)
    }
}

/// Parser capability of one engine
pub trait DialectParser: Send + Sync {
    fn engine(&self) -> Engine;

    /// Parse a whole script into ordered statements.
    /// Fails on the first statement that does not parse.
    fn parse(&self, sql: &str) -> Result<Vec<ParsedStatement>>;

    /// Parse what parses, returning the errors of the statements skipped
    fn parse_lenient(&self, sql: &str) -> (Vec<ParsedStatement>, Vec<AdvisorError>);
}

/// Dialect parser backed by `sqlparser`
pub struct SqlParserAdapter {
    engine: Engine,
    dialect: Box<dyn Dialect + Send + Sync>,
    lexicon: Lexicon,
}

impl SqlParserAdapter {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            dialect: engine.parser_dialect(),
            lexicon: Lexicon::for_family(engine.family()),
        }
    }

    /// Rewrite constructs the MySQL grammar of `sqlparser` rejects
    fn rewrite<'s>(&self, code: &str, chunk: &'s str) -> (Cow<'s, str>, ParseHints) {
        let mut hints = ParseHints::default();
        if !self.engine.is_mysql_family() {
            return (Cow::Borrowed(chunk), hints);
        }

        if starts_with_keywords(code, &["UPDATE"]) {
            if let Some(caps) = UPDATE_LIMIT_RE.captures(chunk) {
                if let (Some(whole), Some(count)) = (caps.get(0), caps.get(1)) {
                    hints.update_limit = Some(count.as_str().to_string());
                    return (Cow::Owned(chunk[..whole.start()].to_string()), hints);
                }
            }
        }

        if starts_with_keywords(code, &["DROP", "INDEX"]) {
            if let Some(caps) = DROP_INDEX_ON_RE.captures(chunk) {
                hints
                    .dropped_indexes
                    .push(caps[2].trim_matches('`').to_string());
                let rewritten =
                    DROP_INDEX_ON_RE.replace(chunk, "ALTER TABLE ${3} DROP CONSTRAINT ${2}");
                return (Cow::Owned(rewritten.into_owned()), hints);
            }
        }

        if starts_with_keywords(code, &["ALTER", "TABLE"]) {
            let re = &*DROP_INDEX_RE;
            if re.is_match(chunk) {
                for caps in re.captures_iter(chunk) {
                    let is_foreign = caps[2].to_uppercase().starts_with("FOREIGN");
                    if !is_foreign {
                        hints
                            .dropped_indexes
                            .push(caps[4].trim_matches('`').to_string());
                    }
                }
                let rewritten = re.replace_all(chunk, "${1}CONSTRAINT${3}${4}");
                return (Cow::Owned(rewritten.into_owned()), hints);
            }
        }

        (Cow::Borrowed(chunk), hints)
    }
}

impl DialectParser for SqlParserAdapter {
    fn engine(&self) -> Engine {
        self.engine
    }

    fn parse(&self, sql: &str) -> Result<Vec<ParsedStatement>> {
        let mut statements = Vec::new();
        for piece in self.parse_pieces(sql) {
            statements.extend(piece?);
        }
        Ok(numbered(statements))
    }

    fn parse_lenient(&self, sql: &str) -> (Vec<ParsedStatement>, Vec<AdvisorError>) {
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        for piece in self.parse_pieces(sql) {
            match piece {
                Ok(parsed) => statements.extend(parsed),
                Err(error) => errors.push(error),
            }
        }
        (numbered(statements), errors)
    }
}

impl SqlParserAdapter {
    /// Parse every top-level chunk on its own
    fn parse_pieces(&self, sql: &str) -> Vec<Result<Vec<ParsedStatement>>> {
        let lines = LineIndex::new(sql);
        split_statements(sql, &self.lexicon)
            .into_iter()
            .map(|chunk| -> Result<Vec<ParsedStatement>> {
                let code = &sql[chunk.code_start..chunk.code_end];
                let range = LineRange {
                    start: lines.line_of(chunk.code_start),
                    end: lines.line_of(chunk.code_end.saturating_sub(1)),
                };
                let line_base = lines.line_of(chunk.start);
                // Leading comments stay so parse-tree lines map back to the script
                let (text, hints) = self.rewrite(code, &sql[chunk.start..chunk.code_end]);

                let asts = Parser::parse_sql(&*self.dialect, &text)
                    .map_err(|e| syntax_error(&e.to_string(), line_base, range.start))?;
                tracing::trace!(line = range.start, count = asts.len(), "parsed chunk");

                Ok(asts
                    .into_iter()
                    .map(|ast| ParsedStatement {
                        index: 0,
                        lines: range,
                        line_base,
                        text: code.to_string(),
                        ast,
                        hints: hints.clone(),
                    })
                    .collect())
            })
            .collect()
    }
}

fn numbered(mut statements: Vec<ParsedStatement>) -> Vec<ParsedStatement> {
    for (index, statement) in statements.iter_mut().enumerate() {
        statement.index = index;
    }
    statements
}

/// Parse a script with the dialect parser of `engine`
pub fn parse(sql: &str, engine: Engine) -> Result<Vec<ParsedStatement>> {
    SqlParserAdapter::new(engine).parse(sql)
}

fn syntax_error(message: &str, line_base: usize, fallback_line: usize) -> AdvisorError {
    let message = message.strip_prefix("sql parser error: ").unwrap_or(message);
    let line = LINE_LOCATION_RE
        .captures(message)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|line| *line > 0)
        .map(|line| line_base + line - 1)
        .unwrap_or(fallback_line);
    AdvisorError::syntax(line, message)
}

fn starts_with_keywords(code: &str, keywords: &[&str]) -> bool {
    let mut words = code.split_whitespace();
    keywords
        .iter()
        .all(|kw| words.next().is_some_and(|w| w.eq_ignore_ascii_case(kw)))
}

static UPDATE_LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\s+LIMIT\s+(\d+)\s*$").expect("valid LIMIT pattern"));

static DROP_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DROP\s+)(INDEX|KEY|FOREIGN\s+KEY)(\s+)(`[^`]+`|[A-Za-z0-9_$]+)")
        .expect("valid DROP INDEX pattern")
});

static DROP_INDEX_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DROP\s+INDEX)\s+(`[^`]+`|[A-Za-z0-9_$]+)\s+ON\s+(`[^`]+`|[A-Za-z0-9_$.]+)")
        .expect("valid DROP INDEX ON pattern")
});

static LINE_LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Line: (\d+)").expect("valid location pattern"));

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::AlterTableOperation;

    #[test]
    fn test_parse_multiple_statements_with_lines() {
        let sql = "CREATE TABLE a (id INT);\n\n-- second\nCREATE TABLE b (\n  id INT\n);";
        let stmts = parse(sql, Engine::MySQL).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].index, 0);
        assert_eq!(stmts[0].lines, LineRange { start: 1, end: 1 });
        assert_eq!(stmts[1].index, 1);
        assert_eq!(stmts[1].lines, LineRange { start: 4, end: 6 });
        assert_eq!(stmts[1].text, "CREATE TABLE b (\n  id INT\n)");
    }

    #[test]
    fn test_parse_empty_script() {
        assert!(parse("  -- nothing\n /* here */ ;", Engine::PostgreSQL)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_syntax_error_reports_script_line() {
        let sql = "SELECT 1;\nSELECT 2;\nCREATE TABLE (;";
        let err = parse(sql, Engine::MySQL).unwrap_err();
        match err {
            AdvisorError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_update_limit_is_recorded() {
        let stmts = parse("UPDATE t SET a = 1 WHERE id > 3 LIMIT 10", Engine::MySQL).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].hints.update_limit.as_deref(), Some("10"));
        assert!(matches!(stmts[0].ast, AstStatement::Update { .. }));
    }

    #[test]
    fn test_update_limit_before_trailing_comment() {
        let sql = "UPDATE t SET a = 1 WHERE b = 2 LIMIT 5 -- trim\n;\nUPDATE t SET a = 2 LIMIT 1 /* done */";
        let stmts = parse(sql, Engine::MySQL).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].hints.update_limit.as_deref(), Some("5"));
        assert_eq!(stmts[0].text, "UPDATE t SET a = 1 WHERE b = 2 LIMIT 5");
        assert_eq!(stmts[0].lines, LineRange { start: 1, end: 1 });
        assert_eq!(stmts[1].hints.update_limit.as_deref(), Some("1"));
    }

    #[test]
    fn test_alter_drop_index_is_rewritten() {
        let stmts = parse("ALTER TABLE t DROP INDEX idx_t_a", Engine::MySQL).unwrap();
        assert_eq!(stmts[0].hints.dropped_indexes, vec!["idx_t_a".to_string()]);
        match &stmts[0].ast {
            AstStatement::AlterTable { operations, .. } => {
                assert!(matches!(
                    operations[0],
                    AlterTableOperation::DropConstraint { .. }
                ));
            }
            other => panic!("unexpected statement: {other}"),
        }
    }

    #[test]
    fn test_mysql_drop_index_on_table() {
        let stmts = parse("DROP INDEX idx_t_a ON t", Engine::MySQL).unwrap();
        assert_eq!(stmts[0].hints.dropped_indexes, vec!["idx_t_a".to_string()]);
        assert!(matches!(stmts[0].ast, AstStatement::AlterTable { .. }));
    }

    #[test]
    fn test_parse_lenient_skips_bad_statements() {
        let adapter = SqlParserAdapter::new(Engine::PostgreSQL);
        let (stmts, errors) = adapter.parse_lenient("SELECT 1;\nSELEC 2;\nSELECT 3");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1].index, 1);
        assert_eq!(stmts[1].lines.start, 3);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], AdvisorError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_script_line_translation() {
        let stmts = parse("SELECT 1;\n\nSELECT 2", Engine::PostgreSQL).unwrap();
        // second chunk starts right after the first terminator, on line 1
        assert_eq!(stmts[1].line_base, 1);
        assert_eq!(stmts[1].script_line(3), Some(3));
        assert_eq!(stmts[1].script_line(0), None);
    }
}
