//! Document splitting
//!
//! A source document is a sequence of SQL statements separated by semicolons,
//! each optionally preceded by a `-- @name: tag` directive. The splitter is
//! not a SQL parser: it only understands enough lexical structure (strings,
//! comments, dollar quoting) to find statement boundaries, and leaves the
//! rest to sqlparser. Comments are stripped, so two statements that differ
//! only in comments share one canonical text.

use sqlbind_common::{Error, StatementId};

/// One extracted statement, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatement {
    pub id: StatementId,
    /// Explicit name from a `-- @name:` directive
    pub tag: Option<String>,
    /// 1-based position among the document's untagged statements; `None`
    /// for tagged statements. This is the basis of default naming and must
    /// be stable across reruns of unchanged input.
    pub ordinal: Option<u32>,
    /// Canonical statement text (comments stripped, trimmed)
    pub text: String,
    /// 1-based line where the statement starts
    pub line: usize,
}

/// The result of splitting one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub statements: Vec<QueryStatement>,
    /// Statement-scoped naming errors (duplicate tags). These never abort
    /// extraction of the remaining statements.
    pub errors: Vec<(StatementId, Error)>,
}

/// Parse a `@name` directive out of a line comment body.
fn name_directive(comment: &str) -> Option<String> {
    let rest = comment.trim_start().strip_prefix("@name")?;
    let rest = rest.trim_start().trim_start_matches(':').trim();
    let tag: String = rest.split_whitespace().next()?.to_string();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Split a document into ordered statements.
pub fn extract_document(document: &str, text: &str) -> ExtractedDocument {
    let chars: Vec<char> = text.chars().collect();
    let mut statements: Vec<QueryStatement> = Vec::new();

    let mut buf = String::new();
    let mut pending_tag: Option<String> = None;
    let mut line = 1usize;
    let mut stmt_line: Option<usize> = None;
    let mut i = 0usize;

    let mut finalize = |buf: &mut String,
                        pending_tag: &mut Option<String>,
                        stmt_line: &mut Option<usize>,
                        statements: &mut Vec<QueryStatement>| {
        let text = buf.trim();
        if !text.is_empty() {
            statements.push(QueryStatement {
                id: StatementId::new(document, statements.len()),
                tag: pending_tag.take(),
                ordinal: None,
                text: text.to_string(),
                line: stmt_line.unwrap_or(1),
            });
        }
        buf.clear();
        *stmt_line = None;
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            // Line comment: consumed, never part of the statement text.
            '-' if next == Some('-') => {
                i += 2;
                let mut comment = String::new();
                while i < chars.len() && chars[i] != '\n' {
                    comment.push(chars[i]);
                    i += 1;
                }
                if let Some(tag) = name_directive(&comment) {
                    pending_tag = Some(tag);
                }
                continue;
            }
            // Block comment, nesting allowed.
            '/' if next == Some('*') => {
                i += 2;
                let mut depth = 1usize;
                while i < chars.len() && depth > 0 {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                        depth += 1;
                        i += 2;
                    } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        depth -= 1;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                continue;
            }
            // Quoted strings and identifiers pass through verbatim.
            '\'' | '"' => {
                let quote = c;
                if stmt_line.is_none() {
                    stmt_line = Some(line);
                }
                buf.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    if sc == '\n' {
                        line += 1;
                    }
                    buf.push(sc);
                    i += 1;
                    if sc == quote {
                        // Doubled quote is an escape, not a terminator.
                        if chars.get(i) == Some(&quote) {
                            buf.push(quote);
                            i += 1;
                        } else {
                            break;
                        }
                    }
                }
                continue;
            }
            // Dollar-quoted string: $tag$ ... $tag$
            '$' => {
                if let Some(close) = dollar_tag(&chars, i) {
                    if stmt_line.is_none() {
                        stmt_line = Some(line);
                    }
                    let tag_len = close;
                    let tag: String = chars[i..i + tag_len].iter().collect();
                    buf.push_str(&tag);
                    i += tag_len;
                    // Copy until the matching closing tag.
                    while i < chars.len() {
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        if chars[i] == '$' && matches_tag(&chars, i, &tag) {
                            buf.push_str(&tag);
                            i += tag_len;
                            break;
                        }
                        buf.push(chars[i]);
                        i += 1;
                    }
                    continue;
                }
                // Plain positional marker like $1
                if stmt_line.is_none() {
                    stmt_line = Some(line);
                }
                buf.push(c);
                i += 1;
                continue;
            }
            ';' => {
                finalize(&mut buf, &mut pending_tag, &mut stmt_line, &mut statements);
                i += 1;
                continue;
            }
            '\n' => {
                line += 1;
                buf.push(c);
                i += 1;
                continue;
            }
            _ => {
                if stmt_line.is_none() && !c.is_whitespace() {
                    stmt_line = Some(line);
                }
                buf.push(c);
                i += 1;
                continue;
            }
        }
    }
    finalize(&mut buf, &mut pending_tag, &mut stmt_line, &mut statements);

    // Assign 1-based ordinals to untagged statements in document order.
    let mut next_ordinal = 0u32;
    for statement in &mut statements {
        if statement.tag.is_none() {
            next_ordinal += 1;
            statement.ordinal = Some(next_ordinal);
        }
    }

    // Duplicate explicit tags are statement-scoped naming errors.
    let mut errors = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for statement in &statements {
        if let Some(tag) = &statement.tag {
            if seen.contains(&tag.as_str()) {
                errors.push((statement.id.clone(), Error::DuplicateName(tag.clone())));
            } else {
                seen.push(tag);
            }
        }
    }

    ExtractedDocument { statements, errors }
}

/// If position `i` starts a dollar-quote tag (`$$` or `$tag$`), returns the
/// tag length in chars.
fn dollar_tag(chars: &[char], i: usize) -> Option<usize> {
    debug_assert_eq!(chars[i], '$');
    let mut j = i + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == '$' {
            return Some(j - i + 1);
        }
        if !(c.is_alphanumeric() || c == '_') {
            return None;
        }
        j += 1;
    }
    None
}

fn matches_tag(chars: &[char], i: usize, tag: &str) -> bool {
    let tag_chars: Vec<char> = tag.chars().collect();
    chars.len() >= i + tag_chars.len() && chars[i..i + tag_chars.len()] == tag_chars[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_in_document_order() {
        let doc = extract_document("q.sql", "SELECT 1; SELECT 2;\nSELECT 3;");
        assert_eq!(doc.statements.len(), 3);
        assert_eq!(doc.statements[0].text, "SELECT 1");
        assert_eq!(doc.statements[2].text, "SELECT 3");
        assert_eq!(doc.statements[2].line, 2);
        assert_eq!(
            doc.statements.iter().map(|s| s.ordinal).collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn test_semicolon_inside_string_does_not_split() {
        let doc = extract_document("q.sql", "SELECT 'a;b' AS x; SELECT 2;");
        assert_eq!(doc.statements.len(), 2);
        assert_eq!(doc.statements[0].text, "SELECT 'a;b' AS x");
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let doc = extract_document("q.sql", "SELECT 'it''s; fine'; SELECT 2;");
        assert_eq!(doc.statements.len(), 2);
        assert_eq!(doc.statements[0].text, "SELECT 'it''s; fine'");
    }

    #[test]
    fn test_comments_are_stripped() {
        let doc = extract_document(
            "q.sql",
            "SELECT 1 -- trailing; not a boundary\n + 2; /* block ; */ SELECT 3;",
        );
        assert_eq!(doc.statements.len(), 2);
        assert_eq!(doc.statements[0].text, "SELECT 1 \n + 2");
        assert_eq!(doc.statements[1].text, "SELECT 3");
    }

    #[test]
    fn test_dollar_quoted_body() {
        let doc = extract_document("q.sql", "SELECT $tag$; not a boundary $tag$; SELECT 2;");
        assert_eq!(doc.statements.len(), 2);
        assert!(doc.statements[0].text.contains("not a boundary"));
    }

    #[test]
    fn test_name_directive() {
        let doc = extract_document(
            "q.sql",
            "-- @name: fetchItems\nSELECT 1;\nSELECT 2;\n-- @name updateItem\nSELECT 3;",
        );
        assert_eq!(doc.statements[0].tag.as_deref(), Some("fetchItems"));
        assert_eq!(doc.statements[0].ordinal, None);
        assert_eq!(doc.statements[1].tag, None);
        assert_eq!(doc.statements[1].ordinal, Some(1));
        assert_eq!(doc.statements[2].tag.as_deref(), Some("updateItem"));
    }

    #[test]
    fn test_duplicate_tags_reported_not_fatal() {
        let doc = extract_document(
            "q.sql",
            "-- @name: fetch\nSELECT 1;\n-- @name: fetch\nSELECT 2;\nSELECT 3;",
        );
        assert_eq!(doc.statements.len(), 3);
        assert_eq!(doc.errors.len(), 1);
        let (id, err) = &doc.errors[0];
        assert_eq!(id.index, 1);
        assert_eq!(*err, Error::DuplicateName("fetch".into()));
        // the untagged sibling still gets its ordinal
        assert_eq!(doc.statements[2].ordinal, Some(1));
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        let doc = extract_document("q.sql", "SELECT 1;\nSELECT 2");
        assert_eq!(doc.statements.len(), 2);
        assert_eq!(doc.statements[1].text, "SELECT 2");
    }

    #[test]
    fn test_empty_segments_ignored() {
        let doc = extract_document("q.sql", ";;  ;\nSELECT 1;");
        assert_eq!(doc.statements.len(), 1);
    }
}
