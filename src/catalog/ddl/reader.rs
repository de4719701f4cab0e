//! Streaming statement reader for SQL dump files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Read buffer used for dump files
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Open a dump file, transparently decompressing it
pub fn open_dump(path: &Path) -> io::Result<StatementReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let reader = Compression::from_path(path).wrap_reader(Box::new(file))?;
    Ok(StatementReader::new(reader))
}

/// Splits a SQL stream into statements.
///
/// Statements end at the current delimiter (`;` unless changed by a
/// `DELIMITER` line, as in MySQL dumps of triggers and routines) outside of
/// quotes. PostgreSQL dollar-quoted bodies (`$$ ... $$`, `$tag$ ... $tag$`)
/// count as quotes. `--` line comments outside quotes are dropped. The
/// returned statements exclude the delimiter.
pub struct StatementReader<R: Read> {
    reader: BufReader<R>,
    delimiter: String,
    pending: String,
    line: String,
    inside_single_quote: bool,
    inside_double_quote: bool,
    inside_backtick: bool,
    /// Opening tag of the dollar quote being read, including both `$`
    dollar_tag: Option<String>,
}

impl<R: Read> StatementReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, reader),
            delimiter: ";".to_string(),
            pending: String::new(),
            line: String::new(),
            inside_single_quote: false,
            inside_double_quote: false,
            inside_backtick: false,
            dollar_tag: None,
        }
    }

    /// Read the next non-empty statement
    pub fn read_statement(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(stmt) = self.take_complete() {
                if !stmt.trim().is_empty() {
                    return Ok(Some(stmt));
                }
                continue;
            }

            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                let rest = std::mem::take(&mut self.pending);
                if rest.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(rest));
            }

            if self.pending.trim().is_empty() && !self.inside_any_quote() {
                let trimmed = self.line.trim();
                if let Some(delimiter) = parse_delimiter_line(trimmed) {
                    self.delimiter = delimiter;
                    continue;
                }
            }

            let line = std::mem::take(&mut self.line);
            self.append_line(&line);
            self.line = line;
        }
    }

    fn inside_any_quote(&self) -> bool {
        self.inside_single_quote
            || self.inside_double_quote
            || self.inside_backtick
            || self.dollar_tag.is_some()
    }

    /// Append a line, stripping comments and marking delimiters with NUL
    fn append_line(&mut self, line: &str) {
        let mut chars = line.char_indices().peekable();
        let mut escaped = false;

        while let Some((i, ch)) = chars.next() {
            if let Some(tag) = &self.dollar_tag {
                if line[i..].starts_with(tag.as_str()) {
                    self.pending.push_str(tag);
                    for _ in 1..tag.len() {
                        chars.next();
                    }
                    self.dollar_tag = None;
                } else {
                    self.pending.push(ch);
                }
                continue;
            }

            if escaped {
                self.pending.push(ch);
                escaped = false;
                continue;
            }

            if ch == '\\' && (self.inside_single_quote || self.inside_double_quote) {
                self.pending.push(ch);
                escaped = true;
                continue;
            }

            match ch {
                '\'' if !self.inside_double_quote && !self.inside_backtick => {
                    self.inside_single_quote = !self.inside_single_quote;
                }
                '"' if !self.inside_single_quote && !self.inside_backtick => {
                    self.inside_double_quote = !self.inside_double_quote;
                }
                '`' if !self.inside_single_quote && !self.inside_double_quote => {
                    self.inside_backtick = !self.inside_backtick;
                }
                '$' if !self.inside_any_quote() => {
                    if let Some(tag) = dollar_quote_tag(&line[i..]) {
                        self.pending.push_str(tag);
                        for _ in 1..tag.len() {
                            chars.next();
                        }
                        self.dollar_tag = Some(tag.to_string());
                        continue;
                    }
                }
                '-' if !self.inside_any_quote() && line[i..].starts_with("--") => {
                    self.pending.push('\n');
                    return;
                }
                _ if !self.inside_any_quote() && line[i..].starts_with(self.delimiter.as_str()) => {
                    self.pending.push('\0');
                    for _ in 1..self.delimiter.chars().count() {
                        chars.next();
                    }
                    continue;
                }
                _ => {}
            }
            self.pending.push(ch);
        }
    }

    fn take_complete(&mut self) -> Option<String> {
        let end = self.pending.find('\0')?;
        let stmt = self.pending[..end].to_string();
        self.pending.drain(..=end);
        Some(stmt)
    }
}

/// Dollar-quote opening tag at the start of `text` (`$$` or `$name$`)
fn dollar_quote_tag(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('$')?;
    let end = rest.find('$')?;
    let name = &rest[..end];
    let valid = name
        .chars()
        .next()
        .map_or(true, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| &text[..end + 2])
}

/// Parse a `DELIMITER <token>` client directive
fn parse_delimiter_line(line: &str) -> Option<String> {
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("DELIMITER") {
        return None;
    }
    let delimiter = rest.trim();
    (!delimiter.is_empty()).then(|| delimiter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(sql: &str) -> Vec<String> {
        let mut reader = StatementReader::new(sql.as_bytes());
        let mut out = Vec::new();
        while let Some(stmt) = reader.read_statement().unwrap() {
            out.push(stmt.trim().to_string());
        }
        out
    }

    #[test]
    fn test_simple_statements() {
        let stmts = statements("CREATE TABLE a (id INT);\nCREATE TABLE b (id INT); INSERT INTO b VALUES (1);");
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], "CREATE TABLE a (id INT)");
        assert_eq!(stmts[2], "INSERT INTO b VALUES (1)");
    }

    #[test]
    fn test_semicolon_in_string() {
        let stmts = statements("CREATE TABLE a (id INT COMMENT 'x;y');\nSELECT 1;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("'x;y'"));
    }

    #[test]
    fn test_escaped_quote() {
        let stmts = statements("CREATE TABLE a (id INT COMMENT 'it\\'s;');\nSELECT 1;");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_line_comments_dropped() {
        let stmts = statements("-- header; comment\nCREATE TABLE a (id INT); -- trailing\n");
        assert_eq!(stmts, vec!["CREATE TABLE a (id INT)".to_string()]);
    }

    #[test]
    fn test_delimiter_switch() {
        let sql = "DELIMITER ;;\nCREATE TRIGGER trg BEFORE INSERT ON a FOR EACH ROW BEGIN SET NEW.x = 1; END;;\nDELIMITER ;\nSELECT 1;";
        let stmts = statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TRIGGER"));
        assert!(stmts[0].ends_with("END"));
        assert_eq!(stmts[1], "SELECT 1");
    }

    #[test]
    fn test_trailing_statement_without_terminator() {
        let stmts = statements("SELECT 1;\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1".to_string(), "SELECT 2".to_string()]);
    }

    #[test]
    fn test_dollar_quoted_function_body() {
        let sql = "CREATE FUNCTION f() RETURNS integer AS $$\nBEGIN\n  RETURN 1;\nEND;\n$$ LANGUAGE plpgsql;\nCREATE TABLE t_article (id INT);\n";
        let stmts = statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("RETURN 1;\nEND;\n$$ LANGUAGE plpgsql"));
        assert_eq!(stmts[1], "CREATE TABLE t_article (id INT)");
    }

    #[test]
    fn test_named_dollar_tag_nests_plain_tag() {
        let sql = "CREATE FUNCTION f() RETURNS text AS $body$ SELECT '$$;'; $body$ LANGUAGE sql;\nSELECT 1;";
        let stmts = statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("$body$ LANGUAGE sql"));
    }

    #[test]
    fn test_dollar_without_tag_is_plain_text() {
        // positional parameters are not dollar quotes
        let stmts = statements("PREPARE p AS SELECT $1, $2;\nSELECT 1;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(dollar_quote_tag("$1, $2"), None);
        assert_eq!(dollar_quote_tag("$_$x"), Some("$_$"));
        assert_eq!(dollar_quote_tag("$$"), Some("$$"));
    }

    #[test]
    fn test_compression_from_path() {
        assert_eq!(Compression::from_path(Path::new("a.sql.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.sql.zst")), Compression::Zstd);
        assert_eq!(Compression::from_path(Path::new("a.sql")), Compression::None);
    }
}
