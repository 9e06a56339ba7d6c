//! Just enough Python lexing to read Django model and migration modules.
//!
//! Source is folded into logical lines: comments are dropped, bracketed
//! expressions and backslash continuations are joined onto one line, and
//! each line keeps the indentation of its first physical line.

/// A logical source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Indentation width (tabs count as four).
    pub indent: usize,
    /// Line text without indentation or comments.
    pub text: String,
    /// 1-based physical line the logical line starts on.
    pub line: usize,
}

/// A call expression split into callee and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Call {
    /// Dotted callee, e.g. `models.CharField`.
    pub callee: String,
    /// Positional arguments, raw.
    pub positional: Vec<String>,
    /// Keyword arguments, raw values.
    pub keywords: Vec<(String, String)>,
}

impl Call {
    /// Last segment of the callee.
    pub fn name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    /// Raw value of a keyword argument.
    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a keyword argument is literally `True`.
    pub fn flag(&self, name: &str) -> bool {
        self.keyword(name) == Some("True")
    }
}

/// Fold Python source into logical lines.
///
/// Returns the starting line of an unterminated string or bracket as the
/// error.
pub fn logical_lines(src: &str) -> Result<Vec<LogicalLine>, usize> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut indent = 0;
    let mut line_no = 1;
    let mut start_line = 1;
    let mut depth = 0usize;
    let mut depth_opened_at = 1;
    let mut at_line_start = true;
    let mut quote: Option<(char, bool, usize)> = None;
    let mut chars = src.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some((q, triple, _)) = quote {
            current.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        if next == '\n' {
                            line_no += 1;
                        }
                        current.push(next);
                    }
                }
                '\n' => line_no += 1,
                _ if c == q => {
                    if !triple {
                        quote = None;
                    } else {
                        let mut look = chars.clone();
                        if look.next() == Some(q) && look.next() == Some(q) {
                            chars.next();
                            chars.next();
                            current.push(q);
                            current.push(q);
                            quote = None;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        match c {
            '\r' => continue,
            ' ' | '\t' if at_line_start => {
                indent += if c == '\t' { 4 } else { 1 };
                continue;
            }
            '\n' => {
                line_no += 1;
                if depth > 0 {
                    current.push(' ');
                } else {
                    flush(&mut lines, &mut current, indent, start_line);
                    indent = 0;
                    at_line_start = true;
                }
                continue;
            }
            _ => {}
        }

        if at_line_start {
            at_line_start = false;
            start_line = line_no;
        }

        match c {
            '#' => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '"' | '\'' => {
                let mut look = chars.clone();
                let triple = look.next() == Some(c) && look.next() == Some(c);
                current.push(c);
                if triple {
                    chars.next();
                    chars.next();
                    current.push(c);
                    current.push(c);
                }
                quote = Some((c, triple, line_no));
            }
            '(' | '[' | '{' => {
                if depth == 0 {
                    depth_opened_at = line_no;
                }
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '\\' if chars.peek() == Some(&'\n') => {
                chars.next();
                line_no += 1;
                current.push(' ');
            }
            _ => current.push(c),
        }
    }

    if let Some((_, _, opened)) = quote {
        return Err(opened);
    }
    if depth > 0 {
        return Err(depth_opened_at);
    }

    flush(&mut lines, &mut current, indent, start_line);
    Ok(lines)
}

fn flush(lines: &mut Vec<LogicalLine>, current: &mut String, indent: usize, line: usize) {
    let text = current.trim();
    if !text.is_empty() {
        lines.push(LogicalLine {
            indent,
            text: text.to_string(),
            line,
        });
    }
    current.clear();
}

/// Byte offset of the start of a 1-based line.
pub fn line_offset(src: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    src.match_indices('\n')
        .nth(line - 2)
        .map(|(i, _)| i + 1)
        .unwrap_or(src.len())
}

/// Split `s` on `sep` where it is not nested in brackets or strings.
///
/// Parts are trimmed; empty parts (e.g. a trailing comma) are dropped.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Position of the first top-level `=` that is an assignment, not a
/// comparison.
pub fn find_assignment(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(i + 1).copied();
                if next != Some(b'=') && !matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip matching quotes from a string literal, including `r`/`b`/`u`
/// prefixes.
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let s = s.trim_start_matches(['r', 'b', 'u', 'R', 'B', 'U']);
    for q in ["\"\"\"", "'''", "\"", "'"] {
        if s.len() >= 2 * q.len() && s.starts_with(q) && s.ends_with(q) {
            return Some(&s[q.len()..s.len() - q.len()]);
        }
    }
    None
}

/// Parse `callee(arg, key=value, ...)`.
pub fn parse_call(expr: &str) -> Option<Call> {
    let expr = expr.trim();
    let open = expr.find('(')?;
    if !expr.ends_with(')') {
        return None;
    }

    let callee = expr[..open].trim();
    if callee.is_empty()
        || !callee
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return None;
    }

    let mut call = Call {
        callee: callee.to_string(),
        ..Default::default()
    };

    for arg in split_top_level(&expr[open + 1..expr.len() - 1], ',') {
        match find_assignment(arg) {
            Some(eq) if is_identifier(arg[..eq].trim()) => {
                call.keywords
                    .push((arg[..eq].trim().to_string(), arg[eq + 1..].trim().to_string()));
            }
            _ => call.positional.push(arg.to_string()),
        }
    }

    Some(call)
}

/// Whether `s` is a plain Python identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_logical_lines_join_brackets() {
        let src = "class A(models.Model):\n    name = models.CharField(\n        max_length=10,  # short\n    )\n";
        let lines = logical_lines(src).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[1].indent, 4);
        assert_eq!(lines[1].line, 2);
        assert!(lines[1].text.starts_with("name = models.CharField("));
        assert!(lines[1].text.contains("max_length=10"));
        assert!(!lines[1].text.contains("short"));
    }

    #[test]
    fn test_logical_lines_strings_and_comments() {
        let src = "# header\nx = \"a # not a comment\"\n\"\"\"doc\nstring\"\"\"\ny = 1 \\\n    + 2\n";
        let lines = logical_lines(src).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "x = \"a # not a comment\"");
        assert_eq!(lines[1].text, "\"\"\"doc\nstring\"\"\"");
        let joined: Vec<_> = lines[2].text.split_whitespace().collect();
        assert_eq!(joined, vec!["y", "=", "1", "+", "2"]);
        assert_eq!(lines[2].line, 5);
    }

    #[test]
    fn test_logical_lines_unterminated() {
        assert_eq!(logical_lines("a = 1\nb = foo(\n  1,\n"), Err(2));
        assert_eq!(logical_lines("s = '''never closed"), Err(1));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("User, on_delete=models.CASCADE, choices=[(1, 'a,b')],", ','),
            vec!["User", "on_delete=models.CASCADE", "choices=[(1, 'a,b')]"]
        );
    }

    #[test]
    fn test_parse_call() {
        let call = parse_call("models.ForeignKey('auth.User', null=True, related_name=\"x\")").unwrap();
        assert_eq!(call.name(), "ForeignKey");
        assert_eq!(call.positional, vec!["'auth.User'"]);
        assert!(call.flag("null"));
        assert_eq!(call.keyword("related_name"), Some("\"x\""));
        assert!(parse_call("not a call").is_none());
    }

    #[test]
    fn test_find_assignment() {
        assert_eq!(find_assignment("a = 1"), Some(2));
        assert_eq!(find_assignment("a == 1"), None);
        assert_eq!(find_assignment("f(a=1)"), None);
        assert_eq!(find_assignment("x >= 1"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'blog'"), Some("blog"));
        assert_eq!(unquote("r\"raw\""), Some("raw"));
        assert_eq!(unquote("blog"), None);
    }

    #[test]
    fn test_line_offset() {
        let src = "ab\ncd\nef";
        assert_eq!(line_offset(src, 1), 0);
        assert_eq!(line_offset(src, 2), 3);
        assert_eq!(line_offset(src, 3), 6);
    }
}
