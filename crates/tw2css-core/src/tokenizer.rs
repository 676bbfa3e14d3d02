//! Byte-level lexing helpers shared by the parser.
//!
//! All positions are byte offsets into the full source. Scanners only ever
//! stop on ASCII bytes, so every returned offset is a valid `str` boundary.

pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

pub fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// End of the identifier starting at `pos` (`pos` itself if there is none).
pub fn scan_identifier(bytes: &[u8], pos: usize) -> usize {
    if pos >= bytes.len() || !is_ident_start(bytes[pos]) {
        return pos;
    }
    let mut i = pos + 1;
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    i
}

/// End of a JSX tag or attribute name (`Foo.Bar`, `data-tw`, `xlink:href`).
pub fn scan_jsx_name(bytes: &[u8], pos: usize) -> usize {
    if pos >= bytes.len() || !is_ident_start(bytes[pos]) {
        return pos;
    }
    let mut i = pos + 1;
    while i < bytes.len() && (is_ident_char(bytes[i]) || matches!(bytes[i], b'-' | b'.' | b':')) {
        i += 1;
    }
    i
}

pub fn skip_whitespace(bytes: &[u8], mut pos: usize, end: usize) -> usize {
    while pos < end && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Index just past the closing quote of the string literal opening at `pos`.
pub fn skip_string(bytes: &[u8], pos: usize) -> Option<usize> {
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' => return None,
            b if b == quote => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past the `*/` of the block comment opening at `pos`.
pub fn skip_block_comment(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut i = pos + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

/// Index of the newline ending the line comment at `pos` (or end of input).
pub fn skip_line_comment(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

/// Raw chunks and `${}` expression ranges of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParts {
    pub quasis: Vec<String>,
    /// Byte ranges of the interpolated expressions, braces excluded.
    pub expressions: Vec<(usize, usize)>,
    /// Index just past the closing backtick.
    pub end: usize,
}

/// Splits the template literal whose backtick sits at `pos`.
pub fn template_parts(src: &str, pos: usize) -> Option<TemplateParts> {
    let bytes = src.as_bytes();
    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    let mut chunk_start = pos + 1;
    let mut i = pos + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'`' => {
                quasis.push(src[chunk_start..i].to_string());
                return Some(TemplateParts {
                    quasis,
                    expressions,
                    end: i + 1,
                });
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                quasis.push(src[chunk_start..i].to_string());
                let close = find_matching(src, i + 1)?;
                expressions.push((i + 2, close));
                i = close;
                chunk_start = close + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past the template literal whose backtick sits at `pos`.
pub fn skip_template(src: &str, pos: usize) -> Option<usize> {
    template_parts(src, pos).map(|parts| parts.end)
}

/// Index of the bracket closing the one at `pos` (`(`, `[` or `{`), skipping
/// over strings, templates and comments.
pub fn find_matching(src: &str, pos: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut stack = vec![closer(bytes[pos])?];
    let mut i = pos + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'`' => {
                i = skip_template(src, i)?;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line_comment(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => {
                if let Some(close) = closer(bytes[i]) {
                    stack.push(close);
                }
            }
            b')' | b']' | b'}' => {
                if stack.pop() != Some(bytes[i]) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn closer(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Splits `lo..hi` on commas that are not nested in brackets, strings,
/// templates or comments. A trailing empty segment is dropped.
pub fn split_top_level(src: &str, lo: usize, hi: usize) -> Option<Vec<(usize, usize)>> {
    let bytes = src.as_bytes();
    let mut segments = Vec::new();
    let mut start = lo;
    let mut i = lo;

    while i < hi {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'`' => {
                i = skip_template(src, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => {
                i = find_matching(src, i)? + 1;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i)?;
                continue;
            }
            b',' => {
                segments.push((start, i));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if !src[start..hi].trim().is_empty() {
        segments.push((start, hi));
    }
    Some(segments)
}

const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "void", "await", "yield", "case", "in", "of", "new", "delete", "throw",
    "default", "do", "else",
];

/// Whether a `<` at `pos` may open JSX, judged from the code before it.
/// `a < b` and `Array<string>` are comparisons or type arguments, while
/// `(<div`, `= <div`, `&& <div` or `return <div` start markup.
pub fn jsx_may_start(src: &str, pos: usize) -> bool {
    let before = src[..pos].trim_end();
    let Some(&last) = before.as_bytes().last() else {
        return true;
    };
    if matches!(
        last,
        b'(' | b'=' | b',' | b'?' | b':' | b'&' | b'|' | b'[' | b'{' | b'}' | b';' | b'>' | b'!'
    ) {
        return true;
    }
    if is_ident_char(last) {
        return ends_with_keyword(before);
    }
    false
}

/// Whether `code` ends with an expression keyword (`return`, `typeof`, …).
pub fn ends_with_keyword(code: &str) -> bool {
    let bytes = code.as_bytes();
    let mut start = bytes.len();
    while start > 0 && is_ident_char(bytes[start - 1]) {
        start -= 1;
    }
    EXPRESSION_KEYWORDS.contains(&&code[start..])
}

/// Whether everything between the previous newline and `pos` is whitespace.
pub fn at_line_start(src: &str, pos: usize) -> bool {
    src[..pos].rsplit('\n').next().unwrap_or("").trim().is_empty()
}

/// Whether `code` uses `name` as a standalone identifier. String literals,
/// comments, template text and property names after a `.` don't count.
pub fn mentions_identifier(code: &str, name: &str) -> bool {
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_string(bytes, i).unwrap_or(i + 1),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i).unwrap_or(bytes.len());
            }
            b'`' => match template_parts(code, i) {
                Some(parts) => {
                    if parts
                        .expressions
                        .iter()
                        .any(|&(lo, hi)| mentions_identifier(&code[lo..hi], name))
                    {
                        return true;
                    }
                    i = parts.end;
                }
                None => i += 1,
            },
            b if is_ident_start(b) => {
                let end = scan_identifier(bytes, i);
                let before = code[..i].trim_end();
                let is_property = before.ends_with('.') && !before.ends_with("...");
                if !is_property && &code[i..end] == name {
                    return true;
                }
                i = end;
            }
            b if is_ident_char(b) => {
                // Rest of a number literal such as `1e5`.
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    false
}

/// Cooks the escapes of a JS string or template chunk.
pub fn unescape_js(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            // Line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// 1-based line and column (in chars) of a byte offset.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test]
    fn test_skip_string_handles_escapes() {
        let src = r#""a\"b" rest"#;
        assert_eq!(skip_string(src.as_bytes(), 0), Some(6));
    }

    #[test_log::test]
    fn test_unterminated_string() {
        assert_eq!(skip_string(b"'abc", 0), None);
    }

    #[test_log::test]
    fn test_find_matching_skips_strings_and_templates() {
        let src = r#"{ a: "}", b: `${ "}" }`, c: { d: 1 } } tail"#;
        let close = find_matching(src, 0).unwrap();
        assert_eq!(&src[close + 1..], " tail");
    }

    #[test_log::test]
    fn test_find_matching_rejects_mismatched() {
        assert_eq!(find_matching("( ]", 0), None);
    }

    #[test_log::test]
    fn test_template_parts() {
        let src = "`mt-2 ${size} text-${\"red\"}-500` after";
        let parts = template_parts(src, 0).unwrap();
        assert_eq!(parts.quasis, vec!["mt-2 ", " text-", "-500"]);
        assert_eq!(parts.expressions.len(), 2);
        let (lo, hi) = parts.expressions[0];
        assert_eq!(&src[lo..hi], "size");
        assert_eq!(&src[parts.end..], " after");
    }

    #[test_log::test]
    fn test_split_top_level() {
        let src = "a, f(b, c), [d, e], 'x,y',";
        let segments: Vec<&str> = split_top_level(src, 0, src.len())
            .unwrap()
            .into_iter()
            .map(|(lo, hi)| src[lo..hi].trim())
            .collect();
        assert_eq!(segments, vec!["a", "f(b, c)", "[d, e]", "'x,y'"]);
    }

    #[test_log::test]
    fn test_jsx_may_start() {
        assert!(jsx_may_start("return <div", 7));
        assert!(jsx_may_start("x = (<div", 5));
        assert!(jsx_may_start("<div", 0));
        assert!(!jsx_may_start("if (a <b", 6));
        assert!(!jsx_may_start("useState<string", 8));
    }

    #[test_log::test]
    fn test_at_line_start() {
        assert!(at_line_start("foo\n  import", 6));
        assert!(!at_line_start("x; import", 3));
    }

    #[test_log::test]
    fn test_mentions_identifier() {
        assert!(mentions_identifier("export const t = tw\n", "tw"));
        assert!(mentions_identifier("f(...tw)", "tw"));
        assert!(mentions_identifier("`a ${tw.div} b`", "tw"));
        assert!(!mentions_identifier("const twStyles = a.tw", "tw"));
        assert!(!mentions_identifier("// tw props\nx = 'tw' + \"tw\" /* tw */", "tw"));
        assert!(!mentions_identifier("`uses tw here`", "tw"));
        assert!(!mentions_identifier("const x = 1tw", "tw"));
    }

    #[test_log::test]
    fn test_unescape_js() {
        assert_eq!(unescape_js(r"a\nb\'c\\"), "a\nb'c\\");
    }

    #[test_log::test]
    fn test_line_col() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 6), (3, 1));
    }
}
