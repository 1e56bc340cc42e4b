use std::ops::Range;

use super::cursor::Cursor;

/// An attribute with its value entity-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// A lexical HTML token with its byte span in the source.
///
/// Comments, doctypes and processing instructions are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw text, entities not yet decoded
    Text { raw: &'a str, span: Range<usize> },
    Start {
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
        span: Range<usize>,
    },
    End { name: String, span: Range<usize> },
}

impl Token<'_> {
    pub fn span(&self) -> Range<usize> {
        match self {
            Token::Text { span, .. } | Token::Start { span, .. } | Token::End { span, .. } => {
                span.clone()
            }
        }
    }
}

/// Look up an attribute by (lowercase) name
pub fn attr<'t>(attrs: &'t [Attr], name: &str) -> Option<&'t str> {
    attrs
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':'
}

fn is_attr_name_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'')
}

/// Tokenize `s`. Never fails: anything that does not form a tag is text.
pub fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut cur = Cursor::new(s);
    let mut out = Vec::new();
    let mut text_start = cur.pos();

    fn flush_text<'a>(out: &mut Vec<Token<'a>>, s: &'a str, start: usize, end: usize) {
        if end > start {
            out.push(Token::Text {
                raw: &s[start..end],
                span: start..end,
            });
        }
    }

    while !cur.eof() {
        if cur.peek() != Some(b'<') {
            cur.bump_while(|b| b != b'<');
            continue;
        }

        let tag_start = cur.pos();
        if cur.starts_with(b"<!--") {
            flush_text(&mut out, s, text_start, tag_start);
            cur.skip_past("-->");
            text_start = cur.pos();
        } else if cur.starts_with(b"<!") || cur.starts_with(b"<?") {
            flush_text(&mut out, s, text_start, tag_start);
            cur.skip_past(">");
            text_start = cur.pos();
        } else if cur.peek_at(1) == Some(b'/') && cur.peek_at(2).is_some_and(|b| b.is_ascii_alphabetic()) {
            flush_text(&mut out, s, text_start, tag_start);
            cur.bump_n(2);
            let name = cur.bump_while(is_tag_name_byte).to_ascii_lowercase();
            cur.skip_past(">");
            out.push(Token::End {
                name,
                span: tag_start..cur.pos(),
            });
            text_start = cur.pos();
        } else if cur.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic()) {
            flush_text(&mut out, s, text_start, tag_start);
            out.push(read_start_tag(&mut cur));
            text_start = cur.pos();
        } else {
            // A lone '<' is text
            cur.bump();
        }
    }

    flush_text(&mut out, s, text_start, cur.pos());
    out
}

fn read_start_tag<'a>(cur: &mut Cursor<'a>) -> Token<'a> {
    let start = cur.pos();
    cur.bump(); // <
    let name = cur.bump_while(is_tag_name_byte).to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => break,
            Some(b'>') => {
                cur.bump();
                break;
            }
            Some(b'/') => {
                cur.bump();
                if cur.peek() == Some(b'>') {
                    cur.bump();
                    self_closing = true;
                    break;
                }
            }
            Some(_) => {
                let attr_name = cur.bump_while(is_attr_name_byte).to_ascii_lowercase();
                if attr_name.is_empty() {
                    // stray quote or similar
                    cur.bump();
                    continue;
                }
                cur.skip_whitespace();
                let value = if cur.peek() == Some(b'=') {
                    cur.bump();
                    cur.skip_whitespace();
                    read_attr_value(cur)
                } else {
                    String::new()
                };
                attrs.push(Attr {
                    name: attr_name,
                    value,
                });
            }
        }
    }

    Token::Start {
        name,
        attrs,
        self_closing,
        span: start..cur.pos(),
    }
}

fn read_attr_value(cur: &mut Cursor<'_>) -> String {
    let raw = match cur.peek() {
        Some(quote @ (b'"' | b'\'')) => {
            cur.bump();
            let value = cur.bump_while(|b| b != quote);
            cur.bump(); // closing quote, if any
            value
        }
        _ => cur.bump_while(|b| !b.is_ascii_whitespace() && b != b'>'),
    };
    html_escape::decode_html_entities(raw).into_owned()
}
