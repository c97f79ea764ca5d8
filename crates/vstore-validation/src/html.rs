//! A small HTML reader for formatted text.
//!
//! Formatted text accepts a tiny subset of HTML: `br`, `strong`, `b`, `em`,
//! `i`, `ul`, `ol` and `li`, without attributes. The reader tokenizes the
//! markup, checks the structure and extracts the visible text so the plain
//! text rules can be applied to it.

use crate::error::ElementValidationError;

const SUPPORTED_TAGS: &[&str] = &["br", "strong", "b", "em", "i", "ul", "ol", "li"];
const VOID_TAGS: &[&str] = &["br"];
const LIST_TAGS: &[&str] = &["ul", "ol"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Open {
        name: String,
        has_attributes: bool,
        self_closing: bool,
    },
    Close {
        name: String,
    },
}

/// Split `html` into tokens. Text tokens are entity-decoded.
pub fn tokenize(html: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(start) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..start])));
        }
        let (token, consumed) = read_tag(&rest[start..])?;
        tokens.push(token);
        rest = &rest[start + consumed..];
    }
    Ok(tokens)
}

/// Read the tag at the start of `input`, returning it and its byte length.
fn read_tag(input: &str) -> Result<(Token, usize), String> {
    let end = tag_end(input).ok_or_else(|| "unterminated tag".to_string())?;
    let inner = &input[1..end];

    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, inner),
    };
    let name_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    if name_len == 0 || !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(format!("unexpected '<' at \"{}\"", &input[..end + 1]));
    }
    let name = body[..name_len].to_ascii_lowercase();
    let tail = body[name_len..].trim();

    let token = if closing {
        if !tail.is_empty() {
            return Err(format!("closing tag </{name}> carries content"));
        }
        Token::Close { name }
    } else {
        let self_closing = tail.ends_with('/');
        let attributes = tail.trim_end_matches('/').trim();
        Token::Open {
            name,
            has_attributes: !attributes.is_empty(),
            self_closing,
        }
    };
    Ok((token, end + 1))
}

/// Byte index of the `>` closing the tag that starts `input`, skipping
/// quoted attribute values.
fn tag_end(input: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in input.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '<') => return None,
            (None, '>') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn is_void(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

fn is_list(name: &str) -> bool {
    LIST_TAGS.contains(&name)
}

fn push_unique(into: &mut Vec<String>, name: &str) {
    if !into.iter().any(|existing| existing == name) {
        into.push(name.to_string());
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Open and close tags must balance. Void tags never need closing.
pub fn check_structure(tokens: &[Token]) -> Option<ElementValidationError> {
    let mut stack: Vec<&str> = Vec::new();
    for token in tokens {
        match token {
            Token::Open {
                name, self_closing, ..
            } => {
                if !self_closing && !is_void(name) {
                    stack.push(name.as_str());
                }
            }
            Token::Close { name } => {
                if is_void(name) {
                    continue;
                }
                match stack.pop() {
                    Some(open) if open == name.as_str() => {}
                    Some(open) => {
                        return Some(ElementValidationError::InvalidHtml {
                            reason: format!("</{name}> closes <{open}>"),
                        })
                    }
                    None => {
                        return Some(ElementValidationError::InvalidHtml {
                            reason: format!("</{name}> has no opening tag"),
                        })
                    }
                }
            }
            Token::Text(_) => {}
        }
    }
    stack.pop().map(|open| ElementValidationError::InvalidHtml {
        reason: format!("<{open}> is never closed"),
    })
}

pub fn check_supported_tags(tokens: &[Token]) -> Option<ElementValidationError> {
    let mut tags = Vec::new();
    for token in tokens {
        let name = match token {
            Token::Open { name, .. } | Token::Close { name } => name,
            Token::Text(_) => continue,
        };
        if !SUPPORTED_TAGS.contains(&name.as_str()) {
            push_unique(&mut tags, name);
        }
    }
    (!tags.is_empty()).then_some(ElementValidationError::UnsupportedTags { tags })
}

pub fn check_attributes(tokens: &[Token]) -> Option<ElementValidationError> {
    let mut tags = Vec::new();
    for token in tokens {
        if let Token::Open {
            name,
            has_attributes: true,
            ..
        } = token
        {
            push_unique(&mut tags, name);
        }
    }
    (!tags.is_empty()).then_some(ElementValidationError::UnsupportedAttributes { tags })
}

struct OpenList {
    items: usize,
}

/// List rules: every list has items, lists never nest, and list children are
/// `li` elements. Requires balanced tokens.
pub fn check_lists(tokens: &[Token]) -> Vec<ElementValidationError> {
    let mut errors = Vec::new();
    let mut unsupported = Vec::new();
    let mut nested = false;
    let mut empty = false;

    // Open elements; lists carry their item count.
    let mut stack: Vec<(&str, Option<OpenList>)> = Vec::new();
    for token in tokens {
        match token {
            Token::Open {
                name, self_closing, ..
            } => {
                if let Some((_, Some(list))) = stack.last_mut() {
                    if name == "li" {
                        list.items += 1;
                    } else {
                        push_unique(&mut unsupported, name);
                    }
                }
                if is_list(name) {
                    if stack.iter().any(|(_, list)| list.is_some()) {
                        nested = true;
                    }
                    if *self_closing {
                        empty = true;
                        continue;
                    }
                }
                if !self_closing && !is_void(name) {
                    let list = is_list(name).then_some(OpenList { items: 0 });
                    stack.push((name.as_str(), list));
                }
            }
            Token::Close { name } => {
                if is_void(name) {
                    continue;
                }
                if let Some((_, Some(list))) = stack.pop() {
                    if list.items == 0 {
                        empty = true;
                    }
                }
            }
            Token::Text(_) => {}
        }
    }

    if empty {
        errors.push(ElementValidationError::EmptyList);
    }
    if nested {
        errors.push(ElementValidationError::NestedList);
    }
    if !unsupported.is_empty() {
        errors.push(ElementValidationError::UnsupportedListElements { tags: unsupported });
    }
    errors
}

/// Visible text: `br` and list items start new lines, source line breaks
/// collapse to spaces.
pub fn text_content(tokens: &[Token]) -> String {
    fn break_line(out: &mut String) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => {
                out.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c }));
            }
            Token::Open { name, .. } if name == "br" => out.push('\n'),
            Token::Open { name, .. } if name == "li" || is_list(name) => break_line(&mut out),
            Token::Close { name } if is_list(name) => break_line(&mut out),
            _ => {}
        }
    }
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Every markup rule. The returned text is what the text rules measure; for
/// markup that cannot be tokenized it is the raw input.
pub fn check_markup(html: &str) -> (Vec<ElementValidationError>, String) {
    let tokens = match tokenize(html) {
        Ok(tokens) => tokens,
        Err(reason) => {
            return (
                vec![ElementValidationError::InvalidHtml { reason }],
                html.to_string(),
            )
        }
    };

    let mut errors = Vec::new();
    let structure = check_structure(&tokens);
    let balanced = structure.is_none();
    errors.extend(structure);
    errors.extend(check_supported_tags(&tokens));
    errors.extend(check_attributes(&tokens));
    if balanced {
        errors.extend(check_lists(&tokens));
    }
    (errors, text_content(&tokens))
}
