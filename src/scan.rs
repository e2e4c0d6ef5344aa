//! Decode-side scanner.
//!
//! Splits encoded bodies into their parts without interpreting values. The
//! one rule that makes this work: a string token `~[n]` is never inspected,
//! the cursor jumps `n` characters past its header. A literal `>` or `|`
//! inside a string therefore cannot close a segment or split an entry.
//!
//! Structural characters are all ASCII, so scanning bytes is safe; only the
//! string jump counts characters. Offsets in errors and in the returned
//! parts are byte offsets into the text passed in.

use crate::{Error, Result};

/// One `<[key]=payload>` unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub key: &'a str,
    pub payload: &'a str,
    /// Offset of `payload` in the scanned body.
    pub offset: usize,
}

/// One `{len&id&body}` entry of the reference block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block<'a> {
    pub id: usize,
    pub body: &'a str,
    pub offset: usize,
}

/// Byte offset reached by advancing `n` characters from `pos`.
pub(crate) fn skip_chars(text: &str, pos: usize, n: usize) -> Option<usize> {
    let rest = text.get(pos..)?;
    let mut chars = rest.char_indices();
    for _ in 0..n {
        chars.next()?;
    }
    Some(pos + chars.next().map_or(rest.len(), |(i, _)| i))
}

/// Reads decimal digits from `pos` up to `terminator`.
///
/// Returns the number and the offset just past the terminator.
pub(crate) fn read_number(text: &str, pos: usize, terminator: u8) -> Result<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == pos {
        return Err(Error::syntax(pos, "expected a number"));
    }
    if bytes.get(end) != Some(&terminator) {
        return Err(Error::syntax(
            end,
            &format!("expected '{}' after number", terminator as char),
        ));
    }
    let number = text[pos..end]
        .parse()
        .map_err(|_| Error::syntax(pos, "number out of range"))?;
    Ok((number, end + 1))
}

/// Reads a `[len]` prefix at `pos`.
pub(crate) fn read_length(text: &str, pos: usize) -> Result<(usize, usize)> {
    if text.as_bytes().get(pos) != Some(&b'[') {
        return Err(Error::syntax(pos, "expected '['"));
    }
    read_number(text, pos + 1, b']')
}

/// Reads a `~[len]chars` string token at `pos`.
///
/// Returns the raw characters and the offset just past them.
pub(crate) fn read_string(text: &str, pos: usize) -> Result<(&str, usize)> {
    if text.as_bytes().get(pos) != Some(&b'~') {
        return Err(Error::syntax(pos, "expected '~'"));
    }
    let (len, start) = read_length(text, pos + 1)?;
    let end = skip_chars(text, start, len)
        .ok_or_else(|| Error::syntax(start, "string runs past the end of input"))?;
    Ok((&text[start..end], end))
}

/// Splits `(token)rest`, returning the token, the rest and the rest's offset.
pub(crate) fn split_type_token(payload: &str) -> Result<(&str, &str, usize)> {
    if !payload.starts_with('(') {
        return Err(Error::syntax(0, "expected '('"));
    }
    let close = payload
        .find(')')
        .ok_or_else(|| Error::syntax(0, "unterminated type token"))?;
    Ok((&payload[1..close], &payload[close + 1..], close + 1))
}

/// Finds the `>` closing a segment whose payload starts at `pos`.
///
/// The depth counter starts at 1 for the segment's own `<` and the segment
/// ends when it returns to 0.
fn find_segment_end(text: &str, pos: usize) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'~' if bytes.get(i + 1) == Some(&b'[') => {
                let (_, end) = read_string(text, i)?;
                i = end;
                continue;
            }
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(Error::syntax(pos, "unterminated segment"))
}

/// Splits a body into its `<[key]=payload>` segments.
pub(crate) fn extract_segments(body: &str) -> Result<Vec<Segment<'_>>> {
    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'<' || bytes.get(pos + 1) != Some(&b'[') {
            return Err(Error::syntax(pos, "expected '<['"));
        }
        let key_start = pos + 2;
        let key_end = body[key_start..]
            .find(']')
            .map(|i| key_start + i)
            .ok_or_else(|| Error::syntax(key_start, "unterminated segment key"))?;
        if bytes.get(key_end + 1) != Some(&b'=') {
            return Err(Error::syntax(key_end + 1, "expected '=' after segment key"));
        }
        let payload_start = key_end + 2;
        let end = find_segment_end(body, payload_start)?;
        segments.push(Segment {
            key: &body[key_start..key_end],
            payload: &body[payload_start..end],
            offset: payload_start,
        });
        pos = end + 1;
    }
    Ok(segments)
}

/// Splits a dictionary entry payload at its top-level `|`.
///
/// Returns the key payload, the value payload and the value's offset.
pub(crate) fn split_entry(payload: &str) -> Result<(&str, &str, usize)> {
    let bytes = payload.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'~' if bytes.get(i + 1) == Some(&b'[') => {
                let (_, end) = read_string(payload, i)?;
                i = end;
                continue;
            }
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b'|' if depth == 0 => return Ok((&payload[..i], &payload[i + 1..], i + 1)),
            _ => {}
        }
        i += 1;
    }
    Err(Error::syntax(0, "dictionary entry without '|'"))
}

/// Splits the reference block region into its entries.
pub(crate) fn extract_blocks(region: &str) -> Result<Vec<Block<'_>>> {
    let bytes = region.as_bytes();
    let mut blocks = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'{' {
            return Err(Error::syntax(pos, "expected '{'"));
        }
        let (len, after_len) = read_number(region, pos + 1, b'&')?;
        let (id, body_start) = read_number(region, after_len, b'&')?;
        let body_end = skip_chars(region, body_start, len)
            .ok_or_else(|| Error::syntax(body_start, "block runs past the end of input"))?;
        if bytes.get(body_end) != Some(&b'}') {
            return Err(Error::syntax(body_end, "expected '}'"));
        }
        blocks.push(Block {
            id,
            body: &region[body_start..body_end],
            offset: body_start,
        });
        pos = body_end + 1;
    }
    Ok(blocks)
}
