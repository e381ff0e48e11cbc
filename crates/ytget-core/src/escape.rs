//! Decoding of the escaped, percent-encoded text embedded in watch pages

/// Reverse percent-encoding. Triplets that are not valid `%XX` pass through
/// unchanged and `+` is kept literally.
pub fn decode_percent(input: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(input.as_bytes())).into_owned()
}

/// Reverse backslash escapes (`&`, `\n`, `\\`, ...) and drop the line
/// breaks the decoding produces, so the result stays on one logical line.
///
/// Unknown or truncated escapes are copied through as written.
pub fn decode_unicode_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let (decoded, consumed) = decode_escape(tail);
        match decoded {
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
        rest = &tail[consumed..];
    }
    out.push_str(rest);

    out.retain(|c| c != '\n' && c != '\r');
    out
}

/// Decode one escape whose backslash has already been consumed. Returns the
/// character and the number of bytes of `tail` it used.
fn decode_escape(tail: &str) -> (Option<char>, usize) {
    let Some(kind) = tail.chars().next() else {
        return (None, 0);
    };

    let simple = match kind {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        '\\' => Some('\\'),
        '/' => Some('/'),
        '"' => Some('"'),
        '\'' => Some('\''),
        _ => None,
    };
    if simple.is_some() {
        return (simple, 1);
    }

    match kind {
        'u' => decode_utf16_escape(tail),
        'x' => scalar(&tail[1..], 2).map_or((None, 0), |c| (Some(c), 3)),
        'U' => scalar(&tail[1..], 8).map_or((None, 0), |c| (Some(c), 9)),
        _ => (None, 0),
    }
}

/// `uXXXX`, combining a following `\uXXXX` low surrogate when present.
fn decode_utf16_escape(tail: &str) -> (Option<char>, usize) {
    let Some(high) = hex_value(&tail[1..], 4) else {
        return (None, 0);
    };

    if (0xD800..0xDC00).contains(&high) {
        let low = tail
            .get(5..)
            .filter(|s| s.starts_with("\\u"))
            .and_then(|s| hex_value(&s[2..], 4))
            .filter(|low| (0xDC00..0xE000).contains(low));
        if let Some(low) = low {
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            if let Some(c) = char::from_u32(code) {
                return (Some(c), 11);
            }
        }
    }

    match char::from_u32(high) {
        Some(c) => (Some(c), 5),
        None => (None, 0),
    }
}

fn scalar(digits: &str, len: usize) -> Option<char> {
    hex_value(digits, len).and_then(char::from_u32)
}

fn hex_value(digits: &str, len: usize) -> Option<u32> {
    let digits = digits.get(..len)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
