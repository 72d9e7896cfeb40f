//! XML character reference decoding
//!
//! Annotation text coming out of `contents-richtext` is frequently escaped a
//! second time by the authoring application, so span text is run through
//! [`decode_entities`] after the XML parser has done its own pass.

use std::borrow::Cow;

/// Longest entity body we try to interpret (`#x10FFFF` is 8 bytes).
const MAX_ENTITY_LEN: usize = 10;

/// Decode named and numeric character references.
///
/// Handles `&amp; &lt; &gt; &quot; &#39; &apos;`, decimal `&#NNN;` and
/// hexadecimal `&#xHHHH;`. Unknown or unterminated references are copied
/// through untouched. Numeric references that do not name a Unicode scalar
/// value decode to U+FFFD.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        let decoded = tail
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_one(&tail[..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode the body of a single reference (the part between `&` and `;`)
fn decode_one(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
    }
}
