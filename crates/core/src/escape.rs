//! Python string-literal escape decoding.

use crate::error::EscapeError;

/// Decode the backslash escapes of a raw string literal.
///
/// `unicode` enables the `\u`, `\U` and `\N` escapes (which are kept
/// literally in byte strings) and selects how malformed `\x` escapes are
/// reported. Unknown escapes keep their backslash.
pub fn decode_string_literal(raw: &str, unicode: bool) -> Result<String, EscapeError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        if c != '\\' {
            out.push(c);
            pos += 1;
            continue;
        }
        let Some(&escape) = chars.get(pos + 1) else {
            out.push('\\');
            break;
        };
        let simple = match escape {
            '\\' => Some('\\'),
            '"' => Some('"'),
            '\'' => Some('\''),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{0b}'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            pos += 2;
            continue;
        }
        match escape {
            // Line continuation
            '\n' => pos += 2,
            'N' if unicode => return Err(EscapeError::NamedEscape),
            'u' | 'U' if unicode => {
                let width = if escape == 'u' { 4 } else { 8 };
                let decoded = hex_escape(&chars, pos, width).ok_or(EscapeError::Truncated {
                    escape,
                    start: pos,
                    end: (pos + 1 + width).min(chars.len() - 1),
                })?;
                let ch = char::from_u32(decoded).ok_or(EscapeError::IllegalCodePoint {
                    start: pos,
                    end: pos + 1 + width,
                })?;
                out.push(ch);
                pos += 2 + width;
            }
            'x' => {
                let Some(decoded) = hex_escape(&chars, pos, 2) else {
                    return Err(if unicode {
                        EscapeError::Truncated {
                            escape,
                            start: pos,
                            end: (pos + 3).min(chars.len() - 1),
                        }
                    } else {
                        EscapeError::InvalidHex
                    });
                };
                // Two hex digits always fit in a char.
                out.extend(char::from_u32(decoded));
                pos += 4;
            }
            '0'..='7' => {
                let digits: String = chars[pos + 1..]
                    .iter()
                    .take(3)
                    .take_while(|d| matches!(d, '0'..='7'))
                    .collect();
                let code = u32::from_str_radix(&digits, 8).unwrap_or(0);
                out.extend(char::from_u32(code));
                pos += 1 + digits.len();
            }
            _ => {
                out.push('\\');
                pos += 1;
            }
        }
    }
    Ok(out)
}

/// Parse exactly `width` hex digits following the escape letter at `pos + 1`.
fn hex_escape(chars: &[char], pos: usize, width: usize) -> Option<u32> {
    let digits = chars.get(pos + 2..pos + 2 + width)?;
    if !digits.iter().all(char::is_ascii_hexdigit) {
        return None;
    }
    let text: String = digits.iter().collect();
    u32::from_str_radix(&text, 16).ok()
}
