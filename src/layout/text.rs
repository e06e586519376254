/// Makes a URL-escaped policy document readable inside a single cell:
/// percent-unescape, strip existing spaces and newlines, then break after
/// `{`, `[`, `,` and before `}`, `]`. Purely punctuation driven, not a JSON
/// formatter.
pub fn format_escaped_document(raw: &str) -> String {
    let decoded = percent_decode(raw);
    let mut out = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        match ch {
            ' ' | '\n' => {}
            '{' | '[' | ',' => {
                out.push(ch);
                out.push('\n');
            }
            '}' | ']' => {
                out.push('\n');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Query-string unescape: `%XX` byte escapes plus `+` for space. Malformed
/// escapes pass through verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    out.push(hi * 16 + lo);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
