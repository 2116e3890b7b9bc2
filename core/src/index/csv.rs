//! Comma-separated record codec for the index file.
//!
//! A field is wrapped in double quotes when it contains the delimiter, a
//! quote or a line terminator; embedded quotes are doubled. Each record
//! ends with `\n`.

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Encode one record, terminator included.
pub fn encode_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        encode_field(field.as_ref(), &mut out);
    }
    out.push('\n');
    out
}

fn encode_field(field: &str, out: &mut String) {
    let needs_quotes = field
        .chars()
        .any(|c| c == DELIMITER || c == QUOTE || c == '\n' || c == '\r');
    if !needs_quotes {
        out.push_str(field);
        return;
    }
    out.push(QUOTE);
    for c in field.chars() {
        if c == QUOTE {
            out.push(QUOTE);
        }
        out.push(c);
    }
    out.push(QUOTE);
}

/// Split one line into fields.
///
/// Lenient: characters after a closing quote are kept, and an unterminated
/// quoted field runs to the end of the line.
pub fn decode_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    field.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            DELIMITER => fields.push(std::mem::take(&mut field)),
            QUOTE if field.is_empty() => in_quotes = true,
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
