use std::borrow::Cow;

const BEARER: &str = "Bearer ";
const TOKEN_FIELD: &str = "\"token\"";

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - nee.len()).find(|&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

/// Replaces the credential after every `Bearer ` with `REDACTED`.
fn redact_bearer(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = find_ascii_case_insensitive(rest, BEARER) {
        let end = idx + BEARER.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let mut consumed = 0;
        for ch in rest.chars() {
            if ch.is_whitespace() || ch == '"' || ch == ',' || ch == ';' {
                break;
            }
            consumed += ch.len_utf8();
        }
        out.push_str("REDACTED");
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Replaces the string value of any `"token": "..."` JSON field.
fn redact_token_fields(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find(TOKEN_FIELD) {
        let end = idx + TOKEN_FIELD.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let after_colon = rest.trim_start();
        let Some(after_colon) = after_colon.strip_prefix(':') else {
            continue;
        };
        let value = after_colon.trim_start();
        let Some(value) = value.strip_prefix('"') else {
            continue;
        };

        // Keep the separator exactly as written.
        let separator_len = rest.len() - value.len();
        out.push_str(&rest[..separator_len]);

        let mut consumed = 0;
        let mut escaped = false;
        for ch in value.chars() {
            if ch == '"' && !escaped {
                break;
            }
            escaped = ch == '\\' && !escaped;
            consumed += ch.len_utf8();
        }
        out.push_str("REDACTED");
        rest = &value[consumed..];
    }
    out.push_str(rest);
    out
}

/// Strips bearer credentials and token fields from text headed for logs.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let value = redact_token_fields(&redact_bearer(input));
    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}
