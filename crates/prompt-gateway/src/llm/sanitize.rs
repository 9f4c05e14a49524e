use std::fmt;

const FENCE: &str = "```";

/// Provider text with fence syntax and surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText(String);

impl SanitizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for SanitizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the first fenced block (opening fence of three or more backticks,
/// optional language tag, up to a closing run at least as long). Prose before the
/// block is dropped; text without any fence is only trimmed. Extraction repeats
/// until no fence is left, so a second pass is a no-op.
pub fn sanitize(text: &str) -> SanitizedText {
    let mut current = text.trim();
    while current.contains(FENCE) {
        current = first_fenced_block(current).trim();
    }
    SanitizedText(current.to_string())
}

/// Free-text variant: unwraps a fence only when one block encloses the whole
/// response, so markdown that merely contains code blocks is left intact.
pub fn sanitize_free_text(text: &str) -> SanitizedText {
    let mut current = text.trim();
    while let Some(inner) = enclosing_block(current) {
        current = inner.trim();
    }
    SanitizedText(current.to_string())
}

fn first_fenced_block(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let fence = &text[open..];
    let width = backtick_run(fence);
    let body = skip_info_string(&fence[width..]);
    match closing_fence(body, width) {
        Some(close) => &body[..close],
        None => body,
    }
}

fn enclosing_block(trimmed: &str) -> Option<&str> {
    let width = backtick_run(trimmed);
    if width < FENCE.len() {
        return None;
    }
    let inner = trimmed[width..].strip_suffix(&trimmed[..width])?;
    let body = skip_info_string(inner);
    if closing_fence(body, width).is_some() {
        return None;
    }
    Some(body)
}

fn backtick_run(text: &str) -> usize {
    text.len() - text.trim_start_matches('`').len()
}

/// Byte offset of the first backtick run in `body` at least `width` long.
fn closing_fence(body: &str, width: usize) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = body[offset..].find('`') {
        let start = offset + found;
        let run = backtick_run(&body[start..]);
        if run >= width {
            return Some(start);
        }
        offset = start + run;
    }
    None
}

/// Drops the rest of the opening fence line when it is empty or a single
/// language token such as `json`.
fn skip_info_string(after_open: &str) -> &str {
    let (first_line, rest) = match after_open.split_once('\n') {
        Some((line, rest)) => (line, rest),
        None => (after_open, ""),
    };
    if first_line.trim().chars().all(is_info_char) {
        rest
    } else {
        after_open
    }
}

fn is_info_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+' | '.' | '#')
}
