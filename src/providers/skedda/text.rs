//! Cleanup for iCalendar TEXT values

/// Unescape an iCalendar text value and squash whitespace.
///
/// `\,` and `\;` become the bare punctuation, `\n`/`\N` become spaces,
/// any other backslash is dropped. Returns `None` for blank input.
pub fn clean_ical_text(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some('\\') | None => {}
            Some(other) => out.push(other),
        }
    }

    let squashed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if squashed.is_empty() {
        None
    } else {
        Some(squashed)
    }
}
