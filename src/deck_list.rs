//! Parsing of canonical plain-text deck lists.
//!
//! Each line is `<count> <name>`, `<count>x <name>` or a bare `<name>` (one
//! copy). Section markers such as `Sideboard:` and the `SB:` line prefix are
//! accepted, blank lines and lines starting with `#` or `//` are ignored.
//! Counts for repeated names are summed.

use std::collections::HashMap;

/// Card name to requested number of copies.
pub type DeckList = HashMap<String, u32>;

pub fn parse_deck_list(text: &str) -> DeckList {
    let mut list = DeckList::new();
    for raw in text.lines() {
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if is_section_marker(line) {
            continue;
        }
        if let Some(rest) = strip_prefix_ignore_case(line, "SB:") {
            line = rest.trim_start();
        }

        let (count, name) = split_count(line);
        let name = strip_set_suffix(name).trim();
        if name.is_empty() || count == 0 {
            continue;
        }
        *list.entry(name.to_string()).or_insert(0) += count;
    }
    list
}

fn is_section_marker(line: &str) -> bool {
    let Some(label) = line.strip_suffix(':') else {
        return false;
    };
    matches!(
        label.trim().to_ascii_lowercase().as_str(),
        "sideboard" | "maybeboard" | "commander" | "deck" | "main" | "mainboard" | "companion"
    )
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

fn split_count(line: &str) -> (u32, &str) {
    let Some((first, rest)) = line.split_once(char::is_whitespace) else {
        return (1, line);
    };
    let digits = first
        .strip_suffix('x')
        .or_else(|| first.strip_suffix('X'))
        .unwrap_or(first);
    match digits.parse::<u32>() {
        Ok(count) => (count, rest.trim_start()),
        Err(_) => (1, line),
    }
}

/// Drop a trailing `(SET)` or `(SET) 123` printing reference.
fn strip_set_suffix(name: &str) -> &str {
    match name.rfind(" (") {
        Some(idx) if name[idx..].contains(')') => &name[..idx],
        _ => name,
    }
}
