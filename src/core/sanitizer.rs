//! Value Sanitizer
//!
//! Neutralizes spreadsheet formula triggers (CSV injection) in field values
//! before they are written. A line that starts with `=`, `+`, `-`, `@` or a
//! tab is prefixed with a single quote, which spreadsheet applications treat
//! as "literal text" and do not display. Lines that already start with quotes
//! followed by a trigger get one more quote, so [`restore_field`] can undo the
//! escaping exactly.
//!
//! Every line of a multi-line value is treated separately, because DDE
//! payloads are commonly smuggled after an embedded newline. A `\r` that
//! ends a CRLF line break is kept, so Windows-edited examples round-trip.
//! Other control characters, including a lone `\r`, are dropped: some
//! importers treat them as line breaks. That drop is the one lossy step;
//! [`restore_field`] undoes everything else exactly.

use std::borrow::Cow;

/// Characters that make a spreadsheet evaluate a cell.
pub const FORMULA_TRIGGERS: [char; 5] = ['=', '+', '-', '@', '\t'];

/// Quoting character used to neutralize a trigger.
pub const ESCAPE_CHAR: char = '\'';

/// Neutralize a single field destined for a vocabulary file.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
pub fn sanitize_field(value: &str) -> Cow<'_, str> {
    if !needs_sanitizing(value) {
        return Cow::Borrowed(value);
    }

    let cleaned = strip_controls(value);

    let escaped = cleaned
        .split('\n')
        .map(|line| {
            if starts_with_trigger(line) {
                format!("{ESCAPE_CHAR}{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Cow::Owned(escaped)
}

/// Reverse the escaping applied by [`sanitize_field`] for display.
pub fn restore_field(value: &str) -> Cow<'_, str> {
    if !value.split('\n').any(is_escaped_line) {
        return Cow::Borrowed(value);
    }

    let restored = value
        .split('\n')
        .map(|line| {
            if is_escaped_line(line) {
                &line[ESCAPE_CHAR.len_utf8()..]
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Cow::Owned(restored)
}

/// True when some line of `value` would be evaluated by a spreadsheet.
pub fn is_dangerous(value: &str) -> bool {
    value.split('\n').any(|line| {
        line.trim_start_matches(is_stripped_control)
            .starts_with(&FORMULA_TRIGGERS[..])
    })
}

fn needs_sanitizing(value: &str) -> bool {
    has_stray_control(value) || value.split('\n').any(starts_with_trigger)
}

fn strip_controls(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' && chars.peek() == Some(&'\n') {
            out.push(c);
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }
    out
}

/// A control character [`strip_controls`] would drop.
fn has_stray_control(value: &str) -> bool {
    value
        .char_indices()
        .any(|(i, c)| is_stripped_control(c) && !(c == '\r' && value[i + 1..].starts_with('\n')))
}

/// A line of the form `'*<trigger>...`.
fn starts_with_trigger(line: &str) -> bool {
    line.trim_start_matches(ESCAPE_CHAR)
        .starts_with(&FORMULA_TRIGGERS[..])
}

/// A line produced by escaping: one quote in front of a `'*<trigger>` line.
fn is_escaped_line(line: &str) -> bool {
    line.strip_prefix(ESCAPE_CHAR)
        .map(starts_with_trigger)
        .unwrap_or(false)
}

fn is_stripped_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(sanitize_field("hello"), "hello");
        assert!(matches!(sanitize_field("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_formula_is_neutralized_but_displays_unchanged() {
        let stored = sanitize_field("=1+1");
        assert_eq!(stored, "'=1+1");
        assert!(!is_dangerous(&stored));
        assert_eq!(restore_field(&stored), "=1+1");
    }

    #[rstest]
    #[case("+SUM(A1:A2)", "'+SUM(A1:A2)")]
    #[case("-2+3", "'-2+3")]
    #[case("@cmd", "'@cmd")]
    #[case("\t=1", "'\t=1")]
    #[case("'=1", "''=1")]
    #[case("it's fine", "it's fine")]
    #[case("a-b", "a-b")]
    fn test_sanitize_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_field(input), expected);
        assert_eq!(restore_field(&sanitize_field(input)), input);
    }

    #[test]
    fn test_dde_after_newline_is_neutralized() {
        let payload = "harmless\n=cmd|' /C calc'!A0";
        let stored = sanitize_field(payload);
        assert_eq!(stored, "harmless\n'=cmd|' /C calc'!A0");
        assert!(!is_dangerous(&stored));
        assert_eq!(restore_field(&stored), payload);
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let stored = sanitize_field("\r=1\u{7}");
        assert_eq!(stored, "'=1");
    }

    #[test]
    fn test_crlf_line_breaks_are_kept() {
        let value = "first line\r\n=SUM(A1)\r\nlast";
        let stored = sanitize_field(value);
        assert_eq!(stored, "first line\r\n'=SUM(A1)\r\nlast");
        assert!(!is_dangerous(&stored));
        assert_eq!(restore_field(&stored), value);

        assert!(matches!(sanitize_field("a\r\nb"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_restore_leaves_ordinary_quotes() {
        assert_eq!(restore_field("'bonjour'"), "'bonjour'");
        assert_eq!(restore_field("l'eau"), "l'eau");
    }
}
