//! Text helpers for building the report: escaping, anchors, number and date formatting.

use time::Date;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_html`] for the five entities it produces.
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Form encoding: everything but unreserved characters is percent-encoded and
/// spaces become `+`.
pub fn quote_plus(input: &str) -> String {
    urlencoding::encode(input).replace("%20", "+")
}

pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day()
    )
}

/// `1234567` → `1&nbsp;234&nbsp;567`.
pub fn number_format(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() * 2);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push_str("&nbsp;");
        }
        out.push(ch);
    }
    out
}

/// Fragment identifier for an artist name.
///
/// Letters pass through, spaces become `_`, anything else is written as its
/// decimal character code between dashes (`AC/DC` → `AC-47-DC`). Both `_` and
/// `-` are themselves escaped, so distinct names never share an anchor.
pub fn anchor_for(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphabetic() {
            out.push(ch);
        } else if ch == ' ' {
            out.push('_');
        } else {
            out.push('-');
            out.push_str(&u32::from(ch).to_string());
            out.push('-');
        }
    }
    out
}

/// Inverse of [`anchor_for`]; `None` for strings it could not have produced.
pub fn name_from_anchor(anchor: &str) -> Option<String> {
    let mut out = String::with_capacity(anchor.len());
    let mut chars = anchor.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '_' => out.push(' '),
            '-' => {
                let code: String = chars.by_ref().take_while(|c| *c != '-').collect();
                out.push(char::from_u32(code.parse().ok()?)?);
            }
            _ => out.push(ch),
        }
    }
    Some(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearClass {
    ThisYear,
    PrevYear,
    Neutral,
}

impl YearClass {
    pub fn of(year: &str, today: Date) -> Self {
        match year.parse::<i32>() {
            Ok(y) if y == today.year() => YearClass::ThisYear,
            Ok(y) if y == today.year() - 1 => YearClass::PrevYear,
            _ => YearClass::Neutral,
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            YearClass::ThisYear => "this-year",
            YearClass::PrevYear => "prev-year",
            YearClass::Neutral => "",
        }
    }
}

pub fn release_type_class(kind: &str) -> &'static str {
    match kind {
        "album" | "ep" | "soundtrack" => "worthy",
        _ => "unworthy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn escape_and_unescape_are_inverse() {
        let raw = "Simon & Garfunkel <\"live\"> 'n'";
        assert_eq!(
            escape_html(raw),
            "Simon &amp; Garfunkel &lt;&quot;live&quot;&gt; &#39;n&#39;"
        );
        assert_eq!(unescape_html(&escape_html(raw)), raw);
    }

    #[test]
    fn unescape_does_not_double_decode() {
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn quote_plus_uses_plus_for_spaces() {
        assert_eq!(quote_plus("Foo Bar/Baz"), "Foo+Bar%2FBaz");
        assert_eq!(quote_plus("Mötley"), "M%C3%B6tley");
    }

    #[test]
    fn number_format_groups_thousands() {
        assert_eq!(number_format(0), "0");
        assert_eq!(number_format(999), "999");
        assert_eq!(number_format(1000), "1&nbsp;000");
        assert_eq!(number_format(1234567), "1&nbsp;234&nbsp;567");
    }

    #[test]
    fn anchor_keeps_letters_and_maps_spaces() {
        assert_eq!(anchor_for("Letters With Underscores"), "Letters_With_Underscores");
        assert_eq!(
            name_from_anchor("Letters_With_Underscores").as_deref(),
            Some("Letters With Underscores")
        );
    }

    #[test]
    fn anchor_escapes_punctuation_and_digits() {
        assert_eq!(anchor_for("AC/DC"), "AC-47-DC");
        assert_eq!(anchor_for("Blink-182"), "Blink-45--49--56--50-");
        assert_eq!(name_from_anchor("Blink-45--49--56--50-").as_deref(), Some("Blink-182"));
        assert_eq!(anchor_for("Sigur Rós"), "Sigur_Rós");
    }

    #[test]
    fn anchor_is_injective_over_printable_ascii() {
        let mut seen = std::collections::HashMap::new();
        let alphabet: Vec<char> = (0x20u8..0x7f).map(char::from).collect();
        for a in &alphabet {
            for b in &alphabet {
                let name = format!("{a}{b}");
                let anchor = anchor_for(&name);
                if let Some(prev) = seen.insert(anchor.clone(), name.clone()) {
                    panic!("{prev:?} and {name:?} share anchor {anchor:?}");
                }
                assert_eq!(name_from_anchor(&anchor).as_deref(), Some(name.as_str()));
            }
        }
    }

    #[test]
    fn year_class_compares_with_run_year() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(YearClass::of("2024", today), YearClass::ThisYear);
        assert_eq!(YearClass::of("2023", today), YearClass::PrevYear);
        assert_eq!(YearClass::of("2022", today), YearClass::Neutral);
        assert_eq!(YearClass::of("", today), YearClass::Neutral);
        assert_eq!(YearClass::ThisYear.css(), "this-year");
    }

    #[test]
    fn release_type_class_marks_worthy_types() {
        assert_eq!(release_type_class("album"), "worthy");
        assert_eq!(release_type_class("ep"), "worthy");
        assert_eq!(release_type_class("soundtrack"), "worthy");
        assert_eq!(release_type_class("live"), "unworthy");
        assert_eq!(release_type_class("single"), "unworthy");
    }

    #[test]
    fn iso_date_pads_fields() {
        assert_eq!(iso_date(date!(2024 - 03 - 07)), "2024-03-07");
    }
}
