use std::io;

use crossterm::{queue, style};

/// A run of menu text; key hints in `[...]` are emphasized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Key(&'a str),
    Label(&'a str),
}

/// Split a menu item such as `"[r]un program"` into key and label spans.
/// An unclosed bracket is kept as plain label text.
pub fn spans(item: &str) -> Vec<Span<'_>> {
    let mut out = Vec::new();
    let mut rest = item;
    while !rest.is_empty() {
        let Some(open) = rest.find('[') else {
            out.push(Span::Label(rest));
            break;
        };
        if open > 0 {
            out.push(Span::Label(&rest[..open]));
        }
        rest = &rest[open..];
        match rest.find(']') {
            Some(close) => {
                out.push(Span::Key(&rest[..=close]));
                rest = &rest[close + 1..];
            }
            None => {
                out.push(Span::Label(rest));
                break;
            }
        }
    }
    out
}

/// Print a menu item, bold keys and dim labels.
pub fn print_menu_item(stdout: &mut io::Stdout, item: &str) -> anyhow::Result<()> {
    for span in spans(item) {
        let (attr, text) = match span {
            Span::Key(text) => (style::Attribute::Bold, text),
            Span::Label(text) => (style::Attribute::Dim, text),
        };
        queue!(
            stdout,
            style::SetAttribute(attr),
            style::Print(text),
            style::SetAttribute(style::Attribute::Reset),
        )?;
    }
    Ok(())
}

/// Display width of a menu line built from `items`, two spaces apart.
pub fn line_width(items: &[&str]) -> usize {
    let text: usize = items.iter().map(|i| i.chars().count()).sum();
    text + items.len().saturating_sub(1) * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_become_key_spans() {
        assert_eq!(
            spans("[r]un [x] stop"),
            vec![
                Span::Key("[r]"),
                Span::Label("un "),
                Span::Key("[x]"),
                Span::Label(" stop"),
            ]
        );
    }

    #[test]
    fn unclosed_bracket_stays_plain() {
        assert_eq!(spans("[F11 full"), vec![Span::Label("[F11 full")]);
        assert!(spans("").is_empty());
    }

    #[test]
    fn line_width_counts_separators() {
        assert_eq!(line_width(&["[q]uit", "[←] l"]), 6 + 2 + 5);
        assert_eq!(line_width(&[]), 0);
    }
}
