//! Tab / Shift+Tab handling for plain textareas (the custom CSS editor).
//!
//! Offsets here are byte offsets into the text. The DOM reports UTF-16 code
//! units; convert with [`utf16_to_byte`] and [`byte_to_utf16`].

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndentEdit {
    pub text: String,
    pub selection: Selection,
}

/// A selection inside one line is replaced by a tab; a selection spanning
/// lines indents each of them.
pub fn indent(text: &str, selection: Selection) -> IndentEdit {
    let selection = selection.clamp(text.len());
    let block_start = line_start(text, selection.start);
    let block_end = line_end(text, selection.end);
    let block = &text[block_start..block_end];

    if !text[selection.start..selection.end].contains('\n') {
        let mut out = String::with_capacity(text.len() + 1);
        out.push_str(&text[..selection.start]);
        out.push('\t');
        out.push_str(&text[selection.end..]);
        return IndentEdit {
            text: out,
            selection: Selection::cursor(selection.start + 1),
        };
    }

    let lines = block.split('\n').count();
    let indented = block
        .split('\n')
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    IndentEdit {
        text: splice(text, block_start, block_end, &indented),
        selection: Selection::new(selection.start + 1, selection.end + lines),
    }
}

/// Removes one tab, or up to four spaces, from every line the selection
/// touches. `None` when nothing could be removed.
pub fn outdent(text: &str, selection: Selection) -> Option<IndentEdit> {
    let selection = selection.clamp(text.len());
    let block_start = line_start(text, selection.start);
    let block_end = line_end(text, selection.end);
    let block = &text[block_start..block_end];

    let mut removed_total = 0;
    let mut removed_first = 0;
    let mut out_lines = Vec::new();
    for (idx, line) in block.split('\n').enumerate() {
        let remove = if line.starts_with('\t') {
            1
        } else {
            line.chars().take_while(|c| *c == ' ').take(4).count()
        };
        if idx == 0 {
            removed_first = remove;
        }
        removed_total += remove;
        out_lines.push(&line[remove..]);
    }
    if removed_total == 0 {
        return None;
    }

    let first_offset = selection.start - block_start;
    let start = selection.start - removed_first.min(first_offset);
    let end = selection.end.saturating_sub(removed_total).max(start);
    Some(IndentEdit {
        text: splice(text, block_start, block_end, &out_lines.join("\n")),
        selection: Selection::new(start, end),
    })
}

fn splice(text: &str, start: usize, end: usize, insert: &str) -> String {
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..start]);
    out.push_str(insert);
    out.push_str(&text[end..]);
    out
}

fn line_start(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[..clamped].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn line_end(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[clamped..]
        .find('\n')
        .map(|i| clamped + i)
        .unwrap_or(text.len())
}

pub fn utf16_to_byte(text: &str, pos_utf16: u32) -> usize {
    let mut acc: u32 = 0;
    for (i, ch) in text.char_indices() {
        if acc >= pos_utf16 {
            return i;
        }
        acc += ch.len_utf16() as u32;
    }
    text.len()
}

pub fn byte_to_utf16(text: &str, byte_idx: usize) -> u32 {
    let mut idx = byte_idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    text[..idx].encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_replaces_single_line_selection() {
        let edit = indent("body { }", Selection::new(6, 7));
        assert_eq!(edit.text, "body {\t}");
        assert_eq!(edit.selection, Selection::cursor(7));
    }

    #[test]
    fn indents_and_outdents_every_selected_line() {
        let text = "a {\ncolor: red;\n}";
        let edit = indent(text, Selection::new(4, text.len()));
        assert_eq!(edit.text, "a {\n\tcolor: red;\n\t}");
        assert_eq!(edit.selection, Selection::new(5, edit.text.len()));

        let back = outdent(&edit.text, edit.selection).unwrap();
        assert_eq!(back.text, text);
        assert_eq!(back.selection, Selection::new(4, text.len()));
    }

    #[test]
    fn outdent_strips_spaces_and_reports_no_op() {
        let edit = outdent("      x", Selection::cursor(7)).unwrap();
        assert_eq!(edit.text, "  x");
        assert_eq!(edit.selection, Selection::cursor(3));
        assert_eq!(outdent("x", Selection::cursor(1)), None);
    }

    #[test]
    fn converts_between_utf16_and_bytes() {
        let text = "a😀b";
        assert_eq!(utf16_to_byte(text, 0), 0);
        assert_eq!(utf16_to_byte(text, 1), 1);
        assert_eq!(utf16_to_byte(text, 3), 5);
        assert_eq!(utf16_to_byte(text, 9), text.len());
        assert_eq!(byte_to_utf16(text, 5), 3);
        assert_eq!(byte_to_utf16(text, text.len()), 4);
    }
}
