//! A pretty-printer for expressions, contexts and declarations.
//! Based off Wadler's 'A Prettier Printer'.
//!
//! - <https://homepages.inf.ed.ac.uk/wadler/papers/prettier/prettier.pdf>
//! - <https://github.com/prettier/prettier-printer>
//!
//! Groups are laid out flat when they fit on the current line, and broken otherwise.
//! Layout is decided greedily, one group at a time, so printing is linear in the size of the document.

use crate::style::Style;

/// The number of spaces added by [`Document::Indent`].
const INDENT: usize = 4;

/// A pretty-printable 'document'.
/// `DOC` in Wadler.
#[derive(Debug, Clone)]
pub enum Document {
    Empty,
    Concat(Vec<Document>),
    Indent(Box<Document>),
    /// Lays out the inner document on one line if it fits, otherwise breaks its lines.
    Group(Box<Document>),
    Text(String),
    /// Text rendered with a style. Styling does not count towards the width of the text.
    Styled { text: String, style: Style },
    /// A space in a flat group, or a newline otherwise.
    Line,
}

impl Document {
    pub fn text(text: impl Into<String>) -> Document {
        Document::Text(text.into())
    }

    pub fn then(self, doc: Document) -> Document {
        Document::Concat(vec![self, doc])
    }

    pub fn indent(self) -> Document {
        Document::Indent(Box::new(self))
    }

    pub fn group(self) -> Document {
        Document::Group(Box::new(self))
    }

    /// Joins documents, placing `separator` between each pair.
    pub fn join(docs: impl IntoIterator<Item = Document>, separator: Document) -> Document {
        let mut result = Vec::new();
        for doc in docs {
            if !result.is_empty() {
                result.push(separator.clone());
            }
            result.push(doc);
        }
        Document::Concat(result)
    }

    /// Renders the document, trying to keep lines at most `width` columns long.
    pub fn pretty_print(&self, width: usize) -> String {
        let mut output = String::new();
        let mut col = 0;
        let mut docs = vec![(0, Mode::Break, self)];
        while let Some((indent, mode, doc)) = docs.pop() {
            match doc {
                Document::Empty => {}
                Document::Concat(more_docs) => {
                    docs.extend(more_docs.iter().rev().map(|doc| (indent, mode, doc)));
                }
                Document::Indent(doc) => docs.push((indent + INDENT, mode, doc)),
                Document::Group(doc) => {
                    let mode = if mode == Mode::Flat
                        || fits(width as isize - col as isize, (indent, Mode::Flat, doc), &docs)
                    {
                        Mode::Flat
                    } else {
                        Mode::Break
                    };
                    docs.push((indent, mode, doc));
                }
                Document::Text(text) => {
                    output.push_str(text);
                    col += text.chars().count();
                }
                Document::Styled { text, style } => {
                    output.push_str(&style.apply(text));
                    col += text.chars().count();
                }
                Document::Line => match mode {
                    Mode::Flat => {
                        output.push(' ');
                        col += 1;
                    }
                    Mode::Break => {
                        output.push('\n');
                        output.extend(std::iter::repeat(' ').take(indent));
                        col = indent;
                    }
                },
            }
        }
        output
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

/// Checks if everything up to the next line break fits into `width` columns,
/// if `next` is laid out flat and is followed by the documents in `rest`.
fn fits(
    mut width: isize,
    next: (usize, Mode, &Document),
    rest: &[(usize, Mode, &Document)],
) -> bool {
    let mut docs = vec![next];
    let mut rest = rest.iter().rev();
    while width >= 0 {
        let (indent, mode, doc) = match docs.pop() {
            Some(item) => item,
            None => match rest.next() {
                Some(item) => *item,
                None => return true,
            },
        };
        match doc {
            Document::Empty => {}
            Document::Concat(more_docs) => {
                docs.extend(more_docs.iter().rev().map(|doc| (indent, mode, doc)));
            }
            Document::Indent(doc) => docs.push((indent + INDENT, mode, doc)),
            Document::Group(doc) => docs.push((indent, mode, doc)),
            Document::Text(text) | Document::Styled { text, .. } => {
                width -= text.chars().count() as isize;
            }
            Document::Line => match mode {
                Mode::Flat => width -= 1,
                Mode::Break => return true,
            },
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::pretty_print::Document;

    fn words(words: &[&str]) -> Document {
        Document::join(words.iter().map(|word| Document::text(*word)), Document::Line)
    }

    #[test]
    fn group_fits() {
        let doc = words(&["f", "a", "b"]).group();
        assert_eq!(doc.pretty_print(80), "f a b");
    }

    #[test]
    fn group_breaks() {
        let doc = Document::text("f")
            .then(Document::Line.then(words(&["alpha", "beta"])).indent())
            .group();
        assert_eq!(doc.pretty_print(8), "f\n    alpha\n    beta");
    }

    #[test]
    fn inner_groups_stay_flat() {
        let inner = words(&["g", "x"]).group();
        let doc = Document::join(
            [Document::text("function"), inner, Document::text("argument")],
            Document::Line,
        )
        .group();
        assert_eq!(doc.pretty_print(12), "function\ng x\nargument");
    }

    #[test]
    fn top_level_lines_break() {
        assert_eq!(words(&["a", "b"]).pretty_print(80), "a\nb");
    }
}
