//! Separator detection and line splitting for delimited exports.
//!
//! Exports arrive as comma- or tab-separated text with optional double
//! quotes. A quote toggles quoting; inside quotes the separator is literal
//! and a doubled quote stands for one quote character. Quoted fields never
//! span lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Tab,
}

impl Separator {
    /// Tab when the header line has strictly more tabs than commas.
    pub fn detect(header_line: &str) -> Self {
        let tabs = header_line.matches('\t').count();
        let commas = header_line.matches(',').count();
        if tabs > commas { Self::Tab } else { Self::Comma }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
        }
    }
}

/// Split one line into raw (untrimmed) fields.
pub fn split_line(
    line: &str,
    separator: Separator,
) -> Vec<String> {
    let separator = separator.as_char();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Lines of the decoded file with their 1-based line numbers, line endings
/// removed.
pub fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().map(|(idx, line)| (idx + 1, line))
}
