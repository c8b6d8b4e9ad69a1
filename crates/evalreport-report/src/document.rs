//! Structured document model: sections of blocks, tables of rows of cells.
//!
//! Nothing here knows about LaTeX syntax; see [`crate::latex`] for rendering.

/// A package the document loads, with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub options: Vec<String>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Vec::new(),
        }
    }

    pub fn with_options(name: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// How a table column lays out its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// Centered, sized to content.
    Centered,
    /// Left-aligned, stretches to fill and wraps.
    Wrapping,
    /// Centered, stretches to fill and wraps.
    CenteredWrapping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: String,
    pub layout: ColumnLayout,
}

impl Column {
    pub fn new(header: &str, layout: ColumnLayout) -> Self {
        Self {
            header: header.to_string(),
            layout,
        }
    }
}

/// Separator placed between the tokens of a wrapped cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Space,
    Comma,
    /// A comma followed by a forced line break.
    CommaBreak,
}

/// A table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Plain text, escaped on render.
    Text(String),
    /// A "less than or equal to" bound, rendered as a math symbol.
    AtMost(u64),
    /// Tokens joined by a separator; long tokens may be split mid-word.
    Wrapped {
        tokens: Vec<String>,
        separator: Separator,
    },
}

impl Cell {
    pub fn text(s: impl ToString) -> Self {
        Cell::Text(s.to_string())
    }
}

/// A table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width must match columns");
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A bulleted list of plain-text items.
    Itemize(Vec<String>),
    Table(Table),
}

/// A numbered section with optional nested subsections.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            blocks: Vec::new(),
            subsections: Vec::new(),
        }
    }
}

/// A complete document: ordered packages, raw preamble lines, front matter
/// and sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub packages: Vec<Package>,
    pub preamble: Vec<String>,
    pub title: String,
    pub author: String,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            packages: Vec::new(),
            preamble: Vec::new(),
            title: title.to_string(),
            author: author.to_string(),
            sections: Vec::new(),
        }
    }

    /// Add a package unless one with the same name is already loaded.
    pub fn add_package(&mut self, package: Package) {
        if !self.packages.iter().any(|p| p.name == package.name) {
            self.packages.push(package);
        }
    }

    /// Every table in reading order, including those in subsections.
    pub fn tables(&self) -> Vec<&Table> {
        fn collect<'a>(section: &'a Section, out: &mut Vec<&'a Table>) {
            for block in &section.blocks {
                if let Block::Table(table) = block {
                    out.push(table);
                }
            }
            for sub in &section.subsections {
                collect(sub, out);
            }
        }

        let mut out = Vec::new();
        for section in &self.sections {
            collect(section, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages_are_deduplicated_by_name() {
        let mut doc = Document::new("t", "a");
        doc.add_package(Package::with_options("xcolor", &["table"]));
        doc.add_package(Package::new("xcolor"));
        assert_eq!(doc.packages.len(), 1);
        assert_eq!(doc.packages[0].options, vec!["table"]);
    }

    #[test]
    fn tables_are_collected_in_reading_order() {
        let mut doc = Document::new("t", "a");
        let mut outer = Section::new("Outer");
        outer.blocks.push(Block::Table(Table::new(vec![Column::new(
            "first",
            ColumnLayout::Centered,
        )])));
        let mut inner = Section::new("Inner");
        inner.blocks.push(Block::Table(Table::new(vec![Column::new(
            "second",
            ColumnLayout::Centered,
        )])));
        outer.subsections.push(inner);
        doc.sections.push(outer);

        let headers: Vec<&str> = doc
            .tables()
            .iter()
            .map(|t| t.columns[0].header.as_str())
            .collect();
        assert_eq!(headers, vec!["first", "second"]);
    }
}
