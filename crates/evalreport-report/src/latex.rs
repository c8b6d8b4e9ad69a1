//! LaTeX source rendering for [`Document`].

use std::fmt::Write as _;

use crate::document::{Block, Cell, ColumnLayout, Document, Section, Separator, Table};

/// Escape text for safe insertion into LaTeX source.
pub fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '$' => out.push_str(r"\$"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\^{}"),
            '\\' => out.push_str(r"\textbackslash{}"),
            '[' => out.push_str("{[}"),
            ']' => out.push_str("{]}"),
            '\n' => out.push_str("\\newline%\n"),
            other => out.push(other),
        }
    }
    out
}

/// Renders documents to LaTeX source.
#[derive(Debug, Clone, Copy)]
pub struct LatexRenderer {
    /// Tokens longer than this are wrapped in `\seqsplit` so they can break.
    pub wrap_threshold: usize,
}

impl LatexRenderer {
    pub fn new(wrap_threshold: usize) -> Self {
        Self { wrap_threshold }
    }

    pub fn render(&self, doc: &Document) -> String {
        let mut out = String::new();

        out.push_str("\\documentclass{article}%\n");
        out.push_str("\\usepackage[T1]{fontenc}%\n");
        out.push_str("\\usepackage[utf8]{inputenc}%\n");
        out.push_str("\\usepackage{lmodern}%\n");
        out.push_str("\\usepackage{textcomp}%\n");
        out.push_str("\\usepackage{lastpage}%\n");
        for package in &doc.packages {
            if package.options.is_empty() {
                let _ = writeln!(out, "\\usepackage{{{}}}%", package.name);
            } else {
                let _ = writeln!(
                    out,
                    "\\usepackage[{}]{{{}}}%",
                    package.options.join(","),
                    package.name
                );
            }
        }
        out.push_str("%\n");
        for line in &doc.preamble {
            out.push_str(line);
            out.push_str("%\n");
        }
        let _ = writeln!(out, "\\title{{{}}}%", escape_latex(&doc.title));
        let _ = writeln!(out, "\\author{{{}}}%", escape_latex(&doc.author));
        out.push_str("\\date{\\today}%\n");
        out.push_str("%\n");

        out.push_str("\\begin{document}%\n");
        out.push_str("\\normalsize%\n");
        out.push_str("\\maketitle%\n");
        out.push_str("\\tableofcontents%\n");
        out.push_str("\\newpage%\n");
        for section in &doc.sections {
            self.render_section(section, 0, &mut out);
        }
        out.push_str("\\end{document}\n");
        out
    }

    fn render_section(&self, section: &Section, depth: usize, out: &mut String) {
        let command = match depth {
            0 => "section",
            1 => "subsection",
            _ => "subsubsection",
        };
        let _ = writeln!(out, "\\{command}{{{}}}%", escape_latex(&section.title));
        for block in &section.blocks {
            match block {
                Block::Itemize(items) => {
                    out.push_str("\\begin{itemize}%\n");
                    for item in items {
                        let _ = writeln!(out, "\\item {}%", escape_latex(item));
                    }
                    out.push_str("\\end{itemize}%\n");
                }
                Block::Table(table) => self.render_table(table, out),
            }
        }
        for sub in &section.subsections {
            self.render_section(sub, depth + 1, out);
        }
    }

    fn render_table(&self, table: &Table, out: &mut String) {
        let spec: String = table
            .columns
            .iter()
            .map(|c| match c.layout {
                ColumnLayout::Centered => "c",
                ColumnLayout::Wrapping => "X",
                ColumnLayout::CenteredWrapping => "Y",
            })
            .collect::<Vec<_>>()
            .join("|");

        out.push_str("\\begin{table}[H]%\n");
        out.push_str("\\refstepcounter{table}%\n");
        let _ = writeln!(out, "\\begin{{tabularx}}{{\\textwidth}}{{|{spec}|}}%");
        out.push_str("\\toprule%\n");

        let header: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let align = if i == 0 { "|c|" } else { "c|" };
                format!("\\multicolumn{{1}}{{{align}}}{{{}}}", escape_latex(&c.header))
            })
            .collect();
        let _ = writeln!(out, "{}\\\\%", header.join("&"));
        out.push_str("\\hline%\n");

        for (i, row) in table.rows.iter().enumerate() {
            if i > 0 {
                out.push_str("\\hline%\n");
            }
            let cells: Vec<String> = row.iter().map(|cell| self.render_cell(cell)).collect();
            let _ = writeln!(out, "{}\\\\%", cells.join("&"));
        }

        out.push_str("\\bottomrule%\n");
        out.push_str("\\end{tabularx}%\n");
        out.push_str("\\end{table}%\n");
    }

    fn render_cell(&self, cell: &Cell) -> String {
        match cell {
            Cell::Text(text) => escape_latex(text),
            Cell::AtMost(bound) => format!("$\\le$ {bound}"),
            Cell::Wrapped { tokens, separator } => {
                let separator = match separator {
                    Separator::Space => " ",
                    Separator::Comma => ", ",
                    Separator::CommaBreak => ", \\newline ",
                };
                tokens
                    .iter()
                    .map(|token| {
                        let escaped = escape_latex(token);
                        if token.chars().count() > self.wrap_threshold {
                            format!("\\seqsplit{{{escaped}}}")
                        } else {
                            escaped
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(separator)
            }
        }
    }
}
