//! Lays out an evaluation summary as a structured document.
//!
//! Layout: a "Test Summary" section (execution time and pass/fail totals),
//! then "Passed Tests" and "Failed Tests" sections, each with an aggregate
//! and a per-instance subsection when there is something to show.
//!
//! Rows are numbered by a single counter that starts at 1 and runs through
//! aggregate passes, per-instance passes, aggregate failures and per-instance
//! failures, in that order. The numbers exist only in the document.

use serde_json::Value as Json;

use evalreport_core::summary::{EvaluationSummary, TestResult};

use crate::config::ReportConfig;
use crate::document::{
    Block, Cell, Column, ColumnLayout, Document, Package, Section, Separator, Table,
};

/// Build the report document for `summary`. `with_ids` adds a column of
/// failing instance ids to per-instance tables.
pub fn build_document(summary: &EvaluationSummary, with_ids: bool, config: &ReportConfig) -> Document {
    let mut doc = Document::new(&summary.title, &config.author);
    add_preamble(&mut doc, config);

    let (mut aggregate_pass, mut instance_pass) = (Vec::new(), Vec::new());
    let (mut aggregate_fail, mut instance_fail) = (Vec::new(), Vec::new());
    for test in &summary.tests {
        match (test.is_aggregate(), test.passed()) {
            (true, true) => aggregate_pass.push(test),
            (false, true) => instance_pass.push(test),
            (true, false) => aggregate_fail.push(test),
            (false, false) => instance_fail.push(test),
        }
    }

    let mut overview = Section::new("Test Summary");
    overview.blocks.push(Block::Itemize(vec![format!(
        "Execution time: {:.2} seconds",
        summary.execution_time_seconds
    )]));
    overview.blocks.push(Block::Table(summary_table(
        aggregate_pass.len() + instance_pass.len(),
        aggregate_fail.len() + instance_fail.len(),
    )));
    doc.sections.push(overview);

    let mut next_id = 1;
    for (label, aggregate, instance) in [
        ("Passed", &aggregate_pass, &instance_pass),
        ("Failed", &aggregate_fail, &instance_fail),
    ] {
        if aggregate.is_empty() && instance.is_empty() {
            continue;
        }
        let mut section = Section::new(&format!("{label} Tests"));
        if !aggregate.is_empty() {
            let mut sub = Section::new(&format!("{label} Aggregate Tests"));
            sub.blocks
                .push(Block::Table(aggregate_table(aggregate, &mut next_id)));
            section.subsections.push(sub);
        }
        if !instance.is_empty() {
            let mut sub = Section::new(&format!("{label} Per-Instance Tests"));
            sub.blocks.push(Block::Table(instance_table(
                instance,
                with_ids,
                &mut next_id,
            )));
            section.subsections.push(sub);
        }
        doc.sections.push(section);
    }

    doc
}

fn add_preamble(doc: &mut Document, config: &ReportConfig) {
    let margin = format!("{}cm", config.margin_cm);
    let geometry: Vec<String> = ["lmargin", "rmargin", "tmargin", "bmargin"]
        .iter()
        .map(|side| format!("{side}={margin}"))
        .collect();
    doc.add_package(Package {
        name: "geometry".to_string(),
        options: geometry,
    });
    doc.add_package(Package::with_options("placeins", &["section"]));
    doc.add_package(Package::new("float"));
    doc.add_package(Package::with_options("xcolor", &["table"]));
    doc.add_package(Package::new("seqsplit"));
    doc.add_package(Package::new("tabularx"));
    doc.add_package(Package::new("booktabs"));
    // tikz must load after xcolor
    doc.add_package(Package::new("tikz"));

    doc.preamble.extend(
        [
            r"\usetikzlibrary{positioning}",
            r"\aboverulesep=0ex",
            r"\belowrulesep=0ex",
            r"\renewcommand{\arraystretch}{1.2}",
            r"\newcolumntype{Y}{>{\centering\arraybackslash}X}",
            r"\def\seqinsert{\-}",
        ]
        .map(String::from),
    );
}

fn summary_table(passed: usize, failed: usize) -> Table {
    let mut table = Table::new(vec![
        Column::new("Total test #", ColumnLayout::CenteredWrapping),
        Column::new("Total pass #", ColumnLayout::CenteredWrapping),
        Column::new("Total fail #", ColumnLayout::CenteredWrapping),
    ]);
    table.push_row(vec![
        Cell::text(passed + failed),
        Cell::text(passed),
        Cell::text(failed),
    ]);
    table
}

fn description_cell(description: &str) -> Cell {
    Cell::Wrapped {
        tokens: description.split(' ').map(String::from).collect(),
        separator: Separator::Space,
    }
}

fn instance_table(tests: &[&TestResult], with_ids: bool, next_id: &mut usize) -> Table {
    let mut columns = vec![
        Column::new("Test ID", ColumnLayout::Centered),
        Column::new("Test description", ColumnLayout::Wrapping),
        Column::new("Pass threshold", ColumnLayout::Centered),
        Column::new("Failure count", ColumnLayout::Centered),
    ];
    if with_ids {
        columns.push(Column::new("Failure data instance ID", ColumnLayout::Wrapping));
    }
    let mut table = Table::new(columns);

    for test in tests {
        let TestResult::PerInstance {
            description,
            fail_threshold,
            fail_number,
            fail_id,
            ..
        } = test
        else {
            continue;
        };
        let mut row = vec![
            Cell::text(*next_id),
            description_cell(description),
            Cell::AtMost(*fail_threshold),
            Cell::text(fail_number),
        ];
        if with_ids {
            row.push(Cell::Wrapped {
                tokens: fail_id
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(display_value)
                    .collect(),
                separator: Separator::Comma,
            });
        }
        table.push_row(row);
        *next_id += 1;
    }
    table
}

fn aggregate_table(tests: &[&TestResult], next_id: &mut usize) -> Table {
    let mut table = Table::new(vec![
        Column::new("Test ID", ColumnLayout::Centered),
        Column::new("Test description", ColumnLayout::Wrapping),
        Column::new("Input value", ColumnLayout::Wrapping),
    ]);

    for test in tests {
        let TestResult::Aggregate {
            description,
            inputs,
            ..
        } = test
        else {
            continue;
        };
        let inputs = inputs
            .iter()
            .map(|(name, value)| format!("{name}={}", display_value(value)))
            .collect();
        table.push_row(vec![
            Cell::text(*next_id),
            description_cell(description),
            Cell::Wrapped {
                tokens: inputs,
                separator: Separator::CommaBreak,
            },
        ]);
        *next_id += 1;
    }
    table
}

/// Strings render bare; everything else as compact JSON.
fn display_value(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn aggregate(description: &str, passed: bool) -> TestResult {
        let mut inputs = Map::new();
        inputs.insert("acc".into(), json!(0.91));
        inputs.insert("split".into(), json!("val"));
        TestResult::Aggregate {
            description: description.into(),
            passed,
            inputs,
        }
    }

    fn instance(description: &str, passed: bool) -> TestResult {
        TestResult::PerInstance {
            description: description.into(),
            passed,
            fail_threshold: 2,
            fail_number: if passed { 1 } else { 5 },
            fail_id: Some(vec![json!(3), json!("img_7")]),
        }
    }

    fn summary(tests: Vec<TestResult>) -> EvaluationSummary {
        EvaluationSummary {
            title: "Unit".into(),
            timestamp: "2025-01-01 00:00:00.000000".into(),
            execution_time_seconds: 3.14159,
            tests,
        }
    }

    fn first_column(table: &Table) -> Vec<Cell> {
        table.rows.iter().map(|r| r[0].clone()).collect()
    }

    fn section_titles(section: &Section) -> Vec<&str> {
        section.subsections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn ids_follow_emission_order() {
        // Summary order deliberately differs from emission order.
        let doc = build_document(
            &summary(vec![
                aggregate("agg fail", false),
                aggregate("agg pass", true),
                instance("inst pass a", true),
                instance("inst pass b", true),
            ]),
            false,
            &ReportConfig::default(),
        );

        let tables = doc.tables();
        assert_eq!(tables.len(), 4);
        assert_eq!(first_column(tables[1]), vec![Cell::text(1)]);
        assert_eq!(first_column(tables[2]), vec![Cell::text(2), Cell::text(3)]);
        assert_eq!(first_column(tables[3]), vec![Cell::text(4)]);
    }

    #[test]
    fn summary_section_reports_totals_and_time() {
        let doc = build_document(
            &summary(vec![aggregate("a", true), instance("b", false)]),
            false,
            &ReportConfig::default(),
        );

        let overview = &doc.sections[0];
        assert_eq!(overview.title, "Test Summary");
        assert_eq!(
            overview.blocks[0],
            Block::Itemize(vec!["Execution time: 3.14 seconds".into()])
        );
        let totals = &doc.tables()[0].rows[0];
        assert_eq!(totals, &vec![Cell::text(2), Cell::text(1), Cell::text(1)]);
    }

    #[test]
    fn empty_groups_are_omitted() {
        let doc = build_document(
            &summary(vec![instance("only failure", false)]),
            false,
            &ReportConfig::default(),
        );
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Test Summary", "Failed Tests"]);
        assert_eq!(section_titles(&doc.sections[1]), vec!["Failed Per-Instance Tests"]);
    }

    #[test]
    fn subsections_put_aggregate_first() {
        let doc = build_document(
            &summary(vec![instance("i", true), aggregate("a", true)]),
            false,
            &ReportConfig::default(),
        );
        assert_eq!(
            section_titles(&doc.sections[1]),
            vec!["Passed Aggregate Tests", "Passed Per-Instance Tests"]
        );
    }

    #[test]
    fn id_column_only_when_tracking() {
        let tests = vec![instance("i", false)];
        let without = build_document(&summary(tests.clone()), false, &ReportConfig::default());
        assert_eq!(without.tables()[1].columns.len(), 4);

        let with = build_document(&summary(tests), true, &ReportConfig::default());
        let table = with.tables()[1];
        assert_eq!(table.columns.len(), 5);
        assert_eq!(
            table.rows[0][4],
            Cell::Wrapped {
                tokens: vec!["3".into(), "img_7".into()],
                separator: Separator::Comma,
            }
        );
        assert_eq!(table.rows[0][2], Cell::AtMost(2));
    }

    #[test]
    fn aggregate_inputs_render_as_assignments() {
        let doc = build_document(
            &summary(vec![aggregate("accuracy is high", true)]),
            false,
            &ReportConfig::default(),
        );
        let row = &doc.tables()[1].rows[0];
        assert_eq!(
            row[1],
            Cell::Wrapped {
                tokens: vec!["accuracy".into(), "is".into(), "high".into()],
                separator: Separator::Space,
            }
        );
        assert_eq!(
            row[2],
            Cell::Wrapped {
                tokens: vec!["acc=0.91".into(), "split=val".into()],
                separator: Separator::CommaBreak,
            }
        );
    }

    #[test]
    fn tikz_loads_after_xcolor() {
        let doc = build_document(&summary(vec![]), false, &ReportConfig::default());
        let position = |name: &str| doc.packages.iter().position(|p| p.name == name);
        assert!(position("xcolor") < position("tikz"));
        assert_eq!(doc.packages[0].options[0], "lmargin=2cm");
    }
}
