//! The `evalreport init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    let path = Path::new("evalreport.toml");
    if path.exists() {
        println!("evalreport.toml already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("Created evalreport.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit evalreport.toml to pick your LaTeX compilers");
    println!("  2. Run: evalreport preflight");
    println!("  3. Run: evalreport render --summary <resources/NAME.json>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# evalreport configuration

# LaTeX compilers tried in order; the first one found on PATH is used.
# With none available, reports are written as .tex source only.
compilers = ["latexmk", "pdflatex"]

# Table tokens longer than this many characters may break mid-word.
wrap_threshold = 27

# Page margin on every side, in centimeters.
margin_cm = 2.0

# author = "${USER}"

[preflight]
# Graph-rendering program that must answer `-V`.
graph_tool = "dot"
"#;
