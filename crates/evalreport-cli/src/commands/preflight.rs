//! The `evalreport preflight` command.

use std::path::PathBuf;

use anyhow::Result;

use evalreport_report::config::load_config_from;
use evalreport_report::preflight::check_dependencies;
use evalreport_report::LatexReportCompiler;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    check_dependencies(&config.preflight).await?;
    println!("{}: ok", config.preflight.graph_tool);

    let compiler = LatexReportCompiler::new(config);
    match compiler.locate_compiler() {
        Some(path) => println!("LaTeX compiler: {}", path.display()),
        None => println!(
            "LaTeX compiler: none of {} found, reports will be written as source only",
            compiler.config().compilers.join(", ")
        ),
    }

    println!("All dependencies available.");
    Ok(())
}
