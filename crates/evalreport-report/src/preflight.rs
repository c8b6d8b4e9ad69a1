//! Explicit dependency preflight for report generation.
//!
//! Nothing here runs implicitly: callers invoke [`check_dependencies`] before
//! a run when they want missing tooling reported up front, with a hint on how
//! to fix it, instead of as a raw failure halfway through.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::PreflightConfig;
use crate::error::ReportError;

const GRAPHVIZ_HINT: &str =
    "test reports require graphviz; see https://www.graphviz.org/download for installation instructions";

const LOCALE_HINT: &str = "the system locale is not configured correctly; set it explicitly, \
     e.g. `export LC_ALL=en_US.UTF-8` and `export LANG=en_US.UTF-8` in your shell profile";

/// Check that the graph tool is reachable and the process locale is usable.
pub async fn check_dependencies(config: &PreflightConfig) -> Result<(), ReportError> {
    check_graph_tool(&config.graph_tool).await?;
    check_locale(current_locale().as_deref())?;
    tracing::debug!(graph_tool = %config.graph_tool, "dependency preflight passed");
    Ok(())
}

/// Run `<program> -V` and require it to succeed.
pub async fn check_graph_tool(program: &str) -> Result<(), ReportError> {
    let status = Command::new(program)
        .arg("-V")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            tracing::debug!(program, code = ?status.code(), "graph tool check failed");
            Err(graphviz_missing())
        }
        Err(e) => {
            tracing::debug!(program, error = %e, "graph tool could not be started");
            Err(graphviz_missing())
        }
    }
}

fn graphviz_missing() -> ReportError {
    ReportError::DependencyMissing {
        capability: "graphviz",
        hint: GRAPHVIZ_HINT.to_string(),
    }
}

/// The effective locale name: the first non-empty of `LC_ALL`, `LC_CTYPE`
/// and `LANG`.
pub fn current_locale() -> Option<String> {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}

/// Accept an unset locale, `C`, `POSIX`, or
/// `language[_territory][.codeset][@modifier]`.
pub fn check_locale(locale: Option<&str>) -> Result<(), ReportError> {
    let Some(locale) = locale else {
        return Ok(());
    };
    if is_valid_locale(locale) {
        Ok(())
    } else {
        Err(ReportError::DependencyMissing {
            capability: "locale",
            hint: format!("unrecognized locale '{locale}': {LOCALE_HINT}"),
        })
    }
}

fn is_valid_locale(locale: &str) -> bool {
    if matches!(locale, "C" | "POSIX") {
        return true;
    }

    let (rest, modifier) = match locale.split_once('@') {
        Some((rest, modifier)) => (rest, Some(modifier)),
        None => (locale, None),
    };
    let (rest, codeset) = match rest.split_once('.') {
        Some((rest, codeset)) => (rest, Some(codeset)),
        None => (rest, None),
    };
    let (language, territory) = match rest.split_once('_') {
        Some((language, territory)) => (language, Some(territory)),
        None => (rest, None),
    };

    let language_ok = matches!(language, "C" | "POSIX")
        || ((2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_alphabetic()));
    let territory_ok = territory.is_none_or(|t| {
        !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric())
    });
    let codeset_ok = codeset.is_none_or(|c| {
        !c.is_empty() && c.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    });
    let modifier_ok = modifier.is_none_or(|m| !m.is_empty());

    language_ok && territory_ok && codeset_ok && modifier_ok
}
