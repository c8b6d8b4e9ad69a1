//! Report configuration and discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for document rendering and compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Compiler programs tried in order; the first one found is used.
    #[serde(default = "default_compilers")]
    pub compilers: Vec<String>,
    /// Table tokens longer than this many characters are split across lines.
    #[serde(default = "default_wrap_threshold")]
    pub wrap_threshold: usize,
    /// Page margin on every side, in centimeters.
    #[serde(default = "default_margin_cm")]
    pub margin_cm: f64,
    /// Author line under the title.
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub preflight: PreflightConfig,
}

/// Settings for the dependency preflight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Graph-rendering program that must be reachable.
    #[serde(default = "default_graph_tool")]
    pub graph_tool: String,
}

fn default_compilers() -> Vec<String> {
    vec!["latexmk".to_string(), "pdflatex".to_string()]
}
fn default_wrap_threshold() -> usize {
    27
}
fn default_margin_cm() -> f64 {
    2.0
}
fn default_author() -> String {
    format!("evalreport {}", env!("CARGO_PKG_VERSION"))
}
fn default_graph_tool() -> String {
    "dot".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            compilers: default_compilers(),
            wrap_threshold: default_wrap_threshold(),
            margin_cm: default_margin_cm(),
            author: default_author(),
            preflight: PreflightConfig::default(),
        }
    }
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            graph_tool: default_graph_tool(),
        }
    }
}

/// Expand `${VAR}` references from the environment; unset variables expand
/// to nothing. Expanded values are inserted verbatim, never re-scanned, and an
/// unterminated `${` is kept as written.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + 2 + len];
        out.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `evalreport.toml` in the current directory
/// 2. `~/.config/evalreport/config.toml`
pub fn load_config() -> Result<ReportConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ReportConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("evalreport.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ReportConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ReportConfig::default(),
    };

    config.compilers = config
        .compilers
        .iter()
        .map(|c| resolve_env_vars(c))
        .collect();
    config.author = resolve_env_vars(&config.author);
    config.preflight.graph_tool = resolve_env_vars(&config.preflight.graph_tool);

    anyhow::ensure!(
        config.wrap_threshold > 0,
        "wrap_threshold must be at least 1"
    );
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("evalreport"))
}
