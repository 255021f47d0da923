//! Conversion engine backed by the `docling` command-line tool.
//!
//! Each conversion runs one `docling` process that writes all four exports
//! (`.md`, `.json`, `.txt`, `.doctags`) into a private [`TempDir`]. The
//! outputs are read into memory before the directory is dropped, so the
//! returned [`DoclingDocument`] owns no files.
//!
//! ```text
//! docling <source> --to md --to json --to text --to doctags
//!         --output <tmp> --ocr|--no-ocr --tables|--no-tables
//!         --enrich-formula|--no-enrich-formula
//! ```

use super::{ConversionEngine, ConvertedDocument, DocumentSource, PipelineOptions};
use crate::error::EngineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").unwrap());

/// Lines of stderr kept in a [`EngineError::CommandFailed`].
const STDERR_LINES: usize = 5;

/// Engine that shells out to `docling`.
#[derive(Debug, Clone)]
pub struct DoclingCliEngine {
    command: PathBuf,
    version: String,
}

impl DoclingCliEngine {
    /// Locate `command` (a path or a name on `PATH`) and check that it runs.
    pub fn new(command: &str) -> Result<Self, EngineError> {
        let resolved = which::which(command).map_err(|e| EngineError::NotFound {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        let output = Command::new(&resolved)
            .arg("--version")
            .output()
            .map_err(|e| EngineError::Unavailable {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::Unavailable {
                command: command.to_string(),
                reason: format!(
                    "--version exited with {:?}: {}",
                    output.status.code(),
                    first_lines(&String::from_utf8_lossy(&output.stderr), STDERR_LINES)
                ),
            });
        }

        let version = parse_version(&String::from_utf8_lossy(&output.stdout))
            .unwrap_or_else(|| "unknown".to_string());
        info!("Using docling {} at {}", version, resolved.display());

        Ok(Self {
            command: resolved,
            version,
        })
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl ConversionEngine for DoclingCliEngine {
    fn describe(&self) -> String {
        format!("docling {}", self.version)
    }

    fn convert(
        &self,
        source: &DocumentSource,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, EngineError> {
        let out_dir = TempDir::new()?;
        let args = build_args(source, options, out_dir.path());
        debug!("Running {} {:?}", self.command.display(), args);

        let output = Command::new(&self.command).args(&args).output()?;
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command: self.command.display().to_string(),
                code: output.status.code(),
                stderr: first_lines(&String::from_utf8_lossy(&output.stderr), STDERR_LINES),
            });
        }

        let document = DoclingDocument::read_from(out_dir.path())?;
        Ok(Box::new(document))
    }
}

/// Command-line arguments for one conversion.
pub fn build_args(
    source: &DocumentSource,
    options: &PipelineOptions,
    out_dir: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(16);
    match source {
        DocumentSource::Url(url) => args.push(url.as_str().into()),
        DocumentSource::Path(path) => args.push(path.as_os_str().to_owned()),
    }
    for to in ["md", "json", "text", "doctags"] {
        args.push("--to".into());
        args.push(to.into());
    }
    args.push("--output".into());
    args.push(out_dir.as_os_str().to_owned());
    args.push(if options.do_ocr { "--ocr" } else { "--no-ocr" }.into());
    args.push(if options.do_table_structure { "--tables" } else { "--no-tables" }.into());
    args.push(
        if options.do_formula_enrichment {
            "--enrich-formula"
        } else {
            "--no-enrich-formula"
        }
        .into(),
    );
    args
}

/// Extract the first version number from `docling --version` output.
pub fn parse_version(stdout: &str) -> Option<String> {
    VERSION_RE
        .captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn first_lines(s: &str, n: usize) -> String {
    s.lines().take(n).collect::<Vec<_>>().join("\n")
}

// ── Converted document ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    Markdown,
    Json,
    Text,
    Doctags,
}

impl OutputKind {
    fn matches(self, file_name: &str) -> bool {
        match self {
            OutputKind::Markdown => file_name.ends_with(".md"),
            OutputKind::Json => file_name.ends_with(".json"),
            OutputKind::Doctags => {
                file_name.ends_with(".doctags") || file_name.ends_with(".doctags.txt")
            }
            OutputKind::Text => {
                file_name.ends_with(".txt") && !file_name.ends_with(".doctags.txt")
            }
        }
    }
}

fn find_output(files: &[(String, PathBuf)], kind: OutputKind) -> Option<&PathBuf> {
    files
        .iter()
        .find(|(name, _)| kind.matches(name))
        .map(|(_, path)| path)
}

/// The four exports of one docling run, held in memory.
#[derive(Debug, Clone)]
pub struct DoclingDocument {
    markdown: Option<String>,
    dict: serde_json::Value,
    text: Option<String>,
    doctags: Option<String>,
    /// File stem shared by the outputs, e.g. `report` for `report.json`.
    stem: String,
}

impl DoclingDocument {
    /// Load the outputs docling wrote into `dir`. The JSON export is required.
    pub fn read_from(dir: &Path) -> Result<Self, EngineError> {
        let mut files: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .collect();
        files.sort();

        let json_path =
            find_output(&files, OutputKind::Json).ok_or_else(|| EngineError::MissingOutput {
                path: dir.join("*.json"),
            })?;
        let stem = json_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw = std::fs::read_to_string(json_path)?;
        let dict = serde_json::from_str(&raw).map_err(|e| EngineError::InvalidOutput {
            path: json_path.clone(),
            detail: e.to_string(),
        })?;

        let read_opt = |kind: OutputKind| -> Result<Option<String>, EngineError> {
            match find_output(&files, kind) {
                Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
                None => Ok(None),
            }
        };

        Ok(Self {
            markdown: read_opt(OutputKind::Markdown)?,
            text: read_opt(OutputKind::Text)?,
            doctags: read_opt(OutputKind::Doctags)?,
            dict,
            stem,
        })
    }

    /// The output directory is gone by the time an export runs, so a missing
    /// export is reported by file name only.
    fn require(&self, value: &Option<String>, ext: &str) -> Result<String, EngineError> {
        value.clone().ok_or_else(|| EngineError::MissingOutput {
            path: PathBuf::from(format!("{}.{ext}", self.stem)),
        })
    }
}

/// Pages in a DoclingDocument JSON: a map keyed by page number, or a list.
pub fn page_count_of(dict: &serde_json::Value) -> usize {
    match dict.get("pages") {
        Some(serde_json::Value::Object(pages)) => pages.len(),
        Some(serde_json::Value::Array(pages)) => pages.len(),
        _ => 0,
    }
}

impl ConvertedDocument for DoclingDocument {
    fn page_count(&self) -> usize {
        page_count_of(&self.dict)
    }

    fn export_to_markdown(&self) -> Result<String, EngineError> {
        self.require(&self.markdown, "md")
    }

    fn export_to_dict(&self) -> Result<serde_json::Value, EngineError> {
        Ok(self.dict.clone())
    }

    fn export_to_doctags(&self) -> Result<String, EngineError> {
        self.require(&self.doctags, "doctags")
    }

    fn export_to_text(&self) -> Result<String, EngineError> {
        self.require(&self.text, "txt")
    }
}
