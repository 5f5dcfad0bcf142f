//! Notebook extraction tool for lopecode HTML files.
//!
//! Lopecode notebooks are single HTML files embedding their modules as
//! `<script type="lope-module" id="…">` blocks and binary attachments as
//! `<script type="lope-file">` blocks. The files can run to many megabytes,
//! so this tool extracts the relevant portion instead of handing the whole
//! file to the model: list the modules, list the cells of one module, read
//! one cell, read one module, or summarize the notebook.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};

use lope_core::schema::ParameterSchema;

use crate::errors::ToolError;
use crate::traits::{LopeTool, ToolContext, ToolOutcome};

const PREVIEW_CHARS: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Notebook parsing
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed notebook: module sources by ID plus file attachments.
struct Notebook {
    modules: BTreeMap<String, String>,
    attachments: Vec<Attachment>,
    size_bytes: usize,
}

struct Attachment {
    id: String,
    file: String,
}

/// One cell definition inside a module source.
struct Cell {
    name: String,
    dependencies: Vec<String>,
    start: usize,
    end: usize,
    preview: String,
}

fn parse_notebook(html: &str) -> Notebook {
    let document = Html::parse_document(html);
    let mut modules = BTreeMap::new();
    let mut attachments = Vec::new();

    if let Ok(selector) = Selector::parse(r#"script[type="lope-module"]"#) {
        for el in document.select(&selector) {
            let id = el.value().attr("id").unwrap_or("unknown").to_owned();
            let source: String = el.text().collect();
            let _ = modules.insert(id, source);
        }
    }

    if let Ok(selector) = Selector::parse(r#"script[type="lope-file"]"#) {
        for el in document.select(&selector) {
            attachments.push(Attachment {
                id: el.value().attr("id").unwrap_or_default().to_owned(),
                file: el.value().attr("file").unwrap_or_default().to_owned(),
            });
        }
    }

    Notebook {
        modules,
        attachments,
        size_bytes: html.len(),
    }
}

/// Matches the head of a cell definition:
/// `const _name = function _name(dep1,dep2){` or `const _name = function*(){`.
fn cell_head_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"const\s+(_\w+)\s*=\s*function\*?\s*\w*\s*\(([^)]*)\)\s*\{").unwrap()
    })
}

/// Extract cell definitions from a module source. The extent of each cell is
/// found by balancing braces from the opening one, so template literals with
/// `${…}` interpolations stay inside their cell.
fn extract_cells(source: &str) -> Vec<Cell> {
    let bytes = source.as_bytes();
    let mut cells = Vec::new();

    for caps in cell_head_pattern().captures_iter(source) {
        let Some(head) = caps.get(0) else { continue };
        let name = caps.get(1).map_or_else(String::new, |m| m.as_str().to_owned());
        let dependencies: Vec<String> = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_owned)
            .collect();

        let mut depth = 1usize;
        let mut pos = head.end();
        while pos < bytes.len() && depth > 0 {
            match bytes[pos] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }

        let content = &source[head.start()..pos];
        let preview = if content.chars().count() > PREVIEW_CHARS {
            let head: String = content.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            content.to_owned()
        };

        cells.push(Cell {
            name,
            dependencies,
            start: head.start(),
            end: pos,
            preview,
        });
    }

    cells
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// The tool
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts modules and cells from lopecode HTML notebooks.
pub struct NotebookTool;

impl NotebookTool {
    fn module<'a>(notebook: &'a Notebook, name: &str) -> Result<&'a str, ToolError> {
        notebook.modules.get(name).map(String::as_str).ok_or_else(|| {
            let available: Vec<&str> = notebook.modules.keys().map(String::as_str).collect();
            ToolError::not_found(format!(
                "Module '{name}' not found. Available modules: {}",
                available.join(", ")
            ))
        })
    }

    fn list_modules(path: &str, notebook: &Notebook) -> ToolOutcome {
        let mut output = format!("Modules in {}:\n", basename(path));
        for (id, source) in &notebook.modules {
            let cell_count = extract_cells(source).len();
            let _ = writeln!(output, "  {id} ({cell_count} cells)");
        }
        let _ = write!(
            output,
            "\nFile attachments: {}",
            notebook.attachments.len()
        );

        let attachments: Vec<Value> = notebook
            .attachments
            .iter()
            .map(|a| json!({"id": a.id, "file": a.file}))
            .collect();

        ToolOutcome::new(format!("Listed {} modules", notebook.modules.len()), output)
            .with_metadata("moduleCount", json!(notebook.modules.len()))
            .with_metadata("attachments", Value::Array(attachments))
    }

    fn list_cells(notebook: &Notebook, module: &str) -> Result<ToolOutcome, ToolError> {
        let source = Self::module(notebook, module)?;
        let cells = extract_cells(source);

        let mut output = format!("Cells in {module}:\n");
        for cell in &cells {
            let mut deps = cell
                .dependencies
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if cell.dependencies.len() > 3 {
                let _ = write!(deps, ", ... (+{})", cell.dependencies.len() - 3);
            }
            let _ = writeln!(output, "  {}: ({deps})", cell.name);
        }

        let listing: Vec<Value> = cells
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "dependencies": c.dependencies,
                    "preview": c.preview,
                })
            })
            .collect();

        Ok(
            ToolOutcome::new(format!("Listed {} cells in {module}", cells.len()), output)
                .with_metadata("cells", Value::Array(listing)),
        )
    }

    fn read_cell(notebook: &Notebook, module: &str, cell: &str) -> Result<ToolOutcome, ToolError> {
        let source = Self::module(notebook, module)?;
        let cells = extract_cells(source);

        // Exact name first, then substring match.
        let found = cells
            .iter()
            .find(|c| c.name == cell)
            .or_else(|| cells.iter().find(|c| c.name.contains(cell)));

        let Some(found) = found else {
            let available: Vec<&str> = cells.iter().map(|c| c.name.as_str()).collect();
            return Err(ToolError::not_found(format!(
                "Cell '{cell}' not found in module '{module}'. Available cells: {}",
                available.join(", ")
            )));
        };

        Ok(ToolOutcome::new(
            format!("Read cell {}", found.name),
            source[found.start..found.end].to_owned(),
        )
        .with_metadata("cell", json!(found.name))
        .with_metadata("dependencies", json!(found.dependencies)))
    }

    fn read_module(notebook: &Notebook, module: &str) -> Result<ToolOutcome, ToolError> {
        let source = Self::module(notebook, module)?;
        Ok(ToolOutcome::new(format!("Read module {module}"), source.to_owned()))
    }

    fn summary(path: &str, notebook: &Notebook) -> ToolOutcome {
        let mut output = format!("Notebook: {}\n", basename(path));
        let _ = writeln!(
            output,
            "Size: {:.1} MB",
            notebook.size_bytes as f64 / 1024.0 / 1024.0
        );
        let _ = writeln!(output, "Modules: {}", notebook.modules.len());
        let _ = writeln!(output, "File attachments: {}\n", notebook.attachments.len());

        let mut total_cells = 0;
        for (id, source) in &notebook.modules {
            let count = extract_cells(source).len();
            total_cells += count;
            let _ = writeln!(output, "  {id}: {count} cells");
        }
        let _ = write!(output, "\nTotal cells: {total_cells}");

        ToolOutcome::new("Notebook summary", output)
            .with_metadata("moduleCount", json!(notebook.modules.len()))
            .with_metadata("cellCount", json!(total_cells))
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid_parameters(format!("'{key}' is required for this action")))
}

#[async_trait]
impl LopeTool for NotebookTool {
    fn name(&self) -> &str {
        "notebook"
    }

    fn description(&self) -> &str {
        "Extracts modules and cells from a lopecode HTML notebook without loading the whole file"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object([
            (
                "path",
                ParameterSchema::string("Path to the lopecode HTML notebook"),
                true,
            ),
            (
                "action",
                ParameterSchema::string_enum(
                    "What to extract",
                    ["list_modules", "list_cells", "read_cell", "read_module", "summary"],
                ),
                true,
            ),
            (
                "module",
                ParameterSchema::string(
                    "Module ID; required for list_cells, read_cell and read_module",
                ),
                false,
            ),
            (
                "cell",
                ParameterSchema::string("Cell name; required for read_cell"),
                false,
            ),
        ])
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let path = required_str(&args, "path")?.to_owned();
        let action = required_str(&args, "action")?.to_owned();

        let html = tokio::fs::read_to_string(&path).await?;
        let notebook = parse_notebook(&html);

        match action.as_str() {
            "list_modules" => Ok(Self::list_modules(&path, &notebook)),
            "list_cells" => Self::list_cells(&notebook, required_str(&args, "module")?),
            "read_cell" => Self::read_cell(
                &notebook,
                required_str(&args, "module")?,
                required_str(&args, "cell")?,
            ),
            "read_module" => Self::read_module(&notebook, required_str(&args, "module")?),
            "summary" => Ok(Self::summary(&path, &notebook)),
            other => Err(ToolError::invalid_parameters(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}
