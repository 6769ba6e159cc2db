//! Core handler: renders Jupyter notebooks (nbformat 4) to HTML.
//!
//! # Responsibilities
//! - Check the notebook's structure (`cells`, `nbformat`)
//! - Render markdown, code and raw cells plus their outputs
//! - Honour the call context: fail fast, race the render, stop between cells
//!
//! # Design Decisions
//! - Rendering is CPU-bound and runs on the blocking pool
//! - Markdown goes through Comrak with raw HTML escaped
//! - Rich `text/html` outputs are sanitised with Ammonia before embedding

use async_trait::async_trait;
use comrak::Options;
use serde_json::{Map, Value};

use crate::service::context::CallContext;
use crate::service::contract::{ConversionRequest, ConversionResponse, Handler};
use crate::service::error::ServiceError;

const SUPPORTED_NBFORMAT: u64 = 4;
const DEFAULT_LANGUAGE: &str = "python";
const DEFAULT_TITLE: &str = "Notebook";

/// The concrete `Convert` implementation at the bottom of every chain.
#[derive(Debug, Clone, Default)]
pub struct NotebookConverter;

impl NotebookConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for NotebookConverter {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let worker_ctx = ctx.clone();
        let render = tokio::task::spawn_blocking(move || render_notebook(&worker_ctx, &req.document));

        tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            joined = render => match joined {
                Ok(result) => result.map(|html| ConversionResponse { html }),
                Err(err) => Err(ServiceError::conversion(format!("renderer aborted: {err}"))),
            },
        }
    }
}

/// Render a notebook document into a complete HTML page.
pub fn render_notebook(ctx: &CallContext, document: &Value) -> Result<String, ServiceError> {
    let notebook = document
        .as_object()
        .ok_or_else(|| ServiceError::conversion("notebook must be a JSON object"))?;

    if let Some(version) = notebook.get("nbformat") {
        match version.as_u64() {
            Some(SUPPORTED_NBFORMAT) => {}
            Some(other) => {
                return Err(ServiceError::conversion(format!(
                    "unsupported nbformat version {other}"
                )))
            }
            None => return Err(ServiceError::conversion("nbformat must be an integer")),
        }
    }

    let cells = notebook
        .get("cells")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::conversion("notebook has no `cells` array"))?;

    let metadata = notebook.get("metadata").and_then(Value::as_object);
    let language = kernel_language(metadata);
    let title = metadata
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TITLE);

    let options = markdown_options();
    let mut body = String::new();
    for (index, cell) in cells.iter().enumerate() {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        render_cell(&mut body, index, cell, &language, &options)?;
    }

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<main class=\"notebook\">\n{}</main>\n</body>\n</html>\n",
        html_escape(title),
        body
    ))
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.math_dollars = true;
    options.render.escape = true;
    options
}

fn kernel_language(metadata: Option<&Map<String, Value>>) -> String {
    let Some(metadata) = metadata else {
        return DEFAULT_LANGUAGE.to_string();
    };
    metadata
        .get("kernelspec")
        .and_then(|k| k.get("language"))
        .or_else(|| metadata.get("language_info").and_then(|l| l.get("name")))
        .and_then(Value::as_str)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

fn render_cell(
    out: &mut String,
    index: usize,
    cell: &Value,
    language: &str,
    options: &Options<'static>,
) -> Result<(), ServiceError> {
    let cell_type = cell
        .get("cell_type")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::conversion(format!("cell {index} has no cell_type")))?;
    let source = multiline(cell.get("source"));

    match cell_type {
        "markdown" => {
            out.push_str("<div class=\"cell markdown\">\n");
            out.push_str(&comrak::markdown_to_html(&source, options));
            out.push_str("</div>\n");
        }
        "code" => {
            out.push_str("<div class=\"cell code\">\n");
            out.push_str(&format!(
                "<div class=\"input\"><pre><code class=\"language-{}\">{}</code></pre></div>\n",
                html_escape(language),
                html_escape(&source)
            ));
            if let Some(outputs) = cell.get("outputs").and_then(Value::as_array) {
                for output in outputs {
                    render_output(out, output);
                }
            }
            out.push_str("</div>\n");
        }
        "raw" => {
            out.push_str(&format!(
                "<div class=\"cell raw\"><pre>{}</pre></div>\n",
                html_escape(&source)
            ));
        }
        other => {
            return Err(ServiceError::conversion(format!(
                "unsupported cell type `{other}` at cell {index}"
            )))
        }
    }
    Ok(())
}

fn render_output(out: &mut String, output: &Value) {
    match output.get("output_type").and_then(Value::as_str) {
        Some("stream") => {
            let name = output.get("name").and_then(Value::as_str).unwrap_or("stdout");
            out.push_str(&format!(
                "<pre class=\"output stream {}\">{}</pre>\n",
                html_escape(name),
                html_escape(&multiline(output.get("text")))
            ));
        }
        Some("execute_result") | Some("display_data") => {
            if let Some(data) = output.get("data") {
                render_mime_bundle(out, data);
            }
        }
        Some("error") => {
            let ename = output.get("ename").and_then(Value::as_str).unwrap_or("Error");
            let evalue = output.get("evalue").and_then(Value::as_str).unwrap_or_default();
            out.push_str(&format!(
                "<pre class=\"output error\">{}: {}</pre>\n",
                html_escape(ename),
                html_escape(evalue)
            ));
        }
        _ => {}
    }
}

fn render_mime_bundle(out: &mut String, data: &Value) {
    if let Some(html) = data.get("text/html") {
        out.push_str(&format!(
            "<div class=\"output html\">{}</div>\n",
            ammonia::clean(&multiline(Some(html)))
        ));
        return;
    }

    for mime in ["image/png", "image/jpeg"] {
        if let Some(image) = data.get(mime) {
            let encoded: String = multiline(Some(image))
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            out.push_str(&format!(
                "<img class=\"output image\" src=\"data:{};base64,{}\">\n",
                mime,
                html_escape(&encoded)
            ));
            return;
        }
    }

    if let Some(text) = data.get("text/plain") {
        out.push_str(&format!(
            "<pre class=\"output text\">{}</pre>\n",
            html_escape(&multiline(Some(text)))
        ));
    }
}

/// nbformat stores multi-line text either as one string or a list of lines.
fn multiline(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
