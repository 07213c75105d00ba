//! Server-rendered HTML page for manual entry and CSV upload

use nids_lib::{FeatureSchema, Label, ResultTable};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Labelled rows shown in the page before the table is cut off
pub const MAX_RESULT_ROWS: usize = 50;

/// Message shown under the single-flow form
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    Prediction(&'a str),
    Error(&'a str),
}

/// What the batch section shows after an upload
#[derive(Debug, Clone, Copy)]
pub enum BatchPanel<'a> {
    /// Labelled table plus the uploaded CSV, posted back for the download
    Result {
        table: &'a ResultTable,
        upload: &'a str,
    },
    Error(&'a str),
}

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; background-color: #f0f2f6; display: flex; }
aside { background-color: #003366; color: white; width: 16rem; min-height: 100vh; padding: 1.5rem; box-sizing: border-box; }
aside h2 { margin-top: 0; }
main { flex: 1; padding: 2rem; max-width: 48rem; }
section { background: white; border-radius: 0.5rem; padding: 1.25rem; margin-bottom: 1.5rem; }
label { display: block; margin-top: 0.6rem; font-size: 0.9rem; }
input[type=number], input[type=file] { width: 100%; padding: 0.3rem; box-sizing: border-box; }
button { margin-top: 1rem; background-color: #0066cc; color: white; border: none; border-radius: 0.3rem; padding: 0.5rem 1.2rem; cursor: pointer; }
.success { background: #e6f4ea; color: #1e6b34; padding: 0.75rem; border-radius: 0.3rem; margin-top: 1rem; }
.error { background: #fdecea; color: #8a1f11; padding: 0.75rem; border-radius: 0.3rem; margin-top: 1rem; }
.results { overflow-x: auto; margin-top: 1rem; }
table { border-collapse: collapse; font-size: 0.85rem; }
th, td { border: 1px solid #d0d4dc; padding: 0.25rem 0.5rem; text-align: right; }
td.attack { color: #8a1f11; font-weight: bold; }
td.normal { color: #1e6b34; }
"#;

/// Form values pre-filled for every schema field
pub fn default_values(schema: FeatureSchema) -> BTreeMap<String, String> {
    schema
        .names()
        .iter()
        .map(|name| (name.to_string(), schema.input_default(name).to_string()))
        .collect()
}

/// Render the index page.
///
/// `values` holds what the single-flow inputs should display; fields absent
/// from it fall back to the schema's input defaults.
pub fn render_index(
    schema: FeatureSchema,
    values: &BTreeMap<String, String>,
    notice: Option<Notice<'_>>,
    batch: Option<BatchPanel<'_>>,
) -> String {
    let mut fields = String::new();
    for name in schema.names() {
        let value = values
            .get(*name)
            .cloned()
            .unwrap_or_else(|| schema.input_default(name).to_string());
        // Writing into a String cannot fail
        let _ = write!(
            fields,
            r#"<label for="{name}">{name}</label><input type="number" step="any" id="{name}" name="{name}" value="{value}">"#,
            name = escape_html(name),
            value = escape_html(&value),
        );
    }

    let notice = match notice {
        Some(Notice::Prediction(text)) => {
            format!(r#"<div class="success">{}</div>"#, escape_html(text))
        }
        Some(Notice::Error(text)) => format!(r#"<div class="error">{}</div>"#, escape_html(text)),
        None => String::new(),
    };

    let batch = match batch {
        Some(BatchPanel::Result { table, upload }) => render_results(table, upload),
        Some(BatchPanel::Error(text)) => format!(
            r#"<div class="error">Error during batch prediction: {}</div>"#,
            escape_html(text)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Network Intrusion Detection System</title>
<style>{STYLE}</style>
</head>
<body>
<aside>
<h2>NIDS Demo</h2>
<p>Classify network flows as normal traffic or attacks, one at a time or as a CSV batch.</p>
<h3>About this model</h3>
<p>A RandomForest trained on a synthetic CICIDS2017-style dataset. Columns missing from an upload are filled with 0; extra columns are ignored.</p>
<p>Expected features:</p>
<ul>{features}</ul>
</aside>
<main>
<h1>Network Intrusion Detection System</h1>
<section>
<h3>Single flow</h3>
<form method="post" action="/predict">
{fields}
<button type="submit">Predict</button>
</form>
{notice}
</section>
<section>
<h3>Batch prediction</h3>
<form method="post" action="/batch" enctype="multipart/form-data">
<label for="file">CSV file with flow features</label>
<input type="file" id="file" name="file" accept=".csv,text/csv">
<button type="submit">Predict batch</button>
</form>
{batch}
</section>
</main>
</body>
</html>
"#,
        features = schema
            .names()
            .iter()
            .map(|n| format!("<li>{}</li>", escape_html(n)))
            .collect::<String>(),
    )
}

fn render_results(table: &ResultTable, upload: &str) -> String {
    let attacks = table.count(Label::Attack);
    let mut html = format!(
        r#"<div class="success">{} flows classified: {} attack, {} normal</div><div class="results"><table><thead><tr>"#,
        table.len(),
        attacks,
        table.len() - attacks
    );
    for column in table.columns() {
        let _ = write!(html, "<th>{}</th>", escape_html(column));
    }
    html.push_str("</tr></thead><tbody>");

    for (row, label) in table.rows().take(MAX_RESULT_ROWS) {
        html.push_str("<tr>");
        for cell in row.cells() {
            let _ = write!(html, "<td>{}</td>", escape_html(&cell.to_string()));
        }
        let class = match label {
            Label::Attack => "attack",
            Label::Normal => "normal",
        };
        let _ = write!(html, r#"<td class="{}">{}</td></tr>"#, class, label);
    }
    html.push_str("</tbody></table></div>");

    if table.len() > MAX_RESULT_ROWS {
        let _ = write!(
            html,
            "<p>Showing the first {} of {} rows. Download the CSV for all of them.</p>",
            MAX_RESULT_ROWS,
            table.len()
        );
    }

    let _ = write!(
        html,
        r#"<form method="post" action="/batch/download"><textarea name="csv" hidden>{}</textarea><button type="submit">Download predictions.csv</button></form>"#,
        escape_html(upload)
    );
    html
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
