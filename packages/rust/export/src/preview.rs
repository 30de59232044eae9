//! Fixed-width text preview of the first rows of a table.

use statgrab_shared::Table;

/// Render the header and the first `limit` rows as aligned text columns,
/// each row prefixed with its position.
pub fn render_preview(table: &Table, limit: usize) -> String {
    let shown = &table.rows()[..limit.min(table.len())];

    let index_width = shown.len().saturating_sub(1).to_string().len();
    let mut widths: Vec<usize> = table.headers().iter().map(|h| h.chars().count()).collect();
    for row in shown {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, "", index_width, table.headers(), &widths);
    for (i, row) in shown.iter().enumerate() {
        push_line(&mut out, &i.to_string(), index_width, row, &widths);
    }

    if table.len() > shown.len() {
        out.push_str(&format!("... {} more rows\n", table.len() - shown.len()));
    }
    out.push_str(&format!("[{} rows x {} columns]\n", table.len(), table.width()));
    out
}

fn push_line(out: &mut String, index: &str, index_width: usize, cells: &[String], widths: &[usize]) {
    let mut line = format!("{index:>index_width$}");
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str("  ");
        line.push_str(&format!("{cell:>width$}"));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
