//! Body-row extraction and the disciplinary-column rule.
//!
//! The disciplinary cell carries no text of its own: it holds two marker
//! elements (yellow and red card counts). Its field value is the two marker
//! texts joined by the configured separator, e.g. `2|1`.

use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use statgrab_shared::{DataRow, MissingMarkerPolicy, Result, StatgrabError, TableConfig};

use crate::{cell_text, child_elements};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Compiled per-table extraction rules.
#[derive(Debug)]
pub struct RowRules {
    /// Column index of the disciplinary cell.
    pub disciplinary_index: usize,
    /// Header text of that column (for error messages).
    pub column_name: String,
    yellow: Marker,
    red: Marker,
    separator: String,
    missing: MissingMarkerPolicy,
}

#[derive(Debug)]
struct Marker {
    class: String,
    selector: Selector,
}

impl Marker {
    fn new(class: &str) -> Result<Self> {
        let selector = Selector::parse(&format!(r#"[class~="{class}"]"#))
            .map_err(|e| StatgrabError::config(format!("invalid marker class {class:?}: {e}")))?;
        Ok(Self {
            class: class.to_string(),
            selector,
        })
    }

    fn text_in(&self, cell: ElementRef<'_>) -> Option<String> {
        cell.select(&self.selector).next().map(cell_text)
    }
}

impl RowRules {
    /// Resolve the disciplinary column against `headers` and compile the
    /// marker selectors.
    pub fn new(config: &TableConfig, headers: &[String]) -> Result<Self> {
        let disciplinary_index = resolve_column(headers, config)?;
        Ok(Self {
            disciplinary_index,
            column_name: headers[disciplinary_index].clone(),
            yellow: Marker::new(&config.yellow_class)?,
            red: Marker::new(&config.red_class)?,
            separator: config.separator.clone(),
            missing: config.missing_marker,
        })
    }

    fn marker_text(&self, marker: &Marker, cell: ElementRef<'_>, row: usize) -> Result<String> {
        match (marker.text_in(cell), self.missing) {
            (Some(text), _) => Ok(text),
            (None, MissingMarkerPolicy::Empty) => {
                debug!(row, marker = %marker.class, "marker absent, substituting empty");
                Ok(String::new())
            }
            (None, MissingMarkerPolicy::Error) => Err(StatgrabError::MissingField {
                row,
                column: self.column_name.clone(),
                marker: marker.class.clone(),
            }),
        }
    }

    fn disciplinary_value(&self, cell: ElementRef<'_>, row: usize) -> Result<String> {
        let yellow = self.marker_text(&self.yellow, cell, row)?;
        let red = self.marker_text(&self.red, cell, row)?;
        Ok(format!("{yellow}{}{red}", self.separator))
    }
}

/// Pick the disciplinary column index.
///
/// A header whose trimmed text equals `disciplinary_header` (ignoring case)
/// wins; otherwise `disciplinary_index` is used. An index past the last
/// header is [`StatgrabError::NotFound`].
pub fn resolve_column(headers: &[String], config: &TableConfig) -> Result<usize> {
    let wanted = config.disciplinary_header.trim();

    if !wanted.is_empty() {
        if let Some(index) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        {
            debug!(index, header = wanted, "disciplinary column matched by header");
            return Ok(index);
        }
        warn!(
            header = wanted,
            index = config.disciplinary_index,
            "no header matches the disciplinary column, falling back to index"
        );
    }

    if config.disciplinary_index >= headers.len() {
        return Err(StatgrabError::not_found(format!(
            "disciplinary column {} (table has {} columns)",
            config.disciplinary_index,
            headers.len()
        )));
    }

    Ok(config.disciplinary_index)
}

// ---------------------------------------------------------------------------
// Row extractor
// ---------------------------------------------------------------------------

/// Read every body row of `table` in document order.
///
/// Rows are the `tr` children of the table's `tbody` sections; cells are
/// each row's `td` children. Rows without any `td` are skipped. A table
/// with no body rows at all has not rendered and is reported as
/// [`StatgrabError::NotFound`].
pub fn extract_rows(table: ElementRef<'_>, rules: &RowRules) -> Result<Vec<DataRow>> {
    let mut rows = Vec::new();

    for tr in child_elements(table, "tbody").flat_map(|tbody| child_elements(tbody, "tr")) {
        let cells: Vec<ElementRef<'_>> = child_elements(tr, "td").collect();
        if cells.is_empty() {
            debug!(after = rows.len(), "skipping row without data cells");
            continue;
        }

        let row_index = rows.len();
        let mut row = DataRow::with_capacity(cells.len());
        for (col, cell) in cells.into_iter().enumerate() {
            if col == rules.disciplinary_index {
                row.push(rules.disciplinary_value(cell, row_index)?);
            } else {
                row.push(cell_text(cell));
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(StatgrabError::not_found("body rows"));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn rows_of(body: &str, config: &TableConfig, names: &[&str]) -> Result<Vec<DataRow>> {
        let html = format!(r#"<table id="t">{body}</table>"#);
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("table").unwrap();
        let table = doc.select(&sel).next().unwrap();
        let rules = RowRules::new(config, &headers(names))?;
        extract_rows(table, &rules)
    }

    fn disc_cell(yellow: &str, red: &str) -> String {
        format!(
            r#"<td><span class="card yellow-card-box">{yellow}</span><span class="card red-card-box">{red}</span></td>"#
        )
    }

    #[test]
    fn yellow_and_red_joined_with_separator() {
        let body = format!(
            "<tbody><tr><td>a</td><td>b</td><td>c</td><td>d</td>{}</tr></tbody>",
            disc_cell("2", "1")
        );
        let names = ["R", "Team", "Goals", "Shots", "Disc"];
        let config = TableConfig {
            disciplinary_header: String::new(),
            ..TableConfig::default()
        };
        let rows = rows_of(&body, &config, &names).unwrap();
        assert_eq!(rows, vec![vec!["a", "b", "c", "d", "2|1"]]);
    }

    #[test]
    fn custom_separator() {
        let body = format!("<tbody><tr><td>Arsenal</td>{}</tr></tbody>", disc_cell("3", "0"));
        let config = TableConfig {
            separator: "/".into(),
            ..TableConfig::default()
        };
        let rows = rows_of(&body, &config, &["Team", "Discipline"]).unwrap();
        assert_eq!(rows[0][1], "3/0");
    }

    #[test]
    fn missing_both_markers_is_missing_field() {
        let body = "<tbody><tr><td>Arsenal</td><td>-</td></tr></tbody>";
        let err = rows_of(body, &TableConfig::default(), &["Team", "Discipline"]).unwrap_err();
        assert!(matches!(
            err,
            StatgrabError::MissingField { row: 0, ref marker, .. } if marker == "yellow-card-box"
        ));
    }

    #[test]
    fn missing_red_marker_only() {
        let body = r#"<tbody><tr><td>Arsenal</td>
            <td><span class="yellow-card-box">4</span></td></tr></tbody>"#;
        let err = rows_of(body, &TableConfig::default(), &["Team", "Discipline"]).unwrap_err();
        assert!(matches!(
            err,
            StatgrabError::MissingField { ref marker, .. } if marker == "red-card-box"
        ));

        let config = TableConfig {
            missing_marker: MissingMarkerPolicy::Empty,
            ..TableConfig::default()
        };
        let rows = rows_of(body, &config, &["Team", "Discipline"]).unwrap();
        assert_eq!(rows[0][1], "4|");
    }

    #[test]
    fn other_cells_are_trimmed_text() {
        let body = format!(
            "<tbody><tr><td>\n  <a href=\"/t/1\">Bayern</a> </td>{}</tr></tbody>",
            disc_cell(" 5 ", "0")
        );
        let rows = rows_of(&body, &TableConfig::default(), &["Team", "Discipline"]).unwrap();
        assert_eq!(rows[0], vec!["Bayern", "5|0"]);
    }

    #[test]
    fn rows_without_data_cells_are_skipped() {
        let body = format!(
            "<tbody><tr><th>Sub header</th></tr><tr><td>Arsenal</td>{}</tr><tr></tr></tbody>",
            disc_cell("1", "0")
        );
        let rows = rows_of(&body, &TableConfig::default(), &["Team", "Discipline"]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn multiple_tbody_sections_keep_document_order() {
        let body = format!(
            "<tbody><tr><td>A</td>{}</tr></tbody><tbody><tr><td>B</td>{}</tr></tbody>",
            disc_cell("1", "0"),
            disc_cell("2", "0")
        );
        let rows = rows_of(&body, &TableConfig::default(), &["Team", "Discipline"]).unwrap();
        let teams: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(teams, ["A", "B"]);
    }

    #[test]
    fn empty_body_is_not_found() {
        let err = rows_of("<tbody></tbody>", &TableConfig::default(), &["Team", "Discipline"])
            .unwrap_err();
        assert!(matches!(err, StatgrabError::NotFound { ref what } if what == "body rows"));
    }

    // --- Column resolution ---

    #[test]
    fn header_name_beats_index() {
        let names = headers(&["Team", "Won", "Lost", "Drawn", "Goals", "Discipline"]);
        assert_eq!(resolve_column(&names, &TableConfig::default()).unwrap(), 5);
    }

    #[test]
    fn header_match_ignores_case_and_whitespace() {
        let names = headers(&["Team", " DISCIPLINE "]);
        assert_eq!(resolve_column(&names, &TableConfig::default()).unwrap(), 1);
    }

    #[test]
    fn falls_back_to_index_when_header_absent() {
        let names = headers(&["R", "Team", "Goals", "Shots", "Cards", "Rating"]);
        assert_eq!(resolve_column(&names, &TableConfig::default()).unwrap(), 4);
    }

    #[test]
    fn index_past_header_width_is_not_found() {
        let names = headers(&["Team", "Won"]);
        let err = resolve_column(&names, &TableConfig::default()).unwrap_err();
        assert!(matches!(err, StatgrabError::NotFound { .. }));
    }

    #[test]
    fn invalid_marker_class_is_config_error() {
        let config = TableConfig {
            yellow_class: r#"bad"class"#.into(),
            ..TableConfig::default()
        };
        let err = RowRules::new(&config, &headers(&["Team", "Discipline"])).unwrap_err();
        assert!(matches!(err, StatgrabError::Config { .. }));
    }
}
