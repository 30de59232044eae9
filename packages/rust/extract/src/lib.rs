//! Statistics-table extraction from rendered HTML.
//!
//! Locates the summary table by its container and table ids, reads the
//! header cells, then reads every body row with the disciplinary-column
//! rule applied (see [`rows`]).

mod rows;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use statgrab_shared::{HeaderRow, Result, StatgrabError, Table, TableConfig};

pub use rows::{RowRules, extract_rows, resolve_column};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse `html` and extract the configured table.
///
/// 1. Locate `#container_id` and the `#table_id` inside it
/// 2. Read the header cells
/// 3. Resolve the disciplinary column and read every body row
/// 4. Validate row widths against the header
#[instrument(skip(html, config), fields(container = %config.container_id, table = %config.table_id))]
pub fn extract_table(html: &str, config: &TableConfig) -> Result<Table> {
    let doc = Html::parse_document(html);
    debug!(html_len = html.len(), "document parsed");

    let table = locate_table(&doc, &config.container_id, &config.table_id)?;
    let headers = extract_headers(table)?;
    let rules = RowRules::new(config, &headers)?;
    let rows = extract_rows(table, &rules)?;

    info!(columns = headers.len(), rows = rows.len(), "table extracted");

    Table::new(headers, rows)
}

// ---------------------------------------------------------------------------
// Table locator
// ---------------------------------------------------------------------------

/// Find the table `#table_id` nested inside `#container_id`.
///
/// A missing element means the page markup changed, so it is reported as
/// [`StatgrabError::NotFound`] rather than as an empty result.
pub fn locate_table<'a>(
    doc: &'a Html,
    container_id: &str,
    table_id: &str,
) -> Result<ElementRef<'a>> {
    let container = doc
        .select(&id_selector(container_id)?)
        .next()
        .ok_or_else(|| StatgrabError::not_found(format!("container #{container_id}")))?;

    container
        .select(&id_selector(table_id)?)
        .find(|el| el.value().name() == "table")
        .ok_or_else(|| {
            StatgrabError::not_found(format!("table #{table_id} inside #{container_id}"))
        })
}

/// Attribute form so ids with CSS meta characters still match.
fn id_selector(id: &str) -> Result<Selector> {
    Selector::parse(&format!(r#"[id="{id}"]"#))
        .map_err(|e| StatgrabError::config(format!("invalid element id {id:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Header extractor
// ---------------------------------------------------------------------------

/// Collect the trimmed text of every header cell, in document order.
///
/// Prefers `thead th`; falls back to every `th` in the table. Empty header
/// text is kept so positions stay aligned with the data cells.
pub fn extract_headers(table: ElementRef<'_>) -> Result<HeaderRow> {
    let thead_th = Selector::parse("thead th").unwrap();
    let any_th = Selector::parse("th").unwrap();

    let mut headers: HeaderRow = table.select(&thead_th).map(cell_text).collect();
    if headers.is_empty() {
        headers = table.select(&any_th).map(cell_text).collect();
    }

    if headers.is_empty() {
        return Err(StatgrabError::not_found("header cells"));
    }

    debug!(?headers, "headers extracted");
    Ok(headers)
}

/// Trimmed text content of an element.
pub(crate) fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Direct element children of `parent` with the given tag name.
pub(crate) fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statgrab_shared::MissingMarkerPolicy;
    use std::fs;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    /// A rendered page with the stats table wrapped the way the live site does it.
    fn page(table_body: &str) -> String {
        format!(
            r#"<html><body>
            <div id="top-team-stats-summary">
              <table id="top-team-stats-summary-grid">{table_body}</table>
            </div>
            </body></html>"#
        )
    }

    // --- Locator ---

    #[test]
    fn missing_container_is_not_found() {
        let html = r#"<html><body><table id="top-team-stats-summary-grid"></table></body></html>"#;
        let err = extract_table(html, &TableConfig::default()).unwrap_err();
        match err {
            StatgrabError::NotFound { what } => assert!(what.contains("top-team-stats-summary")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_table_is_not_found() {
        let html = r#"<html><body><div id="top-team-stats-summary"><p>Loading</p></div></body></html>"#;
        let doc = Html::parse_document(html);
        let err = locate_table(&doc, "top-team-stats-summary", "top-team-stats-summary-grid")
            .unwrap_err();
        assert!(matches!(err, StatgrabError::NotFound { .. }));
    }

    #[test]
    fn table_outside_container_is_ignored() {
        let html = r#"<html><body>
            <div id="top-team-stats-summary"></div>
            <table id="top-team-stats-summary-grid"><tr><td>x</td></tr></table>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert!(locate_table(&doc, "top-team-stats-summary", "top-team-stats-summary-grid").is_err());
    }

    // --- Headers ---

    #[test]
    fn headers_are_trimmed_and_keep_empty_positions() {
        let html = page(
            "<thead><tr><th> R </th><th></th><th>\n Team\n</th></tr></thead>\
             <tbody><tr><td>1</td><td></td><td>Arsenal</td></tr></tbody>",
        );
        let doc = Html::parse_document(&html);
        let table = locate_table(&doc, "top-team-stats-summary", "top-team-stats-summary-grid")
            .unwrap();
        assert_eq!(extract_headers(table).unwrap(), vec!["R", "", "Team"]);
    }

    #[test]
    fn headers_fall_back_to_th_without_thead() {
        let html = page("<tr><th>Team</th><th>Won</th></tr><tr><td>Arsenal</td><td>5</td></tr>");
        let doc = Html::parse_document(&html);
        let table = locate_table(&doc, "top-team-stats-summary", "top-team-stats-summary-grid")
            .unwrap();
        assert_eq!(extract_headers(table).unwrap(), vec!["Team", "Won"]);
    }

    #[test]
    fn table_without_headers_is_not_found() {
        let html = page("<tbody><tr><td>Arsenal</td></tr></tbody>");
        let err = extract_table(&html, &TableConfig::default()).unwrap_err();
        match err {
            StatgrabError::NotFound { what } => assert_eq!(what, "header cells"),
            other => panic!("unexpected error: {other}"),
        }
    }

    // --- Full extraction ---

    #[test]
    fn stub_document_extracts_disciplinary_pair() {
        let html = page(
            r#"<thead><tr><th>Team</th><th>Won</th><th>Disc</th></tr></thead>
            <tbody><tr>
              <td>Arsenal</td><td>5</td>
              <td><span class="yellow-card-box">3</span><span class="red-card-box">0</span></td>
            </tr></tbody>"#,
        );
        let config = TableConfig {
            disciplinary_header: "Disc".into(),
            ..TableConfig::default()
        };

        let table = extract_table(&html, &config).unwrap();
        assert_eq!(table.headers(), ["Team", "Won", "Disc"]);
        assert_eq!(table.rows(), [vec!["Arsenal", "5", "3|0"]]);
    }

    #[test]
    fn fixture_page_extracts_every_team() {
        let html = load_fixture("team_stats.html");
        let table = extract_table(&html, &TableConfig::default()).unwrap();

        assert_eq!(table.width(), 10);
        assert_eq!(table.len(), 4);
        assert_eq!(table.headers()[1], "Team");
        assert_eq!(table.headers()[5], "Discipline");

        let first = &table.rows()[0];
        assert_eq!(first[1], "1. Bayern Munich");
        assert_eq!(first[5], "2|1");

        for row in table.rows() {
            assert_eq!(row.len(), table.width());
        }
    }

    #[test]
    fn fixture_page_with_missing_markers_fails() {
        let html = load_fixture("team_stats_missing_markers.html");
        let err = extract_table(&html, &TableConfig::default()).unwrap_err();
        match err {
            StatgrabError::MissingField { row, column, marker } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Discipline");
                assert_eq!(marker, "yellow-card-box");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fixture_page_with_missing_markers_substitutes_empty() {
        let html = load_fixture("team_stats_missing_markers.html");
        let config = TableConfig {
            missing_marker: MissingMarkerPolicy::Empty,
            ..TableConfig::default()
        };
        let table = extract_table(&html, &config).unwrap();
        assert_eq!(table.rows()[1][5], "|");
    }

    #[test]
    fn ragged_row_is_schema_mismatch() {
        let html = page(
            r#"<thead><tr><th>Team</th><th>Won</th><th>Disc</th></tr></thead>
            <tbody>
              <tr><td>Arsenal</td><td>5</td>
                <td><span class="yellow-card-box">3</span><span class="red-card-box">0</span></td></tr>
              <tr><td>Chelsea</td><td>4</td>
                <td><span class="yellow-card-box">1</span><span class="red-card-box">0</span></td>
                <td>extra</td></tr>
            </tbody>"#,
        );
        let config = TableConfig {
            disciplinary_header: "Disc".into(),
            ..TableConfig::default()
        };
        let err = extract_table(&html, &config).unwrap_err();
        assert!(matches!(
            err,
            StatgrabError::SchemaMismatch {
                row: 1,
                expected: 3,
                found: 4
            }
        ));
    }
}
