//! CSV export and import.
//!
//! Layout: a `ResourceKey` column followed by one column per culture. Fields
//! are trimmed on import and an empty field means "no translation".

use super::FormatError;
use crate::resource::{LocalizationResource, AUTHOR_IMPORT};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::debug;

pub const RESOURCE_KEY_COLUMN: &str = "ResourceKey";
pub const CSV_MIME_TYPE: &str = "text/csv";

/// A rendered export, ready to be served as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub content: String,
    pub mime_type: &'static str,
    pub file_name: String,
}

/// Resources read from a CSV file, plus the culture columns that were
/// recognized.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub resources: Vec<LocalizationResource>,
    pub cultures: Vec<String>,
}

pub fn export(
    resources: &[LocalizationResource],
    cultures: &[String],
) -> Result<ExportResult, FormatError> {
    export_at(resources, cultures, Utc::now())
}

/// Render `resources` ordered by key, one column per entry in `cultures`.
pub fn export_at(
    resources: &[LocalizationResource],
    cultures: &[String],
    exported_at: DateTime<Utc>,
) -> Result<ExportResult, FormatError> {
    let mut sorted: Vec<&LocalizationResource> = resources.iter().collect();
    sorted.sort_by(|a, b| a.resource_key.cmp(&b.resource_key));

    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut header = Vec::with_capacity(cultures.len() + 1);
    header.push(RESOURCE_KEY_COLUMN);
    header.extend(cultures.iter().map(String::as_str));
    writer.write_record(&header)?;

    for resource in sorted {
        let mut row = Vec::with_capacity(cultures.len() + 1);
        row.push(resource.resource_key.as_str());
        for culture in cultures {
            row.push(
                resource
                    .translation(culture)
                    .map(|t| t.value.as_str())
                    .unwrap_or(""),
            );
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Csv(e.into_error().into()))?;

    Ok(ExportResult {
        content: String::from_utf8(bytes)?,
        mime_type: CSV_MIME_TYPE,
        file_name: format!("localization-resources-{}.csv", exported_at.format("%Y%m%d")),
    })
}

/// Parse CSV content into resources.
///
/// # Arguments
/// * `content` - CSV text with a header row
/// * `cultures` - Configured cultures; other columns are ignored
///
/// # Returns
/// * `Err(FormatError::MissingResourceKeyColumn)` if the header lacks the key column
/// * `Err(FormatError::EmptyKey)` for the first row whose key is blank
pub fn parse(content: &str, cultures: &[String]) -> Result<ParseResult, FormatError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let key_index = headers
        .iter()
        .position(|h| h == RESOURCE_KEY_COLUMN)
        .ok_or(FormatError::MissingResourceKeyColumn)?;

    // (column index, configured culture spelling)
    let columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_index)
        .filter_map(|(i, header)| {
            let culture = cultures.iter().find(|c| c.eq_ignore_ascii_case(header));
            if culture.is_none() {
                debug!("Ignoring CSV column '{}'", header);
            }
            culture.map(|c| (i, c.clone()))
        })
        .collect();

    let mut resources = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let key = record.get(key_index).unwrap_or("");
        if key.is_empty() {
            return Err(FormatError::EmptyKey { row });
        }

        let mut resource = LocalizationResource::new(key);
        resource.author = AUTHOR_IMPORT.to_string();
        for (column, culture) in &columns {
            match record.get(*column) {
                Some(value) if !value.is_empty() => {
                    resource.set_translation(culture, value);
                }
                _ => {}
            }
        }
        resources.push(resource);
    }

    Ok(ParseResult {
        resources,
        cultures: columns.into_iter().map(|(_, culture)| culture).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn cultures(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ==================== Export Tests ====================

    #[test]
    fn test_export_header_and_rows_sorted() {
        let resources = vec![
            LocalizationResource::new("B.Key").with_translation("en", "bee"),
            LocalizationResource::new("A.Key")
                .with_translation("en", "ay")
                .with_translation("no", "a"),
        ];

        let result = export(&resources, &cultures(&["en", "no"])).unwrap();
        let lines: Vec<&str> = result.content.lines().collect();

        assert_eq!(lines, vec!["ResourceKey,en,no", "A.Key,ay,a", "B.Key,bee,"]);
    }

    #[test]
    fn test_export_quotes_commas() {
        let resources =
            vec![LocalizationResource::new("A").with_translation("en", "one, two")];

        let result = export(&resources, &cultures(&["en"])).unwrap();
        assert!(result.content.contains("A,\"one, two\""));
    }

    #[test]
    fn test_export_file_name_and_mime() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let result = export_at(&[], &cultures(&["en"]), at).unwrap();

        assert_eq!(result.file_name, "localization-resources-20240307.csv");
        assert_eq!(result.mime_type, "text/csv");
        assert_eq!(result.content.trim(), "ResourceKey,en");
    }

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_trims_fields() {
        let content = "ResourceKey , en , no\n  A.Key ,  hello , hei \n";
        let parsed = parse(content, &cultures(&["en", "no"])).unwrap();

        assert_eq!(parsed.resources.len(), 1);
        let resource = &parsed.resources[0];
        assert_eq!(resource.resource_key, "A.Key");
        assert_eq!(resource.value_for("en", false), Some("hello"));
        assert_eq!(resource.value_for("no", false), Some("hei"));
        assert_eq!(resource.author, AUTHOR_IMPORT);
    }

    #[test]
    fn test_parse_missing_key_column_is_fatal() {
        let content = "Key,en\nA,hello\n";
        let result = parse(content, &cultures(&["en"]));
        assert!(matches!(result, Err(FormatError::MissingResourceKeyColumn)));
    }

    #[test]
    fn test_parse_empty_key_reports_row() {
        let content = "ResourceKey,en\nA,hello\n  ,orphan\n";
        let result = parse(content, &cultures(&["en"]));
        assert!(matches!(result, Err(FormatError::EmptyKey { row: 3 })));
    }

    #[test]
    fn test_parse_ignores_unconfigured_columns() {
        let content = "ResourceKey,en,fr\nA,hello,bonjour\n";
        let parsed = parse(content, &cultures(&["en"])).unwrap();

        assert_eq!(parsed.cultures, cultures(&["en"]));
        assert_eq!(parsed.resources[0].translations.len(), 1);
        assert!(parsed.resources[0].translation("fr").is_none());
    }

    #[test]
    fn test_parse_empty_field_means_no_translation() {
        let content = "ResourceKey,en,no\nA,,hei\n";
        let parsed = parse(content, &cultures(&["en", "no"])).unwrap();

        assert!(parsed.resources[0].translation("en").is_none());
        assert_eq!(parsed.resources[0].value_for("no", false), Some("hei"));
    }

    #[test]
    fn test_parse_short_rows_are_tolerated() {
        let content = "ResourceKey,en,no\nA,hello\n";
        let parsed = parse(content, &cultures(&["en", "no"])).unwrap();

        assert_eq!(parsed.resources[0].value_for("en", false), Some("hello"));
        assert!(parsed.resources[0].translation("no").is_none());
    }

    #[test]
    fn test_parse_matches_culture_case_insensitively() {
        let content = "ResourceKey,EN-us\nA,hello\n";
        let parsed = parse(content, &cultures(&["en-US"])).unwrap();

        assert_eq!(parsed.resources[0].value_for("en-US", false), Some("hello"));
    }

    // ==================== Property Tests ====================

    fn value_strategy() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z0-9,\"]([A-Za-z0-9 ,\"]{0,12}[A-Za-z0-9,\"])?")
    }

    proptest! {
        #[test]
        fn test_export_then_parse_reconstructs_resources(
            rows in proptest::collection::btree_map(
                "[A-Za-z][A-Za-z0-9.]{0,16}",
                (value_strategy(), value_strategy()),
                0..12,
            )
        ) {
            let cultures = cultures(&["en", "no"]);
            let resources: Vec<LocalizationResource> = rows
                .iter()
                .map(|(key, (en, no))| {
                    let mut resource = LocalizationResource::new(key.as_str());
                    if let Some(en) = en {
                        resource.set_translation("en", en);
                    }
                    if let Some(no) = no {
                        resource.set_translation("no", no);
                    }
                    resource
                })
                .collect();

            let exported = export(&resources, &cultures).unwrap();
            let parsed = parse(&exported.content, &cultures).unwrap();

            let reconstructed: BTreeMap<String, (Option<String>, Option<String>)> = parsed
                .resources
                .iter()
                .map(|r| (
                    r.resource_key.clone(),
                    (
                        r.value_for("en", false).map(str::to_string),
                        r.value_for("no", false).map(str::to_string),
                    ),
                ))
                .collect();

            prop_assert_eq!(reconstructed, rows);
        }
    }
}
