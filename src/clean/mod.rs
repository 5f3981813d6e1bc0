//! Cleaning and anonymization of the raw export.
//!
//! This is the only place PII is removed, so it runs before anything is
//! persisted or charted. Text normalization is applied per value and passes
//! nulls through untouched.

use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::Schema;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::schema::{CITY, COMPANY, COUNTRY, column_names, is_pii};
use crate::utils::io::{CsvFormat, read_csv, write_csv};

/// Known spellings of company names, keyed by lower-cased cleaned text
const COMPANY_CANONICAL: [(&str, &str); 5] = [
    ("cap gemini", "capgemini"),
    ("cap-gemini", "capgemini"),
    ("capgemini france", "capgemini"),
    ("capgemini", "capgemini"),
    ("darty", "Darty"),
];

/// Collapse every whitespace run to a single space and trim both ends
#[must_use]
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical spelling of a company name
///
/// Lookup is case-insensitive; names not in the alias table come back with
/// only whitespace cleanup applied.
#[must_use]
pub fn normalize_company(name: &str) -> String {
    let text = clean_text(name);
    let key = text.to_lowercase();
    COMPANY_CANONICAL
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(text, |(_, canonical)| (*canonical).to_string())
}

/// City name in title case ("saint-denis" -> "Saint-Denis")
#[must_use]
pub fn normalize_city(name: &str) -> String {
    let text = clean_text(name);
    let mut out = String::with_capacity(text.len());
    let mut prev_alphabetic = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alphabetic {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        prev_alphabetic = c.is_alphabetic();
    }
    out
}

/// Country code in upper case
#[must_use]
pub fn normalize_country(code: &str) -> String {
    clean_text(code).to_uppercase()
}

/// Apply `f` to every non-null value of a Utf8 column; other types are returned as is
fn map_strings(array: &ArrayRef, f: fn(&str) -> String) -> ArrayRef {
    match array.as_any().downcast_ref::<StringArray>() {
        Some(strings) => Arc::new(strings.iter().map(|v| v.map(f)).collect::<StringArray>()),
        None => Arc::clone(array),
    }
}

/// Drop PII columns and normalize text values
///
/// PII columns that are absent are ignored. Company, city and country
/// columns get their dedicated normalizer; every other Utf8 column gets
/// whitespace cleanup.
pub fn anonymize(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let names = column_names(&schema);
    let companies = COMPANY.present(&names);
    let countries = COUNTRY.present(&names);

    let mut fields = Vec::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let name = field.name().as_str();
        if is_pii(name) {
            continue;
        }
        let normalizer: fn(&str) -> String = if companies.contains(&name) {
            normalize_company
        } else if countries.contains(&name) {
            normalize_country
        } else if name == CITY {
            normalize_city
        } else {
            clean_text
        };
        fields.push(Arc::clone(field));
        columns.push(map_strings(column, normalizer));
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Outcome of a cleaner run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    /// Raw file that was read
    pub raw_path: PathBuf,
    /// Clean file that was written
    pub clean_path: PathBuf,
    /// Number of rows written
    pub rows: usize,
    /// Number of columns written
    pub columns: usize,
    /// PII columns found and dropped
    pub dropped_pii: Vec<String>,
}

/// Read the raw export, anonymize it and write the clean file
pub fn run_cleaner(config: &PipelineConfig) -> Result<CleanSummary> {
    let raw_path = config.raw_path()?;
    let raw = read_csv(&raw_path, CsvFormat::RawExport)?;
    let dropped_pii = column_names(&raw.schema())
        .into_iter()
        .filter(|name| is_pii(name))
        .collect::<Vec<_>>();

    let clean = anonymize(&raw)?;
    let clean_path = config.clean_path();
    write_csv(&clean_path, &clean, CsvFormat::Clean.delimiter())?;

    log::info!(
        "Clean file written: {} ({} rows, dropped PII columns: {:?})",
        clean_path.display(),
        clean.num_rows(),
        dropped_pii
    );
    Ok(CleanSummary {
        raw_path,
        clean_path,
        rows: clean.num_rows(),
        columns: clean.num_columns(),
        dropped_pii,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::io::csv::parse_csv;
    use arrow::array::Array;

    fn strings(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Cap \t  Gemini \n"), "Cap Gemini");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("single"), "single");
    }

    #[test]
    fn test_clean_text_idempotent() {
        for input in ["  a  b ", "x\u{a0}\u{a0}y", "\t\n", "Darty", " M2 -  IT "] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once);
        }
    }

    #[test]
    fn test_normalize_company_aliases() {
        for alias in ["cap gemini", "Cap-Gemini", "CAPGEMINI FRANCE", "  Capgemini ", "cap   gemini"] {
            assert_eq!(normalize_company(alias), "capgemini", "alias {alias:?}");
        }
        assert_eq!(normalize_company("DARTY"), "Darty");
    }

    #[test]
    fn test_normalize_company_unknown_passthrough() {
        assert_eq!(normalize_company("  Thales   Group "), "Thales Group");
        assert_eq!(normalize_company("Société Générale"), "Société Générale");
    }

    #[test]
    fn test_normalize_city_and_country() {
        assert_eq!(normalize_city("  saint-denis "), "Saint-Denis");
        assert_eq!(normalize_city("LYON"), "Lyon");
        assert_eq!(normalize_city("l'isle d'abeau"), "L'Isle D'Abeau");
        assert_eq!(normalize_country(" fr "), "FR");
    }

    #[test]
    fn test_anonymize_drops_pii_and_normalizes() {
        let raw = parse_csv(
            "Nom étudiant;email étudiant;Société;Ville;Pays;Code postal\n\
             Dupont;j@x.fr;cap  gemini;paris;fr;75000\n\
             Martin;;;  lyon ;;69000\n",
            b';',
        )
        .unwrap();

        let clean = anonymize(&raw).unwrap();
        let names = column_names(&clean.schema());
        assert_eq!(names, vec!["Société", "Ville", "Pays", "Code postal"]);
        assert_eq!(
            strings(&clean, "Société"),
            vec![Some("capgemini".to_string()), None]
        );
        assert_eq!(
            strings(&clean, "Ville"),
            vec![Some("Paris".to_string()), Some("Lyon".to_string())]
        );
        assert_eq!(strings(&clean, "Pays"), vec![Some("FR".to_string()), None]);
        assert_eq!(clean.num_rows(), 2);
    }

    #[test]
    fn test_anonymize_without_pii_columns() {
        let raw = parse_csv("Societe,pays\n darty ,be\n", b',').unwrap();
        let clean = anonymize(&raw).unwrap();
        assert_eq!(column_names(&clean.schema()), vec!["Societe", "pays"]);
        assert_eq!(strings(&clean, "Societe"), vec![Some("Darty".to_string())]);
        assert_eq!(strings(&clean, "pays"), vec![Some("BE".to_string())]);
    }

    #[test]
    fn test_anonymize_only_pii_keeps_row_count() {
        let raw = parse_csv("Nom étudiant,email étudiant\nA,a@x\nB,b@x\n", b',').unwrap();
        let clean = anonymize(&raw).unwrap();
        assert_eq!(clean.num_columns(), 0);
        assert_eq!(clean.num_rows(), 2);
    }
}
