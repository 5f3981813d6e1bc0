//! Column catalogue of the internship export.
//!
//! Names are the exact headers of the export. PII columns are listed here so
//! that every stage checks against the same set.

pub mod field_mapping;

pub use field_mapping::ColumnAliases;

use arrow::datatypes::Schema;

/// Student name (PII)
pub const STUDENT_NAME: &str = "Nom étudiant";
/// Student email (PII)
pub const STUDENT_EMAIL: &str = "email étudiant";

/// Columns that must never leave the cleaning stage
pub const PII_COLUMNS: [&str; 2] = [STUDENT_NAME, STUDENT_EMAIL];

/// Cohort label, first source for the year
pub const COHORT: &str = "Promotion";
/// Subject description, second source for the year
pub const SUBJECT: &str = "Sujet";
/// City of the host company
pub const CITY: &str = "Ville";

/// Company column and its alternative spelling
pub const COMPANY: ColumnAliases = ColumnAliases::new("company", &["Société", "Societe"]);
/// Country column and its lower-case spelling
pub const COUNTRY: ColumnAliases = ColumnAliases::new("country", &["Pays", "pays"]);

/// Text sources for the year, in priority order
pub const YEAR_SOURCES: [&str; 2] = [COHORT, SUBJECT];

/// Columns the export is expected to contain; used to detect drift
pub const EXPECTED_COLUMNS: [&str; 11] = [
    "Programme",
    COHORT,
    SUBJECT,
    "Domaine de stage",
    "Société",
    "Adresse société",
    "Code postal",
    CITY,
    "Pays",
    STUDENT_NAME,
    STUDENT_EMAIL,
];

/// Whether a column name is a declared PII column
#[must_use]
pub fn is_pii(column: &str) -> bool {
    PII_COLUMNS.contains(&column)
}

/// Whether a column name belongs to the expected export layout
#[must_use]
pub fn is_expected(column: &str) -> bool {
    EXPECTED_COLUMNS.contains(&column)
}

/// Column names of a schema, in order
#[must_use]
pub fn column_names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}

/// Expected columns absent from `schema`, in catalogue order
#[must_use]
pub fn missing_expected_columns(schema: &Schema) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|name| schema.index_of(name).is_err())
        .collect()
}

/// Roles the mart builder requires that no column of `columns` can fill
#[must_use]
pub fn unresolved_roles<S: AsRef<str>>(columns: &[S]) -> Vec<&'static str> {
    [COMPANY, COUNTRY]
        .iter()
        .filter(|aliases| aliases.resolve(columns).is_none())
        .map(|aliases| aliases.role)
        .collect()
}
