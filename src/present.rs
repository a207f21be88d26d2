//! Presentation binding: categorized view and JSON export of a record.
//!
//! [`categorize`] groups record fields into the four display categories of
//! [`crate::schema::Category`]. Within a group, fields appear in schema
//! order and only when their value is present (see
//! [`crate::record::FieldValue::is_present`]). Everything else in the
//! record is listed under [`CategorizedRecord::unclassified`] so nothing the
//! model returned is hidden.
//!
//! [`serialize`] produces the export artifact: pretty-printed UTF-8 JSON with
//! non-ASCII text kept verbatim.

use crate::error::ClaimsError;
use crate::record::{ExtractedRecord, FieldValue};
use crate::schema::{category_fields, field_spec, Category};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One displayable field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayField {
    /// Record key, unchanged.
    pub key: String,
    /// Humanized key, e.g. `Insured Name`.
    pub label: String,
    /// Rendered value.
    pub value: String,
}

impl fmt::Display for DisplayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// The fields of one display category, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayGroup {
    pub category: Category,
    pub fields: Vec<DisplayField>,
}

impl DisplayGroup {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Label: value` lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.fields.iter().map(ToString::to_string).collect()
    }
}

/// A record split into the four display groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedRecord {
    pub groups: [DisplayGroup; 4],
    /// Record entries that belong to no display list, in reply order and
    /// regardless of value.
    pub unclassified: Vec<(String, Value)>,
}

impl CategorizedRecord {
    pub fn group(&self, category: Category) -> &DisplayGroup {
        // `groups` is built from `Category::ALL`, so the index always matches.
        let idx = Category::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default();
        &self.groups[idx]
    }

    pub fn personal(&self) -> &DisplayGroup {
        self.group(Category::Personal)
    }

    pub fn medical(&self) -> &DisplayGroup {
        self.group(Category::Medical)
    }

    pub fn financial(&self) -> &DisplayGroup {
        self.group(Category::Financial)
    }

    pub fn other(&self) -> &DisplayGroup {
        self.group(Category::Other)
    }
}

/// Split `record` into the four display groups.
pub fn categorize(record: &ExtractedRecord) -> CategorizedRecord {
    let groups = Category::ALL.map(|category| DisplayGroup {
        category,
        fields: category_fields(category)
            .filter_map(|spec| {
                let value = record.get(spec.name)?;
                value.is_present().then(|| display_field(spec.name, value))
            })
            .collect(),
    });

    let unclassified: Vec<(String, Value)> = record
        .as_map()
        .iter()
        .filter(|(key, _)| field_spec(key).and_then(|s| s.display).is_none())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    debug!(
        "Categorized {} fields ({} unclassified)",
        groups.iter().map(|g| g.fields.len()).sum::<usize>(),
        unclassified.len()
    );

    CategorizedRecord {
        groups,
        unclassified,
    }
}

fn display_field(key: &str, value: FieldValue<'_>) -> DisplayField {
    DisplayField {
        key: key.to_string(),
        label: humanize(key),
        value: value.to_string(),
    }
}

/// `date_of_birth` → `Date Of Birth`.
///
/// Underscores become spaces; each run of letters starts upper-case and
/// continues lower-case.
pub fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_letter = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Export form of a record: two-space indented JSON, non-ASCII preserved.
pub fn serialize(record: &ExtractedRecord) -> Result<String, ClaimsError> {
    serde_json::to_string_pretty(record)
        .map_err(|e| ClaimsError::Internal(format!("record serialisation failed: {e}")))
}

/// `extracted_data_<original file name>.json`.
///
/// Only the final path component of `original_name` is used.
pub fn export_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("extracted_data_{base}.json")
}

/// Write the export artifact for `record` into `dir`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_export(
    record: &ExtractedRecord,
    dir: impl AsRef<Path>,
    original_name: &str,
) -> Result<PathBuf, ClaimsError> {
    let dir = dir.as_ref();
    let path = dir.join(export_file_name(original_name));
    let json = serialize(record)?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ClaimsError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| ClaimsError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| ClaimsError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> ExtractedRecord {
        match v {
            Value::Object(m) => ExtractedRecord::new(m),
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn humanize_keys() {
        assert_eq!(humanize("insured_name"), "Insured Name");
        assert_eq!(humanize("hkid_number"), "Hkid Number");
        assert_eq!(humanize("sex"), "Sex");
        assert_eq!(humanize("icu_from"), "Icu From");
        assert_eq!(humanize("reason_outside_hk"), "Reason Outside Hk");
    }

    #[test]
    fn groups_follow_schema_order_not_record_order() {
        let r = record(json!({
            "sex": "Female",
            "occupation": "Engineer",
            "insured_name": "Jane Doe"
        }));
        let c = categorize(&r);
        assert_eq!(
            c.personal().lines(),
            vec!["Insured Name: Jane Doe", "Sex: Female", "Occupation: Engineer"]
        );
    }

    #[test]
    fn empty_values_are_excluded() {
        let r = record(json!({
            "insured_name": "",
            "sex": null,
            "other_insurance": false,
            "policy_number": "P-1"
        }));
        let c = categorize(&r);
        assert!(c.personal().is_empty());
        assert_eq!(c.other().lines(), vec!["Policy Number: P-1"]);

        let r = record(json!({ "insured_name": "Jane", "other_insurance": true }));
        let c = categorize(&r);
        assert_eq!(c.personal().lines(), vec!["Insured Name: Jane"]);
        assert_eq!(c.other().lines(), vec!["Other Insurance: Yes"]);
    }

    #[test]
    fn unclassified_fields_are_kept() {
        let r = record(json!({
            "insured_name": "Jane",
            "is_accident": false,
            "mystery_field": "42"
        }));
        let c = categorize(&r);
        let keys: Vec<&str> = c.unclassified.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["is_accident", "mystery_field"]);
    }

    #[test]
    fn groups_are_in_category_order() {
        let c = categorize(&ExtractedRecord::default());
        let cats: Vec<Category> = c.groups.iter().map(|g| g.category).collect();
        assert_eq!(cats, Category::ALL.to_vec());
        assert_eq!(c.group(Category::Financial).category, Category::Financial);
    }

    #[test]
    fn serialize_keeps_non_ascii_and_round_trips() {
        let r = record(json!({
            "insured_name": "Nguyễn Văn An",
            "hospital_name": "養和醫院",
            "claim_benefits": ["Medical Reimbursement"],
            "is_accident": false,
            "icu_from": null
        }));
        let text = serialize(&r).unwrap();
        assert!(text.contains("Nguyễn Văn An"));
        assert!(text.contains("養和醫院"));
        assert!(text.contains("\n  \"insured_name\": "));
        let back = ExtractedRecord::from_json_str(&text).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn export_name_uses_file_name_only() {
        assert_eq!(export_file_name("claim.pdf"), "extracted_data_claim.pdf.json");
        assert_eq!(
            export_file_name("/tmp/uploads/scan 1.png"),
            "extracted_data_scan 1.png.json"
        );
        assert_eq!(export_file_name(""), "extracted_data_document.json");
    }

    #[tokio::test]
    async fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = record(json!({ "insured_name": "Jane Doe" }));
        let path = write_export(&r, dir.path(), "claim.pdf").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "extracted_data_claim.pdf.json");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, serialize(&r).unwrap());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
