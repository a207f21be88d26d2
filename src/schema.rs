//! The claim-form field schema.
//!
//! [`FIELDS`] is the single source of truth for what the model is asked to
//! extract and how the result is grouped for display. The extraction prompt
//! ([`crate::prompts`]) and the display lists ([`crate::present`]) are both
//! generated from this table, so a field added here shows up in both places.
//!
//! Two independent groupings exist per field:
//!
//! * [`FieldGroup`]: the section of the claim form the field belongs to; it
//!   structures the prompt.
//! * [`Category`]: the display group, if any. Not every field is displayed
//!   in a category; the rest stay reachable through the raw record.

use serde::Serialize;
use std::fmt;

/// Section of the claim form a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldGroup {
    /// Part 1, filled in by the insured person.
    InsuredPerson,
    /// Part 2, filled in by the attending physician.
    Medical,
    /// Payment details.
    Financial,
    /// Anything else on the form.
    Miscellaneous,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::InsuredPerson,
        FieldGroup::Medical,
        FieldGroup::Financial,
        FieldGroup::Miscellaneous,
    ];

    /// Section heading used in the prompt.
    pub fn title(self) -> &'static str {
        match self {
            FieldGroup::InsuredPerson => "Insured person",
            FieldGroup::Medical => "Medical information",
            FieldGroup::Financial => "Financial information",
            FieldGroup::Miscellaneous => "Other information",
        }
    }
}

/// Display group of the categorized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Personal,
    Medical,
    Financial,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Medical,
        Category::Financial,
        Category::Other,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::Personal => "Personal information",
            Category::Medical => "Medical information",
            Category::Financial => "Financial information",
            Category::Other => "Other information",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Value shape the prompt asks for. Not enforced on the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldShape {
    Text,
    /// `DD/MM/YYYY`.
    Date,
    Flag,
    /// Array of strings.
    List,
}

impl FieldShape {
    /// Format hint appended to the field description in the prompt.
    pub fn prompt_hint(self) -> Option<&'static str> {
        match self {
            FieldShape::Text => None,
            FieldShape::Date => Some("format DD/MM/YYYY"),
            FieldShape::Flag => Some("true or false"),
            FieldShape::List => Some("an array of strings"),
        }
    }
}

/// One named field of the claim form.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    pub shape: FieldShape,
    pub description: &'static str,
    pub display: Option<Category>,
}

const fn field(
    name: &'static str,
    group: FieldGroup,
    shape: FieldShape,
    description: &'static str,
    display: Option<Category>,
) -> FieldSpec {
    FieldSpec {
        name,
        group,
        shape,
        description,
        display,
    }
}

use Category as C;
use FieldGroup as G;
use FieldShape as S;

/// Bump whenever [`FIELDS`] or the prompt wording changes; part of the
/// memoization key.
pub const SCHEMA_VERSION: &str = "claims-2024.1";

/// Every field the model is asked for, in prompt order.
///
/// Within each [`Category`] the display order is the order of this table.
#[rustfmt::skip]
pub static FIELDS: &[FieldSpec] = &[
    // ── Insured person ──────────────────────────────────────────────────
    field("insured_name", G::InsuredPerson, S::Text, "Name of the insured person (part 1)", Some(C::Personal)),
    field("policyholder_name", G::InsuredPerson, S::Text, "Name of the policyholder", Some(C::Personal)),
    field("hkid_number", G::InsuredPerson, S::Text, "HKID number of the insured person", Some(C::Personal)),
    field("date_of_birth", G::InsuredPerson, S::Date, "Date of birth", Some(C::Personal)),
    field("sex", G::InsuredPerson, S::Text, "Sex ('Male' or 'Female')", Some(C::Personal)),
    field("occupation", G::InsuredPerson, S::Text, "Occupation", Some(C::Personal)),
    field("signature_date", G::InsuredPerson, S::Date, "Date the insured person signed", Some(C::Personal)),
    field("policy_number", G::InsuredPerson, S::Text, "Policy or certificate number", Some(C::Other)),
    field("product_type", G::InsuredPerson, S::Text, "Product type ('Individual' or 'Group')", Some(C::Other)),
    field("claim_benefits", G::InsuredPerson, S::List, "Benefits claimed, e.g. ['Medical Reimbursement', 'Hospital Income']", Some(C::Other)),
    field("other_insurance", G::InsuredPerson, S::Flag, "Whether a claim was also filed with another insurer", Some(C::Other)),
    field("other_insurance_company", G::InsuredPerson, S::Text, "Name of the other insurer, if any", None),
    field("other_policy_number", G::InsuredPerson, S::Text, "Policy number with the other insurer, if any", None),
    field("doctor_name", G::InsuredPerson, S::Text, "Name of the treating doctor", Some(C::Other)),
    field("treatment_date", G::InsuredPerson, S::Date, "Date of treatment", Some(C::Other)),
    field("accident_date", G::InsuredPerson, S::Date, "Date of the accident, if applicable", None),
    field("accident_time", G::InsuredPerson, S::Text, "Time of the accident, if applicable", None),
    field("accident_place", G::InsuredPerson, S::Text, "Place of the accident, if applicable", None),
    field("accident_description", G::InsuredPerson, S::Text, "Description of the accident, if applicable", None),
    // ── Medical ─────────────────────────────────────────────────────────
    field("patient_name", G::Medical, S::Text, "Name of the patient (part 2, completed by the doctor)", Some(C::Medical)),
    field("admission_date", G::Medical, S::Date, "Hospital admission date", Some(C::Medical)),
    field("discharge_date", G::Medical, S::Date, "Hospital discharge date", Some(C::Medical)),
    field("symptoms", G::Medical, S::Text, "Main symptoms listed", Some(C::Medical)),
    field("final_diagnosis", G::Medical, S::Text, "Doctor's final diagnosis", Some(C::Medical)),
    field("operation_performed", G::Medical, S::Text, "Operations or procedures performed", Some(C::Medical)),
    field("is_accident", G::Medical, S::Flag, "Whether the hospitalisation was caused by an accident", None),
    field("hospital_name", G::Medical, S::Text, "Name of the hospital", Some(C::Medical)),
    field("first_consultation_date", G::Medical, S::Date, "Date of the first consultation for this condition", None),
    field("symptoms_duration", G::Medical, S::Text, "How long symptoms existed before the first consultation", None),
    field("attending_physician_name", G::Medical, S::Text, "Name of the attending physician", Some(C::Medical)),
    field("hospital_ward", G::Medical, S::Text, "Ward class ('Private', 'Semi-private', 'Ward', etc.)", None),
    field("icu_from", G::Medical, S::Date, "Start of ICU stay, if applicable", None),
    field("icu_to", G::Medical, S::Date, "End of ICU stay, if applicable", None),
    field("operation_date", G::Medical, S::Date, "Date of the operation", Some(C::Medical)),
    field("mode_of_anesthesia", G::Medical, S::Text, "Mode of anaesthesia (e.g. 'GA', 'LA', 'MAC', 'Sedation')", None),
    field("professional_comment", G::Medical, S::Text, "Doctor's professional comment", None),
    field("is_pre_existing", G::Medical, S::Flag, "Whether the condition existed before the policy was bought", None),
    field("condition_causes", G::Medical, S::List, "Related causes of the condition, e.g. ['Pregnancy', 'Self-inflicted injury', 'Infertility']", None),
    // ── Financial ───────────────────────────────────────────────────────
    field("bank_name", G::Financial, S::Text, "Bank receiving the payment", Some(C::Financial)),
    field("bank_account_number", G::Financial, S::Text, "Bank account number", Some(C::Financial)),
    field("account_holder_name", G::Financial, S::Text, "Name of the account holder", Some(C::Financial)),
    field("currency", G::Financial, S::Text, "Account currency ('HKD', 'USD', etc.)", Some(C::Financial)),
    field("branch_number", G::Financial, S::Text, "Bank branch number", Some(C::Financial)),
    field("bank_code", G::Financial, S::Text, "Bank code", Some(C::Financial)),
    field("fps_identifier", G::Financial, S::Text, "Phone number, email or FPS ID for receiving the payment", Some(C::Financial)),
    // ── Miscellaneous ───────────────────────────────────────────────────
    field("reason_outside_hk", G::Miscellaneous, S::Text, "Reason for medical expenses outside Hong Kong/Macau, if applicable", None),
    field("policyowner_hkid", G::Miscellaneous, S::Text, "HKID number of the policy owner", None),
    field("policyowner_signature_date", G::Miscellaneous, S::Date, "Date the policy owner signed", None),
];

/// Look up a field by name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Fields in a display category, in table order.
pub fn category_fields(category: Category) -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(move |f| f.display == Some(category))
}

/// Fields of a prompt section, in table order.
pub fn group_fields(group: FieldGroup) -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(move |f| f.group == group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn names(category: Category) -> Vec<&'static str> {
        category_fields(category).map(|f| f.name).collect()
    }

    #[test]
    fn field_names_are_unique() {
        let mut seen = HashSet::new();
        for f in FIELDS {
            assert!(seen.insert(f.name), "duplicate field {}", f.name);
        }
    }

    #[test]
    fn field_names_are_snake_case() {
        for f in FIELDS {
            assert!(
                f.name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "{} is not snake_case",
                f.name
            );
        }
    }

    #[test]
    fn personal_display_order() {
        assert_eq!(
            names(Category::Personal),
            vec![
                "insured_name",
                "policyholder_name",
                "hkid_number",
                "date_of_birth",
                "sex",
                "occupation",
                "signature_date",
            ]
        );
    }

    #[test]
    fn medical_display_order() {
        assert_eq!(
            names(Category::Medical),
            vec![
                "patient_name",
                "admission_date",
                "discharge_date",
                "symptoms",
                "final_diagnosis",
                "operation_performed",
                "hospital_name",
                "attending_physician_name",
                "operation_date",
            ]
        );
    }

    #[test]
    fn financial_and_other_display_order() {
        assert_eq!(
            names(Category::Financial),
            vec![
                "bank_name",
                "bank_account_number",
                "account_holder_name",
                "currency",
                "branch_number",
                "bank_code",
                "fps_identifier",
            ]
        );
        assert_eq!(
            names(Category::Other),
            vec![
                "policy_number",
                "product_type",
                "claim_benefits",
                "other_insurance",
                "doctor_name",
                "treatment_date",
            ]
        );
    }

    #[test]
    fn every_group_has_fields() {
        for group in FieldGroup::ALL {
            assert!(group_fields(group).next().is_some(), "{group:?} is empty");
        }
    }

    #[test]
    fn lookup_by_name() {
        let f = field_spec("claim_benefits").expect("known field");
        assert_eq!(f.shape, FieldShape::List);
        assert!(field_spec("favourite_colour").is_none());
    }
}
