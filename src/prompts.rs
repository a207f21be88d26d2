//! The extraction prompt sent with every document.
//!
//! The prompt is rendered once from [`crate::schema::FIELDS`] and cached for
//! the process lifetime. It is deliberately not configurable: the display
//! lists are derived from the same table, and a free-form override would let
//! the two drift apart.

use crate::schema::{group_fields, FieldGroup, FieldSpec, SCHEMA_VERSION};
use once_cell::sync::Lazy;
use std::fmt::Write as _;

const PREAMBLE: &str = "You are a professional assistant specialised in processing insurance documents.
Your task is to extract the key information from the images of the insurance claim form below.
The images are the pages of one document, in page order.
Return the result as a single JSON object.
The fields to extract are:";

const OUTPUT_RULES: &str = "IMPORTANT: Return only the content of the JSON object. Do not add markdown such as ```json, comments or explanations.
Use the field names exactly as listed. Omit a field or use null when it is not present on the form.";

static EXTRACTION_PROMPT: Lazy<String> = Lazy::new(render_prompt);

/// The extraction prompt for the current [`SCHEMA_VERSION`].
pub fn extraction_prompt() -> &'static str {
    &EXTRACTION_PROMPT
}

fn render_prompt() -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(PREAMBLE);
    prompt.push('\n');

    for group in FieldGroup::ALL {
        let _ = write!(prompt, "\n--- {} ---\n", group.title());
        for spec in group_fields(group) {
            prompt.push_str(&field_line(spec));
            prompt.push('\n');
        }
    }

    prompt.push('\n');
    prompt.push_str(OUTPUT_RULES);
    prompt.push_str(&format!("\n(schema {SCHEMA_VERSION})"));
    prompt
}

fn field_line(spec: &FieldSpec) -> String {
    match spec.shape.prompt_hint() {
        Some(hint) => format!("{}: {} ({}).", spec.name, spec.description, hint),
        None => format!("{}: {}.", spec.name, spec.description),
    }
}
