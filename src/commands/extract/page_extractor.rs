use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{CandidateRecord, RawPage};
use crate::util::preview;

use super::{CompletionClient, CompletionError, PageNormalizer, build_extraction_prompt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct PageExtraction {
    pub(super) page_number: u32,
    pub(super) candidates: Vec<CandidateRecord>,
    pub(super) malformed_response: bool,
    pub(super) skipped_records: usize,
}

/// Only a failed model call is an error. Unparseable output yields an empty
/// extraction and records missing a name or manufacturer are skipped.
pub(super) fn extract_page(
    page: &RawPage,
    normalizer: &PageNormalizer,
    client: &dyn CompletionClient,
) -> Result<PageExtraction, CompletionError> {
    let text = normalizer.normalize(&page.text);
    let prompt = build_extraction_prompt(page.page_number, &text);
    let response = client.complete(&prompt)?;
    Ok(parse_page_response(page.page_number, &response))
}

pub(super) fn parse_page_response(page_number: u32, response: &str) -> PageExtraction {
    let mut extraction = PageExtraction {
        page_number,
        ..PageExtraction::default()
    };

    let items = match serde_json::from_str::<Value>(response) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!(
                page = page_number,
                kind = json_kind(&other),
                "model response is not a JSON array; page yields no candidates"
            );
            extraction.malformed_response = true;
            return extraction;
        }
        Err(error) => {
            warn!(
                page = page_number,
                error = %error,
                response = %preview(response, 120),
                "model response is not valid JSON; page yields no candidates"
            );
            extraction.malformed_response = true;
            return extraction;
        }
    };

    for (index, item) in items.iter().enumerate() {
        match candidate_from_value(page_number, item) {
            Some(candidate) => extraction.candidates.push(candidate),
            None => {
                debug!(
                    page = page_number,
                    index,
                    item = %preview(&item.to_string(), 120),
                    "skipping record without product_name or manufacturer"
                );
                extraction.skipped_records += 1;
            }
        }
    }

    extraction
}

fn candidate_from_value(page_number: u32, item: &Value) -> Option<CandidateRecord> {
    let object = item.as_object()?;
    let product_name = non_empty_string(object.get("product_name"))?;
    let manufacturer = non_empty_string(object.get("manufacturer"))?;

    let mut pages: Vec<u32> = object
        .get("pages")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(page_number_from_value).collect())
        .unwrap_or_else(Vec::new);
    pages.push(page_number);

    Some(CandidateRecord {
        product_name,
        manufacturer,
        pages,
    })
}

// Whitespace-only counts as missing; a usable value is kept exactly as the model wrote it.
fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// Positive integers only; `3.0` and `"3"` are accepted.
fn page_number_from_value(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && *value >= 0.0)
                .map(|value| value as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(number).ok().filter(|page| *page > 0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
