const EXTRACTION_INSTRUCTIONS: &str = r#"You are given the text of **one page** from a construction product submittal. Your task is to extract **the most important product entries** and return them as a **JSON array**. Each entry must be an object with **exactly** the following keys:

  • product_name   - The product's full model number or part number (if listed), and a full descriptive name
  • manufacturer   - The manufacturer's name. If it's not clearly listed near the product, infer it from surrounding context or headers. You must put a manufacturer, unknown is not an option
  • pages          - A list of page numbers (integers) where the product appears. Include the current page number at minimum.

Products may be listed in paragraph form or in tabular form (e.g., rows like `EGC5 - AL - ½" Eggcrate Grid ...`). For these, treat the first field (before the dash or delimiter) as the `product_name`. Use the rest of the line as the description only if it helps disambiguate the product.

Manufacturers may only appear once at the top or bottom of the document; carry this name to all products if no other manufacturer is clearly indicated.

Ignore administrative content like submittal forms, contact info, page numbers, and section headings unless they help establish the manufacturer.

Try to include only the main products in the text, not components or parts of a product.

If a page doesn't seem to have a product listed, you may skip this page.

**Output only the JSON array. Do not include any explanatory text, headers, or markdown.**

Example output:
[
  {"product_name": "45MAHAQ18XA3 High Wall Heat Pump Ductless System (Indoor Unit)", "manufacturer": "Carrier Corporation", "pages": [2]},
  {"product_name": "5HCF23 Hard Ceiling Frame, Adapts F23 to F22, Aluminum", "manufacturer": "Krueger", "pages": [16]}
]
"#;

pub(super) fn build_extraction_prompt(page_number: u32, page_text: &str) -> String {
    format!(
        "{EXTRACTION_INSTRUCTIONS}\nThe current page number is {page_number}.\n\nNow extract from this text:\n\"\"\"{page_text}\"\"\""
    )
}
