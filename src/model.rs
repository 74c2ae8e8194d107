use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub product_name: String,
    pub manufacturer: String,
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub identity_key: String,
    pub product_name: String,
    pub manufacturer: String,
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub path: String,
    pub sha256: String,
    pub output_csv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: String,
    pub sha256: Option<String>,
    pub status: String,
    pub page_count: usize,
    pub malformed_page_count: usize,
    pub skipped_record_count: usize,
    pub candidate_count: usize,
    pub canonical_count: usize,
    pub output_csv: Option<String>,
    pub duration_ms: u128,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub model_id: String,
    pub workers: usize,
    pub output_dir: String,
    pub document_count: usize,
    pub failed_document_count: usize,
    pub documents: Vec<DocumentReport>,
}
