use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info};

use crate::model::{CanonicalRecord, DocumentReport, RawPage};
use crate::util::{output_csv_path, sha256_file};

use super::{
    CompletionClient, PageExtraction, PageNormalizer, PageSource, dedupe_records, extract_page,
    write_products_csv,
};

pub(super) struct Pipeline<'a> {
    pub(super) pages: &'a dyn PageSource,
    pub(super) client: &'a dyn CompletionClient,
    pub(super) normalizer: &'a PageNormalizer,
    pub(super) workers: usize,
    pub(super) output_dir: &'a Path,
    pub(super) output_suffix: &'a str,
}

#[derive(Debug, Clone)]
pub(super) struct DocumentExtraction {
    pub(super) page_count: usize,
    pub(super) malformed_page_count: usize,
    pub(super) skipped_record_count: usize,
    pub(super) candidate_count: usize,
    pub(super) records: Vec<CanonicalRecord>,
}

impl Pipeline<'_> {
    pub(super) fn run_batch(&self, documents: &[PathBuf]) -> Vec<DocumentReport> {
        documents
            .iter()
            .map(|document| self.process_document(document))
            .collect()
    }

    fn process_document(&self, document: &Path) -> DocumentReport {
        let started = Instant::now();
        info!(document = %document.display(), "processing submittal");

        let mut report = DocumentReport {
            path: document.display().to_string(),
            sha256: sha256_file(document).ok(),
            status: "failed".to_string(),
            page_count: 0,
            malformed_page_count: 0,
            skipped_record_count: 0,
            candidate_count: 0,
            canonical_count: 0,
            output_csv: None,
            duration_ms: 0,
            failure_reason: None,
        };

        let output_csv = output_csv_path(self.output_dir, document, self.output_suffix);
        let outcome = self.extract_document(document).and_then(|extraction| {
            write_products_csv(&output_csv, &extraction.records)?;
            Ok(extraction)
        });

        match outcome {
            Ok(extraction) => {
                info!(
                    document = %document.display(),
                    pages = extraction.page_count,
                    candidates = extraction.candidate_count,
                    products = extraction.records.len(),
                    malformed_pages = extraction.malformed_page_count,
                    output = %output_csv.display(),
                    "wrote product table"
                );
                report.status = "completed".to_string();
                report.page_count = extraction.page_count;
                report.malformed_page_count = extraction.malformed_page_count;
                report.skipped_record_count = extraction.skipped_record_count;
                report.candidate_count = extraction.candidate_count;
                report.canonical_count = extraction.records.len();
                report.output_csv = Some(output_csv.display().to_string());
            }
            Err(err) => {
                error!(document = %document.display(), error = %err, "submittal failed");
                for cause in err.chain().skip(1) {
                    error!(cause = %cause, "caused by");
                }
                report.failure_reason = Some(format!("{err:#}"));
            }
        }

        report.duration_ms = started.elapsed().as_millis();
        report
    }

    pub(super) fn extract_document(&self, document: &Path) -> Result<DocumentExtraction> {
        let pages = self
            .pages
            .pages(document)
            .with_context(|| format!("failed to read pages of {}", document.display()))?;

        let extractions = self
            .extract_pages(&pages)
            .with_context(|| format!("model extraction failed for {}", document.display()))?;

        let malformed_page_count = extractions
            .iter()
            .filter(|extraction| extraction.malformed_response)
            .count();
        let skipped_record_count = extractions
            .iter()
            .map(|extraction| extraction.skipped_records)
            .sum();
        let candidates = extractions
            .into_iter()
            .flat_map(|extraction| extraction.candidates)
            .collect::<Vec<_>>();
        let candidate_count = candidates.len();

        Ok(DocumentExtraction {
            page_count: pages.len(),
            malformed_page_count,
            skipped_record_count,
            candidate_count,
            records: dedupe_records(candidates),
        })
    }

    // The first failed call stops the remaining pages and fails the document.
    fn extract_pages(&self, pages: &[RawPage]) -> Result<Vec<PageExtraction>> {
        let workers = self.workers.clamp(1, pages.len().max(1));

        if workers == 1 {
            return pages
                .iter()
                .map(|page| self.extract_one(page))
                .collect();
        }

        let next_page = AtomicUsize::new(0);
        let failed = Mutex::new(None::<anyhow::Error>);
        let results = Mutex::new(Vec::with_capacity(pages.len()));

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if lock(&failed).is_some() {
                            break;
                        }
                        let index = next_page.fetch_add(1, Ordering::SeqCst);
                        let Some(page) = pages.get(index) else {
                            break;
                        };
                        match self.extract_one(page) {
                            Ok(extraction) => lock(&results).push(extraction),
                            Err(err) => {
                                lock(&failed).get_or_insert(err);
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = failed.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            return Err(err);
        }

        let mut results = results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if results.len() != pages.len() {
            return Err(anyhow!(
                "extracted {} of {} pages",
                results.len(),
                pages.len()
            ));
        }
        results.sort_by_key(|extraction: &PageExtraction| extraction.page_number);
        Ok(results)
    }

    fn extract_one(&self, page: &RawPage) -> Result<PageExtraction> {
        let extraction = extract_page(page, self.normalizer, self.client)
            .with_context(|| format!("model call failed for page {}", page.page_number))?;
        debug!(
            page = page.page_number,
            candidates = extraction.candidates.len(),
            "page extracted"
        );
        Ok(extraction)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
