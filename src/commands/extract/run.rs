use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::commands::inventory::discover_pdfs;
use crate::config::{ExtractionConfig, ModelSettings};
use crate::model::ExtractRunManifest;
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use super::{OpenAiCompletion, PageNormalizer, PdftotextSource, Pipeline, RetryingCompletion};

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("extract-{}", utc_compact_string(started_ts));

    let documents = resolve_documents(&args)?;
    let config = ExtractionConfig::from_stopwords_path(args.stopwords_path.as_deref())?;
    let settings = ModelSettings::from_env(
        args.api_base_url.as_deref(),
        &args.model,
        Duration::from_secs(args.timeout_secs.max(1)),
        args.max_retries,
        Duration::from_millis(args.retry_backoff_ms),
    )?;

    ensure_directory(&args.output_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.output_dir
            .join("manifests")
            .join(format!("extract_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(
        run_id = %run_id,
        documents = documents.len(),
        model = %settings.model_id,
        workers = args.workers.max(1),
        stopwords = config.stopwords.len(),
        "starting extraction"
    );

    let client = RetryingCompletion::new(
        OpenAiCompletion::new(&settings).context("failed to build model client")?,
        settings.max_retries,
        settings.retry_backoff,
    );
    let normalizer = PageNormalizer::new(config.stopwords.clone())?;
    let page_source = PdftotextSource {
        max_pages: args.max_pages_per_doc,
    };

    let pipeline = Pipeline {
        pages: &page_source,
        client: &client,
        normalizer: &normalizer,
        workers: args.workers.max(1),
        output_dir: &args.output_dir,
        output_suffix: &args.output_suffix,
    };
    let reports = pipeline.run_batch(&documents);

    let failed_document_count = reports
        .iter()
        .filter(|report| report.status != "completed")
        .count();
    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        status: if failed_document_count == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        model_id: settings.model_id.clone(),
        workers: args.workers.max(1),
        output_dir: args.output_dir.display().to_string(),
        document_count: reports.len(),
        failed_document_count,
        documents: reports,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote extraction run manifest");

    if failed_document_count > 0 {
        bail!(
            "{} of {} submittals failed; see {}",
            failed_document_count,
            manifest.document_count,
            manifest_path.display()
        );
    }

    info!(documents = manifest.document_count, "extraction completed");
    Ok(())
}

fn resolve_documents(args: &ExtractArgs) -> Result<Vec<PathBuf>> {
    if !args.inputs.is_empty() {
        return Ok(args.inputs.clone());
    }

    let documents = discover_pdfs(&args.input_dir)?;
    if documents.is_empty() {
        warn!(input_dir = %args.input_dir.display(), "no submittal PDFs found");
        bail!("no PDFs found in {}", args.input_dir.display());
    }
    Ok(documents)
}
