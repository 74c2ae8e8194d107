use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::model::RawPage;

pub(super) trait PageSource: Send + Sync {
    fn pages(&self, pdf_path: &Path) -> Result<Vec<RawPage>>;
}

#[derive(Debug, Clone, Default)]
pub(super) struct PdftotextSource {
    pub(super) max_pages: Option<usize>,
}

impl PageSource for PdftotextSource {
    fn pages(&self, pdf_path: &Path) -> Result<Vec<RawPage>> {
        if !pdf_path.is_file() {
            bail!("submittal not found: {}", pdf_path.display());
        }

        let mut command = Command::new("pdftotext");
        command
            .arg("-enc")
            .arg("UTF-8")
            .arg("-layout")
            .arg("-f")
            .arg("1");
        if let Some(max_pages) = self.max_pages {
            command.arg("-l").arg(max_pages.to_string());
        }
        command.arg(pdf_path).arg("-");

        let output = command
            .output()
            .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftotext returned non-zero exit status for {}: {}",
                pdf_path.display(),
                stderr.trim()
            );
        }

        let pages = split_pages(&String::from_utf8_lossy(&output.stdout));
        if pages.is_empty() {
            bail!("no extractable pages in {}", pdf_path.display());
        }
        Ok(pages)
    }
}

fn split_pages(raw: &str) -> Vec<RawPage> {
    let mut texts: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while texts.last().is_some_and(|last| last.trim().is_empty()) {
        texts.pop();
    }

    texts
        .into_iter()
        .zip(1u32..)
        .map(|(text, page_number)| RawPage { page_number, text })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pages_numbers_from_one_and_keeps_inner_blank_pages() {
        let pages = split_pages("cover\u{000C}\u{000C}EGC5 - AL\u{0000}\u{000C}\n\u{000C}");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].text, "");
        assert_eq!(pages[2].page_number, 3);
        assert_eq!(pages[2].text, "EGC5 - AL");
    }

    #[test]
    fn split_pages_of_blank_output_is_empty() {
        assert!(split_pages("  \n\u{000C}\n").is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = PdftotextSource::default();
        let error = source
            .pages(&dir.path().join("missing.pdf"))
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("submittal not found"));
    }
}
