use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};

pub const DEFAULT_MODEL_ID: &str = "gpt-4o-mini-2024-07-18";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_products.csv";

// Submittal cover and transmittal boilerplate.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "submittal",
    "review",
    "approved",
    "office",
    "project",
    "date",
    "prepared by",
    "transmitted",
    "remarks",
    "submitted by",
    "engineer",
    "architect",
    "contractor",
    "revision",
    "item number",
    "item description",
    "status",
    "address",
    "phone",
    "fax",
    "email",
    "website",
    "www.",
    "suite",
    "dr.",
    "st.",
    "road",
    "avenue",
    "drive",
    "p.o.",
    "street",
    "contact",
    "tel",
    "copyright",
    "reserved",
    "warning",
    "disclaimer",
    "liability",
    "responsibility",
    "relieve",
    "does not",
    "shall",
    "subject to change",
    "page",
    "sheet",
    "printed on",
    "cover sheet",
    "table of contents",
    "section",
    "notes",
    "drawing",
    "job",
    "unit tag",
    "order number",
    "comments",
    "description",
    "quantity",
    "qty",
    "submitted",
    "delivered via",
    "transmitted to",
    "transmitted by",
    "mstr",
    "pk",
    "disc",
    "code",
    "file",
    "location",
    "note:",
    "system service information",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordSet {
    phrases: Vec<String>,
}

impl StopwordSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut phrases = phrases
            .into_iter()
            .map(|phrase| phrase.as_ref().trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect::<Vec<String>>();
        phrases.sort();
        phrases.dedup();
        Self { phrases }
    }

    // One phrase per line; blank lines and `#` comments are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read stopword file {}", path.display()))?;
        let set = Self::new(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        );
        if set.is_empty() {
            bail!("stopword file {} contains no phrases", path.display());
        }
        Ok(set)
    }

    pub fn matches(&self, line: &str) -> bool {
        self.phrases.iter().any(|phrase| line.contains(phrase.as_str()))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    pub stopwords: StopwordSet,
}

impl ExtractionConfig {
    pub fn from_stopwords_path(path: Option<&Path>) -> Result<Self> {
        let stopwords = match path {
            Some(path) => StopwordSet::load(path)?,
            None => StopwordSet::default(),
        };
        Ok(Self { stopwords })
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl ModelSettings {
    pub fn from_env(
        base_url_override: Option<&str>,
        model_id: &str,
        timeout: Duration,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .context("OPENAI_API_KEY is not set (environment or .env)")?;

        let base_url = base_url_override
            .map(ToOwned::to_owned)
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            timeout,
            max_retries,
            retry_backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopword_set_lowercases_and_drops_blank_entries() {
        let set = StopwordSet::new(["Prepared By", "  ", "FAX", "fax"]);
        assert_eq!(set.len(), 2);
        assert!(set.matches("prepared by: j. smith"));
        assert!(set.matches("fax 555-0100"));
        assert!(!set.matches("egc5 - al eggcrate grid"));
    }

    #[test]
    fn stopword_set_load_skips_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stopwords.txt");
        fs::write(&path, "# boilerplate\nWarranty\n\nlead time\n").expect("write fixture");

        let set = StopwordSet::load(&path).expect("stopwords should load");
        assert_eq!(set.len(), 2);
        assert!(set.matches("standard warranty applies"));
        assert!(!set.matches("# boilerplate"));
    }

    #[test]
    fn stopword_set_load_rejects_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stopwords.txt");
        fs::write(&path, "# nothing here\n").expect("write fixture");

        assert!(StopwordSet::load(&path).is_err());
    }

    #[test]
    fn default_stopwords_cover_transmittal_labels() {
        let set = StopwordSet::default();
        assert!(set.matches("submitted by: acme mechanical"));
        assert!(set.matches("www.example.com"));
    }
}
