use rust_stemmers::{Algorithm, Stemmer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key of the stemmer that leaves words unchanged.
pub const NO_STEMMER: &str = "none";

pub struct LanguageStemmer {
    language: String,
    algorithm: Option<Algorithm>,
}

impl LanguageStemmer {
    pub fn none() -> Self {
        Self { language: NO_STEMMER.to_string(), algorithm: None }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// False for the [`NO_STEMMER`] stemmer.
    pub fn is_stemming(&self) -> bool {
        self.algorithm.is_some()
    }

    pub fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        match self.algorithm {
            Some(algorithm) => Stemmer::create(algorithm).stem(word),
            None => Cow::Borrowed(word),
        }
    }
}

impl fmt::Debug for LanguageStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageStemmer").field("language", &self.language).finish()
    }
}

/// Snowball algorithm for a language code, matched on its primary subtag
/// (`pt_BR` and `pt-BR` both mean `pt`).
fn algorithm_for(language: &str) -> Option<Algorithm> {
    let primary = language.split(['_', '-', '.']).next().unwrap_or_default().to_lowercase();
    let algorithm = match primary.as_str() {
        "ar" | "arabic" => Algorithm::Arabic,
        "da" | "danish" => Algorithm::Danish,
        "nl" | "dutch" => Algorithm::Dutch,
        "en" | "english" => Algorithm::English,
        "fi" | "finnish" => Algorithm::Finnish,
        "fr" | "french" => Algorithm::French,
        "de" | "german" => Algorithm::German,
        "el" | "greek" => Algorithm::Greek,
        "hu" | "hungarian" => Algorithm::Hungarian,
        "it" | "italian" => Algorithm::Italian,
        "no" | "nb" | "nn" | "norwegian" => Algorithm::Norwegian,
        "pt" | "portuguese" => Algorithm::Portuguese,
        "ro" | "romanian" => Algorithm::Romanian,
        "ru" | "russian" => Algorithm::Russian,
        "es" | "spanish" => Algorithm::Spanish,
        "sv" | "swedish" => Algorithm::Swedish,
        "ta" | "tamil" => Algorithm::Tamil,
        "tr" | "turkish" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}

/// Per-language stemmers, created on first use. Always holds [`NO_STEMMER`].
#[derive(Debug)]
pub struct StemmerCache {
    stemmers: HashMap<String, Arc<LanguageStemmer>>,
}

impl Default for StemmerCache {
    fn default() -> Self {
        let mut stemmers = HashMap::new();
        stemmers.insert(NO_STEMMER.to_string(), Arc::new(LanguageStemmer::none()));
        Self { stemmers }
    }
}

impl StemmerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stemmer for `language`; unknown languages fall back to [`NO_STEMMER`].
    pub fn stemmer_for(&mut self, language: Option<&str>) -> Arc<LanguageStemmer> {
        let language = language.filter(|l| !l.is_empty()).unwrap_or(NO_STEMMER);
        if let Some(stemmer) = self.stemmers.get(language) {
            return Arc::clone(stemmer);
        }
        match algorithm_for(language) {
            Some(algorithm) => {
                debug!(language, "creating stemmer");
                let stemmer = Arc::new(LanguageStemmer {
                    language: language.to_string(),
                    algorithm: Some(algorithm),
                });
                self.stemmers.insert(language.to_string(), Arc::clone(&stemmer));
                stemmer
            }
            None => {
                warn!(language, "no stemmer for language, not stemming");
                self.fallback()
            }
        }
    }

    pub fn is_cached(&self, language: &str) -> bool {
        self.stemmers.contains_key(language)
    }

    pub fn len(&self) -> usize {
        self.stemmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stemmers.is_empty()
    }

    fn fallback(&mut self) -> Arc<LanguageStemmer> {
        Arc::clone(
            self.stemmers
                .entry(NO_STEMMER.to_string())
                .or_insert_with(|| Arc::new(LanguageStemmer::none())),
        )
    }
}
