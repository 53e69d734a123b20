//! Language classification: does a block of text need translating?
//!
//! A cheap density heuristic, never a network call. Each language profile is
//! a set of indicator-word regexes (function words plus the contract/tender
//! vocabulary typical of the corpus). For a text block we count indicator
//! hits per 100 words for the source and the target profile and translate
//! only when
//!
//! ```text
//! source_density > target_density × density_factor
//!     && source_density > density_floor
//! ```
//!
//! Text shorter than `min_chars` is always treated as already being in the
//! target language. The verdict is deterministic for a given input and
//! thresholds; linguistic accuracy is best-effort.

use crate::config::ClassifierThresholds;
use crate::error::Pdf2MdError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

fn word_set(words: &str) -> Regex {
    Regex::new(&format!(r"\b(?:{words})\b")).unwrap()
}

static EN_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        word_set(
            "the|and|of|to|in|is|for|with|that|this|as|are|by|from|or|be|an|at|have|has|was|\
             were|been|but|not|on|it|can|will|may|would|could|should|all|more|than|which|who|\
             what|when|where|why|how|if|then|because|while|after|before|during|through|under|\
             over|between|into|about|against|upon|within|without|toward|towards|across|behind|\
             below|above|around|beside|besides|beyond|along|among|throughout|underneath|inside|\
             outside",
        ),
        word_set(
            "agreement|contract|party|parties|shall|must|hereby|herein|whereas|therefore|\
             pursuant|notwithstanding|provided|including|excluding|subject|terms|conditions|\
             obligations|requirements|performance|compliance|provisions|regulations|accordance|\
             applicable|governing|jurisdiction",
        ),
    ]
});

static PT_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        word_set(
            "de|da|do|das|dos|para|com|em|por|que|não|uma|um|os|as|pelo|pela|sobre|entre|após|\
             antes|durante|através|sob|acima|abaixo|dentro|fora|contra|segundo|conforme|\
             mediante|perante",
        ),
        word_set(
            "contrato|acordo|parte|partes|deve|deverá|considerando|portanto|nos termos|obstante|\
             desde que|incluindo|excluindo|sujeito|termos|condições|obrigações|requisitos|\
             desempenho|cumprimento|disposições|regulamentos|conformidade|aplicável|regente|\
             jurisdição",
        ),
    ]
});

static ES_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        word_set(
            "el|la|los|las|de|del|y|en|que|para|con|por|una|un|es|son|al|lo|como|más|pero|sus|\
             entre|sobre|hasta|desde|durante|según|mediante|ante|sin",
        ),
        word_set(
            "contrato|acuerdo|parte|partes|deberá|debe|considerando|por lo tanto|conforme|\
             incluyendo|sujeto|términos|condiciones|obligaciones|requisitos|cumplimiento|\
             disposiciones|reglamentos|aplicable|jurisdicción",
        ),
    ]
});

/// Indicator words for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    code: String,
    indicators: Vec<Regex>,
}

impl LanguageProfile {
    /// Built-in profile for `en`, `pt` or `es`.
    pub fn builtin(code: &str) -> Option<Self> {
        let code = code.to_lowercase();
        let indicators = match code.as_str() {
            "en" => EN_INDICATORS.clone(),
            "pt" | "pt-br" => PT_INDICATORS.clone(),
            "es" => ES_INDICATORS.clone(),
            _ => return None,
        };
        Some(Self { code, indicators })
    }

    /// Custom profile from a list of indicator words or phrases.
    pub fn from_words(code: impl Into<String>, words: &[&str]) -> Self {
        let alternation = words
            .iter()
            .map(|w| regex::escape(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            code: code.into(),
            indicators: vec![word_set(&alternation)],
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Indicator hits in already-lowercased text.
    fn hits(&self, lowered: &str) -> usize {
        self.indicators
            .iter()
            .map(|re| re.find_iter(lowered).count())
            .sum()
    }
}

/// The classifier's measurements for one block of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageVerdict {
    pub words: usize,
    pub source_density: f64,
    pub target_density: f64,
    pub needs_translation: bool,
}

/// Binary source/target language decision.
#[derive(Debug, Clone)]
pub struct LanguageClassifier {
    source: LanguageProfile,
    target: LanguageProfile,
    thresholds: ClassifierThresholds,
}

impl LanguageClassifier {
    pub fn new(
        source: LanguageProfile,
        target: LanguageProfile,
        thresholds: ClassifierThresholds,
    ) -> Self {
        Self {
            source,
            target,
            thresholds,
        }
    }

    /// Classifier over the built-in profiles for two language codes.
    pub fn for_languages(
        source: &str,
        target: &str,
        thresholds: ClassifierThresholds,
    ) -> Result<Self, Pdf2MdError> {
        let lookup = |code: &str| {
            LanguageProfile::builtin(code).ok_or_else(|| {
                Pdf2MdError::InvalidConfig(format!(
                    "No language profile for '{code}' (supported: en, pt, es)"
                ))
            })
        };
        Ok(Self::new(lookup(source)?, lookup(target)?, thresholds))
    }

    /// Shorthand for `assess(text).needs_translation`.
    pub fn needs_translation(&self, text: &str) -> bool {
        self.assess(text).needs_translation
    }

    /// Measure indicator densities and decide.
    pub fn assess(&self, text: &str) -> LanguageVerdict {
        let short = LanguageVerdict {
            words: 0,
            source_density: 0.0,
            target_density: 0.0,
            needs_translation: false,
        };
        if text.trim().chars().count() < self.thresholds.min_chars {
            return short;
        }

        let lowered = text.to_lowercase();
        let words = lowered.split_whitespace().count();
        if words == 0 {
            return short;
        }

        let per_100 = |hits: usize| hits as f64 * 100.0 / words as f64;
        let source_density = per_100(self.source.hits(&lowered));
        let target_density = per_100(self.target.hits(&lowered));
        let needs_translation = source_density > target_density * self.thresholds.density_factor
            && source_density > self.thresholds.density_floor;

        debug!(
            "language {}→{}: {} words, density {:.1} vs {:.1} → {}",
            self.source.code,
            self.target.code,
            words,
            source_density,
            target_density,
            if needs_translation { "translate" } else { "keep" }
        );

        LanguageVerdict {
            words,
            source_density,
            target_density,
            needs_translation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en_to_pt() -> LanguageClassifier {
        LanguageClassifier::for_languages("en", "pt", ClassifierThresholds::default()).unwrap()
    }

    const ENGLISH: &str = "The contractor shall submit the performance bond to the \
        concession authority within thirty days after the signature of the agreement, \
        in accordance with the terms and conditions of this notice.";

    const PORTUGUESE: &str = "A contratada deverá apresentar a garantia de execução ao \
        poder concedente no prazo de trinta dias após a assinatura do contrato, nos \
        termos e condições deste edital.";

    #[test]
    fn english_needs_translation() {
        assert!(en_to_pt().needs_translation(ENGLISH));
    }

    #[test]
    fn portuguese_is_kept() {
        assert!(!en_to_pt().needs_translation(PORTUGUESE));
    }

    #[test]
    fn short_text_is_never_translated() {
        let c = en_to_pt();
        for text in ["", "the and of the", "The contract of the party is in force"] {
            assert!(text.chars().count() < 50);
            assert!(!c.needs_translation(text), "{text:?}");
        }
    }

    #[test]
    fn deterministic_for_same_input() {
        let c = en_to_pt();
        assert_eq!(c.assess(ENGLISH), c.assess(ENGLISH));
    }

    #[test]
    fn floor_blocks_sparse_text() {
        let c = LanguageClassifier::for_languages(
            "en",
            "pt",
            ClassifierThresholds {
                density_floor: 90.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!c.needs_translation(ENGLISH));
    }

    #[test]
    fn unknown_language_is_config_error() {
        let err = LanguageClassifier::for_languages("en", "xx", ClassifierThresholds::default());
        assert!(matches!(err, Err(Pdf2MdError::InvalidConfig(_))));
    }

    #[test]
    fn custom_profile_counts_phrases() {
        let src = LanguageProfile::from_words("xx", &["foo", "bar baz"]);
        let tgt = LanguageProfile::from_words("yy", &["qux"]);
        let c = LanguageClassifier::new(src, tgt, ClassifierThresholds::default());
        let text = "foo bar baz foo something else entirely foo bar baz foo and more words";
        let v = c.assess(text);
        assert!(v.needs_translation);
        assert_eq!(v.target_density, 0.0);
    }
}
