//! Canonicalisation of informal Vietnamese input before classification.
//!
//! Three ordered stages: whitespace cleanup, case-preserving dictionary
//! substitution and word segmentation.

mod dictionary;
mod segmenter;

pub use dictionary::NormalizationDictionary;
pub use segmenter::{LexiconSegmenter, SEGMENT_JOINER, Segmenter};

pub struct TextNormalizer<S = LexiconSegmenter> {
    dictionary: &'static NormalizationDictionary,
    segmenter: S,
}

impl TextNormalizer<LexiconSegmenter> {
    pub fn new() -> Self {
        Self::with_segmenter(LexiconSegmenter)
    }
}

impl Default for TextNormalizer<LexiconSegmenter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Segmenter> TextNormalizer<S> {
    pub fn with_segmenter(segmenter: S) -> Self {
        Self {
            dictionary: NormalizationDictionary::builtin(),
            segmenter,
        }
    }

    /// Run the full pipeline. Blank input short-circuits to an empty string.
    pub fn normalize(&self, text: &str) -> String {
        let cleaned = clean_whitespace(text);
        if cleaned.is_empty() {
            return cleaned;
        }

        let substituted = substitute(self.dictionary, &cleaned);
        self.segmenter.segment(&substituted)
    }
}

/// Trim and collapse every whitespace run to a single ASCII space.
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace whole tokens found in `dictionary`, carrying over each token's casing.
pub fn substitute(dictionary: &NormalizationDictionary, text: &str) -> String {
    text.split_whitespace()
        .map(|token| match dictionary.lookup(&token.to_lowercase()) {
            Some(replacement) => CasePattern::of(token).apply(replacement),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CasePattern {
    Upper,
    Lower,
    Title,
    Mixed,
}

impl CasePattern {
    fn of(token: &str) -> Self {
        let mut has_upper = false;
        let mut has_lower = false;
        for ch in token.chars() {
            if ch.is_uppercase() {
                has_upper = true;
            } else if ch.is_lowercase() {
                has_lower = true;
            }
        }

        match (has_upper, has_lower) {
            (true, false) => CasePattern::Upper,
            (false, true) => CasePattern::Lower,
            _ if token.chars().next().is_some_and(char::is_uppercase) => CasePattern::Title,
            _ => CasePattern::Mixed,
        }
    }

    fn apply(self, replacement: &str) -> String {
        match self {
            CasePattern::Upper => replacement.to_uppercase(),
            CasePattern::Lower => replacement.to_lowercase(),
            CasePattern::Title => capitalize(replacement),
            CasePattern::Mixed => replacement.to_string(),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitute_builtin(text: &str) -> String {
        substitute(NormalizationDictionary::builtin(), text)
    }

    #[test]
    fn blank_input_normalizes_to_empty() {
        let normalizer = TextNormalizer::new();
        for input in ["", " ", "\t\n", "   \u{3000}  "] {
            assert_eq!(normalizer.normalize(input), "");
        }
    }

    #[test]
    fn whitespace_is_trimmed_and_collapsed() {
        assert_eq!(clean_whitespace("  rất \t\t vui \n quá  "), "rất vui quá");
    }

    #[test]
    fn substitution_reapplies_case_pattern() {
        assert_eq!(substitute_builtin("ko"), "không");
        assert_eq!(substitute_builtin("KO"), "KHÔNG");
        assert_eq!(substitute_builtin("Ko"), "Không");
        assert_eq!(substitute_builtin("Ntn"), "Như thế nào");
        assert_eq!(substitute_builtin("NTN"), "NHƯ THẾ NÀO");
    }

    #[test]
    fn mixed_case_passes_replacement_through() {
        assert_eq!(substitute_builtin("oK"), "được");
        assert_eq!(substitute_builtin("sHoP"), "cửa hàng");
    }

    #[test]
    fn unknown_tokens_are_verbatim() {
        assert_eq!(substitute_builtin("Tokyo 2024 tốt!"), "Tokyo 2024 tốt!");
        assert_eq!(substitute_builtin("ko!"), "ko!");
    }

    #[test]
    fn full_pipeline_substitutes_then_segments() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("  sp   nay rat tot, thx SHOP "),
            "sản_phẩm nay rất tot, cảm_ơn CỬA_HÀNG"
        );
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let normalizer = TextNormalizer::new();
        for input in [
            "ship nhanh, sp dc",
            "KO THICH shop nay",
            "Hom nay buon qua",
            "mik muon biet gia",
        ] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn non_whitespace_characters_survive() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("😊 10/10 !!!"), "😊 10/10 !!!");
    }
}
