//! Turns MeCab's line-oriented text output into a [`QueryResult`].
//!
//! Each line has the shape `surface<TAB>f1,f2,...,f9`. Decoding never fails:
//! lines without a tab are either promoted to a foreign-word token or kept
//! verbatim in [`QueryResult::unrecognized`].

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::constants::{
    DEFAULT_FOREIGN_PATTERN, END_OF_SENTENCE_MARKER, FEATURE_DELIMITER, SURFACE_DELIMITER,
};
use crate::error::{MecabError, Result};
use crate::model::{QueryResult, Token};

fn default_foreign_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(DEFAULT_FOREIGN_PATTERN).expect("default foreign pattern is valid")
    })
}

/// Knobs for [`OutputDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Lines without a tab matching this pattern become foreign-word tokens.
    pub foreign_pattern: Regex,
    /// Line dropped silently when it makes up the whole (trimmed) line.
    pub end_of_sentence_marker: Option<String>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            foreign_pattern: default_foreign_pattern().clone(),
            end_of_sentence_marker: Some(END_OF_SENTENCE_MARKER.to_string()),
        }
    }
}

impl DecoderOptions {
    /// Replaces the foreign-word pattern.
    pub fn with_foreign_pattern(mut self, pattern: &str) -> Result<Self> {
        self.foreign_pattern = Regex::new(pattern).map_err(|error| {
            MecabError::InvalidArgument(format!("invalid foreign pattern {pattern:?}: {error}"))
        })?;
        Ok(self)
    }

    /// Sets or clears the end-of-sentence marker.
    pub fn with_end_of_sentence_marker(mut self, marker: Option<&str>) -> Self {
        self.end_of_sentence_marker = marker.map(str::to_string);
        self
    }
}

/// Stateless decoder for raw engine output.
#[derive(Debug, Clone, Default)]
pub struct OutputDecoder {
    options: DecoderOptions,
}

impl OutputDecoder {
    /// Creates a decoder with explicit options.
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    /// Decodes raw engine output.
    ///
    /// Blank lines and the end-of-sentence marker are skipped. Every other
    /// line ends up in exactly one of the two result lists.
    pub fn decode(&self, raw: &str) -> QueryResult {
        let mut result = QueryResult::default();
        let mut malformed = 0usize;

        for line in raw.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let trimmed = line.trim();
            if trimmed.is_empty() || self.is_end_of_sentence(trimmed) {
                continue;
            }

            match line.split_once(SURFACE_DELIMITER) {
                Some((surface, feature_blob)) => {
                    result.recognized.push(Token::from_features(
                        surface,
                        feature_blob.split(FEATURE_DELIMITER),
                    ));
                }
                None => {
                    malformed += 1;
                    if self.options.foreign_pattern.is_match(trimmed) {
                        result.recognized.push(Token::foreign(trimmed));
                    } else {
                        result.unrecognized.push(line.to_string());
                    }
                }
            }
        }

        if malformed > 0 {
            warn!(
                malformed,
                unrecognized = result.unrecognized.len(),
                "engine output contained lines without a feature list"
            );
        }
        result
    }

    fn is_end_of_sentence(&self, trimmed: &str) -> bool {
        self.options
            .end_of_sentence_marker
            .as_deref()
            .map_or(false, |marker| marker == trimmed)
    }
}

/// Decodes raw engine output with [`DecoderOptions::default`].
pub fn decode(raw: &str) -> QueryResult {
    OutputDecoder::default().decode(raw)
}

#[cfg(test)]
mod decoder_tests {
    use super::{decode, DecoderOptions, OutputDecoder};
    use crate::constants::UNKNOWN_FEATURE;
    use crate::model::{Feature, Token};

    #[test]
    fn decodes_nine_field_line_positionally() {
        let result = decode("犬\t名詞,一般,*,*,*,*,犬,イヌ,イヌ");
        assert!(result.unrecognized.is_empty());
        assert_eq!(result.recognized.len(), 1);

        let token = &result.recognized[0];
        assert_eq!(token.surface, "犬");
        assert_eq!(token.part_of_speech(), "名詞");
        assert_eq!(token.pos_detail1(), "一般");
        assert_eq!(token.pos_detail2(), "*");
        assert_eq!(token.dictionary_form(), "犬");
        assert_eq!(token.reading(), "イヌ");
        assert_eq!(token.pronunciation(), "イヌ");
    }

    #[test]
    fn every_slot_matches_its_subfield() {
        let fields = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let raw = format!("語\t{}", fields.join(","));
        let token = decode(&raw).recognized.remove(0);
        for feature in Feature::ALL {
            assert_eq!(token.feature(feature), fields[feature.index()]);
        }
    }

    #[test]
    fn bare_ascii_word_becomes_foreign_token() {
        let result = decode("Hello");
        assert!(result.unrecognized.is_empty());
        assert_eq!(result.recognized, vec![Token::foreign("Hello")]);

        let token = &result.recognized[0];
        assert_eq!(token.part_of_speech(), "foreign");
        assert_eq!(token.dictionary_form(), "Hello");
        assert_eq!(token.reading(), "Hello");
        assert_eq!(token.pronunciation(), "Hello");
    }

    #[test]
    fn short_feature_list_is_padded_with_unknown() {
        let result = decode("???\tbad");
        assert_eq!(result.recognized.len(), 1);
        let token = &result.recognized[0];
        assert_eq!(token.surface, "???");
        assert_eq!(token.part_of_speech(), "bad");
        assert_eq!(token.dictionary_form(), "???");
        for feature in &Feature::ALL[1..] {
            if *feature != Feature::DictionaryForm {
                assert_eq!(token.feature(*feature), UNKNOWN_FEATURE);
            }
        }
    }

    #[test]
    fn empty_subfields_become_unknown() {
        let token = decode("犬\t名詞,,*,*,*,*,,イヌ,イヌ").recognized.remove(0);
        assert_eq!(token.part_of_speech(), "名詞");
        assert_eq!(token.pos_detail1(), UNKNOWN_FEATURE);
        assert_eq!(token.pos_detail2(), "*");
        assert_eq!(token.dictionary_form(), "犬");
        assert_eq!(token.reading(), "イヌ");
    }

    #[test]
    fn bare_tab_line_is_fully_populated() {
        let result = decode("犬\t");
        assert!(result.unrecognized.is_empty());
        let token = &result.recognized[0];
        assert_eq!(token.surface, "犬");
        assert_eq!(token.part_of_speech(), UNKNOWN_FEATURE);
        assert_eq!(token.dictionary_form(), "犬");
        assert!(token.features().iter().all(|value| !value.is_empty()));
    }

    #[test]
    fn extra_features_are_ignored() {
        let token = decode("x\t1,2,3,4,5,6,7,8,9,10,11").recognized.remove(0);
        assert_eq!(token.pronunciation(), "9");
    }

    #[test]
    fn non_ascii_line_without_tab_is_unrecognized() {
        let result = decode("ｗｗｗ\n123abc");
        assert!(result.recognized.is_empty());
        assert_eq!(result.unrecognized, vec!["ｗｗｗ", "123abc"]);
    }

    #[test]
    fn empty_input_yields_empty_result() {
        assert!(decode("").is_empty());
        assert!(decode("\n \n\t\n").is_empty());
    }

    #[test]
    fn eos_marker_is_dropped_unless_disabled() {
        let raw = "猫\t名詞,一般,*,*,*,*,猫,ネコ,ネコ\nEOS\n";
        let result = decode(raw);
        assert_eq!(result.recognized.len(), 1);
        assert!(result.unrecognized.is_empty());

        let decoder = OutputDecoder::new(
            DecoderOptions::default().with_end_of_sentence_marker(None),
        );
        let result = decoder.decode(raw);
        assert_eq!(result.recognized.len(), 2);
        assert_eq!(result.recognized[1], Token::foreign("EOS"));
    }

    #[test]
    fn preserves_engine_order_and_accounts_for_every_line() {
        let raw = "今日\t名詞,副詞可能,*,*,*,*,今日,キョウ,キョー\n\
                   は\t助詞,係助詞,*,*,*,*,は,ハ,ワ\n\
                   Rust\n\
                   ＠＠\n\
                   晴れ\t名詞,一般,*,*,*,*,晴れ,ハレ,ハレ\n\r\n";
        let result = decode(raw);
        let surfaces: Vec<&str> = result.surfaces().collect();
        assert_eq!(surfaces, vec!["今日", "は", "Rust", "晴れ"]);
        assert_eq!(result.unrecognized, vec!["＠＠"]);
        assert_eq!(result.recognized.len() + result.unrecognized.len(), 5);
    }

    #[test]
    fn decoding_is_idempotent() {
        let raw = "犬\t名詞,一般,*,*,*,*,犬,イヌ,イヌ\nHello\n？？\n";
        assert_eq!(decode(raw), decode(raw));
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let result = decode("犬\t名詞,一般,*,*,*,*,犬,イヌ,イヌ\r\nEOS\r\n");
        assert_eq!(result.recognized.len(), 1);
        assert_eq!(result.recognized[0].pronunciation(), "イヌ");
    }

    #[test]
    fn custom_foreign_pattern_is_applied() {
        let options = DecoderOptions::default()
            .with_foreign_pattern("^[A-Za-z0-9]+$")
            .expect("pattern should compile");
        let result = OutputDecoder::new(options).decode("abc123");
        assert_eq!(result.recognized, vec![Token::foreign("abc123")]);
    }

    #[test]
    fn invalid_foreign_pattern_is_rejected() {
        let error = DecoderOptions::default()
            .with_foreign_pattern("([")
            .expect_err("pattern should not compile");
        assert!(error.to_string().starts_with("invalid argument:"));
    }
}
