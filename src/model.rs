use std::fmt;

use crate::constants::{FEATURE_COUNT, FOREIGN_PART_OF_SPEECH, UNKNOWN_FEATURE};

/// Named position in MeCab's fixed nine-slot feature list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Coarse part of speech.
    PartOfSpeech,
    /// First part-of-speech subdivision.
    PosDetail1,
    /// Second part-of-speech subdivision.
    PosDetail2,
    /// Third part-of-speech subdivision.
    PosDetail3,
    /// Conjugation type.
    ConjugationForm1,
    /// Conjugation form.
    ConjugationForm2,
    /// Lemma.
    DictionaryForm,
    /// Reading.
    Reading,
    /// Pronunciation.
    Pronunciation,
}

impl Feature {
    /// All features in output order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::PartOfSpeech,
        Feature::PosDetail1,
        Feature::PosDetail2,
        Feature::PosDetail3,
        Feature::ConjugationForm1,
        Feature::ConjugationForm2,
        Feature::DictionaryForm,
        Feature::Reading,
        Feature::Pronunciation,
    ];

    /// Slot index in the comma-separated feature list.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Feature::PartOfSpeech => "part_of_speech",
            Feature::PosDetail1 => "pos_detail1",
            Feature::PosDetail2 => "pos_detail2",
            Feature::PosDetail3 => "pos_detail3",
            Feature::ConjugationForm1 => "conjugation_form1",
            Feature::ConjugationForm2 => "conjugation_form2",
            Feature::DictionaryForm => "dictionary_form",
            Feature::Reading => "reading",
            Feature::Pronunciation => "pronunciation",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One morpheme decoded from engine output.
///
/// Every token carries exactly [`FEATURE_COUNT`] populated features; slots the
/// engine did not emit hold [`UNKNOWN_FEATURE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Matched substring of the input.
    pub surface: String,
    features: [String; FEATURE_COUNT],
}

impl Token {
    /// Builds a token positionally from feature values.
    ///
    /// Missing or empty slots are filled with [`UNKNOWN_FEATURE`], except
    /// [`Feature::DictionaryForm`], which falls back to the surface. Values
    /// past the ninth slot are ignored.
    pub fn from_features<I, S>(surface: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let surface = surface.into();
        let mut values = values.into_iter().map(Into::<String>::into);
        let features = std::array::from_fn(|index| {
            match values.next().filter(|value| !value.is_empty()) {
                Some(value) => value,
                None if index == Feature::DictionaryForm.index() => surface.clone(),
                None => unknown_feature(),
            }
        });
        Self { surface, features }
    }

    /// Builds the token used for a foreign word the engine left unsegmented.
    pub fn foreign(surface: impl Into<String>) -> Self {
        let surface = surface.into();
        let mut token = Self::from_features(surface.clone(), [FOREIGN_PART_OF_SPEECH]);
        token.features[Feature::DictionaryForm.index()] = surface.clone();
        token.features[Feature::Reading.index()] = surface.clone();
        token.features[Feature::Pronunciation.index()] = surface;
        token
    }

    /// Returns one feature by name.
    pub fn feature(&self, feature: Feature) -> &str {
        &self.features[feature.index()]
    }

    /// Returns all features in output order.
    pub fn features(&self) -> &[String; FEATURE_COUNT] {
        &self.features
    }

    /// Coarse part of speech.
    pub fn part_of_speech(&self) -> &str {
        self.feature(Feature::PartOfSpeech)
    }

    /// First part-of-speech subdivision.
    pub fn pos_detail1(&self) -> &str {
        self.feature(Feature::PosDetail1)
    }

    /// Second part-of-speech subdivision.
    pub fn pos_detail2(&self) -> &str {
        self.feature(Feature::PosDetail2)
    }

    /// Third part-of-speech subdivision.
    pub fn pos_detail3(&self) -> &str {
        self.feature(Feature::PosDetail3)
    }

    /// Conjugation type.
    pub fn conjugation_form1(&self) -> &str {
        self.feature(Feature::ConjugationForm1)
    }

    /// Conjugation form.
    pub fn conjugation_form2(&self) -> &str {
        self.feature(Feature::ConjugationForm2)
    }

    /// Lemma.
    pub fn dictionary_form(&self) -> &str {
        self.feature(Feature::DictionaryForm)
    }

    /// Reading.
    pub fn reading(&self) -> &str {
        self.feature(Feature::Reading)
    }

    /// Pronunciation.
    pub fn pronunciation(&self) -> &str {
        self.feature(Feature::Pronunciation)
    }

    /// Returns whether a feature holds the [`UNKNOWN_FEATURE`] placeholder.
    pub fn is_unknown(&self, feature: Feature) -> bool {
        self.feature(feature) == UNKNOWN_FEATURE
    }
}

fn unknown_feature() -> String {
    UNKNOWN_FEATURE.to_string()
}

/// Output of one analysis call.
///
/// `recognized` keeps the engine's order; `unrecognized` holds raw segments
/// that could not be mapped to a [`Token`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Decoded tokens in engine order.
    pub recognized: Vec<Token>,
    /// Raw text the decoder could not classify.
    pub unrecognized: Vec<String>,
}

impl QueryResult {
    /// Result reporting the whole input as unrecognized.
    pub fn unrecognized_input(text: impl Into<String>) -> Self {
        Self {
            recognized: Vec::new(),
            unrecognized: vec![text.into()],
        }
    }

    /// Returns `true` when neither list holds anything.
    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.unrecognized.is_empty()
    }

    /// Surface forms of the recognized tokens, in order.
    pub fn surfaces(&self) -> impl Iterator<Item = &str> + '_ {
        self.recognized.iter().map(|token| token.surface.as_str())
    }
}
