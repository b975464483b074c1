//! Emotion categories produced by the classifier.
//!
//! The classifier emits one score per category, in the fixed index order:
//!
//! | Index | Label    |
//! |-------|----------|
//! | 0     | Angry    |
//! | 1     | Disgust  |
//! | 2     | Fear     |
//! | 3     | Happy    |
//! | 4     | Sad      |
//! | 5     | Surprise |
//! | 6     | Neutral  |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the seven emotion categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// All categories in classifier output order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Number of categories the classifier scores.
    pub const COUNT: usize = Self::ALL.len();

    /// Look up a category by classifier output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position of this category in the classifier output.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns the label as sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = EmotionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EmotionParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown emotion: {0}")]
pub struct EmotionParseError(String);

/// Classifier output that could not be turned into a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoresError {
    #[error("expected {expected} class scores, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("class scores contain NaN")]
    NotANumber,
}

/// Classification of a single face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionPrediction {
    pub emotion: Emotion,
    /// Highest class score, in [0.0, 1.0] for a softmax output.
    pub confidence: f32,
}

impl EmotionPrediction {
    /// Pick the highest-scoring category.
    ///
    /// Ties resolve to the lowest index.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ScoresError> {
        if scores.len() != Emotion::COUNT {
            return Err(ScoresError::WrongLength {
                expected: Emotion::COUNT,
                actual: scores.len(),
            });
        }
        if scores.iter().any(|s| s.is_nan()) {
            return Err(ScoresError::NotANumber);
        }

        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }

        Ok(Self {
            emotion: Emotion::ALL[best],
            confidence: scores[best],
        })
    }
}
