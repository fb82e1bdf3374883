//! Cloze grading: align a masked transcript against the original one and the
//! learner's answers, producing one verdict per blank.
//!
//! Tokenisation is a naive split on single spaces. Repeated spaces yield empty
//! tokens, which are kept positionally and compared like any other token.
//! Comparison is lower-cased exact equality: no trimming, no punctuation
//! stripping ("dont" and "don't" differ).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token that marks a blank in a masked transcript.
pub const PLACEHOLDER: &str = "***";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
  /// Masked and original transcripts do not line up token for token.
  #[error("masked transcript has {masked} tokens but original has {original}")]
  MalformedInput { masked: usize, original: usize },
  /// Answer count differs from the number of blanks (strict policy only).
  #[error("expected {expected} answers, got {actual}")]
  InputMismatch { expected: usize, actual: usize },
}

/// What to do when the answer count does not match the blank count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
  /// Missing answers grade as empty strings, surplus answers are ignored.
  #[default]
  Pad,
  /// Reject the submission with `GradeError::InputMismatch`.
  Reject,
}

/// Per-blank verdicts, in blank order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GradeResult {
  results: Vec<bool>,
}

impl GradeResult {
  pub fn results(&self) -> &[bool] {
    &self.results
  }

  pub fn len(&self) -> usize {
    self.results.len()
  }

  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }

  /// Overall pass: every blank correct. Vacuously true with no blanks.
  pub fn passed(&self) -> bool {
    self.results.iter().all(|ok| *ok)
  }

  pub fn correct_count(&self) -> usize {
    self.results.iter().filter(|ok| **ok).count()
  }

  /// Fraction of correct blanks in `[0, 1]`; 1.0 when there are no blanks.
  pub fn score(&self) -> f32 {
    if self.results.is_empty() {
      return 1.0;
    }
    self.correct_count() as f32 / self.results.len() as f32
  }

  pub fn percent(&self) -> f32 {
    self.score() * 100.0
  }
}

/// Split on single spaces, keeping empty tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
  text.split(' ').collect()
}

pub fn blank_count<S: AsRef<str>>(masked: &[S]) -> usize {
  masked.iter().filter(|t| t.as_ref() == PLACEHOLDER).count()
}

/// Grade `answers` against the blanks of `masked`, using `original` as ground truth.
///
/// A missing answer compares as the empty string. Only fails when the two
/// transcripts have different lengths.
pub fn grade<M, O, A>(masked: &[M], original: &[O], answers: &[A]) -> Result<GradeResult, GradeError>
where
  M: AsRef<str>,
  O: AsRef<str>,
  A: AsRef<str>,
{
  if masked.len() != original.len() {
    return Err(GradeError::MalformedInput { masked: masked.len(), original: original.len() });
  }

  let mut results = Vec::with_capacity(blank_count(masked));
  let mut blank = 0usize;
  for (token, truth) in masked.iter().zip(original) {
    if token.as_ref() != PLACEHOLDER {
      continue;
    }
    let answer = answers.get(blank).map(|a| a.as_ref()).unwrap_or("");
    results.push(truth.as_ref().to_lowercase() == answer.to_lowercase());
    blank += 1;
  }
  Ok(GradeResult { results })
}

/// Like [`grade`], but applies `policy` to the answer count first.
pub fn grade_with_policy<M, O, A>(
  masked: &[M],
  original: &[O],
  answers: &[A],
  policy: AnswerPolicy,
) -> Result<GradeResult, GradeError>
where
  M: AsRef<str>,
  O: AsRef<str>,
  A: AsRef<str>,
{
  if policy == AnswerPolicy::Reject {
    let expected = blank_count(masked);
    if answers.len() != expected {
      return Err(GradeError::InputMismatch { expected, actual: answers.len() });
    }
  }
  grade(masked, original, answers)
}

/// Tokenise both transcripts and grade.
pub fn grade_text<A: AsRef<str>>(
  masked_text: &str,
  original_text: &str,
  answers: &[A],
  policy: AnswerPolicy,
) -> Result<GradeResult, GradeError> {
  grade_with_policy(&tokenize(masked_text), &tokenize(original_text), answers, policy)
}

/// Check that a clip's transcripts line up token for token. Returns the blank count.
pub fn check_alignment(masked_text: &str, original_text: &str) -> Result<usize, GradeError> {
  let masked = tokenize(masked_text);
  let original = tokenize(original_text);
  if masked.len() != original.len() {
    return Err(GradeError::MalformedInput { masked: masked.len(), original: original.len() });
  }
  Ok(blank_count(&masked))
}

#[cfg(test)]
mod tests {
  use super::*;

  const NONE: [&str; 0] = [];

  #[test]
  fn case_insensitive_match() {
    let upper = grade(&["***"], &["Hello"], &["HELLO"]).unwrap();
    let lower = grade(&["***"], &["Hello"], &["hello"]).unwrap();
    assert_eq!(upper.results(), &[true]);
    assert_eq!(lower.results(), &[true]);
  }

  #[test]
  fn punctuation_causes_mismatch() {
    let r = grade(&["***"], &["dont"], &["don't"]).unwrap();
    assert_eq!(r.results(), &[false]);

    let r = grade(&["***"], &["fox."], &["fox"]).unwrap();
    assert_eq!(r.results(), &[false]);
  }

  #[test]
  fn answers_are_not_trimmed() {
    let r = grade(&["***"], &["fox"], &[" fox"]).unwrap();
    assert_eq!(r.results(), &[false]);
  }

  #[test]
  fn non_blank_positions_are_skipped() {
    let r = grade(&["the", "***", "fox"], &["the", "quick", "fox"], &["quick"]).unwrap();
    assert_eq!(r.results(), &[true]);
  }

  #[test]
  fn blanks_graded_left_to_right() {
    let masked = ["***", "jumps", "***"];
    let original = ["fox", "jumps", "high"];
    assert_eq!(grade(&masked, &original, &["fox", "high"]).unwrap().results(), &[true, true]);
    assert_eq!(grade(&masked, &original, &["cat", "high"]).unwrap().results(), &[false, true]);
  }

  #[test]
  fn vacuous_case_passes() {
    let r = grade(&NONE, &NONE, &NONE).unwrap();
    assert!(r.is_empty());
    assert!(r.passed());
    assert_eq!(r.score(), 1.0);
  }

  #[test]
  fn output_length_equals_blank_count() {
    let masked = tokenize("*** a *** b *** c");
    let original = tokenize("x a y b z c");
    let r = grade(&masked, &original, &["x", "y", "z"]).unwrap();
    assert_eq!(r.len(), blank_count(&masked));
    assert_eq!(r.len(), 3);
  }

  #[test]
  fn missing_answers_grade_as_mismatch() {
    let r = grade(&["***", "***"], &["one", "two"], &["one"]).unwrap();
    assert_eq!(r.results(), &[true, false]);
    assert!(!r.passed());
  }

  #[test]
  fn surplus_answers_are_ignored_when_padding() {
    let r = grade_with_policy(&["***"], &["one"], &["one", "two"], AnswerPolicy::Pad).unwrap();
    assert_eq!(r.results(), &[true]);
  }

  #[test]
  fn reject_policy_fails_on_count_mismatch() {
    let err = grade_with_policy(&["***", "***"], &["a", "b"], &["a"], AnswerPolicy::Reject).unwrap_err();
    assert_eq!(err, GradeError::InputMismatch { expected: 2, actual: 1 });
  }

  #[test]
  fn length_mismatch_is_malformed() {
    let err = grade(&["***", "x"], &["a"], &["a"]).unwrap_err();
    assert_eq!(err, GradeError::MalformedInput { masked: 2, original: 1 });
  }

  #[test]
  fn repeated_spaces_keep_empty_tokens() {
    let masked = tokenize("the  ***");
    let original = tokenize("the  fox");
    assert_eq!(masked, vec!["the", "", "***"]);
    let r = grade(&masked, &original, &["Fox"]).unwrap();
    assert_eq!(r.results(), &[true]);
  }

  #[test]
  fn grading_is_idempotent() {
    let a = grade_text("*** jumps ***", "fox jumps high", &["cat", "high"], AnswerPolicy::Pad).unwrap();
    let b = grade_text("*** jumps ***", "fox jumps high", &["cat", "high"], AnswerPolicy::Pad).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.correct_count(), 1);
    assert_eq!(a.percent(), 50.0);
  }

  #[test]
  fn alignment_check() {
    assert_eq!(check_alignment("the *** fox", "the quick fox"), Ok(1));
    assert_eq!(check_alignment("the fox", "the fox"), Ok(0));
    assert!(matches!(
      check_alignment("the *** fox", "the quick brown fox"),
      Err(GradeError::MalformedInput { masked: 3, original: 4 })
    ));
  }
}
