use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: u32,
    pub time_limit_minutes: Option<u32>, // None = untimed
    pub passing_score_percent: u32,
    pub max_attempts: Option<u32>, // None = unlimited
    pub attempts_used: u32,
    pub enrollment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: u32,
    pub time_limit_minutes: Option<u32>, // None = untimed
    pub passing_score_percent: u32,
    pub max_attempts: Option<u32>, // None = unlimited
}

/// Learner-facing projection of a question. Never carries the correct index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub position: u32,
    pub points: u32,
}

/// Server-computed permission to start a new attempt. The client only displays it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEligibility {
    pub can_attempt: bool,
    #[serde(default)]
    pub attempts_used: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Most recent completed attempt, shown to explain an ineligible session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_number: u32,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f32,
    pub is_passed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Per-question choices for the running attempt. Slot order is question order,
/// regardless of the order the learner answered in. Lives only in session
/// memory until a submission snapshot is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSelection {
    choices: Vec<Option<usize>>,
}

pub const UNANSWERED: i32 = -1;

impl AnswerSelection {
    pub fn new(question_count: usize) -> Self {
        Self {
            choices: vec![None; question_count],
        }
    }

    /// Idempotent overwrite. Out-of-range indices are ignored.
    pub fn select(&mut self, question_index: usize, option_index: usize) {
        if let Some(slot) = self.choices.get_mut(question_index) {
            *slot = Some(option_index);
        }
    }

    pub fn choice(&self, question_index: usize) -> Option<usize> {
        self.choices.get(question_index).copied().flatten()
    }

    pub fn answered_count(&self) -> usize {
        self.choices.iter().filter(|c| c.is_some()).count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.choices.len() - self.answered_count()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Wire encoding: one entry per question, unanswered slots as -1.
    pub fn encode(&self, questions: &[Question]) -> Vec<AnswerEntry> {
        questions
            .iter()
            .zip(self.choices.iter())
            .map(|(q, c)| AnswerEntry {
                question_id: q.id.clone(),
                selected_option: c.map(|i| i as i32).unwrap_or(UNANSWERED),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: String,
    pub selected_option: i32, // -1 = unanswered
}

/// Immutable snapshot sent to the scoring endpoint. Built exactly once per
/// session; retries after a network failure resend this same value, including
/// the attempt token the server can use to deduplicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub quiz_id: String,
    pub enrollment_id: String,
    pub attempt_token: String, // client-generated UUID v4
    pub started_at: DateTime<Utc>,
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub prompt: String,
    pub selected_option: i32, // -1 = unanswered
    pub correct_option: u32,
    pub is_correct: bool,
    pub points_earned: u32,
    pub points_possible: u32,
}

/// Server-authoritative scored result. The only thing the result screens read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub submission_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub attempt_number: u32,
    pub max_attempts: Option<u32>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f32,
    pub is_passed: bool,
    pub passing_score_percent: u32,
    pub time_taken_seconds: u32,
    pub answers: Vec<AnswerResult>,
}

impl SubmissionResult {
    /// Percentage for the progress bar, clamped to [0, 100].
    pub fn percent_clamped(&self) -> f32 {
        self.percentage.clamp(0.0, 100.0)
    }

    /// Whether a fresh attempt may be offered. Recomputed from this result,
    /// not from the pre-attempt eligibility snapshot: the attempt that just
    /// completed changed the count.
    pub fn can_retry(&self) -> bool {
        !self.is_passed
            && match self.max_attempts {
                Some(max) => self.attempt_number < max,
                None => true,
            }
    }
}

/// mm:ss clock text for the countdown.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, position: u32) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("Prompt {id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            position,
            points: 1,
        }
    }

    #[test]
    fn test_select_overwrites_never_appends() {
        let mut answers = AnswerSelection::new(3);
        answers.select(1, 0);
        answers.select(1, 0);
        assert_eq!(answers.choice(1), Some(0));
        assert_eq!(answers.answered_count(), 1);

        answers.select(1, 2);
        assert_eq!(answers.choice(1), Some(2));
        assert_eq!(answers.answered_count(), 1);
    }

    #[test]
    fn test_encode_marks_unanswered_slots() {
        let questions = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let mut answers = AnswerSelection::new(3);
        answers.select(0, 0);

        let encoded = answers.encode(&questions);
        let selected: Vec<i32> = encoded.iter().map(|e| e.selected_option).collect();
        assert_eq!(selected, vec![0, UNANSWERED, UNANSWERED]);
        assert_eq!(encoded[1].question_id, "q2");
    }

    #[test]
    fn test_retry_gate_recomputed_from_result() {
        let mut result = SubmissionResult {
            submission_id: "s1".into(),
            quiz_id: "quiz1".into(),
            quiz_title: "Quiz".into(),
            attempt_number: 2,
            max_attempts: Some(3),
            score: 1,
            max_score: 3,
            percentage: 33.3,
            is_passed: false,
            passing_score_percent: 70,
            time_taken_seconds: 42,
            answers: vec![],
        };
        assert!(result.can_retry());

        result.attempt_number = 3;
        assert!(!result.can_retry());

        result.attempt_number = 5;
        result.max_attempts = None;
        assert!(result.can_retry());

        result.is_passed = true;
        assert!(!result.can_retry());
    }

    #[test]
    fn test_percent_clamped() {
        let mut result = SubmissionResult {
            submission_id: "s1".into(),
            quiz_id: "quiz1".into(),
            quiz_title: "Quiz".into(),
            attempt_number: 1,
            max_attempts: None,
            score: 0,
            max_score: 0,
            percentage: 104.2,
            is_passed: true,
            passing_score_percent: 70,
            time_taken_seconds: 1,
            answers: vec![],
        };
        assert_eq!(result.percent_clamped(), 100.0);
        result.percentage = -3.0;
        assert_eq!(result.percent_clamped(), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(600), "10:00");
    }
}
