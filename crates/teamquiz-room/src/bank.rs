//! Per-room question banks and their CSV import.
//!
//! A bank is an ordered queue of pre-validated questions. Draws consume
//! questions, so nothing is ever asked twice from the same upload.
//!
//! # CSV format
//!
//! Header row required; columns are matched by name:
//!
//! ```text
//! id,text,optionA,optionB,optionC,optionD,correctIndex,category
//! q1,Capital of France?,Paris,Rome,Madrid,,0,Geography
//! ```
//!
//! `id` and `category` may be missing or blank (they default to the
//! 1-based row number and `General`). Blank option cells are dropped; at
//! least two options must remain and `correctIndex` must point at one of
//! them. One bad row rejects the whole file.

use std::collections::VecDeque;
use std::io::Read;

use serde::{Deserialize, Serialize};
use teamquiz_protocol::Question;

/// Category assigned to rows that don't name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Errors from importing a bank file.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    /// The file is not readable CSV, or a required column is missing.
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    /// A row parsed but does not describe a valid question.
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSummary {
    /// Number of questions now in the bank.
    pub loaded: usize,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankRow {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(default)]
    option_a: Option<String>,
    #[serde(default)]
    option_b: Option<String>,
    #[serde(default)]
    option_c: Option<String>,
    #[serde(default)]
    option_d: Option<String>,
    correct_index: String,
    #[serde(default)]
    category: Option<String>,
}

impl BankRow {
    fn into_question(self, row: usize) -> Result<Question, BankError> {
        let bad = |reason: String| BankError::Row { row, reason };

        let options: Vec<String> = [self.option_a, self.option_b, self.option_c, self.option_d]
            .into_iter()
            .flatten()
            .filter(|o| !o.is_empty())
            .collect();
        let correct_index: usize = self
            .correct_index
            .parse()
            .map_err(|_| bad(format!("correctIndex {:?} is not a number", self.correct_index)))?;

        let question = Question {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| row.to_string()),
            text: self.text,
            options,
            correct_index,
            category: Some(
                self.category
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
            ),
        };
        question.validate().map_err(bad)?;
        Ok(question)
    }
}

// ---------------------------------------------------------------------------
// QuestionBank
// ---------------------------------------------------------------------------

/// Ordered queue of questions for one room.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: VecDeque<Question>,
}

impl QuestionBank {
    /// Parses a whole CSV upload. Nothing is returned unless every row is
    /// valid.
    pub fn from_csv(reader: impl Read) -> Result<Self, BankError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut questions = VecDeque::new();
        for (index, record) in csv.deserialize::<BankRow>().enumerate() {
            let row = index + 1;
            let record = record?;
            questions.push_back(record.into_question(row)?);
        }
        Ok(Self { questions })
    }

    /// Builds a bank from already-validated questions.
    pub fn from_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        Self {
            questions: questions.into_iter().collect(),
        }
    }

    /// Removes and returns the first question matching `category`
    /// (any question when `None`).
    pub fn draw(&mut self, category: Option<&str>) -> Option<Question> {
        let index = self
            .questions
            .iter()
            .position(|q| category.is_none() || q.category.as_deref() == category)?;
        self.questions.remove(index)
    }

    /// Puts a drawn question back at the head of the queue.
    pub fn push_front(&mut self, question: Question) {
        self.questions.push_front(question);
    }

    /// Count and categories, as reported after an upload.
    pub fn summary(&self) -> BankSummary {
        let mut categories: Vec<String> = Vec::new();
        for category in self.questions.iter().filter_map(|q| q.category.as_ref()) {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }
        BankSummary {
            loaded: self.questions.len(),
            categories,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
