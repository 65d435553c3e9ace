//! CSV-to-answer batch pipeline.
//!
//! Questions are extracted from the `question` column (header matched
//! case-insensitively) and answered one at a time. Every row produces its own
//! [`RowOutcome`]; a failed row is logged and skipped, never aborting the
//! batch and never rolling back rows already stored.

use crate::models::{CsvRow, NewQnaEntry};
use crate::services::answers::AnswerGenerator;
use crate::storage::{QnaStore, StorageError};
use csv::{ReaderBuilder, Trim};
use futures_util::stream::{self, StreamExt};
use qna_llm_sdk::error::LlmError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("Failed to read CSV file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV must contain a 'Question' column")]
    MissingQuestionColumn,
}

/// What a CSV file holds in its question column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvQuestions {
    /// Non-empty questions in file order
    pub questions: Vec<String>,
    /// Data rows whose question cell is blank or missing
    pub empty_rows: usize,
    /// Questions repeating an earlier one
    pub duplicates: usize,
}

pub fn read_questions(path: &Path) -> Result<CsvQuestions, CsvImportError> {
    let file = File::open(path)?;
    read_questions_from(file)
}

pub fn read_questions_from<R: Read>(input: R) -> Result<CsvQuestions, CsvImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    // Spreadsheet exports are often Windows-1252; undecodable bytes become U+FFFD
    // instead of failing the whole file.
    let column = reader
        .byte_headers()?
        .iter()
        .map(decode_cell)
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case("question"))
        .ok_or(CsvImportError::MissingQuestionColumn)?;

    let mut parsed = CsvQuestions::default();
    let mut seen = HashSet::new();

    for record in reader.byte_records() {
        let record = record?;
        match record.get(column).map(decode_cell).filter(|q| !q.is_empty()) {
            Some(question) => {
                if !seen.insert(question.clone()) {
                    parsed.duplicates += 1;
                }
                parsed.questions.push(question);
            }
            None => parsed.empty_rows += 1,
        }
    }

    Ok(parsed)
}

fn decode_cell(cell: &[u8]) -> String {
    String::from_utf8_lossy(cell).trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Store every answered question with the CSV upload category
    Persist,
    /// Only generate answers, for review before a commit
    Preview,
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("answer generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("insert failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub answer: String,
    /// Id of the stored entry; `None` in preview mode
    pub entry_id: Option<i64>,
}

#[derive(Debug)]
pub struct RowOutcome {
    pub index: usize,
    pub question: String,
    pub result: Result<ProcessedRow, RowError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.processed()
    }

    /// Question/answer pairs of the rows that succeeded
    pub fn rows(&self) -> Vec<CsvRow> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().ok().map(|row| CsvRow {
                    question: o.question.clone(),
                    answer: row.answer.clone(),
                })
            })
            .collect()
    }
}

/// Rows `start..end` (end defaults to the total), shortened to `batch_size`
pub fn select_range(
    total: usize,
    start: usize,
    end: Option<usize>,
    batch_size: Option<usize>,
) -> Range<usize> {
    let mut end = end.unwrap_or(total).min(total);
    if let Some(size) = batch_size {
        end = end.min(start.saturating_add(size));
    }
    start.min(end)..end
}

/// Writes one `Question,Answer,Status` line per outcome
pub fn write_report<W: Write>(report: &BatchReport, output: W) -> Result<(), CsvImportError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["Question", "Answer", "Status"])?;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(row) => writer.write_record([outcome.question.as_str(), row.answer.as_str(), "ok"])?,
            Err(e) => {
                let status = format!("failed: {e}");
                writer.write_record([outcome.question.as_str(), "", status.as_str()])?
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Answers each question in turn; one row's failure never affects another.
pub async fn process_questions(
    questions: Vec<String>,
    generator: &AnswerGenerator,
    store: &dyn QnaStore,
    mode: BatchMode,
) -> BatchReport {
    let total = questions.len();
    info!(total, ?mode, model = generator.model_name(), "Processing question batch");

    let outcomes = stream::iter(questions.into_iter().enumerate())
        .then(|(index, question)| async move {
            debug!(row = index + 1, total, "Generating answer");
            let result = process_row(&question, generator, store, mode).await;
            if let Err(e) = &result {
                warn!(row = index + 1, error = %e, "Skipping question");
            }
            RowOutcome {
                index,
                question,
                result,
            }
        })
        .collect::<Vec<_>>()
        .await;

    let report = BatchReport { outcomes };
    info!(
        total,
        processed = report.processed(),
        failed = report.failed(),
        "Question batch finished"
    );
    report
}

async fn process_row(
    question: &str,
    generator: &AnswerGenerator,
    store: &dyn QnaStore,
    mode: BatchMode,
) -> Result<ProcessedRow, RowError> {
    let answer = generator.generate(question, None).await?;

    let entry_id = match mode {
        BatchMode::Persist => {
            let entry = store
                .insert(NewQnaEntry::from_csv(question, answer.clone()))
                .await?;
            Some(entry.id)
        }
        BatchMode::Preview => None,
    };

    Ok(ProcessedRow { answer, entry_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_match_is_case_insensitive() {
        let csv = "ID,QUESTION,Notes\n1,What is a TPA?,x\n2,Do you audit claims?,y\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(
            parsed.questions,
            vec!["What is a TPA?", "Do you audit claims?"]
        );
    }

    #[test]
    fn blank_cells_are_counted_not_returned() {
        let csv = "Question\nFirst?\n\"  \"\nSecond?\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(parsed.questions, vec!["First?", "Second?"]);
        assert_eq!(parsed.empty_rows, 1);
    }

    #[test]
    fn short_rows_count_as_empty() {
        let csv = "Id,Question\n1,Present?\n2\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(parsed.questions, vec!["Present?"]);
        assert_eq!(parsed.empty_rows, 1);
    }

    #[test]
    fn duplicates_are_kept_and_counted() {
        let csv = "question\nSame?\nSame?\nOther?\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(parsed.questions.len(), 3);
        assert_eq!(parsed.duplicates, 1);
    }

    #[test]
    fn quoted_fields_with_commas_survive() {
        let csv = "Question,Answer\n\"Do you support HSA, FSA, and HRA plans?\",\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(
            parsed.questions,
            vec!["Do you support HSA, FSA, and HRA plans?"]
        );
    }

    #[test]
    fn byte_order_mark_does_not_hide_header() {
        let csv = "\u{feff}Question\nWith BOM?\n";
        let parsed = read_questions_from(csv.as_bytes()).unwrap();
        assert_eq!(parsed.questions, vec!["With BOM?"]);
    }

    #[test]
    fn non_utf8_cells_are_decoded_lossily() {
        let csv: &[u8] = b"Question\nFirst ok?\nCaf\xe9 \x93smart\x94 quotes?\nThird ok?\n";
        let parsed = read_questions_from(csv).unwrap();
        assert_eq!(parsed.questions.len(), 3);
        assert_eq!(parsed.questions[0], "First ok?");
        assert_eq!(parsed.questions[1], "Caf\u{fffd} \u{fffd}smart\u{fffd} quotes?");
        assert_eq!(parsed.questions[2], "Third ok?");
    }

    #[test]
    fn missing_column_fails_the_file() {
        let err = read_questions_from("Prompt\nHello?\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CsvImportError::MissingQuestionColumn));
    }

    #[test]
    fn empty_file_fails_the_file() {
        let err = read_questions_from("".as_bytes()).unwrap_err();
        assert!(matches!(err, CsvImportError::MissingQuestionColumn));
    }

    #[test]
    fn range_defaults_to_everything() {
        assert_eq!(select_range(10, 0, None, None), 0..10);
    }

    #[test]
    fn range_is_clamped_and_batched() {
        assert_eq!(select_range(10, 2, Some(50), None), 2..10);
        assert_eq!(select_range(10, 2, None, Some(3)), 2..5);
        assert_eq!(select_range(10, 8, None, Some(5)), 8..10);
        assert_eq!(select_range(10, 12, None, None), 10..10);
    }

    #[test]
    fn report_lists_failures_with_status() {
        let report = BatchReport {
            outcomes: vec![
                RowOutcome {
                    index: 0,
                    question: "Covered, in network?".to_string(),
                    result: Ok(ProcessedRow {
                        answer: "Yes".to_string(),
                        entry_id: None,
                    }),
                },
                RowOutcome {
                    index: 1,
                    question: "b?".to_string(),
                    result: Err(RowError::Generation(LlmError::invalid_response("down"))),
                },
            ],
        };

        let mut out = Vec::new();
        write_report(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Question,Answer,Status");
        assert_eq!(lines[1], "\"Covered, in network?\",Yes,ok");
        assert!(lines[2].starts_with("b?,,failed: "));
    }

    #[test]
    fn report_counts_and_rows() {
        let report = BatchReport {
            outcomes: vec![
                RowOutcome {
                    index: 0,
                    question: "a?".to_string(),
                    result: Ok(ProcessedRow {
                        answer: "A".to_string(),
                        entry_id: Some(1),
                    }),
                },
                RowOutcome {
                    index: 1,
                    question: "b?".to_string(),
                    result: Err(RowError::Generation(LlmError::invalid_response("down"))),
                },
            ],
        };

        assert_eq!(report.processed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.rows(),
            vec![CsvRow {
                question: "a?".to_string(),
                answer: "A".to_string()
            }]
        );
    }
}
