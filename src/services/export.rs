//! Detailed CSV, pivot CSV and JSON projections of evaluation results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::EvaluationResult;

pub(crate) const OVERALL_FEEDBACK_ROW: &str = "OVERALL_FEEDBACK";

const DETAILED_HEADER: [&str; 6] =
    ["Student Name", "Roll Number", "PDF Filename", "Question ID", "Score", "Feedback"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Detailed,
    Pivot,
    Json,
}

impl ExportFormat {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Detailed => "detailed",
            ExportFormat::Pivot => "pivot",
            ExportFormat::Json => "json",
        }
    }

    pub(crate) fn file_name(self, prefix: &str) -> String {
        match self {
            ExportFormat::Detailed => format!("{prefix}_detailed_results.csv"),
            ExportFormat::Pivot => format!("{prefix}_pivot_results.csv"),
            ExportFormat::Json => format!("{prefix}_results.json"),
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Detailed | ExportFormat::Pivot => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub(crate) fn render(self, results: &[EvaluationResult]) -> Result<String, serde_json::Error> {
        match self {
            ExportFormat::Detailed => Ok(render_csv(
                DETAILED_HEADER,
                detailed_rows(results).iter().map(|row| row.cells().to_vec()),
            )),
            ExportFormat::Pivot => Ok(pivot_table(results).to_csv()),
            ExportFormat::Json => to_json(results),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DetailedRow {
    pub(crate) student_name: String,
    pub(crate) roll_number: String,
    pub(crate) pdf_filename: String,
    pub(crate) question_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) feedback: String,
}

impl DetailedRow {
    fn cells(&self) -> [String; 6] {
        [
            self.student_name.clone(),
            self.roll_number.clone(),
            self.pdf_filename.clone(),
            self.question_id.clone(),
            self.score.map(|score| score.to_string()).unwrap_or_default(),
            self.feedback.clone(),
        ]
    }
}

/// Question rows for every student in input order, then one
/// `OVERALL_FEEDBACK` row per student.
pub(crate) fn detailed_rows(results: &[EvaluationResult]) -> Vec<DetailedRow> {
    let mut rows = Vec::new();

    for result in results {
        let student = result.student();
        for (question_id, grade) in result.grades() {
            rows.push(DetailedRow {
                student_name: student.name.clone(),
                roll_number: student.roll_number.clone(),
                pdf_filename: student.pdf_filename.clone(),
                question_id: question_id.to_string(),
                score: Some(grade.score),
                feedback: grade.feedback.clone(),
            });
        }
    }

    for result in results {
        let student = result.student();
        rows.push(DetailedRow {
            student_name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            pdf_filename: student.pdf_filename.clone(),
            question_id: OVERALL_FEEDBACK_ROW.to_string(),
            score: None,
            feedback: result.overall_feedback().to_string(),
        });
    }

    rows
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PivotTable {
    pub(crate) question_ids: Vec<String>,
    pub(crate) rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PivotRow {
    pub(crate) student_name: String,
    pub(crate) roll_number: String,
    pub(crate) overall_feedback: String,
    /// `(score, feedback)` per entry of [`PivotTable::question_ids`]; empty when not graded.
    pub(crate) cells: Vec<(String, String)>,
}

impl PivotTable {
    pub(crate) fn header(&self) -> Vec<String> {
        let mut header = vec![
            "Student Name".to_string(),
            "Roll Number".to_string(),
            "Overall Feedback".to_string(),
        ];
        for question_id in &self.question_ids {
            header.push(format!("Score_{question_id}"));
            header.push(format!("Feedback_{question_id}"));
        }
        header
    }

    pub(crate) fn to_csv(&self) -> String {
        let rows = self.rows.iter().map(|row| {
            let mut cells = vec![
                row.student_name.clone(),
                row.roll_number.clone(),
                row.overall_feedback.clone(),
            ];
            for (score, feedback) in &row.cells {
                cells.push(score.clone());
                cells.push(feedback.clone());
            }
            cells
        });
        render_csv(self.header(), rows)
    }
}

pub(crate) fn pivot_table(results: &[EvaluationResult]) -> PivotTable {
    let question_ids: Vec<String> = results
        .iter()
        .flat_map(|result| result.grades().map(|(id, _)| id.to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = results
        .iter()
        .map(|result| PivotRow {
            student_name: result.student().name.clone(),
            roll_number: result.roll_number().to_string(),
            overall_feedback: result.overall_feedback().to_string(),
            cells: question_ids
                .iter()
                .map(|id| match result.grade(id) {
                    Some(grade) => (grade.score.to_string(), grade.feedback.clone()),
                    None => (String::new(), String::new()),
                })
                .collect(),
        })
        .collect();

    PivotTable { question_ids, rows }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StudentExport {
    pub(crate) student: StudentInfo,
    pub(crate) evaluations: Vec<QuestionExport>,
    pub(crate) overall_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StudentInfo {
    pub(crate) name: String,
    pub(crate) roll_number: String,
    pub(crate) pdf_filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionExport {
    pub(crate) question_id: String,
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

pub(crate) fn json_records(results: &[EvaluationResult]) -> Vec<StudentExport> {
    results
        .iter()
        .map(|result| {
            let student = result.student();
            StudentExport {
                student: StudentInfo {
                    name: student.name.clone(),
                    roll_number: student.roll_number.clone(),
                    pdf_filename: student.pdf_filename.clone(),
                },
                evaluations: result
                    .grades()
                    .map(|(question_id, grade)| QuestionExport {
                        question_id: question_id.to_string(),
                        score: grade.score,
                        feedback: grade.feedback.clone(),
                    })
                    .collect(),
                overall_feedback: result.overall_feedback().to_string(),
            }
        })
        .collect()
}

pub(crate) fn to_json(results: &[EvaluationResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json_records(results))
}

fn render_csv<H, R>(header: H, rows: R) -> String
where
    H: IntoIterator,
    H::Item: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut out = String::new();
    push_record(&mut out, header);
    for row in rows {
        push_record(&mut out, row);
    }
    out
}

fn push_record<I>(out: &mut String, cells: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let line = cells.into_iter().map(|cell| csv_escape(cell.as_ref())).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
