use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::models::EvaluationResult;
use crate::session::{EvaluationScope, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum EvaluationStatus {
    Completed,
    Failed,
}

impl EvaluationStatus {
    fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentReport {
    pub(crate) roll_number: String,
    pub(crate) status: EvaluationStatus,
    pub(crate) evaluated_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub(crate) evaluated: usize,
    pub(crate) failed: usize,
    pub(crate) students: Vec<StudentReport>,
}

/// Evaluates the students in `scope` one at a time against the current rubric.
///
/// The session lock is only held while planning and while recording each
/// result, never across a model call. Only one run may be active at a time.
/// A reset during the run stops it.
pub(crate) async fn run_evaluation(
    state: &AppState,
    scope: EvaluationScope,
) -> Result<RunReport, SessionError> {
    let _run = state.try_begin_run().map_err(|_| SessionError::EvaluationInProgress)?;
    let plan = state.session().lock().await.plan_evaluation(&scope)?;

    tracing::info!(
        students = plan.students.len(),
        questions = plan.rubric.questions().len(),
        criteria = plan.rubric.criteria().len(),
        ?scope,
        "Starting evaluation run"
    );

    let mut reports = Vec::with_capacity(plan.students.len());
    for student in plan.students {
        let span = tracing::info_span!("evaluate_student", roll_number = %student.roll_number);

        let started = Instant::now();
        let outcome = state
            .evaluator()
            .evaluate(&student.pdf_bytes, plan.rubric.questions(), plan.rubric.criteria())
            .instrument(span)
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        let status =
            if outcome.is_error() { EvaluationStatus::Failed } else { EvaluationStatus::Completed };
        metrics::counter!("evaluations_total", "status" => status.as_str()).increment(1);
        metrics::histogram!("evaluation_duration_seconds").record(elapsed);

        let result = EvaluationResult::from_outcome(student, outcome, now_utc());
        let report = StudentReport {
            roll_number: result.roll_number().to_string(),
            status,
            evaluated_questions: result.question_count(),
            error: result.error().map(str::to_string),
        };

        match status {
            EvaluationStatus::Completed => tracing::info!(
                roll_number = %report.roll_number,
                questions = report.evaluated_questions,
                elapsed_seconds = elapsed,
                "Student evaluated"
            ),
            EvaluationStatus::Failed => tracing::warn!(
                roll_number = %report.roll_number,
                error = report.error.as_deref().unwrap_or_default(),
                "Student evaluation failed"
            ),
        }

        let mut session = state.session().lock().await;
        if session.epoch() != plan.epoch {
            tracing::warn!("Session was reset during evaluation; discarding remaining work");
            break;
        }
        session.record_result(result);
        drop(session);

        reports.push(report);
    }

    let failed = reports.iter().filter(|report| report.status == EvaluationStatus::Failed).count();
    tracing::info!(evaluated = reports.len() - failed, failed, "Evaluation run finished");

    Ok(RunReport { evaluated: reports.len() - failed, failed, students: reports })
}
