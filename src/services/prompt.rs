use crate::models::{criterion_id, QuestionMap, RubricCriteria};

const PREAMBLE: &str = "You are an AI evaluator. Use the following rubric criteria and questions to evaluate the student's PDF response.\n\n";

const INSTRUCTIONS: &str = r#"
INSTRUCTIONS:
1. Evaluate the student's response against each question and the rubric criteria.
2. For each question, provide a score from 0 to 10 (half points such as 7.5 are allowed) and detailed feedback.
3. Provide an overall assessment of the student's work in the "overall_feedback" field.
4. Respond with a single JSON object of this exact shape:
{
  "question_evaluations": [
    {"question_id": "<question id>", "score": <number>, "feedback": "<feedback>"}
  ],
  "overall_feedback": "<overall assessment>"
}
Use the question ids exactly as listed above.
"#;

/// Builds the evaluation prompt. Criteria are numbered by position and
/// questions follow map order, so equal inputs give byte-identical prompts.
pub(crate) fn build_prompt(criteria: &[RubricCriteria], questions: &QuestionMap) -> String {
    let mut prompt = String::from(PREAMBLE);

    prompt.push_str("RUBRIC CRITERIA:\n");
    for (position, criterion) in criteria.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}: {}\n",
            criterion_id(position),
            criterion.title,
            criterion.explanation
        ));
    }

    prompt.push_str("\nQUESTIONS AND STANDARD ANSWERS:\n");
    for (question_id, rubric) in questions {
        prompt.push_str(&format!(
            "{question_id}: {}\nStandard Answer: {}\n\n",
            rubric.question, rubric.standard_answer
        ));
    }

    prompt.push_str(INSTRUCTIONS);
    prompt
}
