use crate::registry::{Metric, ThresholdRegistry};

use super::domain::{ChecklistRequest, MetricInput, MetricValue, ScoreComponent};
use super::validation::ValidationError;
use super::Assessment;

/// Category subtotals above this are flagged high.
const CATEGORY_HIGH: f64 = 5.0;
const CATEGORY_MEDIUM: f64 = 2.0;

fn category_level(subtotal: f64) -> &'static str {
    if subtotal > CATEGORY_HIGH {
        "high"
    } else if subtotal > CATEGORY_MEDIUM {
        "medium"
    } else {
        "low"
    }
}

pub(crate) fn assess(
    registry: &ThresholdRegistry,
    request: &ChecklistRequest,
) -> Result<Assessment, ValidationError> {
    if let Some(unknown) = request
        .answers
        .keys()
        .find(|id| registry.checklist_question(id).is_none())
    {
        return Err(ValidationError::UnknownQuestion(unknown.clone()));
    }

    let questions = registry.checklist_questions();
    let mut inputs = Vec::with_capacity(questions.len());
    // Category order follows the first question in each category.
    let mut categories: Vec<(&str, f64, f64)> = Vec::new();
    let mut score = 0.0;
    let mut ceiling = 0.0;

    for question in questions {
        let answer = request
            .answers
            .get(&question.id)
            .copied()
            .ok_or_else(|| ValidationError::UnansweredQuestion(question.id.clone()))?;

        let points = question.weight * answer.fraction();
        score += points;
        ceiling += question.weight;

        match categories
            .iter_mut()
            .find(|(name, _, _)| *name == question.category)
        {
            Some((_, subtotal, maximum)) => {
                *subtotal += points;
                *maximum += question.weight;
            }
            None => categories.push((question.category.as_str(), points, question.weight)),
        }

        inputs.push(MetricInput::new(
            question.id.clone(),
            MetricValue::Category(answer.label().to_string()),
        ));
    }

    let components = categories
        .into_iter()
        .map(|(name, subtotal, maximum)| ScoreComponent {
            factor: name.to_string(),
            level: Some(category_level(subtotal).to_string()),
            score: subtotal,
            notes: format!("{subtotal:.1} of {maximum:.1} points"),
        })
        .collect();

    Ok(Assessment {
        metric: Metric::ChecklistRisk,
        inputs,
        score,
        ceiling: Some(ceiling),
        components,
        unresolved: None,
    })
}
