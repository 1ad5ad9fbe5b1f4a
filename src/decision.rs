use serde::Serialize;

const DANGER_THRESHOLD: f64 = 0.70;
const SUCCESS_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Danger,
    Warning,
    Success,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Danger => "FRACTURA DETECTADA",
            Status::Warning => "REVISIÓN REQUERIDA",
            Status::Success => "SANO",
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            Status::Warning => "IA sugiere revisión manual.",
            Status::Danger | Status::Success => "IA con alta confianza.",
        }
    }
}

/// Buckets the probability of fracture. Both thresholds are strict, so
/// exactly 0.70 and exactly 0.30 land in the review zone.
pub fn classify(probability_fracture: f64) -> Status {
    if probability_fracture > DANGER_THRESHOLD {
        Status::Danger
    } else if probability_fracture < SUCCESS_THRESHOLD {
        Status::Success
    } else {
        Status::Warning
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnosis {
    pub status: Status,
    pub probability_fracture: f64,
    pub score: f64,
}

impl Diagnosis {
    /// Percentage rounded to two decimals, ties to even.
    pub fn confidence(&self) -> f64 {
        (self.probability_fracture * 100.0 * 100.0).round_ties_even() / 100.0
    }
}

/// The model was trained with 0 = fracture and 1 = healthy, so the score is
/// the probability of a healthy bone.
pub fn decide(score: f64) -> Diagnosis {
    let probability_fracture = 1.0 - score;
    Diagnosis {
        status: classify(probability_fracture),
        probability_fracture,
        score,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub filename: String,
    pub prediction: String,
    pub status: Status,
    pub confidence_fracture: f64,
    pub raw_score_model: f64,
    pub analysis_note: String,
}

impl PredictionReport {
    pub fn new(filename: impl Into<String>, diagnosis: Diagnosis) -> Self {
        Self {
            filename: filename.into(),
            prediction: diagnosis.status.label().to_string(),
            status: diagnosis.status,
            confidence_fracture: diagnosis.confidence(),
            raw_score_model: diagnosis.score,
            analysis_note: diagnosis.status.note().to_string(),
        }
    }
}
