use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// The model's self-reported confidence in its analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

/// Fixed output schema of a resume analysis. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    /// 0–100, produced by the model.
    #[serde(deserialize_with = "deserialize_score")]
    pub overall_fit_score: f64,
    pub missing_skills: Vec<String>,
    pub matching_skills: Vec<String>,
    pub experience_gap: String,
    pub improvement_suggestions: Vec<String>,
    /// Rewritten bullets keyed by resume section name.
    pub suggested_bullet_points: BTreeMap<String, Vec<String>>,
    pub ats_optimization: Vec<String>,
    pub confidence_score: Confidence,
}

impl ResumeAnalysis {
    /// Clamps the fit score into 0–100. Returns the original value if it was out of range.
    pub fn clamp_score(&mut self) -> Option<f64> {
        let original = self.overall_fit_score;
        let clamped = original.clamp(0.0, 100.0);
        if clamped != original {
            self.overall_fit_score = clamped;
            Some(original)
        } else {
            None
        }
    }
}

/// Accepts `85`, `85.5`, `"85"`, `"85%"` and `"85/100"`.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScoreRepr {
        Number(f64),
        Text(String),
    }

    let value = match ScoreRepr::deserialize(deserializer)? {
        ScoreRepr::Number(n) => n,
        ScoreRepr::Text(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed
                .strip_suffix("/100")
                .or_else(|| trimmed.strip_suffix('%'))
                .unwrap_or(trimmed)
                .trim();
            trimmed.parse::<f64>().map_err(|_| {
                serde::de::Error::custom(format!("overall_fit_score is not a number: '{s}'"))
            })?
        }
    };

    if !value.is_finite() {
        return Err(serde::de::Error::custom("overall_fit_score must be finite"));
    }
    Ok(value)
}

/// Field-by-field description of [`ResumeAnalysis`] handed to the model.
pub const FORMAT_INSTRUCTIONS: &str = r#"The output should be formatted as a JSON instance that conforms to the JSON schema below.

Here is the output schema:
```
{
  "type": "object",
  "properties": {
    "overall_fit_score": {"type": "number", "description": "Overall fit score between 0-100"},
    "missing_skills": {"type": "array", "items": {"type": "string"}, "description": "List of skills missing from the resume but required for the job"},
    "matching_skills": {"type": "array", "items": {"type": "string"}, "description": "List of skills that match between resume and job description"},
    "experience_gap": {"type": "string", "description": "Analysis of experience gaps or mismatches"},
    "improvement_suggestions": {"type": "array", "items": {"type": "string"}, "description": "Concrete suggestions to improve the resume"},
    "suggested_bullet_points": {"type": "object", "additionalProperties": {"type": "array", "items": {"type": "string"}}, "description": "Improved bullet points for each resume section"},
    "ats_optimization": {"type": "array", "items": {"type": "string"}, "description": "ATS (Applicant Tracking System) optimization suggestions"},
    "confidence_score": {"type": "string", "enum": ["High", "Medium", "Low"], "description": "Confidence in the analysis"}
  },
  "required": ["overall_fit_score", "missing_skills", "matching_skills", "experience_gap", "improvement_suggestions", "suggested_bullet_points", "ats_optimization", "confidence_score"]
}
```"#;
