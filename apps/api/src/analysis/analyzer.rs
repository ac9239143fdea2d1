//! Resume Analysis: builds the prompt, calls the model, and validates the reply.
//!
//! Flow: validate inputs → fill prompt → LlmClient::complete (primary, then fallback)
//!       → parse into ResumeAnalysis → one repair call if parsing fails → clamp score.

use tracing::{debug, info, warn};

use crate::analysis::models::{ResumeAnalysis, FORMAT_INSTRUCTIONS};
use crate::analysis::prompts::{fill_template, RESUME_ANALYSIS_SYSTEM_TEMPLATE, RESUME_ANALYSIS_USER};
use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, OUTPUT_FIX_PROMPT};
use crate::llm_client::{parse_json, LlmClient, LlmError};

/// A validated analysis plus which model produced it.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: ResumeAnalysis,
    pub model: String,
    /// Whether `model` was the fallback. Both fields describe the call whose
    /// reply became `analysis`, which is the repair call when `repaired` is set.
    pub fallback_used: bool,
    /// True when the first reply was malformed and the repair call fixed it.
    pub repaired: bool,
}

/// Deterministic system prompt for a resume / job description pair.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    fill_template(
        RESUME_ANALYSIS_SYSTEM_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
            ("format_instructions", FORMAT_INSTRUCTIONS),
        ],
    )
}

/// Analyzes a resume against a job description and returns structured feedback.
pub async fn analyze_resume(
    llm: &LlmClient,
    resume_text: &str,
    job_description: &str,
) -> Result<AnalysisOutcome, AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "No resume text provided for analysis.".to_string(),
        ));
    }
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "No job description provided for analysis.".to_string(),
        ));
    }

    let system = build_analysis_prompt(resume_text, job_description);
    let completion = llm
        .complete(&system, RESUME_ANALYSIS_USER)
        .await
        .map_err(|e| AppError::Llm(format!("Resume analysis failed: {e}")))?;
    debug!(model = %completion.model, usage = ?completion.usage, "Analysis completion received");

    let mut model = completion.model;
    let mut fallback_used = completion.fallback_used;
    let mut repaired = false;

    let mut analysis = match parse_json::<ResumeAnalysis>(&completion.text) {
        Ok(analysis) => analysis,
        Err(parse_err) => {
            warn!(model = %model, "Analysis output did not match schema, requesting repair: {parse_err}");
            let fixed = repair_output(llm, &completion.text, &parse_err).await?;
            model = fixed.1;
            fallback_used = fixed.2;
            repaired = true;
            fixed.0
        }
    };

    if let Some(original) = analysis.clamp_score() {
        warn!(
            "Model returned out-of-range fit score {original}; clamped to {}",
            analysis.overall_fit_score
        );
    }

    info!(
        model = %model,
        fallback_used,
        repaired,
        "Resume analysis completed. Overall fit score: {}",
        analysis.overall_fit_score
    );

    Ok(AnalysisOutcome {
        analysis,
        model,
        fallback_used,
        repaired,
    })
}

/// Asks the model once to rewrite a malformed reply so it satisfies the schema.
async fn repair_output(
    llm: &LlmClient,
    bad_output: &str,
    parse_err: &LlmError,
) -> Result<(ResumeAnalysis, String, bool), AppError> {
    let error = parse_err.to_string();
    let prompt = fill_template(
        OUTPUT_FIX_PROMPT,
        &[
            ("format_instructions", FORMAT_INSTRUCTIONS),
            ("completion", bad_output),
            ("error", &error),
        ],
    );

    let completion = llm
        .complete(JSON_ONLY_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Output repair call failed: {e}")))?;

    let analysis = parse_json::<ResumeAnalysis>(&completion.text).map_err(|e| {
        AppError::Llm(format!("Analysis failed due to output format error: {e}"))
    })?;

    Ok((analysis, completion.model, completion.fallback_used))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::analysis::models::tests::SAMPLE_ANALYSIS_JSON;
    use crate::analysis::models::Confidence;
    use crate::llm_client::LlmSettings;

    fn client(server: &MockServer) -> LlmClient {
        LlmClient::new(LlmSettings {
            base_url: server.uri(),
            api_key: "sk-test".to_string(),
            primary_model: "primary/model".to_string(),
            fallback_model: Some("fallback/model".to_string()),
            temperature: 0.0,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    #[test]
    fn test_prompt_embeds_inputs_and_schema() {
        let prompt = build_analysis_prompt("RESUME BODY", "JD BODY");
        assert!(prompt.contains("**Resume Content:**\nRESUME BODY"));
        assert!(prompt.contains("**Job Description:**\nJD BODY"));
        assert!(prompt.contains("\"overall_fit_score\""));
        assert!(!prompt.contains("{format_instructions}"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            build_analysis_prompt("a", "b"),
            build_analysis_prompt("a", "b")
        );
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected_without_calling_the_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply(SAMPLE_ANALYSIS_JSON))
            .expect(0)
            .mount(&server)
            .await;
        let llm = client(&server);

        let err = analyze_resume(&llm, "  ", "Senior Python Developer")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("resume text")));

        let err = analyze_resume(&llm, "Python developer", "\n")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("job description")));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply(&format!("```json\n{SAMPLE_ANALYSIS_JSON}\n```")))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap();

        assert_eq!(outcome.model, "primary/model");
        assert!(!outcome.fallback_used);
        assert!(!outcome.repaired);
        assert_eq!(outcome.analysis.confidence_score, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_repaired_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("did not satisfy the constraints"))
            .respond_with(reply(SAMPLE_ANALYSIS_JSON))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("{\"overall_fit_score\": 50}"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap();

        assert!(outcome.repaired);
        assert_eq!(outcome.analysis.matching_skills.len(), 4);
    }

    #[tokio::test]
    async fn test_model_and_fallback_flag_describe_the_repair_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "primary/model"})))
            .and(body_string_contains("did not satisfy the constraints"))
            .respond_with(reply(SAMPLE_ANALYSIS_JSON))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "primary/model"})))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "fallback/model"})))
            .respond_with(reply("{\"overall_fit_score\": 50}"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap();

        assert!(outcome.repaired);
        assert_eq!(outcome.model, "primary/model");
        assert!(!outcome.fallback_used);
    }

    #[tokio::test]
    async fn test_unrepairable_reply_is_an_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("I cannot help with that."))
            .expect(2)
            .mount(&server)
            .await;

        let err = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(ref m) if m.contains("output format error")));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped() {
        let server = MockServer::start().await;
        let body = SAMPLE_ANALYSIS_JSON.replace("72", "130");
        Mock::given(method("POST"))
            .respond_with(reply(&body))
            .mount(&server)
            .await;

        let outcome = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap();
        assert!((outcome.analysis.overall_fit_score - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_all_models_down_is_an_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let err = analyze_resume(&client(&server), "Python developer", "Senior Python role")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
