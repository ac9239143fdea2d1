//! Human-readable markdown summary of a [`ResumeAnalysis`].

use crate::analysis::models::ResumeAnalysis;

const MAX_SKILLS_SHOWN: usize = 5;
const MAX_SUGGESTIONS_SHOWN: usize = 3;
const MAX_ATS_TIPS_SHOWN: usize = 3;

fn score_tier(score: f64) -> &'static str {
    if score >= 80.0 {
        "Excellent match for this role!"
    } else if score >= 60.0 {
        "Good match with room for improvement"
    } else {
        "Significant improvements needed"
    }
}

/// Renders the score, skills, experience gap and top suggestions.
/// Empty sections are omitted.
pub fn format_analysis_report(analysis: &ResumeAnalysis) -> String {
    let mut parts = vec![
        format!("**Overall Fit Score: {}/100**", analysis.overall_fit_score),
        score_tier(analysis.overall_fit_score).to_string(),
    ];

    if !analysis.matching_skills.is_empty() {
        parts.push(format!(
            "\n**Matching Skills ({}):**",
            analysis.matching_skills.len()
        ));
        parts.extend(
            analysis
                .matching_skills
                .iter()
                .take(MAX_SKILLS_SHOWN)
                .map(|s| format!("• {s}")),
        );
    }

    if !analysis.missing_skills.is_empty() {
        parts.push(format!(
            "\n**Skills to Develop ({}):**",
            analysis.missing_skills.len()
        ));
        parts.extend(
            analysis
                .missing_skills
                .iter()
                .take(MAX_SKILLS_SHOWN)
                .map(|s| format!("• {s}")),
        );
    }

    if !analysis.experience_gap.trim().is_empty() {
        parts.push(format!(
            "\n**Experience Analysis:**\n{}",
            analysis.experience_gap.trim()
        ));
    }

    if !analysis.improvement_suggestions.is_empty() {
        parts.push("\n**Top Improvement Suggestions:**".to_string());
        parts.extend(
            analysis
                .improvement_suggestions
                .iter()
                .take(MAX_SUGGESTIONS_SHOWN)
                .enumerate()
                .map(|(i, s)| format!("{}. {s}", i + 1)),
        );
    }

    if !analysis.ats_optimization.is_empty() {
        parts.push("\n**ATS Optimization Tips:**".to_string());
        parts.extend(
            analysis
                .ats_optimization
                .iter()
                .take(MAX_ATS_TIPS_SHOWN)
                .map(|s| format!("• {s}")),
        );
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::tests::SAMPLE_ANALYSIS_JSON;

    fn sample() -> ResumeAnalysis {
        serde_json::from_str(SAMPLE_ANALYSIS_JSON).unwrap()
    }

    #[test]
    fn test_score_tiers() {
        assert_eq!(score_tier(80.0), "Excellent match for this role!");
        assert_eq!(score_tier(79.9), "Good match with room for improvement");
        assert_eq!(score_tier(60.0), "Good match with room for improvement");
        assert_eq!(score_tier(59.0), "Significant improvements needed");
    }

    #[test]
    fn test_report_contains_all_sections() {
        let report = format_analysis_report(&sample());
        assert!(report.starts_with("**Overall Fit Score: 72/100**\nGood match"));
        assert!(report.contains("**Matching Skills (4):**\n• Python"));
        assert!(report.contains("**Skills to Develop (3):**\n• AWS"));
        assert!(report.contains("**Experience Analysis:**\nThree years"));
        assert!(report.contains("1. Quantify the impact"));
        assert!(report.contains("**ATS Optimization Tips:**\n• Mention FastAPI"));
    }

    #[test]
    fn test_lists_are_truncated() {
        let mut analysis = sample();
        analysis.matching_skills = (1..=8).map(|i| format!("skill{i}")).collect();
        analysis.improvement_suggestions = (1..=6).map(|i| format!("tip{i}")).collect();

        let report = format_analysis_report(&analysis);
        assert!(report.contains("**Matching Skills (8):**"));
        assert!(report.contains("• skill5"));
        assert!(!report.contains("• skill6"));
        assert!(report.contains("3. tip3"));
        assert!(!report.contains("tip4"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut analysis = sample();
        analysis.missing_skills.clear();
        analysis.experience_gap = "  ".to_string();
        analysis.ats_optimization.clear();

        let report = format_analysis_report(&analysis);
        assert!(!report.contains("Skills to Develop"));
        assert!(!report.contains("Experience Analysis"));
        assert!(!report.contains("ATS Optimization"));
        assert!(report.contains("Matching Skills"));
    }
}
