// All LLM prompt constants for resume analysis.

/// System prompt template.
/// Replace: {resume_text}, {job_description}, {format_instructions}
pub const RESUME_ANALYSIS_SYSTEM_TEMPLATE: &str = r#"You are an expert resume analyst and career coach with extensive experience in recruitment and ATS systems.

Your task is to analyze the provided resume against the given job description and provide comprehensive feedback.

**Analysis Guidelines:**
1. **Scoring**: Provide an overall fit score (0-100) based on skills match, experience relevance, and role alignment.
2. **Skills Analysis**: Identify missing skills from the job requirements and highlight matching skills.
3. **Experience Gap**: Analyze any experience mismatches or gaps compared to job requirements.
4. **Improvement Suggestions**: Provide actionable advice to strengthen the resume.
5. **ATS Optimization**: Suggest keywords and formatting improvements for ATS compatibility.
6. **Bullet Points**: Rewrite key bullet points to be more impactful and relevant.

**Resume Content:**
{resume_text}

**Job Description:**
{job_description}

**Output Requirements:**
- Return your analysis in the exact JSON format specified in the schema
- Be specific and actionable in your suggestions
- Use industry-standard terminology
- Ensure all suggestions are realistic and implementable
- Focus on measurable improvements

{format_instructions}"#;

/// Fixed user turn sent with every analysis.
pub const RESUME_ANALYSIS_USER: &str =
    "Please analyze this resume and provide your detailed assessment in JSON format.";

/// Substitutes `{name}` placeholders in one left-to-right pass.
///
/// Inserted values are never rescanned, so a resume that happens to contain
/// `{job_description}` is sent verbatim. Unknown placeholders are left as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(name)
                .filter(|tail| tail.starts_with('}'))
                .map(|_| (*value, name.len() + 2))
        });
        match replacement {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &rest[open + consumed..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_replaces_known_placeholders() {
        let filled = fill_template("a={a}, b={b}", &[("a", "1"), ("b", "2")]);
        assert_eq!(filled, "a=1, b=2");
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let filled = fill_template(
            "R:{resume_text} J:{job_description}",
            &[("resume_text", "{job_description}"), ("job_description", "Rust")],
        );
        assert_eq!(filled, "R:{job_description} J:Rust");
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let filled = fill_template(r#"{"k": {x}} {a}"#, &[("a", "1")]);
        assert_eq!(filled, r#"{"k": {x}} 1"#);
    }

    #[test]
    fn test_analysis_template_has_all_placeholders() {
        for name in ["{resume_text}", "{job_description}", "{format_instructions}"] {
            assert!(RESUME_ANALYSIS_SYSTEM_TEMPLATE.contains(name), "{name}");
        }
    }
}
