// Shared prompt fragments used across LLM calls.
// Feature-specific prompts live next to the feature (see analysis/prompts.rs).

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Repair prompt for a reply that failed schema validation.
/// Replace: {format_instructions}, {error}, {completion}
pub const OUTPUT_FIX_PROMPT: &str = r#"Instructions:
--------------
{format_instructions}
--------------
Completion:
--------------
{completion}
--------------

Above, the Completion did not satisfy the constraints given in the Instructions.
Error:
--------------
{error}
--------------

Please try again. Respond with a corrected JSON object that satisfies the constraints laid out in the Instructions:"#;
