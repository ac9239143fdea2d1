//! Heuristic resume sectioning and word-budget chunking.
//!
//! Headings are recognized line by line: an optional qualifier ("Work",
//! "Technical", ...) followed by a known section word, optionally with a
//! trailing colon and inline content ("Skills: Rust, Go").
//! Section text runs from its heading to the next heading, heading included.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:(?:work|professional|technical|academic|key|personal|relevant|core)[ \t]+)?(education|experience|skills?|projects?|certifications?|summary|profile|contact(?:[ \t]+(?:information|details))?|objective)[ \t]*(?::[^\n]*)?$",
    )
    .expect("section heading pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionKind {
    /// Text before the first recognized heading (name, headline, links).
    Header,
    /// The whole document when no heading is recognized.
    General,
    Education,
    Experience,
    Skills,
    Projects,
    Certifications,
    Summary,
    Contact,
    Objective,
}

impl SectionKind {
    fn from_heading_word(word: &str) -> Self {
        let word = word.to_ascii_lowercase();
        if word.starts_with("education") {
            SectionKind::Education
        } else if word.starts_with("experience") {
            SectionKind::Experience
        } else if word.starts_with("skill") {
            SectionKind::Skills
        } else if word.starts_with("project") {
            SectionKind::Projects
        } else if word.starts_with("certification") {
            SectionKind::Certifications
        } else if word.starts_with("contact") {
            SectionKind::Contact
        } else if word.starts_with("objective") {
            SectionKind::Objective
        } else {
            // summary | profile
            SectionKind::Summary
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeSection {
    pub kind: SectionKind,
    /// Heading as written in the document, without a trailing colon or inline content.
    pub heading: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeChunk {
    pub section: SectionKind,
    pub heading: String,
    /// 1-based position within its section.
    pub chunk_index: usize,
    pub text: String,
}

/// Splits resume text into sections in document order.
/// Repeated headings yield separate sections.
pub fn split_into_sections(raw_text: &str) -> Vec<ResumeSection> {
    let raw = raw_text.replace("\r\n", "\n");

    let headings: Vec<(usize, SectionKind, String)> = HEADING
        .captures_iter(&raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let word = caps.get(1)?;
            let line = whole.as_str();
            let heading = line.split(':').next().unwrap_or(line).trim().to_string();
            Some((
                whole.start(),
                SectionKind::from_heading_word(word.as_str()),
                heading,
            ))
        })
        .collect();

    let Some(&(first_start, _, _)) = headings.first() else {
        let text = raw.trim();
        if text.is_empty() {
            return vec![];
        }
        return vec![ResumeSection {
            kind: SectionKind::General,
            heading: String::new(),
            text: text.to_string(),
        }];
    };

    let mut sections = Vec::with_capacity(headings.len() + 1);

    let preamble = raw[..first_start].trim();
    if !preamble.is_empty() {
        sections.push(ResumeSection {
            kind: SectionKind::Header,
            heading: String::new(),
            text: preamble.to_string(),
        });
    }

    for (i, (start, kind, heading)) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map_or(raw.len(), |next| next.0);
        sections.push(ResumeSection {
            kind: *kind,
            heading: heading.clone(),
            text: raw[*start..end].trim().to_string(),
        });
    }

    sections
}

/// Groups whitespace-separated words into runs of at most `max_words`.
pub fn chunk_section_text(section_text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = section_text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|run| run.join(" "))
        .collect()
}

/// Sections the text, then chunks every non-empty section.
pub fn build_resume_chunks(raw_text: &str, max_words: usize) -> Vec<ResumeChunk> {
    split_into_sections(raw_text)
        .into_iter()
        .filter(|section| !section.text.is_empty())
        .flat_map(|section| {
            chunk_section_text(&section.text, max_words)
                .into_iter()
                .enumerate()
                .map(move |(i, text)| ResumeChunk {
                    section: section.kind,
                    heading: section.heading.clone(),
                    chunk_index: i + 1,
                    text,
                })
        })
        .collect()
}

/// Resume body sent to the model: chunk texts separated by blank lines,
/// or `raw_text` itself when chunking produced nothing.
pub fn prompt_text(chunks: &[ResumeChunk], raw_text: &str) -> String {
    if chunks.is_empty() {
        return raw_text.trim().to_string();
    }
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\njane@example.com\n\nSummary\nBackend engineer with 6 years of experience.\n\nWork Experience\nAcme Corp - Senior Engineer\nExperienced in building payment systems.\n\nSkills: Rust, Go, PostgreSQL\n\nEDUCATION\nB.Sc. Computer Science\n";

    fn kinds(sections: &[ResumeSection]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_sections_follow_document_order() {
        let sections = split_into_sections(RESUME);
        assert_eq!(
            kinds(&sections),
            vec![
                SectionKind::Header,
                SectionKind::Summary,
                SectionKind::Experience,
                SectionKind::Skills,
                SectionKind::Education,
            ]
        );
        assert_eq!(sections[0].text, "Jane Doe\njane@example.com");
        assert_eq!(sections[2].heading, "Work Experience");
        assert_eq!(sections[4].heading, "EDUCATION");
    }

    #[test]
    fn test_section_text_includes_heading_and_stops_at_next() {
        let sections = split_into_sections(RESUME);
        assert_eq!(
            sections[2].text,
            "Work Experience\nAcme Corp - Senior Engineer\nExperienced in building payment systems."
        );
        assert_eq!(sections[3].text, "Skills: Rust, Go, PostgreSQL");
        assert_eq!(sections[3].heading, "Skills");
    }

    #[test]
    fn test_prose_starting_with_keyword_is_not_a_heading() {
        let sections = split_into_sections("Experienced engineer\nProjects\nCompiler in Rust");
        assert_eq!(kinds(&sections), vec![SectionKind::Header, SectionKind::Projects]);
        assert_eq!(sections[0].text, "Experienced engineer");
    }

    #[test]
    fn test_no_headings_yields_single_general_section() {
        let sections = split_into_sections("  Jane Doe\nRust developer  ");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::General);
        assert_eq!(sections[0].text, "Jane Doe\nRust developer");
    }

    #[test]
    fn test_empty_text_yields_no_sections() {
        assert!(split_into_sections(" \n\t ").is_empty());
    }

    #[test]
    fn test_repeated_headings_are_kept_separately() {
        let text = "Experience\nAcme\n[Page 2 Text]\nExperience\nGlobex";
        let sections = split_into_sections(text);
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Experience, SectionKind::Experience]
        );
        assert_eq!(sections[0].text, "Experience\nAcme\n[Page 2 Text]");
        assert_eq!(sections[1].text, "Experience\nGlobex");
    }

    #[test]
    fn test_crlf_line_endings() {
        let sections = split_into_sections("Jane\r\nContact Information\r\njane@example.com\r\n");
        assert_eq!(kinds(&sections), vec![SectionKind::Header, SectionKind::Contact]);
        assert_eq!(sections[1].heading, "Contact Information");
    }

    #[test]
    fn test_profile_and_certifications_map_to_canonical_kinds() {
        let sections = split_into_sections("Profile\nEngineer\nCertifications:\nCKA");
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Summary, SectionKind::Certifications]
        );
    }

    #[test]
    fn test_chunking_respects_word_budget() {
        let text = (1..=1200).map(|i| format!("w{i}")).collect::<Vec<_>>().join("\n");
        let chunks = chunk_section_text(&text, 500);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split(' ').count(), 500);
        assert_eq!(chunks[2].split(' ').count(), 200);
        assert!(chunks[1].starts_with("w501 "));
    }

    #[test]
    fn test_chunk_indices_restart_per_section() {
        let chunks = build_resume_chunks(RESUME, 3);
        let experience: Vec<_> = chunks
            .iter()
            .filter(|c| c.section == SectionKind::Experience)
            .collect();
        assert_eq!(experience.len(), 4);
        assert_eq!(experience[0].chunk_index, 1);
        assert_eq!(experience[0].text, "Work Experience Acme");
        assert_eq!(experience[3].chunk_index, 4);
        assert_eq!(chunks[0].section, SectionKind::Header);
        assert_eq!(chunks[0].chunk_index, 1);
    }

    #[test]
    fn test_prompt_text_joins_chunks_or_falls_back() {
        let chunks = build_resume_chunks("Skills\nRust Go", 500);
        assert_eq!(prompt_text(&chunks, "ignored"), "Skills Rust Go");
        assert_eq!(prompt_text(&[], "  raw text  "), "raw text");
    }
}
