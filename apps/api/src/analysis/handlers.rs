//! Axum route handlers for upload, extraction, and analysis.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::analyzer::{analyze_resume, AnalysisOutcome};
use crate::analysis::models::ResumeAnalysis;
use crate::analysis::report::format_analysis_report;
use crate::errors::AppError;
use crate::extraction::sections::{build_resume_chunks, prompt_text, ResumeChunk, SectionKind};
use crate::extraction::{detect_kind, extract_document, DocumentKind, ExtractedDocument, PageText};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisMeta {
    pub analysis_id: Uuid,
    pub model: String,
    pub fallback_used: bool,
    pub repaired_output: bool,
    pub document_kind: DocumentKind,
    pub pages: usize,
    pub chunks: usize,
    /// Distinct section kinds, in document order.
    pub sections: Vec<SectionKind>,
    pub warnings: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: ResumeAnalysis,
    pub report: String,
    pub meta: AnalysisMeta,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub document_kind: DocumentKind,
    pub pages: usize,
    pub text: String,
    pub chunks: Vec<ResumeChunk>,
    pub warnings: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Upload parsing
// ────────────────────────────────────────────────────────────────────────────

struct UploadedFile {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
    kind: DocumentKind,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    job_description: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

/// Reads the `file` and `job_description` fields; other fields are ignored.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("job_description") => {
                form.job_description = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let filename = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(multipart_error)?;

                if bytes.is_empty() {
                    return Err(AppError::Validation("Uploaded file is empty".to_string()));
                }
                if bytes.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File is {} bytes; the limit is {max_bytes} bytes",
                        bytes.len()
                    )));
                }

                let head = &bytes[..bytes.len().min(16)];
                let kind = detect_kind(head, content_type.as_deref(), filename.as_deref())
                    .ok_or_else(|| {
                        AppError::UnsupportedMediaType(format!(
                            "Unsupported resume format ({}); upload a PDF, text, or image file",
                            filename.as_deref().unwrap_or("unnamed")
                        ))
                    })?;

                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                    kind,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

struct PreparedResume {
    document: ExtractedDocument,
    raw_text: String,
    chunks: Vec<ResumeChunk>,
}

impl PreparedResume {
    fn prompt_text(&self) -> String {
        if self.chunks.is_empty() {
            warn!("Chunking produced no sections; using raw text");
        }
        prompt_text(&self.chunks, &self.raw_text)
    }

    fn section_kinds(&self) -> Vec<SectionKind> {
        let mut kinds: Vec<SectionKind> = Vec::new();
        for chunk in &self.chunks {
            if !kinds.contains(&chunk.section) {
                kinds.push(chunk.section);
            }
        }
        kinds
    }
}

/// Extract → render → section/chunk.
async fn prepare_resume(state: &AppState, file: UploadedFile) -> Result<PreparedResume, AppError> {
    info!(
        filename = file.filename.as_deref().unwrap_or("unnamed"),
        size = file.bytes.len(),
        kind = file.kind.label(),
        "Resume upload accepted"
    );

    let document = extract_document(
        file.bytes,
        file.kind,
        file.content_type.as_deref(),
        state.ocr.as_deref(),
    )
    .await?;

    let raw_text = document.render_text();
    let chunks = build_resume_chunks(&raw_text, state.config.chunk_max_words);
    info!(chunks = chunks.len(), "Resume chunked");

    Ok(PreparedResume {
        document,
        raw_text,
        chunks,
    })
}

fn respond(outcome: AnalysisOutcome, prepared: &PreparedResume) -> AnalyzeResponse {
    let report = format_analysis_report(&outcome.analysis);
    AnalyzeResponse {
        report,
        meta: AnalysisMeta {
            analysis_id: Uuid::new_v4(),
            model: outcome.model,
            fallback_used: outcome.fallback_used,
            repaired_output: outcome.repaired,
            document_kind: prepared.document.kind,
            pages: prepared.document.pages.len(),
            chunks: prepared.chunks.len(),
            sections: prepared.section_kinds(),
            warnings: prepared.document.warnings.clone(),
            analyzed_at: Utc::now(),
        },
        analysis: outcome.analysis,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze-resume
///
/// Multipart upload of `file` + `job_description`. Full pipeline:
/// extract → chunk → prompt → LLM (primary, then fallback) → schema → report.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = read_upload(multipart, state.config.max_upload_bytes).await?;

    let job_description = form
        .job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;

    let prepared = prepare_resume(&state, file).await?;
    let outcome = analyze_resume(&state.llm, &prepared.prompt_text(), &job_description).await?;

    Ok(Json(respond(outcome, &prepared)))
}

/// POST /analyze-text
///
/// Same analysis for an already-extracted resume. Skips document extraction.
pub async fn handle_analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let raw_text = request.resume_text.trim().to_string();
    let prepared = PreparedResume {
        chunks: build_resume_chunks(&raw_text, state.config.chunk_max_words),
        document: ExtractedDocument {
            kind: DocumentKind::Text,
            pages: vec![PageText {
                number: 1,
                text: raw_text.clone(),
                ocr: vec![],
            }],
            warnings: vec![],
        },
        raw_text,
    };

    let outcome =
        analyze_resume(&state.llm, &prepared.prompt_text(), &request.job_description).await?;

    Ok(Json(respond(outcome, &prepared)))
}

/// POST /extract-resume
///
/// Runs extraction and chunking only. Useful for previewing what the model will see.
pub async fn handle_extract_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let form = read_upload(multipart, state.config.max_upload_bytes).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;

    let prepared = prepare_resume(&state, file).await?;

    Ok(Json(ExtractResponse {
        document_kind: prepared.document.kind,
        pages: prepared.document.pages.len(),
        text: prepared.raw_text,
        chunks: prepared.chunks,
        warnings: prepared.document.warnings,
    }))
}
