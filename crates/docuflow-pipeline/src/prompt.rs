//! Prompt assembly. Pure and deterministic: identical inputs always yield
//! byte-identical prompt text, so mode tuning is reproducible.
//!
//! Section order is fixed: system instruction, guidelines, enrichment
//! context, transcript, frame references. Empty sections are omitted.

use docuflow_core::{EvidenceFrame, GenerationRequest, Mode};

/// Assemble the generation prompt text.
pub fn assemble_prompt(
    mode: &Mode,
    enrichment: &[String],
    transcript: Option<&str>,
    frames: &[EvidenceFrame],
) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(mode.system_instruction.trim().to_string());

    if !mode.guidelines.is_empty() {
        let lines: Vec<String> = mode
            .guidelines
            .iter()
            .enumerate()
            .map(|(i, g)| format!("{}. {}", i + 1, g))
            .collect();
        sections.push(format!("## Guidelines\n{}", lines.join("\n")));
    }

    if !enrichment.is_empty() {
        let lines: Vec<String> = enrichment.iter().map(|s| format!("- {}", s)).collect();
        sections.push(format!("## Related context\n{}", lines.join("\n")));
    }

    if let Some(text) = transcript {
        let text = text.trim();
        if !text.is_empty() {
            sections.push(format!("## Transcript\n{}", text));
        }
    }

    if !frames.is_empty() {
        let lines: Vec<String> = frames
            .iter()
            .enumerate()
            .map(|(i, f)| format!("Frame {} at {:.1}s", i + 1, f.timestamp_secs))
            .collect();
        sections.push(format!("## Visual evidence\n{}", lines.join("\n")));
    }

    sections.join("\n\n")
}

/// Bundle prompt text and frames into the one-shot generation request.
pub fn build_request(
    mode: &Mode,
    enrichment: &[String],
    transcript: Option<&str>,
    frames: Vec<EvidenceFrame>,
) -> GenerationRequest {
    let prompt = assemble_prompt(mode, enrichment, transcript, &frames);
    GenerationRequest { prompt, frames }
}
