//! Assistant instruction file
//!
//! The system instruction lives in a JSON file edited by the content
//! team: a general preamble, per-document summaries, answering
//! guidelines, a prioritization rule, citation examples, and a fallback
//! clause. `render` flattens it into the single instruction string the
//! prompt builder consumes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parsed instruction file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSet {
    pub instruction: InstructionSections,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSections {
    pub general: String,
    pub document_summaries: Vec<String>,
    pub response_guidelines: Vec<String>,
    pub prioritization: String,
    pub examples: Vec<String>,
    pub fallback: String,
}

impl InstructionSet {
    /// Load and parse the instruction file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read instruction file {}", path.display()))?;

        let parsed: InstructionSet = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse instruction file {}", path.display()))?;

        Ok(parsed)
    }

    /// Flatten the sections into one instruction string
    pub fn render(&self) -> String {
        let sections = &self.instruction;

        let mut text = format!("{}\n\n", sections.general);

        text.push_str("Resúmenes de Documentos:\n");
        text.push_str(
            &sections
                .document_summaries
                .iter()
                .map(|doc| format!("- {}", doc))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        text.push_str("\n\n");

        text.push_str("Cómo Responder:\n");
        text.push_str(
            &sections
                .response_guidelines
                .iter()
                .map(|guideline| format!("- {}", guideline))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        text.push_str("\n\n");

        text.push_str(&format!("Priorización:\n{}\n\n", sections.prioritization));

        text.push_str("Ejemplos de Citas:\n");
        text.push_str(
            &sections
                .examples
                .iter()
                .map(|example| format!("- {}", example))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        text.push_str("\n\n");

        text.push_str(&sections.fallback);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "instruction": {
                "general": "Eres un asistente clinico.",
                "document_summaries": ["Guia A: antibioticos", "Guia B: sepsis"],
                "response_guidelines": ["Cita siempre la fuente"],
                "prioritization": "Prefiere las guias locales.",
                "examples": ["**Guia A.pdf**"],
                "fallback": "Si no hay documentos, dilo."
            }
        }"#
    }

    #[test]
    fn test_load_and_render() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let instruction = InstructionSet::load(file.path()).unwrap();
        let rendered = instruction.render();

        assert!(rendered.starts_with("Eres un asistente clinico.\n\n"));
        assert!(rendered.contains("Resúmenes de Documentos:\n- Guia A: antibioticos\n- Guia B: sepsis"));
        assert!(rendered.contains("Cómo Responder:\n- Cita siempre la fuente"));
        assert!(rendered.contains("Priorización:\nPrefiere las guias locales."));
        assert!(rendered.contains("Ejemplos de Citas:\n- **Guia A.pdf**"));
        assert!(rendered.ends_with("Si no hay documentos, dilo."));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(InstructionSet::load("/nonexistent/instructions.json").is_err());
    }

    #[test]
    fn test_missing_key_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"instruction": {"general": "solo esto"}}"#)
            .unwrap();

        assert!(InstructionSet::load(file.path()).is_err());
    }
}
