//! LLM prompt engineering for clinical field extraction

use clinotes_domain::FieldSchema;
use clinotes_llm::CompletionRequest;
use thiserror::Error;

/// Errors raised while building a prompt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Note exceeds the configured length limit
    #[error("Note too long: {length} chars (max: {max})")]
    NoteTooLong {
        /// Note length in characters
        length: usize,
        /// Configured limit
        max: usize,
    },
}

/// A complete prompt for one note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions, schema and output contract
    pub system: String,

    /// The note, between delimiters
    pub user: String,
}

impl Prompt {
    /// Single-string rendering of the prompt
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }

    /// Request for the model client
    pub fn to_request(&self) -> CompletionRequest {
        CompletionRequest::with_system(self.system.clone(), self.user.clone())
    }
}

/// Builds extraction prompts for the model
///
/// The system part depends only on the schema and is rendered once.
pub struct PromptBuilder {
    system: String,
    output_keys: String,
    max_note_chars: usize,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(schema: &FieldSchema, max_note_chars: usize) -> Self {
        let output_keys = schema.keys().join(", ");
        Self {
            system: render_system(schema),
            output_keys,
            max_note_chars,
        }
    }

    /// Build the prompt for a note
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::NoteTooLong`] when the note has more than
    /// `max_note_chars` characters. Notes are never truncated.
    pub fn build(&self, note_text: &str) -> Result<Prompt, PromptError> {
        let length = note_text.chars().count();
        if length > self.max_note_chars {
            return Err(PromptError::NoteTooLong {
                length,
                max: self.max_note_chars,
            });
        }

        let mut user = String::with_capacity(note_text.len() + 512);
        user.push_str("Extract structured medical information from the following clinical note.\n\n");
        user.push_str(NOTE_START);
        user.push('\n');
        user.push_str(note_text.trim());
        user.push('\n');
        user.push_str(NOTE_END);
        user.push_str("\n\n");
        user.push_str(&format!(
            "Return ONLY a JSON object with exactly these keys: {}.\n",
            self.output_keys
        ));
        user.push_str(OUTPUT_FORMAT_REMINDER);

        Ok(Prompt {
            system: self.system.clone(),
            user,
        })
    }
}

const NOTE_START: &str = "----- BEGIN CLINICAL NOTE -----";
const NOTE_END: &str = "----- END CLINICAL NOTE -----";

fn render_system(schema: &FieldSchema) -> String {
    let mut system = String::new();

    // 1. Role and principles
    system.push_str(EXTRACTION_INSTRUCTIONS);
    system.push_str("\n\n");

    // 2. One section per field, in schema order
    system.push_str("## FIELDS\n\n");
    for (i, def) in schema.definitions().enumerate() {
        system.push_str(&format!(
            "{}. {} ({})\n   {}\n",
            i + 1,
            def.key,
            def.label,
            def.description
        ));
    }
    system.push('\n');

    // 3. Output contract
    system.push_str("## OUTPUT FORMAT\n\nReturn a single JSON object with exactly these keys:\n\n{\n");
    let keys = schema.keys();
    for (i, key) in keys.iter().enumerate() {
        let comma = if i + 1 < keys.len() { "," } else { "" };
        system.push_str(&format!("  \"{}\": \"\"{}\n", key, comma));
    }
    system.push_str("}\n\n");

    // 4. Rules, worked examples and special cases
    system.push_str(CRITICAL_RULES);
    system.push_str("\n\n");
    system.push_str(WORKED_EXAMPLES);
    system.push_str("\n\n");
    system.push_str(SPECIAL_HANDLING);

    system
}

const EXTRACTION_INSTRUCTIONS: &str = r#"You are a clinical information extraction system. Read one clinical note and copy its key medical data into a fixed JSON structure.

## PRINCIPLES
- Extract information exactly as written in the note
- Preserve medical terminology and abbreviations as they appear
- If information is not present, use an empty string ""
- Never invent, infer or embellish information
- Separate multiple items within the same field with a semicolon (;)"#;

const CRITICAL_RULES: &str = r#"## RULES
1. Return ONLY valid JSON: no markdown code blocks, no explanations, no additional text
2. Use the key names exactly as listed (case-sensitive)
3. Every key must be present; use "" for anything the note does not state
4. Separate multiple items with semicolons within the same field
5. Keep abbreviations, units and dosing exactly as written
6. Extract only what is explicitly documented"#;

const WORKED_EXAMPLES: &str = r#"## EXAMPLES

### Complete note
Input:
"CC: Chest pain. HPI: 65M with crushing substernal chest pain x2h while mowing, 9/10, radiating to L arm, with diaphoresis. PMH: HTN, T2DM, HLD. Meds: Metformin 1000mg PO BID, Lisinopril 20mg PO daily. Allergies: Penicillin - anaphylaxis. PE: BP 165/95, HR 105, RR 20, SpO2 94% RA; CV: tachycardic, no murmurs; Lungs: clear. ROS: No palpitations; no cough. Labs: Troponin I 2.8 ng/mL (elevated); ECG ST elevation II, III, aVF. Assessment: Acute inferior STEMI. Plan: ASA 325mg stat, heparin drip, emergent PCI, admit CCU."

Output:
{
  "Chief_Complaint": "Chest pain",
  "History_Present_Illness": "65M with crushing substernal chest pain x2h while mowing, 9/10, radiating to L arm, with diaphoresis",
  "Past_Medical_History": "HTN; T2DM; HLD",
  "Current_Medications": "Metformin 1000mg PO BID; Lisinopril 20mg PO daily",
  "Allergies": "Penicillin - anaphylaxis",
  "Physical_Exam": "BP 165/95, HR 105, RR 20, SpO2 94% RA; CV: tachycardic, no murmurs; Lungs: clear",
  "Review_of_Systems": "No palpitations; no cough",
  "Labs_Imaging_Results": "Troponin I 2.8 ng/mL (elevated); ECG ST elevation II, III, aVF",
  "Assessment_Impression": "Acute inferior STEMI",
  "Plan": "ASA 325mg stat; Heparin drip; Emergent PCI; Admit CCU"
}

### Sparse note
Input:
"Pt still short of breath. COPD exacerbation. On albuterol nebs q4h. Add prednisone 40mg daily x5d. Pulm to see."

Output:
{
  "Chief_Complaint": "Short of breath",
  "History_Present_Illness": "Pt still short of breath",
  "Past_Medical_History": "COPD",
  "Current_Medications": "Albuterol nebs q4h",
  "Allergies": "",
  "Physical_Exam": "",
  "Review_of_Systems": "",
  "Labs_Imaging_Results": "",
  "Assessment_Impression": "COPD exacerbation",
  "Plan": "Add prednisone 40mg daily x5d; Pulm to see"
}"#;

const SPECIAL_HANDLING: &str = r#"## SPECIAL CASES
- Order sets and ICU notes: active infusions and drips go in Current_Medications; IV fluids, DVT prophylaxis, nutrition and labs to be drawn go in Plan
- Trending values: keep every value in sequence (e.g. "CRP: 146 -> 71.9 -> 66")
- Consultations: consultant recommendations go in Plan
- Notes without section headers: assign each statement to the field it describes"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Use "" for any field not present in the note and semicolons between multiple items. No markdown, no code blocks, no commentary."#;

#[cfg(test)]
mod tests {
    use super::*;
    use clinotes_domain::SchemaField;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(FieldSchema::clinical(), 1_000)
    }

    #[test]
    fn test_prompt_includes_note_between_delimiters() {
        let prompt = builder().build("CC: cough for 3 days").unwrap();
        let start = prompt.user.find(NOTE_START).unwrap();
        let note = prompt.user.find("CC: cough for 3 days").unwrap();
        let end = prompt.user.find(NOTE_END).unwrap();
        assert!(start < note && note < end);
    }

    #[test]
    fn test_prompt_lists_every_field_in_order() {
        let prompt = builder().build("note").unwrap();
        let mut last = 0;
        for field in SchemaField::ALL {
            let marker = format!("\"{}\": \"\"", field.key());
            let pos = prompt.system.find(&marker).unwrap_or_else(|| panic!("{} missing", field.key()));
            assert!(pos >= last, "{} out of order", field.key());
            last = pos;
        }
        assert!(prompt.system.contains("Labs/Imaging Results"));
    }

    #[test]
    fn test_prompt_includes_rules() {
        let prompt = builder().build("note").unwrap();
        assert!(prompt.system.contains("empty string"));
        assert!(prompt.system.contains("semicolon"));
        assert!(prompt.system.contains("Never invent"));
        assert!(prompt.system.contains("abbreviations"));
        assert!(prompt.system.contains("Sparse note"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = builder();
        assert_eq!(b.build("same note").unwrap(), b.build("same note").unwrap());
    }

    #[test]
    fn test_combined_contains_both_parts() {
        let prompt = builder().build("HPI: fever").unwrap();
        let combined = prompt.combined();
        assert!(combined.starts_with(&prompt.system));
        assert!(combined.ends_with(&prompt.user));
    }

    #[test]
    fn test_note_at_limit_is_accepted() {
        let b = PromptBuilder::new(FieldSchema::clinical(), 10);
        assert!(b.build("0123456789").is_ok());
    }

    #[test]
    fn test_note_over_limit_is_rejected() {
        let b = PromptBuilder::new(FieldSchema::clinical(), 10);
        assert_eq!(
            b.build("0123456789X"),
            Err(PromptError::NoteTooLong { length: 11, max: 10 })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 10 characters, 20 bytes
        let b = PromptBuilder::new(FieldSchema::clinical(), 10);
        assert!(b.build("°°°°°°°°°°").is_ok());
    }

    #[test]
    fn test_to_request_carries_system_and_user() {
        let prompt = builder().build("note").unwrap();
        let request = prompt.to_request();
        assert_eq!(request.system.as_deref(), Some(prompt.system.as_str()));
        assert_eq!(request.user, prompt.user);
    }
}
