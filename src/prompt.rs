// src/prompt.rs
//! Builds the instruction block that configures the companion for one patient.

use crate::models::profile::Profile;

const MISSING: &str = "not provided";

/// Style rules appended to every prompt, in order.
pub const GUIDELINES: [&str; 9] = [
    "Use everyday language that is easy to understand",
    "Provide clear, concise, professional, and empathetic explanations",
    "Do not use sorrow or pitiful language. Do not apologise in the response.",
    "Offer analogies or examples when helpful but be sensitive and considerate to the severity of the patient's situation.",
    "If a technical term is necessary, provide a simple definition.",
    "Assume the patient has no medical background and aim to educate without overwhelming.",
    "Ensure information is accurate to the source",
    "Use gender inclusive language",
    "In your answers, refer to the patient by their name.",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptFields {
    pub patient_name: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub appointment: Option<String>,
    pub notes: Option<String>,
}

impl From<&Profile> for PromptFields {
    fn from(profile: &Profile) -> Self {
        PromptFields {
            patient_name: profile.username.clone(),
            diagnosis: profile.diagnosis.clone(),
            prescription: profile.prescription.clone(),
            appointment: profile.appointment.clone(),
            notes: profile.notes.clone(),
        }
    }
}

fn field(value: &Option<String>) -> &str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => MISSING,
    }
}

pub fn compose_system_prompt(fields: &PromptFields) -> String {
    let mut prompt = format!(
        "You are a friendly healthcare companion. Your patient, {name}, has been diagnosed with {diagnosis} \
         and has a prescription for {prescription}. Their next appointment is {appointment}. They will ask you \
         for information relating to their diagnosis, prescription, and care plan. Your purpose is to use your \
         knowledge base and the patient's medical record {notes} to support them to understand and manage their \
         health with a positive and informed approach to navigating their healthcare journey. Critically, ensure \
         that they understand clinical language.\n\n\
         Follow these guidelines for what language to use when answering queries:\n",
        name = field(&fields.patient_name),
        diagnosis = field(&fields.diagnosis),
        prescription = field(&fields.prescription),
        appointment = field(&fields.appointment),
        notes = field(&fields.notes),
    );

    for (i, guideline) in GUIDELINES.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, guideline));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(prompt: &str) -> Vec<&str> {
        prompt
            .lines()
            .filter(|line| {
                let digits: String = line.chars().take_while(|c| c.is_ascii_digit()).collect();
                !digits.is_empty() && line[digits.len()..].starts_with(". ")
            })
            .collect()
    }

    #[test]
    fn test_prompt_interpolates_all_fields() {
        let fields = PromptFields {
            patient_name: Some("Jane".into()),
            diagnosis: Some("Type 2 Diabetes".into()),
            prescription: Some("Metformin".into()),
            appointment: Some("2024-06-01".into()),
            notes: Some("stable".into()),
        };
        let prompt = compose_system_prompt(&fields);

        for value in ["Jane", "Type 2 Diabetes", "Metformin", "2024-06-01", "stable"] {
            assert!(prompt.contains(value), "missing {value}");
        }
        let lines = numbered_lines(&prompt);
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("1. "));
        assert!(lines[8].starts_with("9. "));
    }

    #[test]
    fn test_missing_fields_are_marked() {
        let prompt = compose_system_prompt(&PromptFields {
            patient_name: Some("Sam".into()),
            diagnosis: Some("   ".into()),
            ..Default::default()
        });
        assert!(prompt.contains("Your patient, Sam,"));
        assert!(prompt.contains("diagnosed with not provided"));
        assert!(!prompt.contains("undefined"));
        assert_eq!(numbered_lines(&prompt).len(), 9);
    }

    #[test]
    fn test_fields_from_profile() {
        let profile = Profile {
            username: Some("Ada".into()),
            appointment: Some("Monday".into()),
            ..Default::default()
        };
        let fields = PromptFields::from(&profile);
        assert_eq!(fields.patient_name.as_deref(), Some("Ada"));
        assert_eq!(fields.appointment.as_deref(), Some("Monday"));
        assert!(fields.notes.is_none());
    }
}
