//! System instruction builder for the parenting assistant

use babylog_shared::guidelines::{DosageGuideline, GuidelineSet};
use babylog_shared::models::Baby;
use std::fmt::Write;

const ASSISTANT_ROLE: &str = "You are a warm, practical assistant helping parents care for their baby. \
Answer using the activity log and reference numbers below when they are relevant. \
You are not a doctor: for fever in infants under 3 months, breathing difficulty, dehydration, \
lethargy or any worsening symptom, tell the parent to contact a pediatrician or emergency services. \
Never invent measurements that are not in the log. Keep answers short and concrete.";

/// Instruction used to condense a finished exchange
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following exchange between a parent and a baby-care \
assistant in at most two sentences. Keep concrete facts (symptoms, amounts, times, advice given). \
Reply with the summary only.";

/// Everything the system instruction is built from
pub struct PromptInput<'a> {
    pub baby: &'a Baby,
    pub age_months: u32,
    pub activity_context: &'a str,
    pub guidelines: &'a GuidelineSet,
    pub prior_summaries: &'a [String],
}

pub fn build_system_prompt(input: &PromptInput<'_>) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(ASSISTANT_ROLE);

    let _ = write!(
        prompt,
        "\n\n## Baby\n{} ({}), {} months old, born {}.",
        input.baby.name, input.baby.gender, input.age_months, input.baby.birth_date
    );

    prompt.push_str("\n\n## Reference guidelines\n");
    prompt.push_str(&format_guidelines(input.guidelines));

    prompt.push_str("\n\n## Recent activity\n");
    prompt.push_str(input.activity_context.trim_end());

    if !input.prior_summaries.is_empty() {
        prompt.push_str("\n\n## Earlier conversations (most recent first)\n");
        for summary in input.prior_summaries {
            let _ = writeln!(prompt, "- {}", summary.trim());
        }
    }

    prompt
}

/// Guideline numbers as plain text lines
pub fn format_guidelines(set: &GuidelineSet) -> String {
    let mut out = String::new();

    match (set.weight_kg, set.weight_percentile) {
        (Some(weight), Some(p)) => {
            let _ = writeln!(
                out,
                "- Weight {:.2} kg: about the {}th percentile ({}){}",
                weight,
                p.percentile,
                p.band.description(),
                if p.from_reference { "" } else { ", no reference data for this age" }
            );
        }
        _ => out.push_str("- No weight recorded yet; weight-based guidance unavailable\n"),
    }

    if let Some(feeding) = set.feeding {
        let _ = writeln!(
            out,
            "- Feeding: {}-{} ml per day, {}-{} ml per feeding",
            feeding.daily_min_ml, feeding.daily_max_ml, feeding.per_feeding_min_ml, feeding.per_feeding_max_ml
        );
    }

    let _ = writeln!(out, "- Sleep: {} per day, {}", set.sleep.total_hours, set.sleep.naps);

    for dosage in &set.dosages {
        match dosage {
            DosageGuideline::Calculated(dose) => {
                let _ = writeln!(
                    out,
                    "- {} ({} mg/ml): {} ml per dose, at most {} ml per dose and {} ml per day",
                    dose.medicine.display_name(),
                    dose.mg_per_ml,
                    dose.recommended_ml,
                    dose.max_single_ml,
                    dose.max_daily_ml
                );
            }
            DosageGuideline::MissingConcentration { medicine, .. } => {
                let _ = writeln!(
                    out,
                    "- {}: ask the parent for the syrup concentration before giving a dose",
                    medicine.display_name()
                );
            }
        }
    }

    if !set.dosages.is_empty() {
        let _ = write!(out, "- {}", babylog_shared::guidelines::DOSAGE_DISCLAIMER);
    }

    out.trim_end().to_string()
}
