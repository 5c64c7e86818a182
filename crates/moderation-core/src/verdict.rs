use crate::models::{FinalStatus, InferenceOutcome, RuleOutcome, StorageLocation, Verdict};

/// Merge both outcomes into a verdict. VALID only when both checks passed.
pub fn combine(
    location: StorageLocation,
    rule_outcome: RuleOutcome,
    inference_outcome: InferenceOutcome,
) -> Verdict {
    let final_status = if rule_outcome.passed && inference_outcome.passed {
        FinalStatus::Valid
    } else {
        FinalStatus::Invalid
    };

    Verdict {
        location,
        rule_outcome,
        inference_outcome,
        final_status,
    }
}
