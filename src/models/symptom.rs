use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::conversation::MedicalContext;
use super::enums::{Priority, SuggestedAction, SymptomCategory};

/// Result of one local symptom analysis. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub detected_symptoms: BTreeMap<SymptomCategory, Vec<String>>,
    pub total_symptom_count: usize,
    pub priority: Priority,
    pub categories: BTreeSet<SymptomCategory>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.total_symptom_count == 0
    }

    /// Matched terms flattened in category order.
    pub fn symptoms(&self) -> Vec<String> {
        self.detected_symptoms.values().flatten().cloned().collect()
    }

    /// Project onto a turn annotation with the given suggested actions.
    pub fn medical_context(&self, suggested_actions: BTreeSet<SuggestedAction>) -> MedicalContext {
        MedicalContext {
            symptoms: self.symptoms(),
            suggested_actions,
            priority: self.priority,
        }
    }
}
