//! Local symptom triage.
//!
//! Case-insensitive substring matching of clinical text against a fixed
//! French keyword table. Pure and cheap: safe to run on every keystroke.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AnalysisResult, Priority, SuggestedAction, SymptomCategory};

/// Keyword table. Keywords are lower-case; within one category no keyword is
/// a substring of another so a single mention counts once.
pub fn keywords_for(category: SymptomCategory) -> &'static [&'static str] {
    match category {
        SymptomCategory::Cardiovascular => &[
            "douleur thoracique",
            "palpitation",
            "tachycardie",
            "bradycardie",
            "hypertension",
            "oppression",
            "syncope",
            "arythmie",
            "angor",
            "œdème des membres",
        ],
        SymptomCategory::Respiratory => &[
            "toux",
            "dyspnée",
            "dyspnee",
            "essoufflement",
            "asthme",
            "bronchite",
            "sifflement",
            "expectoration",
            "pneumonie",
        ],
        SymptomCategory::Neurological => &[
            "céphalée",
            "cephalee",
            "migraine",
            "vertige",
            "convulsion",
            "paralysie",
            "engourdissement",
            "perte de connaissance",
            "confusion",
            "trouble de la vision",
        ],
        SymptomCategory::Gastrointestinal => &[
            "nausée",
            "nausee",
            "vomissement",
            "diarrhée",
            "diarrhee",
            "constipation",
            "douleur abdominale",
            "ballonnement",
            "brûlure d'estomac",
            "reflux",
        ],
        SymptomCategory::Infectious => &[
            "fièvre",
            "fievre",
            "frissons",
            "infection",
            "angine",
            "grippe",
            "sueurs nocturnes",
        ],
        SymptomCategory::Musculoskeletal => &[
            "lombalgie",
            "arthralgie",
            "douleur articulaire",
            "mal de dos",
            "entorse",
            "fracture",
            "raideur",
            "tendinite",
            "myalgie",
        ],
        SymptomCategory::Dermatological => &[
            "éruption",
            "eruption",
            "prurit",
            "démangeaison",
            "eczéma",
            "eczema",
            "rougeur",
            "urticaire",
            "lésion cutanée",
            "acné",
        ],
        SymptomCategory::Genitourinary => &[
            "brûlure mictionnelle",
            "dysurie",
            "hématurie",
            "pollakiurie",
            "incontinence",
            "douleur pelvienne",
        ],
        SymptomCategory::General => &[
            "fatigue",
            "asthénie",
            "perte de poids",
            "amaigrissement",
            "malaise",
            "perte d'appétit",
            "insomnie",
        ],
    }
}

/// Classify free text into symptom categories and an urgency level.
pub fn analyze(text: &str) -> AnalysisResult {
    let lower = text.to_lowercase();

    let mut detected_symptoms = BTreeMap::new();
    for category in SymptomCategory::ALL {
        let matched: Vec<String> = keywords_for(category)
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        if !matched.is_empty() {
            detected_symptoms.insert(category, matched);
        }
    }

    let total_symptom_count = detected_symptoms.values().map(Vec::len).sum();
    let categories: BTreeSet<SymptomCategory> = detected_symptoms.keys().copied().collect();
    let priority = priority_for(&categories, total_symptom_count);

    AnalysisResult {
        detected_symptoms,
        total_symptom_count,
        priority,
        categories,
    }
}

/// First matching rule wins.
fn priority_for(categories: &BTreeSet<SymptomCategory>, total: usize) -> Priority {
    if categories.contains(&SymptomCategory::Cardiovascular)
        || categories.contains(&SymptomCategory::Neurological)
    {
        Priority::High
    } else if total >= 3 || categories.contains(&SymptomCategory::Infectious) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Actions offered on an assistant turn answering text with this analysis.
///
/// Nothing detected: no actions. Otherwise synthesis and examination, plus a
/// referral for high priority or a prescription below it.
pub fn suggested_actions(analysis: &AnalysisResult) -> BTreeSet<SuggestedAction> {
    let mut actions = BTreeSet::new();
    if analysis.is_empty() {
        return actions;
    }
    actions.insert(SuggestedAction::Synthesis);
    actions.insert(SuggestedAction::Examination);
    if analysis.priority == Priority::High {
        actions.insert(SuggestedAction::Referral);
    } else {
        actions.insert(SuggestedAction::Prescription);
    }
    actions
}

/// Labels of the detected categories, in table order.
pub fn category_labels(analysis: &AnalysisResult) -> Vec<&'static str> {
    analysis.categories.iter().map(|c| c.label()).collect()
}
