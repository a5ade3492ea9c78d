//! Template replies generated locally while the backend is unreachable.
//!
//! The request intent is resolved once from the message, then dispatched
//! through a lookup of pure generator functions. Generators only see the
//! active consultation and its local analysis.

use super::symptoms::category_labels;
use crate::models::{AnalysisResult, Consultation, SymptomCategory};

const OFFLINE_BANNER: &str = "📴 Mode hors ligne : réponse générée localement, sans l'assistant distant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfflineIntent {
    Synthesis,
    Prescription,
    Diagnostic,
    Examination,
    General,
}

impl OfflineIntent {
    /// Keyword lookup, first family that matches wins.
    pub fn resolve(message: &str) -> Self {
        let lower = message.to_lowercase();
        let families: [(Self, &[&str]); 4] = [
            (Self::Synthesis, &["synthèse", "synthese", "résumé", "resume", "récapitul", "recapitul"]),
            (Self::Prescription, &["ordonnance", "prescri", "traitement", "médicament", "medicament"]),
            (Self::Diagnostic, &["diagnostic", "hypothèse", "hypothese", "différentiel", "differentiel"]),
            (Self::Examination, &["examen", "bilan", "analyse", "imagerie", "radio"]),
        ];

        families
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Self::General)
    }
}

/// What a generator gets to work with.
#[derive(Debug, Clone, Copy)]
pub struct OfflineInput<'a> {
    pub consultation: &'a Consultation,
    /// Analysis of the consultation's own clinical text.
    pub analysis: &'a AnalysisResult,
    pub prior_consultations: &'a [Consultation],
}

pub type Generator = fn(&OfflineInput<'_>) -> String;

pub fn generator_for(intent: OfflineIntent) -> Generator {
    match intent {
        OfflineIntent::Synthesis => synthesis,
        OfflineIntent::Prescription => prescription,
        OfflineIntent::Diagnostic => diagnostic,
        OfflineIntent::Examination => examination,
        OfflineIntent::General => general,
    }
}

/// Resolve the intent of `message` and generate the reply.
pub fn respond(message: &str, input: &OfflineInput<'_>) -> (OfflineIntent, String) {
    let intent = OfflineIntent::resolve(message);
    (intent, generator_for(intent)(input))
}

pub fn welcome(input: &OfflineInput<'_>) -> String {
    let c = input.consultation;
    format!(
        "{OFFLINE_BANNER}\n\nBonjour. Consultation de {} du {} (motif : {}).\n\
         Priorité estimée : {}.\n\
         Je peux préparer une synthèse, des pistes diagnostiques, des examens à envisager \
         ou des éléments de prescription.",
        c.patient_label(),
        c.date.format("%d/%m/%Y"),
        c.reason,
        input.analysis.priority.label(),
    )
}

fn synthesis(input: &OfflineInput<'_>) -> String {
    let c = input.consultation;
    let mut lines = vec![
        OFFLINE_BANNER.to_string(),
        String::new(),
        format!("Synthèse de la consultation du {}", c.date.format("%d/%m/%Y")),
        format!("Patient : {}", c.patient_label()),
        format!("Motif : {}", c.reason),
    ];
    if let Some(diagnosis) = c.diagnosis.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(format!("Diagnostic : {diagnosis}"));
    }
    lines.push(symptom_line(input.analysis));
    if !input.analysis.is_empty() {
        let labels = category_labels(input.analysis);
        lines.push(format!("Catégories : {}", labels.join(", ")));
    }
    lines.push(format!("Priorité : {}", input.analysis.priority.label()));
    lines.push(format!(
        "Consultations antérieures : {}",
        input.prior_consultations.len()
    ));
    lines.join("\n")
}

fn prescription(input: &OfflineInput<'_>) -> String {
    let mut lines = vec![
        OFFLINE_BANNER.to_string(),
        String::new(),
        "Éléments à vérifier avant prescription :".to_string(),
    ];
    lines.extend(
        input
            .analysis
            .categories
            .iter()
            .map(|c| format!("- {} : {}", c.label(), prescription_hint(*c))),
    );
    lines.push("- Allergies et traitements en cours à confirmer avec le patient".into());
    lines.push("La prescription reste à la seule appréciation du médecin.".into());
    lines.join("\n")
}

fn diagnostic(input: &OfflineInput<'_>) -> String {
    let mut lines = vec![OFFLINE_BANNER.to_string(), String::new()];
    if input.analysis.is_empty() {
        lines.push("Aucun symptôme repéré dans le dossier : pistes diagnostiques indisponibles hors ligne.".into());
        return lines.join("\n");
    }
    lines.push(format!(
        "Pistes à explorer (priorité {}) :",
        input.analysis.priority.label()
    ));
    lines.extend(
        input
            .analysis
            .categories
            .iter()
            .map(|c| format!("- {} : {}", c.label(), diagnostic_hint(*c))),
    );
    lines.join("\n")
}

fn examination(input: &OfflineInput<'_>) -> String {
    let mut lines = vec![
        OFFLINE_BANNER.to_string(),
        String::new(),
        "Examens à envisager :".to_string(),
    ];
    if input.analysis.is_empty() {
        lines.push(format!("- {}", examination_hint(SymptomCategory::General)));
    } else {
        lines.extend(
            input
                .analysis
                .categories
                .iter()
                .map(|c| format!("- {} : {}", c.label(), examination_hint(*c))),
        );
    }
    lines.join("\n")
}

fn general(input: &OfflineInput<'_>) -> String {
    general_reply(input.analysis)
}

/// Reply that needs no consultation. Also used by the floating assistant.
pub fn general_reply(analysis: &AnalysisResult) -> String {
    format!(
        "{OFFLINE_BANNER}\n\n{}\nPriorité estimée : {}.\n\
         Demandez une synthèse, un diagnostic, des examens ou une prescription, \
         ou repassez en ligne pour une réponse complète.",
        symptom_line(analysis),
        analysis.priority.label(),
    )
}

fn symptom_line(analysis: &AnalysisResult) -> String {
    if analysis.is_empty() {
        "Symptômes repérés : aucun".to_string()
    } else {
        format!("Symptômes repérés : {}", analysis.symptoms().join(", "))
    }
}

fn examination_hint(category: SymptomCategory) -> &'static str {
    match category {
        SymptomCategory::Cardiovascular => "ECG, prise de tension, auscultation cardiaque",
        SymptomCategory::Respiratory => "auscultation pulmonaire, saturation, radio thoracique si besoin",
        SymptomCategory::Neurological => "examen neurologique complet, fond d'œil",
        SymptomCategory::Gastrointestinal => "palpation abdominale, bilan hépatique",
        SymptomCategory::Infectious => "température, NFS, CRP",
        SymptomCategory::Musculoskeletal => "examen articulaire et rachidien, imagerie si traumatisme",
        SymptomCategory::Dermatological => "examen cutané complet",
        SymptomCategory::Genitourinary => "bandelette urinaire, ECBU",
        SymptomCategory::General => "constantes, bilan biologique standard",
    }
}

fn diagnostic_hint(category: SymptomCategory) -> &'static str {
    match category {
        SymptomCategory::Cardiovascular => "éliminer en priorité une cause cardiaque aiguë",
        SymptomCategory::Respiratory => "infection respiratoire, asthme, cause allergique",
        SymptomCategory::Neurological => "éliminer un signe de gravité neurologique",
        SymptomCategory::Gastrointestinal => "cause infectieuse, fonctionnelle ou médicamenteuse",
        SymptomCategory::Infectious => "foyer infectieux à localiser",
        SymptomCategory::Musculoskeletal => "cause mécanique ou inflammatoire",
        SymptomCategory::Dermatological => "cause allergique, infectieuse ou inflammatoire",
        SymptomCategory::Genitourinary => "infection urinaire, cause obstructive",
        SymptomCategory::General => "altération de l'état général à documenter",
    }
}

fn prescription_hint(category: SymptomCategory) -> &'static str {
    match category {
        SymptomCategory::Cardiovascular => "avis spécialisé avant tout traitement",
        SymptomCategory::Respiratory => "traitement symptomatique, réévaluation si persistance",
        SymptomCategory::Neurological => "pas de traitement avant bilan étiologique",
        SymptomCategory::Gastrointestinal => "réhydratation, traitement symptomatique",
        SymptomCategory::Infectious => "antipyrétique, antibiothérapie seulement si foyer bactérien",
        SymptomCategory::Musculoskeletal => "antalgiques, repos relatif",
        SymptomCategory::Dermatological => "traitement local adapté",
        SymptomCategory::Genitourinary => "antibiothérapie selon résultat de la bandelette",
        SymptomCategory::General => "traitement selon la cause retrouvée",
    }
}
