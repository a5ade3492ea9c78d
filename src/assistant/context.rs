use chrono::NaiveDateTime;

use super::backend::{HistoryEntry, HistoryRole};
use crate::models::{AiSummary, ChatTurn, Consultation};

/// Bounds on what is sent with each dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_prior_summaries: usize,
    pub recent_turn_window: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_prior_summaries: 3,
            recent_turn_window: 10,
        }
    }
}

/// Bounded context accompanying one remote dispatch. Built fresh each time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    pub active: Consultation,
    /// Same patient, active one excluded, newest first.
    pub prior_consultations: Vec<Consultation>,
    /// Most recent summaries of the patient, oldest first.
    pub prior_summaries: Vec<AiSummary>,
    /// Tail of the conversation, failed turns excluded.
    pub recent_turns: Vec<ChatTurn>,
}

/// Assemble the context for the active consultation.
pub fn build_context(
    active: &Consultation,
    all_consultations: &[Consultation],
    all_summaries: &[AiSummary],
    turns: &[ChatTurn],
    limits: &ContextLimits,
) -> ConversationContext {
    let mut prior_consultations: Vec<Consultation> = all_consultations
        .iter()
        .filter(|c| c.patient_id == active.patient_id && c.id != active.id)
        .cloned()
        .collect();
    prior_consultations.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    let mut prior_summaries: Vec<AiSummary> = all_summaries
        .iter()
        .filter(|s| s.patient_id == active.patient_id)
        .cloned()
        .collect();
    prior_summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    prior_summaries.truncate(limits.max_prior_summaries);
    prior_summaries.reverse();

    let recent_turns = recent_window(turns, limits.recent_turn_window);

    ConversationContext {
        active: active.clone(),
        prior_consultations,
        prior_summaries,
        recent_turns,
    }
}

/// Last `window` turns, failed ones excluded.
pub fn recent_window(turns: &[ChatTurn], window: usize) -> Vec<ChatTurn> {
    let answered: Vec<&ChatTurn> = turns.iter().filter(|t| !t.is_failed()).collect();
    let skip = answered.len().saturating_sub(window);
    answered.into_iter().skip(skip).cloned().collect()
}

impl ConversationContext {
    /// Patient record rendered as tagged sections.
    pub fn preamble(&self) -> String {
        let mut sections = vec![("CONSULTATION ACTIVE", format_active(&self.active))];

        if !self.prior_consultations.is_empty() {
            let lines = self
                .prior_consultations
                .iter()
                .map(format_prior)
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(("CONSULTATIONS ANTÉRIEURES", lines));
        }

        if !self.prior_summaries.is_empty() {
            let lines = self
                .prior_summaries
                .iter()
                .map(|s| format!("- {} : {}", s.created_at.format("%d/%m/%Y"), s.content.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(("SYNTHÈSES PRÉCÉDENTES", lines));
        }

        sections
            .iter()
            .map(|(label, content)| format!("<{label}>\n{content}\n</{label}>"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Wire `messageHistory`: the preamble as a system entry, then the turns.
    pub fn message_history(&self, now: NaiveDateTime) -> Vec<HistoryEntry> {
        let mut history = Vec::with_capacity(self.recent_turns.len() + 1);
        history.push(HistoryEntry {
            role: HistoryRole::System,
            content: self.preamble(),
            timestamp: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        });
        history.extend(self.recent_turns.iter().map(HistoryEntry::from));
        history
    }
}

fn format_active(c: &Consultation) -> String {
    let mut lines = vec![
        format!("Patient : {}", c.patient_label()),
        format!("Date : {}", c.date.format("%d/%m/%Y")),
        format!("Motif : {}", c.reason),
    ];
    if let Some(diagnosis) = c.diagnosis.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(format!("Diagnostic : {diagnosis}"));
    }
    if let Some(notes) = c.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Notes : {notes}"));
    }
    lines.join("\n")
}

fn format_prior(c: &Consultation) -> String {
    match c.diagnosis.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(diagnosis) => format!("- {} : {} ({diagnosis})", c.date.format("%d/%m/%Y"), c.reason),
        None => format!("- {} : {}", c.date.format("%d/%m/%Y"), c.reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Delivery;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn consultation(id: i64, patient_id: i64, d: u32) -> Consultation {
        Consultation {
            id,
            patient_id,
            doctor_id: 1,
            patient_name: Some("Jeanne Martin".into()),
            date: day(d),
            reason: format!("Motif {id}"),
            diagnosis: None,
            notes: None,
        }
    }

    fn summary(id: i64, patient_id: i64, d: u32) -> AiSummary {
        AiSummary {
            id,
            patient_id,
            consultation_id: None,
            content: format!("Synthèse {id}"),
            created_at: day(d).and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    fn turns(n: usize) -> Vec<ChatTurn> {
        (0..n)
            .map(|i| {
                let at = day(20).and_hms_opt(9, i as u32, 0).unwrap();
                if i % 2 == 0 {
                    ChatTurn::user(format!("q{i}"), at, None)
                } else {
                    ChatTurn::assistant(format!("r{i}"), at, None)
                }
            })
            .collect()
    }

    #[test]
    fn prior_consultations_exclude_active_and_other_patients() {
        let active = consultation(10, 3, 20);
        let all = vec![
            active.clone(),
            consultation(11, 3, 2),
            consultation(12, 4, 5),
            consultation(13, 3, 9),
        ];
        let ctx = build_context(&active, &all, &[], &[], &ContextLimits::default());
        let ids: Vec<i64> = ctx.prior_consultations.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![13, 11]);
    }

    #[test]
    fn summaries_bounded_to_most_recent() {
        let active = consultation(10, 3, 20);
        let summaries: Vec<AiSummary> = (1..=5).map(|i| summary(i, 3, i as u32)).collect();
        let ctx = build_context(&active, &[], &summaries, &[], &ContextLimits::default());
        let ids: Vec<i64> = ctx.prior_summaries.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn summaries_of_other_patients_are_ignored() {
        let active = consultation(10, 3, 20);
        let summaries = vec![summary(1, 3, 1), summary(2, 8, 2)];
        let ctx = build_context(&active, &[], &summaries, &[], &ContextLimits::default());
        assert_eq!(ctx.prior_summaries.len(), 1);
    }

    #[test]
    fn turn_window_keeps_the_tail() {
        let active = consultation(10, 3, 20);
        let all_turns = turns(14);
        let ctx = build_context(&active, &[], &[], &all_turns, &ContextLimits::default());
        assert_eq!(ctx.recent_turns.len(), 10);
        assert_eq!(ctx.recent_turns[0].text, "q4");
        assert_eq!(ctx.recent_turns[9].text, "r13");
    }

    #[test]
    fn short_conversation_is_sent_whole() {
        let active = consultation(10, 3, 20);
        let ctx = build_context(&active, &[], &[], &turns(3), &ContextLimits::default());
        assert_eq!(ctx.recent_turns.len(), 3);
    }

    #[test]
    fn failed_turns_are_left_out() {
        let active = consultation(10, 3, 20);
        let mut all_turns = turns(3);
        all_turns[2].delivery = Delivery::Failed {
            reason: "timeout".into(),
        };
        let ctx = build_context(&active, &[], &[], &all_turns, &ContextLimits::default());
        assert_eq!(ctx.recent_turns.len(), 2);
    }

    #[test]
    fn custom_limits_apply() {
        let active = consultation(10, 3, 20);
        let limits = ContextLimits {
            max_prior_summaries: 1,
            recent_turn_window: 2,
        };
        let summaries: Vec<AiSummary> = (1..=3).map(|i| summary(i, 3, i as u32)).collect();
        let ctx = build_context(&active, &[], &summaries, &turns(5), &limits);
        assert_eq!(ctx.prior_summaries.len(), 1);
        assert_eq!(ctx.prior_summaries[0].id, 3);
        assert_eq!(ctx.recent_turns.len(), 2);
    }

    #[test]
    fn preamble_has_tagged_sections() {
        let mut active = consultation(10, 3, 20);
        active.diagnosis = Some("Bronchite aiguë".into());
        let all = vec![consultation(11, 3, 2)];
        let summaries = vec![summary(1, 3, 4)];
        let ctx = build_context(&active, &all, &summaries, &[], &ContextLimits::default());

        let preamble = ctx.preamble();
        assert!(preamble.starts_with("<CONSULTATION ACTIVE>\nPatient : Jeanne Martin"));
        assert!(preamble.contains("Diagnostic : Bronchite aiguë"));
        assert!(preamble.contains("<CONSULTATIONS ANTÉRIEURES>\n- 02/02/2026 : Motif 11\n"));
        assert!(preamble.contains("<SYNTHÈSES PRÉCÉDENTES>\n- 04/02/2026 : Synthèse 1\n"));
    }

    #[test]
    fn preamble_omits_empty_sections() {
        let active = consultation(10, 3, 20);
        let ctx = build_context(&active, &[], &[], &[], &ContextLimits::default());
        assert!(!ctx.preamble().contains("ANTÉRIEURES"));
        assert!(!ctx.preamble().contains("SYNTHÈSES"));
    }

    #[test]
    fn history_starts_with_system_preamble() {
        let active = consultation(10, 3, 20);
        let ctx = build_context(&active, &[], &[], &turns(2), &ContextLimits::default());
        let now = day(20).and_hms_opt(10, 0, 0).unwrap();

        let history = ctx.message_history(now);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, HistoryRole::System);
        assert_eq!(history[0].timestamp, "2026-02-20T10:00:00");
        assert_eq!(history[1].role, HistoryRole::User);
        assert_eq!(history[2].role, HistoryRole::Assistant);
    }
}
