use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + Display, serde names matching as_str
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

// Variant order is the urgency order: `Low < Medium < High`.
str_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(SuggestedAction {
    Synthesis => "synthesis",
    Prescription => "prescription",
    Examination => "examination",
    Referral => "referral",
});

str_enum!(ConnectionMode {
    Online => "online",
    Offline => "offline",
});

str_enum!(SymptomCategory {
    Cardiovascular => "cardiovascular",
    Respiratory => "respiratory",
    Neurological => "neurological",
    Gastrointestinal => "gastrointestinal",
    Infectious => "infectious",
    Musculoskeletal => "musculoskeletal",
    Dermatological => "dermatological",
    Genitourinary => "genitourinary",
    General => "general",
});

impl SymptomCategory {
    /// Every category, in table order.
    pub const ALL: [SymptomCategory; 9] = [
        Self::Cardiovascular,
        Self::Respiratory,
        Self::Neurological,
        Self::Gastrointestinal,
        Self::Infectious,
        Self::Musculoskeletal,
        Self::Dermatological,
        Self::Genitourinary,
        Self::General,
    ];

    /// Display label shown next to annotated turns.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cardiovascular => "❤️ Cardiovasculaire",
            Self::Respiratory => "🫁 Respiratoire",
            Self::Neurological => "🧠 Neurologique",
            Self::Gastrointestinal => "🍽️ Gastro-intestinal",
            Self::Infectious => "🦠 Infectieux",
            Self::Musculoskeletal => "🦴 Musculo-squelettique",
            Self::Dermatological => "🩹 Dermatologique",
            Self::Genitourinary => "💧 Génito-urinaire",
            Self::General => "🩺 Général",
        }
    }
}

impl Priority {
    /// French label used in generated text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "faible",
            Self::Medium => "modérée",
            Self::High => "élevée",
        }
    }
}
