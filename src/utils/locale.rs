//! Localized User Messages
//!
//! The fixed set of strings the engine itself shows to users (as opposed to
//! text the model writes). Kept in one table so no raw error ever reaches the
//! user untranslated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::Es => f.write_str("es"),
        }
    }
}

impl FromStr for Locale {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.split(['-', '_']).next().unwrap_or_default() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            _ => Err(AppError::validation(format!("Unsupported locale: {}", s))),
        }
    }
}

/// Message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    TryAgain,
    RateLimited,
    BudgetExhausted,
    BudgetWarning,
    RoundLimit,
    FallbackIntro,
    NothingToReport,
    PendingApproval,
    ApprovalDeclined,
    PlanOverrun,
    SkillFailed,
}

impl Locale {
    /// Look up a message. Placeholders are `{0}`, `{1}`, ...
    pub fn text(&self, msg: Msg) -> &'static str {
        match (self, msg) {
            (Locale::En, Msg::TryAgain) => {
                "I couldn't reach the assistant service just now. Please try again in a moment."
            }
            (Locale::Es, Msg::TryAgain) => {
                "No pude contactar con el servicio del asistente. Inténtalo de nuevo en un momento."
            }
            (Locale::En, Msg::RateLimited) => {
                "You're sending requests too quickly. Please wait {0} seconds."
            }
            (Locale::Es, Msg::RateLimited) => {
                "Estás enviando solicitudes demasiado rápido. Espera {0} segundos."
            }
            (Locale::En, Msg::BudgetExhausted) => {
                "This conversation has used its token budget. Start a new conversation to continue."
            }
            (Locale::Es, Msg::BudgetExhausted) => {
                "Esta conversación agotó su presupuesto de tokens. Inicia una nueva para continuar."
            }
            (Locale::En, Msg::BudgetWarning) => {
                "This conversation has used {0}% of its token budget."
            }
            (Locale::Es, Msg::BudgetWarning) => {
                "Esta conversación ha usado el {0}% de su presupuesto de tokens."
            }
            (Locale::En, Msg::RoundLimit) => "I reached my step limit for this request. Here's what I did:",
            (Locale::Es, Msg::RoundLimit) => {
                "Alcancé el límite de pasos para esta solicitud. Esto es lo que hice:"
            }
            (Locale::En, Msg::FallbackIntro) => {
                "I couldn't get a well-formed answer from the model, so here is what the data shows:"
            }
            (Locale::Es, Msg::FallbackIntro) => {
                "No obtuve una respuesta válida del modelo; esto es lo que muestran los datos:"
            }
            (Locale::En, Msg::NothingToReport) => {
                "I couldn't complete that request. Could you rephrase it?"
            }
            (Locale::Es, Msg::NothingToReport) => {
                "No pude completar esa solicitud. ¿Podrías reformularla?"
            }
            (Locale::En, Msg::PendingApproval) => "These changes need your confirmation:",
            (Locale::Es, Msg::PendingApproval) => "Estos cambios necesitan tu confirmación:",
            (Locale::En, Msg::ApprovalDeclined) => "Okay, I won't make those changes.",
            (Locale::Es, Msg::ApprovalDeclined) => "De acuerdo, no haré esos cambios.",
            (Locale::En, Msg::PlanOverrun) => {
                "The proposed schedule ends {0} days after the target date."
            }
            (Locale::Es, Msg::PlanOverrun) => {
                "El calendario propuesto termina {0} días después de la fecha objetivo."
            }
            (Locale::En, Msg::SkillFailed) => "{0} failed: {1}",
            (Locale::Es, Msg::SkillFailed) => "{0} falló: {1}",
        }
    }

    /// Look up a message and substitute positional arguments.
    pub fn format(&self, msg: Msg, args: &[&str]) -> String {
        let mut out = self.text(msg).to_string();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{}}}", i), arg);
        }
        out
    }
}
