//! Per-language message tables.
//!
//! Every screen the dialog can show lives here as a static template with up
//! to two positional `{}` slots, filled first-slot-first by [`render`].
//! Tips are additionally keyed by BMI category.

use crate::bmi::BmiCategory;
use crate::session::Language;

/// Identifier of one screen or terminal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    /// Language selection screen (bilingual by design).
    Welcome,
    /// Age prompt.
    AskAge,
    /// Weight prompt.
    AskWeight,
    /// Height prompt.
    AskHeight,
    /// Result screen; slots: BMI value, localized category label.
    Result,
    /// History screen; slot: formatted record lines or the empty notice.
    History,
    /// Line shown inside the history screen when no records exist.
    HistoryEmpty,
    /// Terminal goodbye after "00".
    Goodbye,
    /// Terminal message for out-of-range or non-numeric input.
    InvalidInput,
    /// Terminal message for an unrecognized menu choice.
    InvalidChoice,
    /// Terminal message when the service itself failed.
    Maintenance,
}

/// Look up a message template.
pub fn message(lang: Language, key: MessageKey) -> &'static str {
    match lang {
        Language::French => match key {
            MessageKey::Welcome => WELCOME,
            MessageKey::AskAge => "Entrez votre âge:\n0. Retour\n00. Quitter",
            MessageKey::AskWeight => "Entrez votre poids en kg:\n0. Retour\n00. Quitter",
            MessageKey::AskHeight => "Entrez votre taille en cm:\n0. Retour\n00. Quitter",
            MessageKey::Result => {
                "Votre IMC est {} ({})\n1. Conseils\n2. Historique\n0. Recommencer\n00. Quitter"
            }
            MessageKey::History => "Historique IMC:\n{}\n0. Retour\n00. Quitter",
            MessageKey::HistoryEmpty => "Aucun historique trouvé.",
            MessageKey::Goodbye => "Merci d'avoir utilisé le service IMC. Au revoir!",
            MessageKey::InvalidInput => "Entrée invalide. La session est terminée.",
            MessageKey::InvalidChoice => "Choix non reconnu. La session est terminée.",
            MessageKey::Maintenance => "Service en maintenance. Veuillez réessayer plus tard.",
        },
        Language::Kinyarwanda => match key {
            MessageKey::Welcome => WELCOME,
            MessageKey::AskAge => "Andika imyaka yawe:\n0. Subira inyuma\n00. Gusohoka",
            MessageKey::AskWeight => {
                "Andika ibiro byawe mu kilogarama (kg):\n0. Subira inyuma\n00. Gusohoka"
            }
            MessageKey::AskHeight => {
                "Andika uburebure bwawe muri santimetero (cm):\n0. Subira inyuma\n00. Gusohoka"
            }
            MessageKey::Result => {
                "BMI yawe ni {} ({})\n1. Inama\n2. Amateka\n0. Tangira bundi\n00. Gusohoka"
            }
            MessageKey::History => "Amateka ya BMI:\n{}\n0. Subira inyuma\n00. Gusohoka",
            MessageKey::HistoryEmpty => "Nta mateka aboneka.",
            MessageKey::Goodbye => "Murakoze gukoresha serivisi ya BMI. Murabeho!",
            MessageKey::InvalidInput => "Icyo wanditse ntikiremewe. Igikorwa kirarangiye.",
            MessageKey::InvalidChoice => "Ihitamo ntirizwi. Igikorwa kirarangiye.",
            MessageKey::Maintenance => "Serivisi iri gusanwa. Mwongere mugerageze nyuma.",
        },
    }
}

// The welcome screen is shown before a language exists, so it carries both.
const WELCOME: &str =
    "Bienvenue au service IMC / Murakaza neza kuri serivisi ya BMI\n1. Français\n2. Ikinyarwanda\n00. Quitter";

/// Category-specific health tips.
pub fn tips(lang: Language, category: BmiCategory) -> &'static str {
    match lang {
        Language::French => match category {
            BmiCategory::Underweight => {
                "Votre poids est trop faible. Mangez plus souvent et consultez un nutritionniste.\n0. Retour\n00. Quitter"
            }
            BmiCategory::Normal => {
                "Votre poids est sain. Gardez une alimentation équilibrée et restez actif.\n0. Retour\n00. Quitter"
            }
            BmiCategory::Overweight => {
                "Vous êtes en surpoids. Réduisez les sucres et marchez 30 minutes par jour.\n0. Retour\n00. Quitter"
            }
            BmiCategory::Obese => {
                "Votre IMC indique une obésité. Consultez un professionnel de santé.\n0. Retour\n00. Quitter"
            }
        },
        Language::Kinyarwanda => match category {
            BmiCategory::Underweight => {
                "Ibiro byawe ni bike. Fata ifunguro ryuzuye kandi ugane umuganga w'imirire.\n0. Subira inyuma\n00. Gusohoka"
            }
            BmiCategory::Normal => {
                "Ibiro byawe ni byiza. Komeza kurya indyo yuzuye no gukora imyitozo.\n0. Subira inyuma\n00. Gusohoka"
            }
            BmiCategory::Overweight => {
                "Ufite ibiro birenze. Gabanya isukari kandi ugende n'amaguru buri munsi.\n0. Subira inyuma\n00. Gusohoka"
            }
            BmiCategory::Obese => {
                "BMI yawe igaragaza umubyibuho ukabije. Gana umuganga.\n0. Subira inyuma\n00. Gusohoka"
            }
        },
    }
}

/// Localized label for a BMI category.
pub fn category_label(lang: Language, category: BmiCategory) -> &'static str {
    match lang {
        Language::French => match category {
            BmiCategory::Underweight => "Maigreur",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Surpoids",
            BmiCategory::Obese => "Obésité",
        },
        Language::Kinyarwanda => match category {
            BmiCategory::Underweight => "Ibiro bike",
            BmiCategory::Normal => "Bisanzwe",
            BmiCategory::Overweight => "Ibiro birenze",
            BmiCategory::Obese => "Umubyibuho ukabije",
        },
    }
}

/// Fill the positional `{}` slots of a template, first slot first.
/// Extra arguments are ignored; missing arguments leave the slot as-is.
pub fn render(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for arg in args {
        if !out.contains("{}") {
            break;
        }
        out = out.replacen("{}", arg, 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_fills_slots_in_order() {
        assert_eq!(render("a {} b {}", &["1", "2"]), "a 1 b 2");
    }

    #[test]
    fn render_ignores_extra_args() {
        assert_eq!(render("{}", &["1", "2"]), "1");
    }

    #[test]
    fn render_without_slots_is_identity() {
        assert_eq!(render("Au revoir!", &["1"]), "Au revoir!");
    }

    #[test]
    fn result_template_takes_value_then_label() {
        let text = render(
            message(Language::French, MessageKey::Result),
            &["24.2", category_label(Language::French, BmiCategory::Normal)],
        );
        assert!(text.starts_with("Votre IMC est 24.2 (Normal)"));
    }

    #[test]
    fn every_category_has_tips_in_both_languages() {
        for lang in [Language::French, Language::Kinyarwanda] {
            for category in [
                BmiCategory::Underweight,
                BmiCategory::Normal,
                BmiCategory::Overweight,
                BmiCategory::Obese,
            ] {
                assert!(!tips(lang, category).is_empty());
                assert!(!category_label(lang, category).is_empty());
            }
        }
    }
}
