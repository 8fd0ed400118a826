//! Session data types for one in-progress USSD dialog.

use rust_decimal::Decimal;
use smallvec::SmallVec;
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::bmi::BmiResult;

/// Menu position within the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum MenuState {
    /// Language selection screen.
    Welcome,
    /// Prompt for age in years.
    Age,
    /// Prompt for weight in kilograms.
    Weight,
    /// Prompt for height in centimeters.
    Height,
    /// Computed BMI with follow-up options.
    Result,
    /// Category-specific health tips.
    Tips,
    /// Recent BMI records for the caller.
    History,
}

/// Dialog language chosen on the welcome screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Language {
    /// Primary language, used before any choice is made.
    French,
    /// Kinyarwanda locale.
    Kinyarwanda,
}

/// Lifecycle status mirrored to the session metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum SessionStatus {
    /// Dialog in progress.
    Active,
    /// User exited with "00" or the dialog completed.
    Closed,
    /// Terminated on invalid input or internal failure.
    Invalid,
    /// Purged by the expiry sweep.
    Expired,
}

/// One in-progress USSD dialog.
///
/// The gateway delivers turns for a single session key serially, so a
/// session is only ever mutated by one request at a time.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session key assigned by the gateway.
    pub key: String,
    /// Caller phone number.
    pub phone: String,
    /// Current menu position.
    pub state: MenuState,
    /// Previously visited states, most recent last ("back" pops).
    pub nav_stack: SmallVec<[MenuState; 8]>,
    /// Chosen language, if past the welcome screen.
    pub language: Option<Language>,
    /// Collected age in years.
    pub age: Option<u32>,
    /// Collected weight in kilograms.
    pub weight: Option<Decimal>,
    /// Collected height in centimeters.
    pub height: Option<Decimal>,
    /// Computed BMI, present once height was entered.
    pub result: Option<BmiResult>,
    /// Last activity timestamp, drives expiry.
    pub last_activity: OffsetDateTime,
    /// Raw accumulated text of the last processed turn.
    last_text: Option<String>,
    /// Wire reply produced by the last processed turn.
    last_reply: Option<String>,
}

impl Session {
    /// Create a fresh session at the welcome screen.
    pub fn new(key: impl Into<String>, phone: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            key: key.into(),
            phone: phone.into(),
            state: MenuState::Welcome,
            nav_stack: SmallVec::new(),
            language: None,
            age: None,
            weight: None,
            height: None,
            result: None,
            last_activity: now,
            last_text: None,
            last_reply: None,
        }
    }

    /// Effective language, defaulting to the primary one before selection.
    pub fn lang(&self) -> Language {
        self.language.unwrap_or(Language::French)
    }

    /// Move forward to `next`, pushing the current state on the nav stack.
    /// Pushes only when the state actually changes.
    pub fn advance(&mut self, next: MenuState) {
        if self.state != next {
            self.nav_stack.push(self.state);
            self.state = next;
        }
    }

    /// Pop back to the previous state, dropping every measurement collected
    /// at or after it. Returns the state landed on (Welcome when the stack
    /// is empty).
    pub fn back(&mut self) -> MenuState {
        let target = self.nav_stack.pop().unwrap_or(MenuState::Welcome);
        self.clear_from(target);
        self.state = target;
        target
    }

    /// Reset the whole dialog to the welcome screen, forgetting the
    /// language and everything collected.
    pub fn reset(&mut self) {
        self.nav_stack.clear();
        self.clear_from(MenuState::Welcome);
        self.state = MenuState::Welcome;
    }

    /// Drop all measurements and the computed result, keeping the language.
    /// Used when the user restarts from the result screen.
    pub fn clear_measurements(&mut self) {
        self.age = None;
        self.weight = None;
        self.height = None;
        self.result = None;
    }

    /// Clear everything that had not yet been collected when `target` was
    /// the current state.
    fn clear_from(&mut self, target: MenuState) {
        match target {
            MenuState::Welcome => {
                self.language = None;
                self.clear_measurements();
            }
            MenuState::Age => self.clear_measurements(),
            MenuState::Weight => {
                self.weight = None;
                self.height = None;
                self.result = None;
            }
            MenuState::Height => {
                self.height = None;
                self.result = None;
            }
            MenuState::Result | MenuState::Tips | MenuState::History => {}
        }
    }

    /// True if the session has seen no activity for longer than `ttl`.
    pub fn is_expired(&self, ttl: std::time::Duration, now: OffsetDateTime) -> bool {
        now - self.last_activity > ttl
    }

    /// Record activity at `now`.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.last_activity = now;
    }

    /// Remember the processed turn so a gateway replay can be answered
    /// without re-running side effects.
    pub fn remember_turn(&mut self, text: &str, reply: &str) {
        self.last_text = Some(text.to_string());
        self.last_reply = Some(reply.to_string());
    }

    /// If `text` is exactly the accumulated input already processed,
    /// return the reply produced back then.
    pub fn replayed(&self, text: &str) -> Option<&str> {
        match (&self.last_text, &self.last_reply) {
            (Some(last), Some(reply)) if last == text => Some(reply),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::bmi::compute_bmi;

    fn session() -> Session {
        Session::new("sess-1", "+250700000001", datetime!(2026-01-01 12:00 UTC))
    }

    #[test]
    fn advance_pushes_only_on_change() {
        let mut s = session();
        s.advance(MenuState::Age);
        s.advance(MenuState::Age);
        assert_eq!(s.state, MenuState::Age);
        assert_eq!(s.nav_stack.as_slice(), &[MenuState::Welcome]);
    }

    #[test]
    fn back_pops_the_stack() {
        let mut s = session();
        s.advance(MenuState::Age);
        s.advance(MenuState::Weight);
        assert_eq!(s.back(), MenuState::Age);
        assert_eq!(s.state, MenuState::Age);
        assert_eq!(s.nav_stack.as_slice(), &[MenuState::Welcome]);
    }

    #[test]
    fn back_from_height_clears_later_measurements() {
        let mut s = session();
        s.language = Some(Language::French);
        s.advance(MenuState::Age);
        s.age = Some(25);
        s.advance(MenuState::Weight);
        s.weight = Some(dec!(70));
        s.advance(MenuState::Height);

        assert_eq!(s.back(), MenuState::Weight);
        assert_eq!(s.age, Some(25));
        assert_eq!(s.weight, None);
        assert_eq!(s.result, None);
        assert_eq!(s.language, Some(Language::French));
    }

    #[test]
    fn back_to_welcome_forgets_language() {
        let mut s = session();
        s.language = Some(Language::Kinyarwanda);
        s.advance(MenuState::Age);
        assert_eq!(s.back(), MenuState::Welcome);
        assert_eq!(s.language, None);
    }

    #[test]
    fn clear_measurements_keeps_language() {
        let mut s = session();
        s.language = Some(Language::Kinyarwanda);
        s.age = Some(30);
        s.weight = Some(dec!(82));
        s.height = Some(dec!(178));
        s.result = compute_bmi(dec!(82), dec!(178));

        s.clear_measurements();

        assert_eq!(s.language, Some(Language::Kinyarwanda));
        assert!(s.age.is_none() && s.weight.is_none() && s.height.is_none());
        assert!(s.result.is_none());
    }

    #[test]
    fn expiry_uses_last_activity() {
        let s = session();
        let ttl = std::time::Duration::from_secs(30 * 60);
        assert!(!s.is_expired(ttl, datetime!(2026-01-01 12:29 UTC)));
        assert!(s.is_expired(ttl, datetime!(2026-01-01 12:31 UTC)));
    }

    #[test]
    fn replay_returns_the_remembered_reply() {
        let mut s = session();
        assert!(s.replayed("1*25").is_none());
        s.remember_turn("1*25", "CON Entrez votre poids");
        assert_eq!(s.replayed("1*25"), Some("CON Entrez votre poids"));
        assert!(s.replayed("1*25*70").is_none());
    }
}
