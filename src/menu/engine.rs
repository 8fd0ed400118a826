//! The menu state machine.
//!
//! One call to [`MenuEngine::handle_turn`] processes one gateway request:
//! session lookup or creation, token extraction, a state-indexed transition,
//! optional persistence, and the `CON `/`END ` reply. Every failure path
//! produces a definitive terminal reply; the dialog never hangs.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::bmi::{compute_bmi, BmiCategory, MAX_AGE, MAX_HEIGHT_CM, MAX_WEIGHT_KG};
use crate::config::Config;
use crate::error::{Result, StorageError, UssdError};
use crate::menu::input::{extract_token, ParseRule, EXIT_TOKEN};
use crate::menu::text::{category_label, message, render, tips, MessageKey};
use crate::metrics::{
    METRIC_RECORDS_SAVED, METRIC_SESSIONS_CLOSED, METRIC_SESSIONS_CREATED,
    METRIC_SESSIONS_EXPIRED, METRIC_SESSIONS_INVALID, METRIC_TURNS, METRIC_TURN_LATENCY,
};
use crate::session::{Language, MenuState, Session, SessionStatus, SessionStore};
use crate::storage::{BmiRecord, UssdRepository};

/// One inbound gateway request, form-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct UssdRequest {
    /// Opaque session key from the gateway.
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Caller phone number.
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    /// Short code dialed, unused by the menu.
    #[serde(rename = "serviceCode", default)]
    pub service_code: Option<String>,
    /// Accumulated dialed text, `*`-delimited.
    #[serde(default)]
    pub text: String,
}

/// Reply for one turn. The prefix is the wire contract with the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Dialog continues; the gateway prompts again.
    Continue(String),
    /// Dialog terminates.
    End(String),
}

impl Reply {
    /// Serialize with the `CON `/`END ` prefix, exactly one space.
    pub fn to_wire(&self) -> String {
        match self {
            Reply::Continue(text) => format!("CON {text}"),
            Reply::End(text) => format!("END {text}"),
        }
    }

    /// True for terminal replies.
    pub fn is_end(&self) -> bool {
        matches!(self, Reply::End(_))
    }
}

/// Tunables for the engine, taken from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Session inactivity TTL.
    pub ttl: Duration,
    /// History entries shown.
    pub history_limit: i64,
    /// Token extraction rule.
    pub parse_rule: ParseRule,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            history_limit: 3,
            parse_rule: ParseRule::LastSegment,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.session_ttl(),
            history_limit: config.history_limit,
            parse_rule: if config.legacy_input_parsing {
                ParseRule::FullSequence
            } else {
                ParseRule::LastSegment
            },
        }
    }
}

/// Outcome of one transition before serialization.
struct Turn {
    reply: Reply,
    status: SessionStatus,
}

impl Turn {
    fn active(text: String) -> Self {
        Self {
            reply: Reply::Continue(text),
            status: SessionStatus::Active,
        }
    }

    fn end(text: String, status: SessionStatus) -> Self {
        Self {
            reply: Reply::End(text),
            status,
        }
    }
}

/// USSD menu session engine.
pub struct MenuEngine {
    store: Arc<dyn SessionStore>,
    repo: Arc<dyn UssdRepository>,
    settings: EngineSettings,
}

impl MenuEngine {
    /// Create an engine over a session store and a repository.
    pub fn new(
        store: Arc<dyn SessionStore>,
        repo: Arc<dyn UssdRepository>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            repo,
            settings,
        }
    }

    /// Number of in-flight sessions.
    pub fn live_sessions(&self) -> usize {
        self.store.len()
    }

    /// Process one turn. Never fails outward: infrastructure errors become
    /// a terminal localized maintenance reply.
    pub async fn handle_turn(&self, req: &UssdRequest) -> String {
        let started = Instant::now();
        counter!(METRIC_TURNS).increment(1);

        let wire = match self.process(req).await {
            Ok(wire) => wire,
            Err(err) => {
                error!(session = %req.session_id, error = %err, "turn failed, ending dialog");
                let lang = self
                    .store
                    .remove(&req.session_id)
                    .map(|session| session.lang())
                    .unwrap_or(Language::French);
                counter!(METRIC_SESSIONS_INVALID).increment(1);
                if let Err(mark_err) = self
                    .repo
                    .mark_status(&req.session_id, SessionStatus::Invalid)
                    .await
                {
                    warn!(session = %req.session_id, error = %mark_err, "could not flag failed session");
                }
                Reply::End(message(lang, MessageKey::Maintenance).to_string()).to_wire()
            }
        };

        histogram!(METRIC_TURN_LATENCY).record(started.elapsed().as_secs_f64() * 1000.0);
        wire
    }

    /// Purge sessions idle past the TTL and flag them in the metadata
    /// table. Returns how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        let purged = self
            .store
            .purge_expired(OffsetDateTime::now_utc(), self.settings.ttl);
        for session in &purged {
            counter!(METRIC_SESSIONS_EXPIRED).increment(1);
            if let Err(err) = self
                .repo
                .mark_status(&session.key, SessionStatus::Expired)
                .await
            {
                warn!(session = %session.key, error = %err, "could not flag expired session");
            }
        }
        if !purged.is_empty() {
            info!(count = purged.len(), "purged expired sessions");
        }
        purged.len()
    }

    async fn process(&self, req: &UssdRequest) -> Result<String> {
        let now = OffsetDateTime::now_utc();

        let mut session = match self.store.get(&req.session_id) {
            Some(existing) if !existing.is_expired(self.settings.ttl, now) => existing,
            Some(_expired) => {
                // Expired dialogs are never resurrected, even if the
                // gateway reuses the key before the sweep ran.
                self.store.remove(&req.session_id);
                counter!(METRIC_SESSIONS_EXPIRED).increment(1);
                if let Err(err) = self
                    .repo
                    .mark_status(&req.session_id, SessionStatus::Expired)
                    .await
                {
                    warn!(session = %req.session_id, error = %err, "could not flag expired session");
                }
                counter!(METRIC_SESSIONS_CREATED).increment(1);
                Session::new(&req.session_id, &req.phone_number, now)
            }
            None => {
                counter!(METRIC_SESSIONS_CREATED).increment(1);
                Session::new(&req.session_id, &req.phone_number, now)
            }
        };

        // The gateway re-sends the whole accumulated string; a replay of
        // the last turn gets the remembered reply and no new side effects.
        if let Some(reply) = session.replayed(&req.text) {
            debug!(session = %req.session_id, "replayed turn");
            return Ok(reply.to_string());
        }

        let token = extract_token(&req.text, self.settings.parse_rule);
        let turn = if token == EXIT_TOKEN {
            counter!(METRIC_SESSIONS_CLOSED).increment(1);
            Turn::end(
                message(session.lang(), MessageKey::Goodbye).to_string(),
                SessionStatus::Closed,
            )
        } else {
            self.step(&mut session, &token, now).await?
        };

        let wire = turn.reply.to_wire();
        match turn.status {
            SessionStatus::Active => {
                session.touch(now);
                session.remember_turn(&req.text, &wire);
                self.repo
                    .upsert_session(&session, SessionStatus::Active)
                    .await?;
                self.store.upsert(session);
            }
            status => {
                if status == SessionStatus::Invalid {
                    counter!(METRIC_SESSIONS_INVALID).increment(1);
                }
                self.store.remove(&req.session_id);
                self.repo.upsert_session(&session, status).await?;
            }
        }
        Ok(wire)
    }

    /// Apply one token to the current state.
    async fn step(&self, session: &mut Session, token: &str, now: OffsetDateTime) -> Result<Turn> {
        let lang = session.lang();
        match session.state {
            MenuState::Welcome => match token {
                "" | "0" => Ok(Turn::active(message(lang, MessageKey::Welcome).to_string())),
                "1" | "2" => {
                    session.language = Some(if token == "1" {
                        Language::French
                    } else {
                        Language::Kinyarwanda
                    });
                    session.advance(MenuState::Age);
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => Ok(self.invalid_choice(lang)),
            },

            MenuState::Age => match token {
                "0" => {
                    session.reset();
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => match token.parse::<u32>() {
                    Ok(age) if age >= 1 && age <= MAX_AGE => {
                        session.age = Some(age);
                        session.advance(MenuState::Weight);
                        Ok(Turn::active(self.render_state(session).await?))
                    }
                    _ => Ok(self.invalid_input(lang)),
                },
            },

            MenuState::Weight => match token {
                "0" => {
                    session.back();
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => match token.parse::<Decimal>() {
                    Ok(weight) if weight > Decimal::ZERO && weight <= MAX_WEIGHT_KG => {
                        session.weight = Some(weight);
                        session.advance(MenuState::Height);
                        Ok(Turn::active(self.render_state(session).await?))
                    }
                    _ => Ok(self.invalid_input(lang)),
                },
            },

            MenuState::Height => match token {
                "0" => {
                    session.back();
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => match token.parse::<Decimal>() {
                    Ok(height) if height > Decimal::ZERO && height <= MAX_HEIGHT_CM => {
                        self.complete_measurement(session, height, now).await?;
                        Ok(Turn::active(self.render_state(session).await?))
                    }
                    _ => Ok(self.invalid_input(lang)),
                },
            },

            MenuState::Result => match token {
                "0" => {
                    session.clear_measurements();
                    session.advance(MenuState::Age);
                    Ok(Turn::active(self.render_state(session).await?))
                }
                "1" => {
                    session.advance(MenuState::Tips);
                    Ok(Turn::active(self.render_state(session).await?))
                }
                "2" => {
                    session.advance(MenuState::History);
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => Ok(self.invalid_choice(lang)),
            },

            MenuState::Tips | MenuState::History => match token {
                "0" => {
                    session.back();
                    Ok(Turn::active(self.render_state(session).await?))
                }
                _ => Ok(self.invalid_choice(lang)),
            },
        }
    }

    /// Store the height, compute the BMI, and persist exactly one record.
    async fn complete_measurement(
        &self,
        session: &mut Session,
        height: Decimal,
        now: OffsetDateTime,
    ) -> Result<()> {
        session.height = Some(height);
        let weight = session
            .weight
            .ok_or_else(|| UssdError::Internal("height entered without weight".into()))?;
        let age = session
            .age
            .ok_or_else(|| UssdError::Internal("height entered without age".into()))?;
        let result = compute_bmi(weight, height)
            .ok_or_else(|| UssdError::Internal("non-positive measurements".into()))?;
        session.result = Some(result);

        let record = BmiRecord {
            session_key: session.key.clone(),
            phone_number: session.phone.clone(),
            age: age as i32,
            height_cm: height,
            weight_kg: weight,
            bmi: result.value,
            category: result.category.to_string(),
            recorded_at: now,
        };
        self.repo.save_record(&record).await?;
        counter!(METRIC_RECORDS_SAVED).increment(1);
        info!(
            session = %session.key,
            bmi = %result.value,
            category = %result.category,
            "bmi record saved"
        );

        session.advance(MenuState::Result);
        Ok(())
    }

    /// Render the screen for the session's current state.
    async fn render_state(&self, session: &Session) -> Result<String> {
        let lang = session.lang();
        Ok(match session.state {
            MenuState::Welcome => message(lang, MessageKey::Welcome).to_string(),
            MenuState::Age => message(lang, MessageKey::AskAge).to_string(),
            MenuState::Weight => message(lang, MessageKey::AskWeight).to_string(),
            MenuState::Height => message(lang, MessageKey::AskHeight).to_string(),
            MenuState::Result => self.render_result(session)?,
            MenuState::Tips => {
                let result = session
                    .result
                    .ok_or_else(|| UssdError::Internal("tips without a result".into()))?;
                tips(lang, result.category).to_string()
            }
            MenuState::History => self.render_history(session).await?,
        })
    }

    fn render_result(&self, session: &Session) -> Result<String> {
        let lang = session.lang();
        let result = session
            .result
            .ok_or_else(|| UssdError::Internal("result screen without a result".into()))?;
        Ok(render(
            message(lang, MessageKey::Result),
            &[
                &result.value.to_string(),
                category_label(lang, result.category),
            ],
        ))
    }

    async fn render_history(&self, session: &Session) -> Result<String> {
        let lang = session.lang();
        let records = self
            .repo
            .recent_records(&session.phone, self.settings.history_limit)
            .await?;

        let body = if records.is_empty() {
            message(lang, MessageKey::HistoryEmpty).to_string()
        } else {
            let mut lines = Vec::with_capacity(records.len());
            for (i, record) in records.iter().enumerate() {
                let category =
                    BmiCategory::from_str(&record.category).map_err(|_| {
                        StorageError::CorruptValue {
                            column: "category",
                            value: record.category.clone(),
                        }
                    })?;
                lines.push(format!(
                    "{}. {} ({}) - {}",
                    i + 1,
                    record.bmi,
                    category_label(lang, category),
                    record.recorded_at.date()
                ));
            }
            lines.join("\n")
        };

        Ok(render(message(lang, MessageKey::History), &[&body]))
    }

    fn invalid_input(&self, lang: Language) -> Turn {
        Turn::end(
            message(lang, MessageKey::InvalidInput).to_string(),
            SessionStatus::Invalid,
        )
    }

    fn invalid_choice(&self, lang: Language) -> Turn {
        Turn::end(
            message(lang, MessageKey::InvalidChoice).to_string(),
            SessionStatus::Invalid,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::session::InMemorySessionStore;
    use crate::storage::mock::{MockConfig, MockRepository};

    const PHONE: &str = "+250788123456";

    fn engine_with(repo: MockRepository) -> (MenuEngine, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MenuEngine::new(
            store.clone(),
            Arc::new(repo),
            EngineSettings::default(),
        );
        (engine, store)
    }

    fn engine() -> (MenuEngine, Arc<InMemorySessionStore>, MockRepository) {
        let repo = MockRepository::new();
        let (engine, store) = engine_with(repo.clone());
        (engine, store, repo)
    }

    async fn turn(engine: &MenuEngine, key: &str, text: &str) -> String {
        engine
            .handle_turn(&UssdRequest {
                session_id: key.to_string(),
                phone_number: PHONE.to_string(),
                service_code: None,
                text: text.to_string(),
            })
            .await
    }

    /// Drive the dialog to the result screen in French (age 25, 70kg, 170cm).
    async fn to_result(engine: &MenuEngine, key: &str) -> String {
        turn(engine, key, "").await;
        turn(engine, key, "1").await;
        turn(engine, key, "1*25").await;
        turn(engine, key, "1*25*70").await;
        turn(engine, key, "1*25*70*170").await
    }

    #[tokio::test]
    async fn first_turn_shows_the_welcome_screen() {
        let (engine, _, _) = engine();
        let reply = turn(&engine, "s1", "").await;
        assert!(reply.starts_with("CON Bienvenue"), "got: {reply}");
    }

    #[tokio::test]
    async fn french_happy_path_reaches_a_normal_result() {
        let (engine, _, repo) = engine();
        let reply = to_result(&engine, "s1").await;

        assert!(reply.starts_with("CON "), "got: {reply}");
        assert!(reply.contains("Votre IMC est 24.2"), "got: {reply}");
        assert!(reply.contains("(Normal)"), "got: {reply}");

        let records = repo.saved_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Normal");
        assert_eq!(records[0].phone_number, PHONE);
    }

    #[tokio::test]
    async fn kinyarwanda_choice_switches_the_language() {
        let (engine, _, _) = engine();
        turn(&engine, "s1", "").await;
        let reply = turn(&engine, "s1", "2").await;
        assert!(reply.starts_with("CON Andika imyaka"), "got: {reply}");
    }

    #[tokio::test]
    async fn replaying_the_same_text_does_not_save_twice() {
        let (engine, _, repo) = engine();
        let first = to_result(&engine, "s1").await;
        let again = turn(&engine, "s1", "1*25*70*170").await;

        assert_eq!(first, again);
        assert_eq!(repo.saved_records().len(), 1);
    }

    #[tokio::test]
    async fn exit_token_ends_from_any_state() {
        let (engine, store, _) = engine();
        turn(&engine, "s1", "").await;
        let reply = turn(&engine, "s1", "00").await;
        assert!(reply.starts_with("END "), "got: {reply}");
        assert!(store.get("s1").is_none());

        to_result(&engine, "s2").await;
        let reply = turn(&engine, "s2", "1*25*70*170*00").await;
        assert!(reply.starts_with("END "), "got: {reply}");
        assert!(store.get("s2").is_none());
    }

    #[tokio::test]
    async fn non_numeric_age_terminates_the_session() {
        let (engine, store, repo) = engine();
        turn(&engine, "s1", "").await;
        turn(&engine, "s1", "1").await;
        let reply = turn(&engine, "s1", "1*abc").await;

        assert_eq!(reply, "END Entrée invalide. La session est terminée.");
        assert!(store.get("s1").is_none());
        let statuses = repo.statuses();
        assert_eq!(statuses.last().unwrap().1, SessionStatus::Invalid);
    }

    #[tokio::test]
    async fn out_of_range_age_is_invalid() {
        let (engine, _, _) = engine();
        turn(&engine, "s1", "").await;
        turn(&engine, "s1", "1").await;
        let reply = turn(&engine, "s1", "1*121").await;
        assert!(reply.starts_with("END Entrée invalide"), "got: {reply}");
    }

    #[tokio::test]
    async fn unknown_result_choice_is_invalid() {
        let (engine, store, _) = engine();
        to_result(&engine, "s1").await;
        let reply = turn(&engine, "s1", "1*25*70*170*7").await;
        assert!(reply.starts_with("END Choix non reconnu"), "got: {reply}");
        assert!(store.get("s1").is_none());
    }

    #[tokio::test]
    async fn tips_then_back_re_renders_the_result() {
        let (engine, _, _) = engine();
        to_result(&engine, "s1").await;

        let tips_reply = turn(&engine, "s1", "1*25*70*170*1").await;
        assert!(tips_reply.starts_with("CON Votre poids est sain"), "got: {tips_reply}");

        let back = turn(&engine, "s1", "1*25*70*170*1*0").await;
        assert!(back.contains("Votre IMC est 24.2"), "got: {back}");
    }

    #[tokio::test]
    async fn history_lists_recent_records_newest_first() {
        let (engine, _, _) = engine();
        to_result(&engine, "s1").await;

        let reply = turn(&engine, "s1", "1*25*70*170*2").await;
        assert!(reply.starts_with("CON Historique IMC:"), "got: {reply}");
        assert!(reply.contains("1. 24.2 (Normal)"), "got: {reply}");

        let back = turn(&engine, "s1", "1*25*70*170*2*0").await;
        assert!(back.contains("Votre IMC est 24.2"), "got: {back}");
    }

    #[tokio::test]
    async fn empty_history_shows_the_localized_notice() {
        let (engine, _, repo) = engine();
        to_result(&engine, "s1").await;
        repo.clear_records();

        let reply = turn(&engine, "s1", "1*25*70*170*2").await;
        assert!(reply.starts_with("CON "), "got: {reply}");
        assert!(reply.contains("Aucun historique trouvé."), "got: {reply}");
    }

    #[tokio::test]
    async fn restart_from_result_keeps_language_and_clears_measurements() {
        let (engine, store, _) = engine();
        to_result(&engine, "s1").await;

        let reply = turn(&engine, "s1", "1*25*70*170*0").await;
        assert!(reply.starts_with("CON Entrez votre âge"), "got: {reply}");

        let session = store.get("s1").unwrap();
        assert_eq!(session.language, Some(Language::French));
        assert!(session.age.is_none());
        assert!(session.weight.is_none());
        assert!(session.result.is_none());
    }

    #[tokio::test]
    async fn back_from_weight_returns_to_the_age_prompt() {
        let (engine, store, _) = engine();
        turn(&engine, "s1", "").await;
        turn(&engine, "s1", "1").await;
        turn(&engine, "s1", "1*25").await;

        let reply = turn(&engine, "s1", "1*25*0").await;
        assert!(reply.starts_with("CON Entrez votre âge"), "got: {reply}");
        let session = store.get("s1").unwrap();
        assert_eq!(session.state, MenuState::Age);
        assert!(session.weight.is_none());
    }

    #[tokio::test]
    async fn storage_failure_ends_with_the_maintenance_message() {
        let repo = MockRepository::with_config(MockConfig {
            fail_save: true,
            ..MockConfig::default()
        });
        let (engine, store) = engine_with(repo);

        turn(&engine, "s1", "").await;
        turn(&engine, "s1", "1").await;
        turn(&engine, "s1", "1*30").await;
        turn(&engine, "s1", "1*30*80").await;
        let reply = turn(&engine, "s1", "1*30*80*180").await;

        assert_eq!(reply, "END Service en maintenance. Veuillez réessayer plus tard.");
        assert!(store.get("s1").is_none());
    }

    #[tokio::test]
    async fn stale_key_starts_fresh_and_flags_the_old_session_expired() {
        let (engine, store, repo) = engine();

        // Mid-dialog session last touched well past the TTL.
        let stale_at = OffsetDateTime::now_utc() - Duration::from_secs(31 * 60);
        let mut stale = Session::new("s1", PHONE, stale_at);
        stale.language = Some(Language::Kinyarwanda);
        stale.advance(MenuState::Age);
        store.upsert(stale);

        let reply = turn(&engine, "s1", "").await;

        assert!(reply.starts_with("CON Bienvenue"), "got: {reply}");
        assert!(repo
            .statuses()
            .contains(&("s1".to_string(), SessionStatus::Expired)));

        let fresh = store.get("s1").unwrap();
        assert_eq!(fresh.state, MenuState::Welcome);
        assert!(fresh.language.is_none());
    }

    #[tokio::test]
    async fn corrupt_stored_category_ends_with_the_maintenance_message() {
        let (engine, store, repo) = engine();
        to_result(&engine, "s1").await;

        repo.save_record(&BmiRecord {
            session_key: "old".to_string(),
            phone_number: PHONE.to_string(),
            age: 25,
            height_cm: dec!(170),
            weight_kg: dec!(70),
            bmi: dec!(24.2),
            category: "Chonky".to_string(),
            recorded_at: OffsetDateTime::now_utc(),
        })
        .await
        .unwrap();

        let reply = turn(&engine, "s1", "1*25*70*170*2").await;

        assert_eq!(reply, "END Service en maintenance. Veuillez réessayer plus tard.");
        assert!(store.get("s1").is_none());
    }

    #[tokio::test]
    async fn welcome_zero_redisplays_instead_of_terminating() {
        let (engine, store, _) = engine();
        turn(&engine, "s1", "").await;
        let reply = turn(&engine, "s1", "0").await;
        assert!(reply.starts_with("CON Bienvenue"), "got: {reply}");
        assert!(store.get("s1").is_some());
    }
}
