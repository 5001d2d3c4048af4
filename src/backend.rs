use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::{Catalog, CatalogEntry};
use crate::config;
use crate::pipeline::MatchStore;
use crate::record::MatchRecord;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const DATE_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Blocking client for the tracker backend. Every endpoint answers with a
/// `{"status": ..., "data": ...}` envelope.
#[derive(Debug, Clone)]
pub struct Backend {
    base: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    status: String,
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentTier {
    pub current_elo: i32,
    pub tier: String,
    pub tier_short: String,
    pub last_game_number: i64,
    #[serde(default)]
    pub total_wins: i32,
    #[serde(default)]
    pub win_streak_value: i32,
}

#[derive(Debug, Deserialize)]
struct ExistsData {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct NamesData {
    names: Vec<String>,
}

impl Backend {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::backend_base_url())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn current_tier(&self) -> Result<CurrentTier> {
        let envelope: Envelope<CurrentTier> = get_json(&self.url("/current_tier"))?;
        Ok(envelope.data)
    }

    pub fn opponent_names(&self) -> Result<Vec<String>> {
        let envelope: Envelope<NamesData> = get_json(&self.url("/opponent_names"))?;
        Ok(envelope.data.names)
    }

    /// Fetches the three id catalogs in one go; enrichment wants them as
    /// plain lookup tables, not live endpoints.
    pub fn fetch_catalog(&self) -> Result<Catalog> {
        let characters: Envelope<Vec<CatalogEntry>> = get_json(&self.url("/characters"))?;
        let stages: Envelope<Vec<CatalogEntry>> = get_json(&self.url("/stages"))?;
        let moves: Envelope<Vec<CatalogEntry>> = get_json(&self.url("/movelist"))?;
        Ok(Catalog::new(characters.data, stages.data, moves.data))
    }
}

impl MatchStore for Backend {
    fn probe(&self) -> Result<()> {
        self.current_tier().map(|_| ())
    }

    fn exists(&self, ranked_game_number: i64, match_date: Option<NaiveDateTime>) -> Result<bool> {
        let client = http_client()?;
        let mut request = client
            .get(self.url("/match-exists"))
            .query(&[("ranked_game_number", ranked_game_number.to_string())]);
        if let Some(date) = match_date {
            request = request.query(&[("match_date", date.format(DATE_WIRE_FORMAT).to_string())]);
        }
        let resp = request
            .send()
            .with_context(|| format!("existence check for match {ranked_game_number}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading existence body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status}: {body}"));
        }
        let envelope: Envelope<ExistsData> =
            serde_json::from_str(&body).context("invalid existence json")?;
        Ok(envelope.data.exists)
    }

    fn submit(&self, record: &MatchRecord) -> Result<()> {
        let client = http_client()?;
        let resp = client
            .post(self.url("/insert-match"))
            .json(&submit_payload(record))
            .send()
            .with_context(|| format!("submit match {}", record.ranked_game_number))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("http {status}: {body}"));
        }
        Ok(())
    }
}

fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status}: {body}"));
    }
    serde_json::from_str(&body).with_context(|| format!("invalid json from {url}"))
}

/// The flat key layout `/insert-match` expects, `game_N_*` fields included.
pub fn submit_payload(record: &MatchRecord) -> Value {
    let mut map = Map::new();
    map.insert(
        "match_date".to_string(),
        match record.match_date {
            Some(date) => Value::from(date.format(DATE_WIRE_FORMAT).to_string()),
            None => Value::Null,
        },
    );
    map.insert("elo_rank_new".to_string(), Value::from(record.elo_rank_new));
    map.insert("elo_rank_old".to_string(), Value::from(record.elo_rank_old));
    map.insert("elo_change".to_string(), Value::from(record.elo_change));
    map.insert(
        "match_win".to_string(),
        Value::from(if record.is_win() { 1 } else { 0 }),
    );
    map.insert(
        "ranked_game_number".to_string(),
        Value::from(record.ranked_game_number),
    );
    map.insert("total_wins".to_string(), Value::from(record.total_wins));
    map.insert(
        "win_streak_value".to_string(),
        Value::from(record.win_streak_value),
    );
    map.insert("opponent_elo".to_string(), Value::from(record.opponent_elo));
    map.insert(
        "opponent_estimated_elo".to_string(),
        Value::from(record.opponent_estimated_elo),
    );
    map.insert(
        "opponent_name".to_string(),
        Value::from(record.opponent_name.clone()),
    );
    for (i, game) in record.games.iter().enumerate() {
        let n = i + 1;
        map.insert(format!("game_{n}_char_pick"), Value::from(game.char_pick));
        map.insert(
            format!("game_{n}_opponent_pick"),
            Value::from(game.opponent_pick),
        );
        map.insert(format!("game_{n}_stage"), Value::from(game.stage));
        map.insert(format!("game_{n}_winner"), Value::from(game.winner));
        map.insert(
            format!("game_{n}_final_move_id"),
            Value::from(game.final_move_id),
        );
        map.insert(format!("game_{n}_duration"), Value::from(game.duration));
    }
    Value::Object(map)
}
