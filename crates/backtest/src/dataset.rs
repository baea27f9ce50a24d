//! Historical labeled games.
//!
//! A dataset is an immutable, chronologically sorted list of finished games
//! with their closing moneylines. Its identity is a SHA-256 fingerprint of
//! the canonical records, which ties calibrated parameters and checkpoints
//! to the exact data they were computed from.

use std::path::Path;

use chrono::NaiveDate;
use progno_core::{
    DatasetIdentity, FormResult, GameContext, HeadToHead, OddsSnapshot, Side, TeamStats,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Failure loading a historical dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record parsed but is unusable.
    #[error("game {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// One finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalGame {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// Closing American moneylines.
    pub home_odds: f64,
    pub away_odds: f64,
    #[serde(default)]
    pub home_form: Vec<FormResult>,
    #[serde(default)]
    pub away_form: Vec<FormResult>,
    #[serde(default)]
    pub head_to_head: HeadToHead,
    #[serde(default)]
    pub home_stats: TeamStats,
    #[serde(default)]
    pub away_stats: TeamStats,
    pub home_score: u32,
    pub away_score: u32,
}

impl HistoricalGame {
    /// Winning side, or `None` for a tie.
    #[must_use]
    pub fn winner(&self) -> Option<Side> {
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The pre-game context as the live engine would have seen it.
    #[must_use]
    pub fn to_context(&self) -> GameContext {
        GameContext::new(
            self.home_team.clone(),
            self.away_team.clone(),
            OddsSnapshot::moneyline(self.home_odds, self.away_odds),
        )
        .with_game_id(self.id.clone())
        .with_league("", self.league.clone())
        .with_stats(self.home_stats.clone(), self.away_stats.clone())
        .with_form(self.home_form.clone(), self.away_form.clone())
        .with_head_to_head(self.head_to_head)
    }
}

/// Flat CSV layout; form columns are compact strings such as `WWLDW`.
#[derive(Debug, Deserialize)]
struct GameRecord {
    id: String,
    date: NaiveDate,
    #[serde(default)]
    league: String,
    home_team: String,
    away_team: String,
    home_odds: f64,
    away_odds: f64,
    #[serde(default)]
    home_form: String,
    #[serde(default)]
    away_form: String,
    #[serde(default)]
    h2h_home_wins: u32,
    #[serde(default)]
    h2h_away_wins: u32,
    #[serde(default)]
    h2h_draws: u32,
    #[serde(default)]
    home_wins: u32,
    #[serde(default)]
    home_losses: u32,
    #[serde(default)]
    away_wins: u32,
    #[serde(default)]
    away_losses: u32,
    home_score: u32,
    away_score: u32,
}

impl From<GameRecord> for HistoricalGame {
    fn from(r: GameRecord) -> Self {
        Self {
            id: r.id,
            date: r.date,
            league: r.league,
            home_team: r.home_team,
            away_team: r.away_team,
            home_odds: r.home_odds,
            away_odds: r.away_odds,
            home_form: FormResult::parse_sequence(&r.home_form),
            away_form: FormResult::parse_sequence(&r.away_form),
            head_to_head: HeadToHead {
                home_wins: r.h2h_home_wins,
                away_wins: r.h2h_away_wins,
                draws: r.h2h_draws,
            },
            home_stats: TeamStats {
                wins: r.home_wins,
                losses: r.home_losses,
                ..TeamStats::default()
            },
            away_stats: TeamStats {
                wins: r.away_wins,
                losses: r.away_losses,
                ..TeamStats::default()
            },
            home_score: r.home_score,
            away_score: r.away_score,
        }
    }
}

/// Immutable, chronologically ordered set of games.
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    name: String,
    games: Vec<HistoricalGame>,
    fingerprint: String,
}

impl HistoricalDataset {
    /// Builds a dataset, sorting games by date (stable, so same-day games
    /// keep their input order).
    ///
    /// # Errors
    /// Returns [`DatasetError::InvalidRecord`] for a game with an empty id or
    /// team name.
    pub fn new(name: impl Into<String>, mut games: Vec<HistoricalGame>) -> Result<Self, DatasetError> {
        if let Some(bad) = games
            .iter()
            .find(|g| g.id.trim().is_empty() || g.home_team.trim().is_empty() || g.away_team.trim().is_empty())
        {
            return Err(DatasetError::InvalidRecord {
                id: bad.id.clone(),
                reason: "missing id or team name".to_string(),
            });
        }
        games.sort_by_key(|g| g.date);
        let fingerprint = fingerprint(&games)?;
        Ok(Self {
            name: name.into(),
            games,
            fingerprint,
        })
    }

    /// Loads games from a CSV file with a header row.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row does not parse.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let games = reader
            .deserialize::<GameRecord>()
            .map(|row| row.map(HistoricalGame::from))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(path = %path.display(), games = games.len(), "Loaded historical games");
        Self::new(dataset_name(path), games)
    }

    /// Loads games from a JSON array.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let games: Vec<HistoricalGame> = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), games = games.len(), "Loaded historical games");
        Self::new(dataset_name(path), games)
    }

    /// Loads by extension: `.json` as JSON, anything else as CSV.
    ///
    /// # Errors
    /// See [`from_csv`](Self::from_csv) and [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(path),
            _ => Self::from_csv(path),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn games(&self) -> &[HistoricalGame] {
        &self.games
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Hex SHA-256 of the canonical records.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn identity(&self) -> DatasetIdentity {
        DatasetIdentity {
            name: self.name.clone(),
            fingerprint: self.fingerprint.clone(),
            games: self.games.len(),
        }
    }
}

fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}

fn fingerprint(games: &[HistoricalGame]) -> Result<String, DatasetError> {
    let mut hasher = Sha256::new();
    for game in games {
        hasher.update(serde_json::to_vec(game)?);
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}
