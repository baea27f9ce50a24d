//! Game context supplied by the odds/stats collaborator.
//!
//! A [`GameContext`] is immutable for the duration of a prediction. The
//! simulation layer never mutates one in place; it builds perturbed copies.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Recency weights for the last five results, most recent first.
pub const RECENCY_WEIGHTS: [f64; 5] = [0.35, 0.25, 0.20, 0.12, 0.08];

/// One side of a matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Home team.
    Home,
    /// Away team.
    Away,
}

impl Side {
    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Away => write!(f, "away"),
        }
    }
}

/// Result of a past game from one team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    /// Win.
    #[serde(rename = "W")]
    Win,
    /// Loss.
    #[serde(rename = "L")]
    Loss,
    /// Draw / tie.
    #[serde(rename = "D")]
    Draw,
}

impl FormResult {
    /// Points credited to a result: win 1, draw 0.5, loss 0.
    #[must_use]
    pub const fn points(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.5,
            Self::Loss => 0.0,
        }
    }

    /// Parses a compact form string such as `"WWLDW"`, most recent first.
    ///
    /// Unknown characters are ignored.
    #[must_use]
    pub fn parse_sequence(s: &str) -> Vec<Self> {
        s.chars()
            .filter_map(|c| match c.to_ascii_uppercase() {
                'W' => Some(Self::Win),
                'L' => Some(Self::Loss),
                'D' | 'T' => Some(Self::Draw),
                _ => None,
            })
            .collect()
    }
}

/// Recency-weighted form score in [0, 1] over the last five results.
///
/// With five results this is the plain weighted sum (the weights sum to 1).
/// Shorter histories are renormalized over the weights actually used; an
/// empty history scores a neutral 0.5.
#[must_use]
pub fn recency_form_score(results: &[FormResult]) -> f64 {
    let used: Vec<(f64, f64)> = results
        .iter()
        .zip(RECENCY_WEIGHTS.iter())
        .map(|(r, w)| (r.points(), *w))
        .collect();
    let weight_sum: f64 = used.iter().map(|(_, w)| w).sum();
    if weight_sum <= f64::EPSILON {
        return 0.5;
    }
    used.iter().map(|(p, w)| p * w).sum::<f64>() / weight_sum
}

/// Bookmaker odds snapshot. Moneylines are American odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    /// Home moneyline (e.g. -150).
    pub home: f64,
    /// Away moneyline (e.g. +130).
    pub away: f64,
    /// Home spread in points (negative = home favored).
    #[serde(default)]
    pub spread: Option<f64>,
    /// Posted game total.
    #[serde(default)]
    pub total: Option<f64>,
}

impl OddsSnapshot {
    /// Creates a moneyline-only snapshot.
    #[must_use]
    pub fn moneyline(home: f64, away: f64) -> Self {
        Self {
            home,
            away,
            spread: None,
            total: None,
        }
    }

    /// Returns the moneyline for a side.
    #[must_use]
    pub fn for_side(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

/// Season and recent scoring statistics for one team.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamStats {
    /// Average points scored over recent games.
    pub recent_avg_points: f64,
    /// Average points allowed over recent games.
    pub recent_avg_allowed: f64,
    /// Season points scored.
    pub points_for: f64,
    /// Season points allowed.
    pub points_against: f64,
    /// Season wins.
    pub wins: u32,
    /// Season losses.
    pub losses: u32,
}

impl TeamStats {
    /// Season win percentage, or 0.5 with no games played.
    #[must_use]
    pub fn win_pct(&self) -> f64 {
        let games = self.wins + self.losses;
        if games == 0 {
            0.5
        } else {
            f64::from(self.wins) / f64::from(games)
        }
    }

    fn validate(&self, names: [&'static str; 4]) -> Result<(), InputError> {
        let values = [
            self.recent_avg_points,
            self.recent_avg_allowed,
            self.points_for,
            self.points_against,
        ];
        for (value, field) in values.into_iter().zip(names) {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::InvalidValue { field, value });
            }
        }
        Ok(())
    }
}

const HOME_STAT_FIELDS: [&str; 4] = [
    "home_stats.recent_avg_points",
    "home_stats.recent_avg_allowed",
    "home_stats.points_for",
    "home_stats.points_against",
];

const AWAY_STAT_FIELDS: [&str; 4] = [
    "away_stats.recent_avg_points",
    "away_stats.recent_avg_allowed",
    "away_stats.points_for",
    "away_stats.points_against",
];

/// Head-to-head record between the two teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeadToHead {
    /// Wins by the current home team.
    pub home_wins: u32,
    /// Wins by the current away team.
    pub away_wins: u32,
    /// Draws.
    #[serde(default)]
    pub draws: u32,
}

impl HeadToHead {
    /// Total meetings.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.home_wins + self.away_wins + self.draws
    }

    /// Home share of meetings (draws count half), or 0.5 with no meetings.
    #[must_use]
    pub fn home_win_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.5
        } else {
            (f64::from(self.home_wins) + f64::from(self.draws) * 0.5) / f64::from(total)
        }
    }
}

/// Game-time weather for outdoor venues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Temperature in degrees Fahrenheit.
    pub temperature_f: f64,
    /// Sustained wind speed in mph.
    pub wind_mph: f64,
    /// Rain or snow expected.
    #[serde(default)]
    pub precipitation: bool,
}

/// Venue information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Venue {
    /// Home stadium elevation in feet.
    pub home_elevation_ft: f64,
    /// Away team's home elevation in feet.
    pub away_elevation_ft: f64,
    /// Domed / indoor venue.
    #[serde(default)]
    pub indoor: bool,
}

/// Aggregate injury impact per side, as a fraction of team strength lost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InjuryReport {
    /// Home strength lost, 0.0 to 1.0.
    pub home_impact: f64,
    /// Away strength lost, 0.0 to 1.0.
    pub away_impact: f64,
}

/// Public betting splits on the home side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingSplits {
    /// Percentage of tickets on the home team (0 to 100).
    pub public_pct_home: f64,
    /// Percentage of money on the home team (0 to 100).
    pub money_pct_home: f64,
    /// Line moved against the public side.
    #[serde(default)]
    pub reverse_line_movement: bool,
}

/// News / social sentiment per team in [-1, 1].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    /// Home sentiment.
    pub home: f64,
    /// Away sentiment.
    pub away: f64,
}

/// A probability supplied by an outside judge (analyst, language model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalJudgment {
    /// Judge's home win probability.
    pub home_win_prob: f64,
    /// Judge's self-reported confidence, 0 to 100.
    pub confidence: f64,
    /// Identifier of the judge.
    #[serde(default)]
    pub source: String,
}

/// Everything the core knows about one upcoming game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContext {
    /// Caller-assigned identifier.
    #[serde(default)]
    pub game_id: String,
    /// Home team identifier.
    pub home_team: String,
    /// Away team identifier.
    pub away_team: String,
    /// Sport, e.g. "americanfootball".
    #[serde(default)]
    pub sport: String,
    /// League, e.g. "NFL".
    #[serde(default)]
    pub league: String,
    /// Odds snapshot.
    pub odds: OddsSnapshot,
    /// Home team statistics.
    #[serde(default)]
    pub home_stats: TeamStats,
    /// Away team statistics.
    #[serde(default)]
    pub away_stats: TeamStats,
    /// Home results, most recent first.
    #[serde(default)]
    pub home_form: Vec<FormResult>,
    /// Away results, most recent first.
    #[serde(default)]
    pub away_form: Vec<FormResult>,
    /// Head-to-head record.
    #[serde(default)]
    pub head_to_head: HeadToHead,
    /// Weather, if outdoor and known.
    #[serde(default)]
    pub weather: Option<Weather>,
    /// Venue elevations.
    #[serde(default)]
    pub venue: Option<Venue>,
    /// Injury impact.
    #[serde(default)]
    pub injuries: Option<InjuryReport>,
    /// Public betting splits.
    #[serde(default)]
    pub betting_splits: Option<BettingSplits>,
    /// Sentiment scores.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// External judgment.
    #[serde(default)]
    pub external_judgment: Option<ExternalJudgment>,
}

impl GameContext {
    /// Creates a context with the minimum required fields.
    #[must_use]
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        odds: OddsSnapshot,
    ) -> Self {
        Self {
            game_id: String::new(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            sport: String::new(),
            league: String::new(),
            odds,
            home_stats: TeamStats::default(),
            away_stats: TeamStats::default(),
            home_form: Vec::new(),
            away_form: Vec::new(),
            head_to_head: HeadToHead::default(),
            weather: None,
            venue: None,
            injuries: None,
            betting_splits: None,
            sentiment: None,
            external_judgment: None,
        }
    }

    /// Sets the game identifier.
    #[must_use]
    pub fn with_game_id(mut self, id: impl Into<String>) -> Self {
        self.game_id = id.into();
        self
    }

    /// Sets sport and league.
    #[must_use]
    pub fn with_league(mut self, sport: impl Into<String>, league: impl Into<String>) -> Self {
        self.sport = sport.into();
        self.league = league.into();
        self
    }

    /// Sets both teams' statistics.
    #[must_use]
    pub fn with_stats(mut self, home: TeamStats, away: TeamStats) -> Self {
        self.home_stats = home;
        self.away_stats = away;
        self
    }

    /// Sets both teams' recent form, most recent first.
    #[must_use]
    pub fn with_form(mut self, home: Vec<FormResult>, away: Vec<FormResult>) -> Self {
        self.home_form = home;
        self.away_form = away;
        self
    }

    /// Sets the head-to-head record.
    #[must_use]
    pub fn with_head_to_head(mut self, h2h: HeadToHead) -> Self {
        self.head_to_head = h2h;
        self
    }

    /// Sets weather.
    #[must_use]
    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Sets venue.
    #[must_use]
    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    /// Sets injuries.
    #[must_use]
    pub fn with_injuries(mut self, injuries: InjuryReport) -> Self {
        self.injuries = Some(injuries);
        self
    }

    /// Sets betting splits.
    #[must_use]
    pub fn with_betting_splits(mut self, splits: BettingSplits) -> Self {
        self.betting_splits = Some(splits);
        self
    }

    /// Sets sentiment.
    #[must_use]
    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    /// Sets an external judgment.
    #[must_use]
    pub fn with_external_judgment(mut self, judgment: ExternalJudgment) -> Self {
        self.external_judgment = Some(judgment);
        self
    }

    /// Returns the team name for a side.
    #[must_use]
    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// Checks the context is complete enough to predict on.
    ///
    /// # Errors
    /// Returns the first problem found: empty team names, moneylines that are
    /// not finite or sit inside (-100, 100), or negative / non-finite stats.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.home_team.trim().is_empty() {
            return Err(InputError::MissingField("home_team"));
        }
        if self.away_team.trim().is_empty() {
            return Err(InputError::MissingField("away_team"));
        }
        validate_american(self.odds.home, "odds.home")?;
        validate_american(self.odds.away, "odds.away")?;
        if let Some(total) = self.odds.total {
            if !total.is_finite() || total <= 0.0 {
                return Err(InputError::InvalidValue {
                    field: "odds.total",
                    value: total,
                });
            }
        }
        if let Some(spread) = self.odds.spread {
            if !spread.is_finite() {
                return Err(InputError::InvalidValue {
                    field: "odds.spread",
                    value: spread,
                });
            }
        }
        self.home_stats.validate(HOME_STAT_FIELDS)?;
        self.away_stats.validate(AWAY_STAT_FIELDS)?;
        Ok(())
    }
}

/// Validates a single American price.
///
/// # Errors
/// Returns [`InputError::InvalidOdds`] for non-finite values or values with
/// magnitude below 100.
pub fn validate_american(value: f64, field: &'static str) -> Result<(), InputError> {
    if !value.is_finite() || value.abs() < 100.0 {
        return Err(InputError::InvalidOdds { field, value });
    }
    Ok(())
}
