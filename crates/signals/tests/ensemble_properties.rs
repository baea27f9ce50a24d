//! End-to-end properties of the standard ensemble.

use std::sync::Arc;

use progno_core::{
    CalibrationParameterSet, FormResult, GameContext, HeadToHead, InjuryReport, NeutralReason,
    OddsSnapshot, ParameterStore, Pick, Side, TeamStats, Weather, WeightSet,
};
use progno_signals::{Aggregator, MarketModel, ModelRegistry, PerformanceWindow};

fn stats(points: f64, allowed: f64, wins: u32, losses: u32) -> TeamStats {
    TeamStats {
        recent_avg_points: points,
        recent_avg_allowed: allowed,
        points_for: points * f64::from(wins + losses),
        points_against: allowed * f64::from(wins + losses),
        wins,
        losses,
    }
}

fn full_game() -> GameContext {
    let mut odds = OddsSnapshot::moneyline(-180.0, 155.0);
    odds.spread = Some(-4.5);
    odds.total = Some(44.5);
    GameContext::new("KC", "LV", odds)
        .with_game_id("kc-lv")
        .with_league("americanfootball", "NFL")
        .with_stats(stats(27.4, 19.8, 9, 2), stats(18.6, 25.1, 3, 8))
        .with_form(
            FormResult::parse_sequence("WWLWW"),
            FormResult::parse_sequence("LLWLL"),
        )
        .with_head_to_head(HeadToHead {
            home_wins: 6,
            away_wins: 2,
            draws: 0,
        })
        .with_weather(Weather {
            temperature_f: 38.0,
            wind_mph: 12.0,
            precipitation: false,
        })
        .with_injuries(InjuryReport {
            home_impact: 0.05,
            away_impact: 0.15,
        })
}

fn standard() -> Aggregator {
    Aggregator::standard(Arc::new(CalibrationParameterSet::default()))
}

// ============================================
// Output Bounds
// ============================================

#[test]
fn probabilities_are_complementary_and_bounded() {
    let r = standard().predict(&full_game());
    assert!((r.home_win_prob + r.away_win_prob - 1.0).abs() < 1e-12);
    assert!((0.05..=0.95).contains(&r.home_win_prob));
    assert!((0.0..=95.0).contains(&r.confidence));
    for c in &r.contributions {
        assert!((0.05..=0.95).contains(&c.home_win_prob), "{}", c.factor);
    }
}

#[test]
fn strong_favorite_is_picked_with_market_edge() {
    let r = standard().predict(&full_game());
    assert_eq!(r.pick, Pick::Home);
    assert!(r.market_edge.is_some());
    assert!(r.neutral_reason.is_none());
    assert!(r.expected_total.is_some());
}

#[test]
fn contributions_follow_registry_order() {
    let agg = standard();
    let r = agg.predict(&full_game());
    let names: Vec<&str> = r.contributions.iter().map(|c| c.factor.as_str()).collect();
    let expected: Vec<&str> = agg
        .registry()
        .names()
        .into_iter()
        .filter(|n| names.contains(n))
        .collect();
    assert_eq!(names, expected);
}

// ============================================
// Input Handling
// ============================================

#[test]
fn malformed_odds_give_invalid_input() {
    let ctx = GameContext::new("KC", "LV", OddsSnapshot::moneyline(-50.0, 155.0));
    let agg = standard();
    assert!(agg.try_predict(&ctx).is_err());
    let r = agg.predict(&ctx);
    assert_eq!(r.neutral_reason, Some(NeutralReason::InvalidInput));
    assert_eq!(r.pick, Pick::NoPrediction);
}

#[test]
fn empty_registry_is_neutral() {
    let agg = Aggregator::new(
        Arc::new(ModelRegistry::new()),
        Arc::new(CalibrationParameterSet::default()),
    );
    let r = agg.predict(&full_game());
    assert_eq!(r.neutral_reason, Some(NeutralReason::NoSignals));
    assert!((r.home_win_prob - 0.5).abs() < f64::EPSILON);
}

#[test]
fn swapping_sides_mirrors_market_only_ensemble() {
    let registry = Arc::new(ModelRegistry::new().with_model(Box::new(MarketModel::default())));
    let agg = Aggregator::new(registry, Arc::new(CalibrationParameterSet::default()));
    let forward = agg.predict(&GameContext::new("A", "B", OddsSnapshot::moneyline(-150.0, 130.0)));
    let swapped = agg.predict(&GameContext::new("B", "A", OddsSnapshot::moneyline(130.0, -150.0)));
    assert!((forward.home_win_prob - swapped.away_win_prob).abs() < 1e-12);
    assert_eq!(forward.pick, Pick::Home);
    assert_eq!(swapped.pick, Pick::Away);
}

// ============================================
// Weights
// ============================================

#[test]
fn zeroed_multipliers_leave_only_the_market() {
    let agg = standard();
    let weights: WeightSet = agg
        .registry()
        .names()
        .into_iter()
        .map(|n| (n.to_string(), if n == "market" { 1.0 } else { 0.0 }))
        .collect();
    let params = CalibrationParameterSet::default().with_weights(weights);
    let market_only = Aggregator::standard(Arc::new(params)).predict(&full_game());

    let market = market_only
        .contributions
        .iter()
        .find(|c| c.factor == "market")
        .unwrap();
    assert!((market_only.home_win_prob - market.home_win_prob).abs() < 1e-12);
}

#[test]
fn learned_weights_favor_the_factor_that_was_right() {
    let agg = standard();
    let ctx = full_game();
    let r = agg.predict(&ctx);

    let mut window = PerformanceWindow::default();
    for _ in 0..20 {
        window.record(&r.contributions, Some(Side::Away));
    }
    let next = agg.learn(&window.performance());

    let away_pickers: Vec<&str> = r
        .contributions
        .iter()
        .filter(|c| c.home_win_prob < 0.5)
        .map(|c| c.factor.as_str())
        .collect();
    let home_pickers: Vec<&str> = r
        .contributions
        .iter()
        .filter(|c| c.home_win_prob > 0.5)
        .map(|c| c.factor.as_str())
        .collect();
    for a in &away_pickers {
        for h in &home_pickers {
            assert!(next.get(a) > next.get(h), "{a} should outweigh {h}");
        }
    }
}

#[test]
fn learning_one_factor_moves_it_against_the_rest() {
    let agg = standard();
    let r = agg.predict(&full_game());
    let form = r
        .contributions
        .iter()
        .find(|c| c.factor == "recent-form")
        .unwrap()
        .clone();

    let right = if form.home_win_prob > 0.5 { Side::Home } else { Side::Away };

    let mut window = PerformanceWindow::default();
    for _ in 0..10 {
        window.record(std::slice::from_ref(&form), Some(right));
    }
    let next = agg.learn(&window.performance());

    assert!(next.get("recent-form") > next.get("market"));
    assert!(next.get("market") < 1.0);
    assert_eq!(next.len(), agg.registry().len());
}

// ============================================
// Parameter Generations
// ============================================

#[test]
fn aggregator_keeps_its_generation_across_publish() {
    let store = ParameterStore::new(CalibrationParameterSet::default());
    let before = Aggregator::standard(store.current());
    let ctx = full_game();
    let first = before.predict(&ctx);

    let weights = WeightSet::new().with("market", 0.5).with("recent-form", 2.0);
    store.publish(CalibrationParameterSet::default().with_weights(weights));

    assert_eq!(before.predict(&ctx), first);
    let after = Aggregator::standard(store.current()).predict(&ctx);
    assert!((after.home_win_prob - first.home_win_prob).abs() > 1e-9);
}
