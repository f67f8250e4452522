//! Behavior-driven tests for multi-leg strategy evaluation.

use voltick_core::{
    ExpiryDate, MarketQuote, OptionContract, OptionType, ProviderId, Symbol, UtcDateTime,
};
use voltick_pricing::{
    evaluate, linear_grid, Direction, LegInstrument, PayoffBound, Strategy, StrategyLeg,
};

fn market_quote(spot: f64) -> MarketQuote {
    MarketQuote::new(
        Symbol::parse("SPY").expect("valid symbol"),
        spot,
        0.05,
        0.0,
        0.22,
        UtcDateTime::parse("2026-08-27T15:00:00Z").expect("valid timestamp"),
        ProviderId::Manual,
        None,
        None,
    )
    .expect("valid quote")
}

fn option_leg(strike: f64, option_type: OptionType, direction: Direction) -> StrategyLeg {
    let contract = OptionContract::new(
        Symbol::parse("SPY").expect("valid symbol"),
        strike,
        ExpiryDate::parse("2026-12-18").expect("valid expiry"),
        option_type,
    )
    .expect("valid contract");
    StrategyLeg {
        instrument: LegInstrument::Option(contract),
        direction,
        quantity: 1,
    }
}

// =============================================================================
// Canonical shapes
// =============================================================================

#[tokio::test]
async fn long_straddle_breaks_even_at_strike_plus_and_minus_cost() {
    // Given: a long straddle at K=100 entered for a 10.0 debit
    let straddle = Strategy::new(
        Some(String::from("long straddle")),
        vec![
            option_leg(100.0, OptionType::Call, Direction::Long),
            option_leg(100.0, OptionType::Put, Direction::Long),
        ],
        10.0,
    )
    .expect("valid strategy");

    // When: evaluated on the [50, 150] grid
    let grid = linear_grid(50.0, 150.0, 100).expect("valid grid");
    let evaluation = evaluate(&straddle, &market_quote(100.0), &grid).expect("evaluates");

    // Then: breakevens sit at 90 and 110
    assert_eq!(evaluation.breakevens.len(), 2);
    assert!((evaluation.breakevens[0] - 90.0).abs() < 1e-9);
    assert!((evaluation.breakevens[1] - 110.0).abs() < 1e-9);

    // And: gain is unbounded to the upside, loss capped at the debit
    assert_eq!(evaluation.max_gain, PayoffBound::Unbounded);
    assert_eq!(evaluation.max_loss, PayoffBound::Finite(-10.0));
}

#[tokio::test]
async fn covered_call_has_capped_gain_and_deep_but_finite_loss() {
    // Given: long stock entered at a 95.0 net basis, short a 110 call
    let covered_call = Strategy::new(
        Some(String::from("covered call")),
        vec![
            StrategyLeg {
                instrument: LegInstrument::Underlying,
                direction: Direction::Long,
                quantity: 1,
            },
            option_leg(110.0, OptionType::Call, Direction::Short),
        ],
        95.0,
    )
    .expect("valid strategy");

    let grid = linear_grid(50.0, 150.0, 100).expect("valid grid");
    let evaluation = evaluate(&covered_call, &market_quote(100.0), &grid).expect("evaluates");

    // Then: upside is capped at the strike, downside runs to the basis
    assert_eq!(evaluation.max_gain, PayoffBound::Finite(15.0));
    assert_eq!(evaluation.max_loss, PayoffBound::Finite(-95.0));

    // And: the short call offsets the stock delta without killing it
    assert!(evaluation.net_greeks.delta > 0.0);
    assert!(evaluation.net_greeks.delta < 1.0);
    assert!(evaluation.net_greeks.gamma < 0.0);
}

#[tokio::test]
async fn naked_short_call_exposes_unbounded_loss() {
    let short_call = Strategy::new(
        None,
        vec![option_leg(100.0, OptionType::Call, Direction::Short)],
        -7.5,
    )
    .expect("valid strategy");

    let grid = linear_grid(50.0, 150.0, 100).expect("valid grid");
    let evaluation = evaluate(&short_call, &market_quote(100.0), &grid).expect("evaluates");

    assert_eq!(evaluation.max_loss, PayoffBound::Unbounded);
    assert_eq!(evaluation.max_gain, PayoffBound::Finite(7.5));
}

#[tokio::test]
async fn long_put_gain_is_bounded_by_the_zero_price_floor() {
    // Given: a long 100 put for a 4.0 debit, on a grid that stops at 60
    let long_put = Strategy::new(
        None,
        vec![option_leg(100.0, OptionType::Put, Direction::Long)],
        4.0,
    )
    .expect("valid strategy");

    let grid = linear_grid(60.0, 140.0, 80).expect("valid grid");
    let evaluation = evaluate(&long_put, &market_quote(100.0), &grid).expect("evaluates");

    // Then: the extreme comes from the S=0 extrapolation, not the grid edge
    assert_eq!(evaluation.max_gain, PayoffBound::Finite(96.0));
    assert_eq!(evaluation.max_loss, PayoffBound::Finite(-4.0));
}

#[tokio::test]
async fn bull_call_spread_is_bounded_on_both_sides() {
    // Given: long the 95 call, short the 105 call, 4.0 net debit
    let spread = Strategy::new(
        Some(String::from("bull call spread")),
        vec![
            option_leg(95.0, OptionType::Call, Direction::Long),
            option_leg(105.0, OptionType::Call, Direction::Short),
        ],
        4.0,
    )
    .expect("valid strategy");

    let grid = linear_grid(50.0, 150.0, 200).expect("valid grid");
    let evaluation = evaluate(&spread, &market_quote(100.0), &grid).expect("evaluates");

    assert_eq!(evaluation.max_gain, PayoffBound::Finite(6.0));
    assert_eq!(evaluation.max_loss, PayoffBound::Finite(-4.0));
    assert_eq!(evaluation.breakevens.len(), 1);
    assert!((evaluation.breakevens[0] - 99.0).abs() < 1e-9);
}

// =============================================================================
// Serialization contract (CLI strategy files)
// =============================================================================

#[tokio::test]
async fn strategy_files_round_trip_through_json() {
    let strategy = Strategy::new(
        Some(String::from("collar")),
        vec![
            StrategyLeg {
                instrument: LegInstrument::Underlying,
                direction: Direction::Long,
                quantity: 1,
            },
            option_leg(90.0, OptionType::Put, Direction::Long),
            option_leg(110.0, OptionType::Call, Direction::Short),
        ],
        100.0,
    )
    .expect("valid strategy");

    let json = serde_json::to_string_pretty(&strategy).expect("serializes");
    let parsed: Strategy = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(parsed, strategy);
}

#[tokio::test]
async fn hand_written_files_with_zero_quantity_legs_are_rejected() {
    let json = r#"{
        "legs": [
            {
                "instrument": { "kind": "underlying" },
                "direction": "long",
                "quantity": 0
            }
        ],
        "entry_cost": 0.0
    }"#;

    // Deserialization is structural; semantic validation happens in new()
    let parsed: Strategy = serde_json::from_str(json).expect("structurally valid");
    assert!(Strategy::new(parsed.name, parsed.legs, parsed.entry_cost).is_err());
}
