#![cfg(feature = "serde")]

//! Loading engine configurations and persisting states through serde.

use ranlux::{GeneratorConfig, LaneSeeding, Luxury, PackedBigInt, Ranlux, RanluxPP, UnpackedState};

#[test]
fn test_config_from_json() {
    let json = r#"{ "seed": 3124, "luxury": { "level": 4 }, "width": 8, "lanes": "replicated" }"#;
    let cfg: GeneratorConfig = serde_json::from_str(json).unwrap();

    assert_eq!(
        cfg,
        GeneratorConfig { seed: 3124, luxury: Luxury::Level(4), width: 8, lanes: LaneSeeding::Replicated }
    );

    let mut wide = cfg.build().unwrap();
    let mut scalar = Ranlux::new(3124, Luxury::Level(4)).unwrap();

    for _ in 0..50 {
        let v = scalar.draw();

        for _ in 0..8 {
            assert_eq!(wide.draw(), v);
        }
    }
}

#[test]
fn test_missing_fields_take_defaults() {
    let cfg: GeneratorConfig = serde_json::from_str(r#"{ "luxury": { "distance": 2048 } }"#).unwrap();

    assert_eq!(cfg.seed, 314_159_265);
    assert_eq!(cfg.width, 1);
    assert_eq!(cfg.luxury.skip_distance(), Ok(2048));
}

#[test]
fn test_invalid_config_fails_at_build() {
    let cfg: GeneratorConfig = serde_json::from_str(r#"{ "luxury": { "level": 9 } }"#).unwrap();

    assert!(cfg.build().is_err());
}

#[test]
fn test_states_survive_serialization() {
    let mut rng = Ranlux::new(5, Luxury::Level(2)).unwrap();
    let _ = rng.draw();

    let json = serde_json::to_string(&rng.state()).unwrap();
    let state: UnpackedState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, rng.state());

    let lcg = RanluxPP::from_state(&state, 97).unwrap();
    let packed: PackedBigInt = serde_json::from_str(&serde_json::to_string(lcg.state()).unwrap()).unwrap();
    assert_eq!(&packed, lcg.state());
}
