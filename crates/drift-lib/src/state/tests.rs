use super::*;
use crate::error::RecommendError;
use crate::models::{ResourceType, WorkloadKey, NO_UPDATE};

const T0: i64 = 1_700_000_040;

fn trace(len: usize) -> Vec<Sample> {
    (0..len)
        .map(|i| {
            let value = 0.4 + 0.1 * ((i * 13) % 17) as f64 / 16.0;
            (T0 + i as i64 * 60, value)
        })
        .collect()
}

fn ts(index: usize) -> i64 {
    T0 + index as i64 * 60
}

fn hourly() -> RecommenderConfig {
    RecommenderConfig::with_interval(60)
}

#[test]
fn test_short_lived_returns_p98_once() {
    let config = RecommenderConfig {
        resource_request: 2.0,
        ..hourly()
    };
    let usage: Vec<Sample> = (0..30).map(|i| (ts(i), (i + 1) as f64)).collect();
    let mut state = RecommendationState::new();

    let first = state.compute(&config, &usage, &[]).unwrap();
    assert_eq!(first.patch_timestamp, ts(29) + 60);
    // rank 0.98 * 29 = 28.42 between 29 and 30
    assert!((first.target - 29.42).abs() < 1e-9);
    assert!(state.target_history(60).is_empty());

    let second = state.compute(&config, &usage, &[]).unwrap();
    assert_eq!(second.patch_timestamp, NO_UPDATE);
    assert_eq!(second.lower_bound, first.lower_bound);
    assert_eq!(second.target, first.target);
    assert_eq!(second.upper_bound, first.upper_bound);
}

#[test]
fn test_short_lived_then_first_full_interval() {
    let mut state = RecommendationState::new();
    let short = state.compute(&hourly(), &trace(30), &[]).unwrap();
    assert!(short.is_update());

    let full = state.compute(&hourly(), &trace(60), &[]).unwrap();
    assert_eq!(full.patch_timestamp, ts(59) + 60);
    assert_eq!(state.target_history(60).len(), 1);
    assert_eq!(state.target_history(60)[0].interval_start, T0);
}

#[test]
fn test_windows_are_not_counted_twice() {
    let mut state = RecommendationState::new();

    let first = state.compute(&hourly(), &trace(180), &[]).unwrap();
    assert_eq!(first.patch_timestamp, ts(179) + 60);
    assert_eq!(state.target_history(60).len(), 3);

    let again = state.compute(&hourly(), &trace(180), &[]).unwrap();
    assert_eq!(again.patch_timestamp, NO_UPDATE);
    assert_eq!(again.target, first.target);
    assert_eq!(state.target_history(60).len(), 3);

    // a partial new interval is not enough
    let partial = state.compute(&hourly(), &trace(220), &[]).unwrap();
    assert_eq!(partial.patch_timestamp, NO_UPDATE);
    assert_eq!(state.target_history(60).len(), 3);

    let next = state.compute(&hourly(), &trace(240), &[]).unwrap();
    assert_eq!(next.patch_timestamp, ts(239) + 60);
    let starts: Vec<i64> = state
        .target_history(60)
        .iter()
        .map(|e| e.interval_start)
        .collect();
    assert_eq!(starts, vec![ts(0), ts(60), ts(120), ts(180)]);
}

#[test]
fn test_trailing_partial_interval_is_deferred() {
    let mut state = RecommendationState::new();
    let first = state.compute(&hourly(), &trace(150), &[]).unwrap();
    assert_eq!(first.patch_timestamp, ts(119) + 60);
    assert_eq!(state.target_history(60).len(), 2);

    let second = state.compute(&hourly(), &trace(180), &[]).unwrap();
    assert_eq!(second.patch_timestamp, ts(179) + 60);
    assert_eq!(state.target_history(60).len(), 3);
}

#[test]
fn test_interval_switch_keeps_histories_apart() {
    let mut state = RecommendationState::new();
    state.compute(&hourly(), &trace(180), &[]).unwrap();

    let two_hourly = RecommenderConfig::with_interval(120);
    let rec = state.compute(&two_hourly, &trace(240), &[]).unwrap();
    assert_eq!(rec.patch_timestamp, ts(239) + 60);
    assert_eq!(state.target_history(120).len(), 2);
    assert_eq!(state.target_history(60).len(), 3);

    // switching back resumes the hourly history
    let back = state.compute(&hourly(), &trace(240), &[]).unwrap();
    assert!(back.is_update());
    assert_eq!(state.target_history(60).len(), 4);
}

#[test]
fn test_short_history_forecast_is_max_and_bounds_exact() {
    let mut state = RecommendationState::new();
    let rec = state.compute(&hourly(), &trace(180), &[]).unwrap();

    let max = state
        .target_history(60)
        .iter()
        .map(|e| e.target)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(rec.target, max);
    assert!((rec.lower_bound - 0.90 * rec.target).abs() < 1e-9);
    assert!((rec.upper_bound - 1.05 * rec.target).abs() < 1e-9);
}

#[test]
fn test_ue_weight_is_characterized_once() {
    let mut state = RecommendationState::new();
    state.compute(&hourly(), &trace(120), &[]).unwrap();
    let weight = state.ue_weight().unwrap();
    let characterization = state.characterization().unwrap();
    assert_eq!(characterization.ue_weight, weight);
    assert!(!characterization.is_periodic);

    // a low priority would lower a fresh weight, the cached one stays
    let low = RecommenderConfig {
        priority: Some("low".to_string()),
        ..hourly()
    };
    state.compute(&low, &trace(180), &[]).unwrap();
    assert_eq!(state.ue_weight(), Some(weight));

    state.reset_ue_weight();
    assert!(state.ue_weight().is_none());
    state.compute(&low, &trace(240), &[]).unwrap();
    // spread of the longer trace differs only marginally
    assert!((state.ue_weight().unwrap() - (weight - 0.4)).abs() < 1e-3);
}

#[test]
fn test_weight_override_skips_characterization() {
    let config = RecommenderConfig {
        ue_weight: Some(0.5),
        ..hourly()
    };
    let mut state = RecommendationState::new();
    state.compute(&config, &trace(120), &[]).unwrap();
    assert_eq!(state.ue_weight(), Some(0.5));
    assert!(state.characterization().is_none());
}

#[test]
fn test_weight_override_is_bound_once() {
    let first = RecommenderConfig {
        ue_weight: Some(0.5),
        ..hourly()
    };
    let changed = RecommenderConfig {
        ue_weight: Some(0.99),
        ..hourly()
    };

    let mut steady = RecommendationState::new();
    let mut relabeled = RecommendationState::new();
    steady.compute(&first, &trace(60), &[]).unwrap();
    relabeled.compute(&first, &trace(60), &[]).unwrap();

    let a = steady.compute(&first, &trace(120), &[]).unwrap();
    let b = relabeled.compute(&changed, &trace(120), &[]).unwrap();
    assert_eq!(a, b);
    assert_eq!(relabeled.ue_weight(), Some(0.5));

    // after a reset the new value is picked up
    relabeled.reset_ue_weight();
    relabeled.compute(&changed, &trace(180), &[]).unwrap();
    assert_eq!(relabeled.ue_weight(), Some(0.99));
}

#[test]
fn test_characterization_sees_whole_intervals_only() {
    let mut state = RecommendationState::new();
    state.compute(&hourly(), &trace(150), &[]).unwrap();

    let whole: Vec<f64> = trace(120).iter().map(|(_, v)| *v).collect();
    let expected = WorkloadCharacterizer::new(60, 1440, crate::config::Priority::High)
        .characterize(&whole);
    assert_eq!(state.characterization(), Some(expected));
}

#[test]
fn test_heavy_throttle_raises_recommendation() {
    let throttle = |fraction: f64| -> Vec<Sample> { (0..60).map(|i| (ts(i), fraction)).collect() };

    let mut light = RecommendationState::new();
    let mut heavy = RecommendationState::new();
    let a = light.compute(&hourly(), &trace(60), &throttle(0.05)).unwrap();
    let b = heavy.compute(&hourly(), &trace(60), &throttle(0.2)).unwrap();
    assert!(b.target > a.target);
}

#[test]
fn test_errors_leave_state_unchanged() {
    let mut state = RecommendationState::new();
    let rec = state.compute(&hourly(), &trace(120), &[]).unwrap();

    let err = state.compute(&hourly(), &[], &[]).unwrap_err();
    assert!(matches!(err, RecommendError::MalformedInput(_)));

    let invalid = vec![(T0, f64::NAN), (T0 + 60, f64::NAN)];
    let err = state.compute(&hourly(), &invalid, &[]).unwrap_err();
    assert!(matches!(err, RecommendError::MalformedInput(_)));

    let unsupported = RecommenderConfig {
        forecast_model: "arima".to_string(),
        ..hourly()
    };
    let err = state.compute(&unsupported, &trace(240), &[]).unwrap_err();
    assert!(matches!(err, RecommendError::UnsupportedForecastModel(_)));

    assert_eq!(state.last_recommendation(), Some(rec));
    assert_eq!(state.target_history(60).len(), 2);
}

#[test]
fn test_store_parallel_keys() {
    let store = RecommendationStore::new();
    let keys: Vec<WorkloadKey> = (0..4)
        .map(|i| WorkloadKey::new("default", format!("app-{}", i), "main", ResourceType::Cpu))
        .collect();

    std::thread::scope(|scope| {
        for key in &keys {
            let store = &store;
            scope.spawn(move || {
                let rec = store.compute(key, &hourly(), &trace(120), &[]).unwrap();
                assert_eq!(rec.patch_timestamp, ts(119) + 60);
            });
        }
    });

    assert_eq!(store.len(), 4);
    let mut tracked = store.keys();
    tracked.sort_by(|a, b| a.workload.cmp(&b.workload));
    assert_eq!(tracked, keys);

    // identical inputs give identical results per key
    let targets: Vec<f64> = keys
        .iter()
        .map(|k| store.get(k).unwrap().last_recommendation().unwrap().target)
        .collect();
    assert!(targets.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_store_failed_compute_does_not_track_key() {
    let store = RecommendationStore::new();
    let key = WorkloadKey::new("default", "broken", "main", ResourceType::Memory);
    assert!(store.compute(&key, &hourly(), &[], &[]).is_err());
    assert!(store.is_empty());
    assert!(store.get(&key).is_none());
}

#[test]
fn test_store_evict_and_reset() {
    let store = RecommendationStore::new();
    let key = WorkloadKey::new("prod", "api", "server", ResourceType::Cpu);
    store.compute(&key, &hourly(), &trace(60), &[]).unwrap();

    assert!(store.reset_ue_weight(&key));
    assert!(store.get(&key).unwrap().ue_weight().is_none());

    assert!(store.evict(&key));
    assert!(!store.evict(&key));
    assert!(!store.reset_ue_weight(&key));
    assert!(store.is_empty());
}
