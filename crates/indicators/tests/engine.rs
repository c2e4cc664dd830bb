//! End-to-end engine tests: manager, cache, registry, and analyzer working
//! together on realistic frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kline_indicators::{
    IndicatorError, IndicatorManager, IndicatorRegistry, IndicatorSpec, Params, StatefulAnalyzer,
};
use kline_types::{OhlcvRow, SeriesFrame};

fn daily_frame(closes: &[f64]) -> SeriesFrame {
    let rows: Vec<OhlcvRow> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            OhlcvRow::new(i as i64 * 86_400_000_000_000, c - 0.5, c + 1.0, c - 1.0, c, 1000.0)
        })
        .collect();
    SeriesFrame::from_ohlcv(&rows).unwrap()
}

/// Registers an indicator that counts its own invocations.
fn counting_spec(name: &str, counter: Arc<AtomicUsize>) -> IndicatorSpec {
    IndicatorSpec {
        name: name.to_string(),
        calc: Arc::new(move |frame: &SeriesFrame, _: &Params| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![("counted".to_string(), vec![1.0; frame.len()])])
        }),
        dependencies: Vec::new(),
        default_params: Params::new(),
        description: String::new(),
        category: "test".to_string(),
    }
}

#[test]
fn repeat_calculation_is_served_from_cache() {
    let manager = IndicatorManager::new();
    let counter = Arc::new(AtomicUsize::new(0));
    manager.register_custom(counting_spec("counted", counter.clone()));

    let frame = daily_frame(&[10.0, 11.0, 12.0, 13.0]);
    let first = manager.calculate(&frame, "counted", &Params::new()).unwrap();
    let second = manager.calculate(&frame, "counted", &Params::new()).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(first.column("counted").unwrap(), second.column("counted").unwrap());
    let stats = manager.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn changed_data_invalidates_cached_result() {
    let manager = IndicatorManager::new();
    let counter = Arc::new(AtomicUsize::new(0));
    manager.register_custom(counting_spec("counted", counter.clone()));

    let frame_a = daily_frame(&[10.0, 11.0, 12.0]);
    let frame_b = daily_frame(&[20.0, 21.0, 22.0]);
    manager.calculate(&frame_a, "counted", &Params::new()).unwrap();
    manager.calculate(&frame_b, "counted", &Params::new()).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn dependencies_run_before_dependents() {
    let manager = IndicatorManager::new();
    manager.register_custom(IndicatorSpec {
        name: "base".to_string(),
        calc: Arc::new(|frame: &SeriesFrame, _: &Params| {
            Ok(vec![("base".to_string(), vec![2.0; frame.len()])])
        }),
        dependencies: Vec::new(),
        default_params: Params::new(),
        description: String::new(),
        category: "test".to_string(),
    });
    manager.register_custom(IndicatorSpec {
        name: "derived".to_string(),
        calc: Arc::new(|frame: &SeriesFrame, _: &Params| {
            let base = frame
                .column("base")
                .ok_or_else(|| IndicatorError::missing(vec!["base"]))?;
            Ok(vec![("derived".to_string(), base.iter().map(|v| v * 3.0).collect())])
        }),
        dependencies: vec!["base".to_string()],
        default_params: Params::new(),
        description: String::new(),
        category: "test".to_string(),
    });

    let frame = daily_frame(&[10.0, 11.0]);
    // requesting only the dependent must transitively pull in its dependency
    let out = manager.calculate(&frame, "derived", &Params::new()).unwrap();
    assert_eq!(out.column("base").unwrap(), &[2.0, 2.0]);
    assert_eq!(out.column("derived").unwrap(), &[6.0, 6.0]);

    let order = manager
        .calculation_order(&["derived".to_string()])
        .unwrap();
    assert_eq!(order, vec!["base", "derived"]);
}

#[test]
fn dependency_cycle_is_a_hard_error() {
    let mut registry = IndicatorRegistry::new();
    let noop: kline_indicators::registry::CalcFn =
        Arc::new(|_: &SeriesFrame, _: &Params| Ok(Vec::new()));
    for (name, dep) in [("a", "b"), ("b", "c"), ("c", "a")] {
        registry.register(IndicatorSpec {
            name: name.to_string(),
            calc: noop.clone(),
            dependencies: vec![dep.to_string()],
            default_params: Params::new(),
            description: String::new(),
            category: "test".to_string(),
        });
    }
    let err = registry.resolve_order(&["a".to_string()]).unwrap_err();
    match err {
        IndicatorError::CyclicDependency { remaining } => {
            assert_eq!(remaining, vec!["a", "b", "c"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ma_boundary_fills_short_frames() {
    let manager = IndicatorManager::new();
    let frame = daily_frame(&[10.0, 20.0, 30.0]);
    let out = manager
        .calculate(&frame, "ma", &Params::new().with("windows", vec![5]))
        .unwrap();
    let ma5 = out.column("ma5").unwrap();
    assert!((ma5[0] - 10.0).abs() < 1e-9);
    assert!((ma5[2] - 20.0).abs() < 1e-9);
}

#[test]
fn macd_on_thirty_rising_closes() {
    let manager = IndicatorManager::new();
    let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
    let frame = daily_frame(&closes);
    let out = manager
        .calculate(
            &frame,
            "macd",
            &Params::new().with("fast", 12).with("slow", 26).with("signal", 9),
        )
        .unwrap();

    let macd = out.column("macd").unwrap();
    let signal = out.column("macd_signal").unwrap();
    let hist = out.column("macd_hist").unwrap();
    assert_eq!(macd.len(), 30);
    for i in 0..30 {
        assert!(macd[i].is_finite());
        assert!(signal[i].is_finite());
        assert!(hist[i].is_finite());
    }
    assert_eq!(hist[29], macd[29] - signal[29]);
}

#[test]
fn analyzer_second_compute_skips_manager_entirely() {
    let manager = Arc::new(IndicatorManager::new());
    let counter = Arc::new(AtomicUsize::new(0));
    manager.register_custom(counting_spec("counted", counter.clone()));

    let mut analyzer =
        StatefulAnalyzer::new(daily_frame(&[10.0, 11.0, 12.0]), manager.clone()).unwrap();
    analyzer.compute("counted", &Params::new()).unwrap();
    let traffic = manager.cache_stats().total_requests;
    analyzer.compute("counted", &Params::new()).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    // no cache lookup happened for the repeat
    assert_eq!(manager.cache_stats().total_requests, traffic);
}

#[test]
fn analyzer_reset_then_recompute() {
    let manager = Arc::new(IndicatorManager::new());
    let mut analyzer = StatefulAnalyzer::new(
        daily_frame(&(0..20).map(|i| 100.0 + i as f64).collect::<Vec<_>>()),
        manager,
    )
    .unwrap();

    let params = Params::new().with("windows", vec![5]);
    analyzer.compute("ma", &params).unwrap();
    let before = analyzer.frame().column("ma5").unwrap().to_vec();

    analyzer.reset(Some("ma"), Some(5));
    assert!(!analyzer.frame().has_column("ma5"));
    assert!(!analyzer.is_computed("ma", Some(5)));

    analyzer.compute("ma", &params).unwrap();
    assert_eq!(analyzer.frame().column("ma5").unwrap(), before.as_slice());
}

#[test]
fn kdj_on_flat_market_stays_at_zero() {
    let manager = IndicatorManager::new();
    let rows: Vec<OhlcvRow> = (0..10)
        .map(|i| OhlcvRow::new(i as i64 + 1, 50.0, 50.0, 50.0, 50.0, 100.0))
        .collect();
    let frame = SeriesFrame::from_ohlcv(&rows).unwrap();
    let out = manager.calculate(&frame, "kdj", &Params::new()).unwrap();
    for &v in out.column("k14").unwrap() {
        assert_eq!(v, 0.0);
    }
    for &v in out.column("j14").unwrap() {
        assert_eq!(v, 0.0);
    }
}

#[test]
fn rsi_pinned_at_hundred_in_pure_uptrend() {
    let manager = IndicatorManager::new();
    let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
    let frame = daily_frame(&closes);
    let out = manager.calculate(&frame, "rsi", &Params::new()).unwrap();
    let rsi = out.column("rsi14").unwrap();
    for &v in rsi {
        assert_eq!(v, 100.0);
    }
}
