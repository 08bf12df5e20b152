use brat_core::analysis::limitation_report;
use brat_core::sensitivity::{default_slots, AdjustmentSlot, InputDistributions, MemorySink};
use brat_core::{AdjustmentKind, Distribution, InputVariable, MonteCarlo, SensitivityConfig};

fn config(seed: u64) -> SensitivityConfig {
    SensitivityConfig { n_simulations: 4, n_reaches: 50, seed, ..Default::default() }
}

#[test]
fn same_seed_same_records() {
    let run = |seed| {
        let mut sink = MemorySink::default();
        MonteCarlo::configure(config(seed)).unwrap().run(&mut sink).unwrap();
        sink.runs
    };
    let (a, b) = (run(17), run(17));
    assert_eq!(a.len(), 4);
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.adjustments, y.adjustments);
        assert_eq!(x.reaches, y.reaches);
        assert_eq!(x.results, y.results);
        assert_eq!(x.stats, y.stats);
    }
}

#[test]
fn record_counts_match_configuration() {
    let mut sink = MemorySink::default();
    let summary = MonteCarlo::configure(config(2)).unwrap().run(&mut sink).unwrap();
    assert_eq!(summary.n_simulations, 4);
    assert!(summary.finished >= summary.started);
    for run in &sink.runs {
        assert_eq!(run.reaches.len(), 50);
        assert_eq!(run.results.len(), 50);
        assert_eq!(run.adjustments.len(), default_slots().len());
        assert!(run.stats.combined.mean <= run.stats.vegetation.mean);
        assert!(run.stats.vegetation.std_dev >= 0.0);
    }
}

#[test]
fn uniform_inputs_stay_within_their_ranges() {
    let cfg = SensitivityConfig { inputs: InputDistributions::uniform(), ..config(4) };
    let mc = MonteCarlo::configure(cfg).unwrap();
    let sampled = mc.sample(0, None).unwrap();
    for r in &sampled.reaches {
        assert!((0.0..4.0).contains(&r.streamside));
        assert!((0.0..190.0).contains(&r.baseflow_power));
        assert!((0.0..2400.0).contains(&r.peak_flow_power));
        assert!((0.0..1.0).contains(&r.slope));
        assert_eq!(r.length_m, 1000.0);
    }
}

#[test]
fn scale_slot_on_hydrology_is_accepted() {
    let cfg = SensitivityConfig {
        slots: vec![AdjustmentSlot::new(
            InputVariable::PeakFlow,
            AdjustmentKind::Scale,
            Distribution::Normal { mean: 1.0, std_dev: 0.75 },
        )],
        ..config(8)
    };
    let mut sink = MemorySink::default();
    MonteCarlo::configure(cfg).unwrap().run(&mut sink).unwrap();
    assert!(sink.runs.iter().all(|r| r.adjustments[0].adjustment.value() > 0.0));
}

#[test]
fn limitation_report_over_a_simulation() {
    let mut sink = MemorySink::default();
    MonteCarlo::configure(config(21)).unwrap().run(&mut sink).unwrap();
    let run = &sink.runs[0];
    let report = limitation_report(&run.reaches, &run.results);
    assert_eq!(report.total, 50);
    let limited = run.results.iter().filter(|r| r.combined != r.vegetation).count();
    assert_eq!(report.limited, limited);
    for breakdown in &report.by_variable {
        let classified: usize = breakdown.classes.iter().map(|c| c.reaches).sum();
        assert_eq!(classified, 50, "{} classes do not partition the reaches", breakdown.variable);
    }
}
