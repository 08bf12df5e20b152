use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use brat_core::capacity::vegetation::{SUITABILITY_GEOMETRY, VEGETATION_RULES};
use brat_core::capacity::{dam_count, CombinedFis, Suitability, VegetationFis, PERVASIVE_CEILING};
use brat_core::fuzzy::{adjust, Domain, Geometry, MembershipFn};
use brat_core::{
    ingest, Adjustment, BratError, CapacityConfig, CapacityModel, Density, Epoch, InputVariable, Reach, Reclass,
    ShapeFit,
};

fn reach(streamside: f64, riparian: f64, baseflow: f64, peak: f64, slope: f64) -> Reach {
    Reach {
        id: 1,
        reach_code: None,
        length_m: 1000.0,
        drainage_area_km2: 5.0,
        streamside,
        riparian,
        baseflow_power: baseflow,
        peak_flow_power: peak,
        slope,
    }
}

#[test]
fn every_center_pair_lands_in_its_rule_density_band() {
    let veg = VegetationFis::new(None, None).unwrap();
    for r in Suitability::ALL {
        for s in Suitability::ALL {
            let rule = VEGETATION_RULES
                .iter()
                .find(|rule| rule.antecedent[0].category == r as usize && rule.antecedent[1].category == s as usize)
                .unwrap_or_else(|| panic!("no rule for {r:?}/{s:?}"));
            let value = veg.evaluate(r.center(), s.center()).0.value;
            let in_band = match Density::ALL[rule.consequent] {
                Density::None => value == 0.0,
                Density::Rare => value > 0.1 && value < 1.5,
                Density::Occasional => value > 1.5 && value < 8.0,
                Density::Frequent => value > 8.0 && value < 25.0,
                Density::Pervasive => value == PERVASIVE_CEILING,
            };
            assert!(in_band, "{r:?}/{s:?} -> {:?} gave {value}", Density::ALL[rule.consequent]);
        }
    }
}

#[test]
fn vegetation_category_centers_map_to_expected_densities() {
    let veg = VegetationFis::new(None, None).unwrap();
    let at = |r: Suitability, s: Suitability| veg.evaluate(r.center(), s.center()).0.value;

    assert_eq!(at(Suitability::Unsuitable, Suitability::Unsuitable), 0.0);
    assert_eq!(at(Suitability::Preferred, Suitability::Preferred), PERVASIVE_CEILING);

    // Rare plateau is [0.1, 0.5], occasional [1.5, 4], frequent [8, 12].
    let rare = at(Suitability::Barely, Suitability::Barely);
    assert!(rare > 0.1 && rare < 1.5, "barely/barely gave {rare}");
    let occasional = at(Suitability::Moderately, Suitability::Moderately);
    assert!(occasional > 1.5 && occasional < 8.0, "moderately/moderately gave {occasional}");
    let frequent = at(Suitability::Suitable, Suitability::Suitable);
    assert!(frequent > 8.0 && frequent < 25.0, "suitable/suitable gave {frequent}");
}

#[test]
fn identity_adjustments_match_the_unadjusted_model() {
    let base = CapacityModel::standard().unwrap();
    let mut cfg = CapacityConfig::default();
    cfg.adjustments.streamside = Some(Adjustment::Scale(1.0));
    cfg.adjustments.riparian = Some(Adjustment::Shift(0.0));
    cfg.adjustments.baseflow = Some(Adjustment::Shift(0.0));
    cfg.adjustments.peak_flow = Some(Adjustment::Scale(1.0));
    cfg.adjustments.slope = Some(Adjustment::Shift(0.0));
    let same = CapacityModel::new(&cfg).unwrap();

    for s in [0.0, 0.7, 1.3, 2.0, 2.9, 3.6, 4.0] {
        for (baseflow, peak, slope) in [(20.0, 300.0, 0.002), (165.0, 1300.0, 0.05), (100.0, 2500.0, 0.18)] {
            let r = reach(s, 4.0 - s, baseflow, peak, slope);
            let (a, b) = (base.evaluate(&r), same.evaluate(&r));
            assert_eq!((a.vegetation, a.combined, a.dam_count), (b.vegetation, b.combined, b.dam_count));
        }
    }
}

#[test]
fn combined_never_exceeds_vegetation() {
    let model = CapacityModel::standard().unwrap();
    for i in 0..=8 {
        for j in 0..=8 {
            let (s, r) = (i as f64 * 0.5, j as f64 * 0.5);
            for (baseflow, peak, slope) in [(0.0, 0.0, 0.0), (50.0, 500.0, 0.01), (175.0, 1500.0, 0.14), (10.0, 9000.0, 0.3)] {
                let out = model.evaluate(&reach(s, r, baseflow, peak, slope));
                assert!(out.combined <= out.vegetation, "({s}, {r}) gave {} > {}", out.combined, out.vegetation);
            }
        }
    }
}

#[test]
fn drainage_gate_zeroes_unless_reach_code_is_excepted() {
    let cfg = CapacityConfig { max_drainage_area: Some(50.0), drainage_exceptions: vec![33400], ..Default::default() };
    let model = CapacityModel::new(&cfg).unwrap();

    let mut big = reach(4.0, 4.0, 50.0, 500.0, 0.01);
    big.drainage_area_km2 = 50.0;
    let out = model.evaluate(&big);
    assert_eq!((out.combined, out.dam_count), (0.0, 0.0));
    assert_eq!(out.diagnostics.combined, Reclass::DrainageGated);

    big.reach_code = Some(33400);
    assert!(model.evaluate(&big).combined > 0.0);
}

#[test]
fn dam_count_rounding() {
    assert_eq!(dam_count(0.3, 1000.0), 1.0);
    assert_eq!(dam_count(0.0, 1000.0), 0.0);
    assert_eq!(dam_count(1.7, 1000.0), 1.7);
}

#[test]
fn scale_two_on_frequent_trapezoid() {
    let domain = Domain::new(0.0, 45.0);
    let mf = adjust::build(Geometry::Trapezoid([4.0, 8.0, 12.0, 25.0]), domain, Some(&Adjustment::Scale(2.0))).unwrap();
    assert_eq!(mf, MembershipFn::Trapezoid { a: 0.0, b: 8.0, c: 12.0, d: 38.0 });
}

#[test]
fn end_to_end_good_habitat() {
    let model = CapacityModel::standard().unwrap();
    let r = Reach { length_m: 350.0, ..reach(4.0, 4.0, 50.0, 500.0, 0.01) };
    let out = model.evaluate(&r);
    assert!(out.combined >= 25.0 && out.combined <= 45.0, "combined {}", out.combined);
    assert_abs_diff_eq!(out.dam_count, (out.combined * 0.35 * 100.0).round() / 100.0, epsilon = 1e-9);
}

#[test]
fn shifted_and_reshaped_inputs_keep_full_coverage() {
    for adj in [
        Adjustment::Shift(0.4),
        Adjustment::Shift(-0.4),
        Adjustment::Shape(ShapeFit::BestFit),
        Adjustment::Shape(ShapeFit::LooseFit),
        Adjustment::Scale(1.5),
    ] {
        let mut cfg = CapacityConfig::default();
        cfg.adjustments.streamside = Some(adj);
        cfg.adjustments.baseflow = Some(adj);
        let model = CapacityModel::new(&cfg).unwrap();
        assert!(model.coverage_gaps().is_empty(), "{adj} opened gaps: {:?}", model.coverage_gaps());
    }
}

#[test]
fn reshaped_vegetation_still_orders_the_diagonal() {
    for fit in [ShapeFit::BestFit, ShapeFit::LooseFit] {
        let adj = Adjustment::Shape(fit);
        let veg = VegetationFis::new(Some(&adj), Some(&adj)).unwrap();
        let low = veg.evaluate(0.5, 0.5).0.value;
        let high = veg.evaluate(3.5, 3.5).0.value;
        assert!(low < high, "{fit:?}: {low} !< {high}");
    }
}

#[test]
fn combined_stage_short_circuits_cannot_build() {
    let combined = CombinedFis::new(None, None, None).unwrap();
    assert_eq!(combined.evaluate(40.0, 300.0, 500.0, 0.02).0.value, 0.0);
    assert_eq!(combined.evaluate(40.0, 300.0, 40.0, 0.6).0.value, 0.0);
}

#[test]
fn suitability_geometry_matches_category_order() {
    let names: Vec<&str> = SUITABILITY_GEOMETRY.iter().map(|(n, _)| *n).collect();
    assert_eq!(names, ["unsuitable", "barely", "moderately", "suitable", "preferred"]);
}

#[test]
fn ingestion_reports_the_missing_field() {
    let mut table = BTreeMap::new();
    let mut attrs: BTreeMap<String, f64> = [
        ("iVeg_30EX", 3.0),
        ("iVeg100EX", 3.0),
        ("iHyd_SPLow", 40.0),
        ("iHyd_SP2", 700.0),
        ("iGeo_Slope", 0.02),
        ("iGeo_DA", 3.0),
        ("iGeo_Len", 800.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    table.insert(10, attrs.clone());
    assert_eq!(ingest(&table, Epoch::Existing).unwrap().len(), 1);

    attrs.remove("iGeo_Len");
    table.insert(11, attrs);
    assert_eq!(
        ingest(&table, Epoch::Existing).unwrap_err(),
        BratError::MissingInput { reach_id: 11, field: "iGeo_Len".into() }
    );
}

#[test]
fn invalid_adjustments_fail_before_evaluation() {
    let raw = r#"{"adjustments": {"slope": {"kind": "shape", "value": 3}}}"#;
    assert!(serde_json::from_str::<CapacityConfig>(raw).is_err());

    let mut cfg = CapacityConfig::default();
    cfg.adjustments.riparian = Some(Adjustment::Scale(-0.5));
    assert!(matches!(CapacityModel::new(&cfg), Err(BratError::InvalidAdjustment(_))));
    assert_eq!(InputVariable::Riparian.domain(), Domain::new(0.0, 4.0));
}
