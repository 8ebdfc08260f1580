use std::fs;

use hybrid_motor_sim::ballistics::{
    BurnSimulator, BurnStatus, ConfigurationError, FaultPolicy, FluxBasis, NullObserver,
    TimeStepPolicy,
};
use hybrid_motor_sim::config::{load_engine_catalog, load_engine_file, write_engine_file};
use hybrid_motor_sim::scenario::{
    ScenarioError, SweepParameter, ThermoSource, engine_from_file, load_engine,
    settings_from_file, thermo_from_file,
};

#[test]
fn shipped_catalog_loads_in_file_order() {
    let engines = load_engine_catalog("data/engines").expect("catalog");
    let names: Vec<&str> = engines.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["paraffin_small", "pe_small", "r2s_hdpe"]);

    for engine in &engines {
        engine_from_file(engine).unwrap_or_else(|err| panic!("{}: {err}", engine.name));
    }
}

#[test]
fn pe_small_preset_matches_reference_burn() {
    let loaded = load_engine("data/engines".as_ref(), Some("PE_Small")).expect("pe_small");
    let config = loaded.config().unwrap();
    assert!((config.oxidizer.initial_mass_kg - 0.4).abs() < 1e-12);
    assert!(matches!(
        loaded.settings().time_step,
        TimeStepPolicy::Staged { initial_dt, dt, .. } if initial_dt == 5e-4 && dt == 1e-3
    ));

    let thermo = loaded.thermo().unwrap();
    assert!(matches!(thermo, ThermoSource::Fixed(_)));
    let report = BurnSimulator::new(config, &thermo, loaded.settings())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    assert!((report.final_state.time - 6.6675).abs() < 2e-3);
    assert!((report.summary.total_impulse_n_s - 638.6).abs() < 6.0);
    let peak_bar = report.summary.peak_pressure_pa / 1e5;
    assert!((peak_bar - 32.84).abs() < 0.3, "peak {peak_bar} bar");
    let mr = report.summary.average_mixture_ratio;
    assert!((9.0..10.5).contains(&mr), "O/F {mr}");
    assert!(report.summary.safety_factor.unwrap() > 1.0);
}

#[test]
fn unknown_engine_name_is_reported() {
    let err = load_engine("data/engines".as_ref(), Some("nope")).unwrap_err();
    assert!(matches!(err, ScenarioError::UnknownEngine(name) if name == "nope"));

    let err = load_engine("data/engines".as_ref(), None).unwrap_err();
    assert!(matches!(err, ScenarioError::NameRequired));
}

#[test]
fn engine_file_round_trips_through_disk() {
    let original = load_engine_file("data/engines/r2s_hdpe.toml").unwrap();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("copy.toml");
    write_engine_file(&path, &original).unwrap();

    let back = load_engine_file(&path).unwrap();
    assert_eq!(back, original);
    assert_eq!(back.max_port_radius_m, Some(0.068));
    assert!(back.suppress_mixture_out_of_range);
    assert_eq!(settings_from_file(&back).fault_policy, FaultPolicy::Lenient);
}

#[test]
fn half_specified_wall_is_rejected() {
    let mut file = load_engine_file("data/engines/pe_small.toml").unwrap();
    file.wall_yield_strength_pa = None;
    assert_eq!(
        engine_from_file(&file).unwrap_err(),
        ConfigurationError::IncompleteWall
    );
}

#[test]
fn missing_thermo_keys_are_an_error() {
    let mut file = load_engine_file("data/engines/paraffin_small.toml").unwrap();
    file.thermo_cstar_m_s = None;
    let err = thermo_from_file(&file, ".".as_ref()).unwrap_err();
    assert!(matches!(err, ScenarioError::MissingThermo(name) if name == "paraffin_small"));
}

#[test]
fn relative_thermo_table_resolves_next_to_engine_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = "pressure_bar,mixture_ratio,thrust_coefficient,cstar_m_s,\
                 chamber_temperature_k,molar_mass,gamma,cp_j_kg_k\n\
                 1,2,1.4,1500,3000,25,1.2,1800\n\
                 1,12,1.4,1500,3000,25,1.2,1800\n\
                 80,2,1.5,1520,3050,25,1.2,1800\n\
                 80,12,1.5,1520,3050,25,1.2,1800\n";
    fs::write(dir.path().join("props.csv"), table).unwrap();

    let mut file = load_engine_file("data/engines/paraffin_small.toml").unwrap();
    file.thermo_table = Some("props.csv".into());
    let engine_path = dir.path().join("engine.toml");
    write_engine_file(&engine_path, &file).unwrap();

    let loaded = load_engine(&engine_path, None).unwrap();
    let thermo = loaded.thermo().unwrap();
    assert!(matches!(thermo, ThermoSource::Table(_)));
    assert!(thermo.describe().contains("20"));
}

#[test]
fn sweep_parameters_parse_by_key() {
    let param: SweepParameter = "THROAT_RADIUS_M".parse().unwrap();
    assert_eq!(param, SweepParameter::ThroatRadius);
    assert!("chamber_colour".parse::<SweepParameter>().is_err());

    let mut file = load_engine_file("data/engines/pe_small.toml").unwrap();
    SweepParameter::OxidizerMassFlow.apply(&mut file, 0.08);
    assert_eq!(file.oxidizer_mass_flow_kg_s, 0.08);
    assert_eq!(file.regression_flux_basis, FluxBasis::Oxidizer);
}
