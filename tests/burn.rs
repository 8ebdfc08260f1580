use std::sync::Arc;

use hybrid_motor_sim::ballistics::{
    BurnSimulator, BurnStatus, ChamberState, EngineConfig, FaultPolicy, MeasuredFeed,
    NullObserver, NumericalFault, SimulationSettings, TimeStepPolicy, step,
};
use hybrid_motor_sim::thermo::{FixedThermo, TableRow, ThermoTable};

fn reference_engine() -> EngineConfig {
    EngineConfig::builder("reference")
        .grain_length(0.2)
        .initial_port_radius(0.01)
        .grain_density(924.0)
        .regression(1.55e-4, 0.5, 0.0)
        .throat_area(1.5e-4)
        .area_ratio(20.0)
        .discharge_coefficient(1.0)
        .combustion_efficiency(1.0)
        .chamber_volumes(5e-5, 2.5e-5)
        .oxidizer_mass(2.4)
        .constant_oxidizer_flow(0.3)
        .build()
        .expect("reference engine")
}

fn reference_gas() -> FixedThermo {
    FixedThermo::new(1.2, 1800.0, 3000.0, 1500.0)
}

fn fixed_step() -> SimulationSettings {
    SimulationSettings::default().with_time_step(TimeStepPolicy::Fixed(1e-3))
}

/// Constant properties over a grid whose mixture-ratio domain ends at 3.
fn narrow_table() -> ThermoTable {
    let mut rows = Vec::new();
    for pressure_bar in [1.0, 100.0] {
        for mixture_ratio in [1.0, 3.0] {
            rows.push(TableRow {
                pressure_bar,
                mixture_ratio,
                thrust_coefficient: 1.5,
                cstar_m_s: 1500.0,
                chamber_temperature_k: 3000.0,
                molar_mass: 25.0,
                gamma: 1.2,
                cp_j_kg_k: 1800.0,
            });
        }
    }
    ThermoTable::from_rows(20.0, rows).expect("table")
}

#[test]
fn reference_burn_completes_with_growing_port() {
    let thermo = reference_gas();
    let mut sim = BurnSimulator::new(reference_engine(), &thermo, fixed_step());
    let report = sim.run(&mut NullObserver).expect("valid engine");

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    assert!(report.fault.is_none());
    assert!((7999..=8001).contains(&report.iterations), "{}", report.iterations);
    assert!((report.final_state.time - 8.0).abs() < 2e-3);

    let radii = report.log.port_radii();
    assert!(radii.windows(2).all(|w| w[1] >= w[0]), "port radius must not shrink");
    let oxidizer: Vec<f64> = report.log.iter().map(|r| r.oxidizer_mass_remaining).collect();
    assert!(oxidizer.windows(2).all(|w| w[1] <= w[0]));
    assert!((report.final_state.port_radius - 0.0284).abs() < 5e-4);

    assert!(report.log.thrusts().iter().all(|&f| f > 0.0));
    let peak_bar = report.summary.peak_pressure_pa / 1e5;
    assert!((33.5..35.0).contains(&peak_bar), "peak {peak_bar} bar");
    assert!((report.summary.total_impulse_n_s - 4213.0).abs() < 40.0);
    assert!(report.summary.is_finite());
}

#[test]
fn runs_are_repeatable() {
    let thermo = reference_gas();
    let first = BurnSimulator::new(reference_engine(), &thermo, fixed_step())
        .run(&mut NullObserver)
        .unwrap();
    let second = BurnSimulator::new(reference_engine(), &thermo, fixed_step())
        .run(&mut NullObserver)
        .unwrap();
    assert_eq!(first.log, second.log);
    assert_eq!(first.final_state, second.final_state);
}

#[test]
fn step_does_not_depend_on_call_history() {
    let config = reference_engine();
    let thermo = reference_gas();
    let start = ChamberState::initial(&config);
    let a = step(&start, &config, &thermo, FaultPolicy::Strict, 1e-3);
    let _ = step(&a.state, &config, &thermo, FaultPolicy::Strict, 1e-3);
    let b = step(&start, &config, &thermo, FaultPolicy::Strict, 1e-3);
    assert_eq!(a, b);
}

#[test]
fn empty_tank_takes_no_steps() {
    let config = EngineConfig::builder("empty")
        .oxidizer_mass(0.0)
        .build()
        .unwrap();
    let thermo = reference_gas();
    let report = BurnSimulator::new(config, &thermo, fixed_step())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    assert_eq!(report.iterations, 0);
    assert!(report.log.is_empty());
    assert_eq!(report.summary.total_impulse_n_s, 0.0);
}

#[test]
fn strict_fault_halts_on_first_step() {
    let thermo = FixedThermo::new(1.0, 1800.0, 3000.0, 1500.0);
    let mut sim = BurnSimulator::new(reference_engine(), &thermo, fixed_step());
    let report = sim.run(&mut NullObserver).unwrap();

    assert_eq!(report.status, BurnStatus::CompletedFault);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.final_state, ChamberState::initial(sim.config()));
    let event = report.fault.expect("fault event");
    assert_eq!(event.time, 0.0);
    assert_eq!(event.fault, NumericalFault::GammaOutOfRange(1.0));
    assert_eq!(report.summary.faulted_steps, 1);
}

#[test]
fn lenient_mode_clamps_mixture_ratio_into_table() {
    let table = narrow_table();
    let settings = fixed_step().with_fault_policy(FaultPolicy::Lenient);
    let report = BurnSimulator::new(reference_engine(), &table, settings)
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    assert!(report.log.iter().all(|r| r.mixture_ratio == 3.0));
    assert!(
        report
            .log
            .iter()
            .all(|r| matches!(r.fault, Some(NumericalFault::MixtureOutOfRange { .. })))
    );
    assert!(report.log.thrusts().iter().all(|&f| f > 0.0));

    let summary = &report.summary;
    assert!((summary.average_mixture_ratio - 3.0).abs() < 1e-12);
    assert_eq!(summary.clamped_steps, report.log.len());
    assert_eq!(summary.faulted_steps, 0);
    assert!(report.log.first_fault().is_none());
}

#[test]
fn strict_mode_rejects_out_of_table_mixture() {
    let table = narrow_table();
    let report = BurnSimulator::new(reference_engine(), &table, fixed_step())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedFault);
    let event = report.fault.unwrap();
    assert!(event.fault.is_mixture_range());
}

#[test]
fn measured_feed_ends_the_burn_at_its_last_sample() {
    let feed = MeasuredFeed::new(vec![0.0, 0.5, 1.0], vec![0.3, 0.25, -0.01], 0.001).unwrap();
    let config = EngineConfig::builder("replay")
        .grain_length(0.2)
        .initial_port_radius(0.01)
        .regression(1.55e-4, 0.5, 0.0)
        .throat_area(1.5e-4)
        .oxidizer_mass(2.4)
        .oxidizer_feed(Arc::new(feed))
        .build()
        .unwrap();
    let thermo = reference_gas();
    let report = BurnSimulator::new(config, &thermo, fixed_step())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    assert!(report.final_state.time >= 1.0);
    assert!(report.final_state.time < 1.0 + 2e-3);
    assert!(report.final_state.oxidizer_mass_remaining > 2.0);
    let last = report.log.last().unwrap();
    assert!((last.oxidizer_mass_flow_rate - 0.001).abs() < 0.01);
}

#[test]
fn staged_step_uses_fine_step_before_transition() {
    let settings = SimulationSettings::default().with_time_step(TimeStepPolicy::Staged {
        initial_dt: 5e-4,
        transition_time: 0.1,
        dt: 1e-3,
    });
    let thermo = reference_gas();
    let report = BurnSimulator::new(reference_engine(), &thermo, settings.with_max_iterations(300))
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedMaxIterations);
    let steps: Vec<f64> = report.log.iter().map(|r| r.dt).collect();
    assert_eq!(steps[0], 5e-4);
    assert_eq!(steps[199], 5e-4);
    assert_eq!(steps[299], 1e-3);
}

#[test]
fn wall_adds_hoop_stress_to_summary() {
    let config = EngineConfig::builder("walled")
        .wall(0.005, 2.0e8)
        .build()
        .unwrap();
    let thermo = FixedThermo::new(1.1573, 2301.0, 3139.88, 1608.2);
    let report = BurnSimulator::new(config, &thermo, fixed_step())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(report.status, BurnStatus::CompletedNormal);
    let hoop = report.summary.hoop_stress_pa.expect("hoop stress");
    let factor = report.summary.safety_factor.expect("safety factor");
    assert!(hoop > 0.0);
    assert!((factor - 2.0e8 / hoop).abs() < 1e-9 * factor);
}
