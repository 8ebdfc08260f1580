use clap::Parser;
use hybrid_motor_sim::core::units::{bar_to_pa, m_to_mm};
use hybrid_motor_sim::sizing::{NozzlePoint, SizingInputs, size_injector, size_motor};
use tracing_subscriber::EnvFilter;

/// Preliminary motor and injector sizing from a thrust target.
#[derive(Parser, Debug)]
#[command(author, version, about = "Hybrid motor preliminary sizing")]
struct Cli {
    /// Oxidizer-to-fuel mass ratio
    #[arg(long, default_value_t = 7.0)]
    mixture_ratio: f64,
    /// Run tank pressure in bar
    #[arg(long, default_value_t = 50.0)]
    tank_pressure_bar: f64,
    /// Injector pressure drop as a fraction of tank pressure
    #[arg(long, default_value_t = 0.2)]
    injector_drop: f64,
    #[arg(long, default_value_t = 1.0)]
    feed_efficiency: f64,
    /// Final over initial port diameter
    #[arg(long, default_value_t = 3.0)]
    port_ratio: f64,
    #[arg(long, default_value_t = 400.0)]
    thrust_n: f64,
    #[arg(long, default_value_t = 9.0)]
    oxidizer_volume_l: f64,
    #[arg(long, default_value_t = 800.0)]
    oxidizer_density: f64,
    #[arg(long, default_value_t = 0.9)]
    combustion_efficiency: f64,
    #[arg(long, default_value_t = 1.0)]
    nozzle_efficiency: f64,
    #[arg(long, default_value_t = 1.0)]
    discharge_coefficient: f64,
    #[arg(long, default_value_t = 924.0)]
    fuel_density: f64,
    #[arg(long, default_value_t = 0.000155)]
    regression_a: f64,
    #[arg(long, default_value_t = 0.5)]
    regression_n: f64,
    /// Throat pressure from the equilibrium solver, in bar
    #[arg(long, default_value_t = 22.914)]
    throat_pressure_bar: f64,
    /// Thrust coefficient from the equilibrium solver
    #[arg(long, default_value_t = 0.6630)]
    thrust_coefficient: f64,
    /// Characteristic velocity from the equilibrium solver (m/s)
    #[arg(long, default_value_t = 1608.2)]
    cstar: f64,
    /// Shower-head injector hole diameter in mm
    #[arg(long, default_value_t = 1.0)]
    hole_diameter_mm: f64,
    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let inputs = SizingInputs {
        mixture_ratio: cli.mixture_ratio,
        run_tank_pressure_bar: cli.tank_pressure_bar,
        injector_pressure_drop: cli.injector_drop,
        feed_efficiency: cli.feed_efficiency,
        port_ratio: cli.port_ratio,
        desired_thrust_n: cli.thrust_n,
        oxidizer_volume_l: cli.oxidizer_volume_l,
        oxidizer_density_kg_m3: cli.oxidizer_density,
        combustion_efficiency: cli.combustion_efficiency,
        nozzle_efficiency: cli.nozzle_efficiency,
        discharge_coefficient: cli.discharge_coefficient,
        fuel_density_kg_m3: cli.fuel_density,
        regression_a: cli.regression_a,
        regression_n: cli.regression_n,
    };
    let nozzle = NozzlePoint {
        throat_pressure_pa: bar_to_pa(cli.throat_pressure_bar),
        thrust_coefficient: cli.thrust_coefficient,
        characteristic_velocity_m_s: cli.cstar,
    };

    let motor = size_motor(&inputs, &nozzle)?;
    let injector = size_injector(
        motor.oxidizer_mass_flow_kg_s,
        cli.discharge_coefficient,
        cli.oxidizer_density,
        cli.injector_drop * bar_to_pa(cli.tank_pressure_bar),
        cli.hole_diameter_mm * 1.0e-3,
    )?;

    if cli.json {
        let doc = serde_json::json!({ "motor": motor, "injector": injector });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Oxidizer mass: {:.4} kg", motor.oxidizer_mass_kg);
    println!("Fuel mass: {:.4} kg", motor.fuel_mass_kg);
    println!("Chamber pressure: {:.3} bar", motor.chamber_pressure_bar);
    println!("Throat diameter: {:.3} mm", m_to_mm(motor.throat_diameter_m));
    println!("Total mass flow: {:.4} kg/s", motor.propellant_mass_flow_kg_s);
    println!("Oxidizer mass flow: {:.4} kg/s", motor.oxidizer_mass_flow_kg_s);
    println!("Burn time: {:.3} s", motor.burn_time_s);
    println!("Fuel outside diameter: {:.3} mm", m_to_mm(motor.fuel_outer_diameter_m));
    println!("Fuel inside diameter: {:.3} mm", m_to_mm(motor.fuel_inner_diameter_m));
    println!("Fuel grain length: {:.3} mm", m_to_mm(motor.fuel_length_m));
    println!("Injector area: {:.4} mm^2", injector.total_area_m2 * 1.0e6);
    println!(
        "Injector holes: {:.2} (drill {})",
        injector.hole_count,
        injector.holes_to_drill()
    );
    Ok(())
}
