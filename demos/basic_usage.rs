//! Ejemplo básico de uso del simulador de estación de servicio

use petrol_station_simulator::report::{format_duration, render_report};
use petrol_station_simulator::{FuelKind, ServiceRange, Simulation, SimulationConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("=== Ejemplo: Uso Básico del Simulador ===\n");

    // 1. Configuración de referencia
    println!("1. Ejecutando con la configuración de referencia (40 autos)...");
    let mut base = SimulationConfig::default();
    base.car_count = 40;
    base.seed = Some(7);

    let base_report = match Simulation::new(base.clone()).and_then(|s| s.run()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    println!("{}", render_report(&base_report));

    // 2. Misma demanda con una sola caja
    println!("\n2. Ejecutando con una sola caja...");
    let mut single_register = base.clone();
    single_register.registers.count = 1;
    single_register.registers.payment = ServiceRange::new(3, 8);

    let single_report = match Simulation::new(single_register).and_then(|s| s.run()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    // Comparación de resultados
    println!("\n=== Comparación ===");
    println!("| Etapa      | 2 cajas      | 1 caja       |");
    println!("|------------|--------------|--------------|");
    for kind in FuelKind::ALL {
        println!(
            "| {:<10} | {:>12} | {:>12} |",
            kind.label(),
            format_duration(base_report.statistics.fuel(kind).avg_queue_time),
            format_duration(single_report.statistics.fuel(kind).avg_queue_time),
        );
    }
    println!(
        "| {:<10} | {:>12} | {:>12} |",
        "Registers",
        format_duration(base_report.statistics.registers.avg_queue_time),
        format_duration(single_report.statistics.registers.avg_queue_time),
    );
    println!(
        "\nDuración total: {} vs {}",
        format_duration(base_report.elapsed),
        format_duration(single_report.elapsed)
    );
}
