//! # Módulo de Reportes
//!
//! Formatea y persiste el resultado de una corrida. El núcleo de la
//! simulación no depende de este módulo: solo lo usa el binario.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::aggregator::{AggregateStatistics, CarRecord, StageStats};
use crate::car::FuelKind;
use crate::simulation::SimulationReport;
use crate::station::StationSummary;

/// Formatea una duración en milisegundos con tres decimales ("12.345ms").
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    format!("{}.{:03}ms", micros / 1000, micros % 1000)
}

fn push_stage(out: &mut String, title: &str, stats: &StageStats) {
    let _ = writeln!(out, "{}:", title);
    let _ = writeln!(out, "  total_cars: {}", stats.total_cars);
    let _ = writeln!(out, "  total_time: {} u", stats.total_service_time);
    let _ = writeln!(out, "  avg_queue_time: {}", format_duration(stats.avg_queue_time));
    let _ = writeln!(out, "  max_queue_time: {}", format_duration(stats.max_queue_time));
}

/// Bloque de estadísticas finales por combustible y de cajas.
pub fn render_statistics(statistics: &AggregateStatistics) -> String {
    let mut out = String::from("Final statistics\n");
    for kind in FuelKind::ALL {
        push_stage(&mut out, kind.label(), statistics.fuel(kind));
    }
    push_stage(&mut out, "Registers", &statistics.registers);
    out
}

/// Tabla de surtidores y cajas con autos atendidos.
pub fn render_stations(stations: &[StationSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<20} {:>8} {:>8}", "ID", "Estación", "Autos", "Pico");
    let _ = writeln!(out, "{}", "-".repeat(45));
    for station in stations {
        let _ = writeln!(
            out,
            "{:<6} {:<20} {:>8} {:>8}",
            station.id,
            station.kind.to_string(),
            station.served,
            station.peak_occupancy
        );
    }
    out
}

/// Reporte completo en texto: estaciones y estadísticas.
pub fn render_report(report: &SimulationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== REPORTE DE RESULTADOS ===\n");
    out.push_str(&render_stations(&report.stations));
    out.push('\n');
    out.push_str(&render_statistics(&report.statistics));
    let _ = writeln!(out, "\nDuración total de simulación: {}", format_duration(report.elapsed));
    out
}

/// Un auto por línea, en orden de finalización.
pub fn render_cars_csv(cars: &[CarRecord]) -> String {
    let mut csv = String::from(
        "CarID,Fuel,Stand,Register,StandWait_ms,FuelTime,RegisterWait_ms,PayTime,Total_ms,FuelStart_ms,PaidAt_ms\n",
    );
    for car in cars {
        let _ = writeln!(
            csv,
            "{},{},{},{},{:.3},{},{:.3},{},{:.3},{:.3},{:.3}",
            car.id,
            car.fuel,
            car.stand_id,
            car.register_id,
            millis(car.stand_wait),
            car.fuel_service,
            millis(car.register_wait),
            car.payment_service,
            millis(car.total),
            millis(car.fueling_started),
            millis(car.payment_completed),
        );
    }
    csv
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Guarda el reporte completo como JSON.
pub fn write_json(path: &Path, report: &SimulationReport) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
