//! Tests de integración para el simulador de estación de servicio

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use petrol_station_simulator::report::{render_cars_csv, render_statistics};
use petrol_station_simulator::{
    CarRecord, FuelKind, ServiceRange, Simulation, SimulationConfig, SimulationReport, StationKind,
};

fn config_with(car_count: usize, seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.car_count = car_count;
    config.seed = Some(seed);
    config
}

fn run(config: SimulationConfig) -> SimulationReport {
    Simulation::new(config).unwrap().run().unwrap()
}

/// Solo surtidores de gas, con tiempos fijos.
fn single_lane(car_count: usize) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.car_count = car_count;
    config.arrival = ServiceRange::new(0, 0);
    for kind in FuelKind::ALL {
        config.fuel_mut(kind).count = 0;
    }
    config.stands.gas.count = 1;
    config.stands.gas.service = ServiceRange::new(1, 1);
    config.registers.count = 1;
    config.registers.payment = ServiceRange::new(1, 1);
    config
}

fn assert_each_car_exactly_once(cars: &[CarRecord], expected: usize) {
    let mut ids: Vec<usize> = cars.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..expected).collect::<Vec<_>>());
}

#[test]
fn test_every_car_completes_exactly_once() {
    for (n, seed) in [(1, 3), (7, 11), (25, 29)] {
        let report = run(config_with(n, seed));

        assert_eq!(report.statistics.total_cars(), n);
        assert_eq!(report.statistics.registers.total_cars, n);
        assert_each_car_exactly_once(&report.cars, n);

        let per_fuel: usize = report.statistics.fuels.values().map(|s| s.total_cars).sum();
        assert_eq!(per_fuel, n);
    }
}

#[test]
fn test_zero_cars_drains_cleanly() {
    let report = run(config_with(0, 1));

    assert_eq!(report.statistics.total_cars(), 0);
    assert!(report.cars.is_empty());
    for kind in FuelKind::ALL {
        let stats = report.statistics.fuel(kind);
        assert_eq!(stats.total_cars, 0);
        assert_eq!(stats.avg_queue_time, Duration::ZERO);
    }
    assert!(report.stations.iter().all(|s| s.served == 0));
}

#[test]
fn test_single_lane_totals_are_exact() {
    let report = run(single_lane(5));
    let gas = report.statistics.fuel(FuelKind::Gas);

    assert_eq!(gas.total_cars, 5);
    assert_eq!(gas.total_service_time, 5);
    assert_eq!(report.statistics.registers.total_cars, 5);
    assert_eq!(report.statistics.registers.total_service_time, 5);
    for kind in [FuelKind::Diesel, FuelKind::Lpg, FuelKind::Electric] {
        assert_eq!(report.statistics.fuel(kind).total_cars, 0);
    }
    assert!(report.cars.iter().all(|c| c.fuel == FuelKind::Gas && c.stand_id == 0));
}

#[test]
fn test_service_draws_stay_in_configured_ranges() {
    let config = config_with(40, 77);
    let report = run(config.clone());

    for car in &report.cars {
        assert!(
            config.fuel(car.fuel).service.contains(car.fuel_service),
            "auto {} cargó {} u fuera de rango",
            car.id,
            car.fuel_service
        );
        assert!(config.registers.payment.contains(car.payment_service));
        assert!(car.total >= car.stand_wait + car.register_wait);
        assert!(car.payment_completed >= car.fueling_started);
    }
}

#[test]
fn test_stations_never_hold_two_cars() {
    let report = run(config_with(30, 5));

    assert!(report.stations.iter().all(|s| s.peak_occupancy <= 1));
    let stand_served: usize = report
        .stations
        .iter()
        .filter(|s| s.kind != StationKind::Register)
        .map(|s| s.served)
        .sum();
    let register_served: usize = report
        .stations
        .iter()
        .filter(|s| s.kind == StationKind::Register)
        .map(|s| s.served)
        .sum();
    assert_eq!(stand_served, 30);
    assert_eq!(register_served, 30);
}

#[test]
fn test_stand_waits_for_payment_before_next_car() {
    let report = run(config_with(30, 13));

    let mut by_stand: BTreeMap<usize, Vec<&CarRecord>> = BTreeMap::new();
    for car in &report.cars {
        by_stand.entry(car.stand_id).or_default().push(car);
    }

    for (stand, mut cars) in by_stand {
        cars.sort_by_key(|c| c.fueling_started);
        for pair in cars.windows(2) {
            assert!(
                pair[1].fueling_started >= pair[0].payment_completed,
                "surtidor {}: auto {} empezó antes de que pagara el auto {}",
                stand,
                pair[1].id,
                pair[0].id
            );
        }
    }
}

#[test]
fn test_stand_kind_matches_car_fuel() {
    let report = run(config_with(20, 21));
    let kinds: BTreeMap<usize, StationKind> = report
        .stations
        .iter()
        .filter(|s| s.kind != StationKind::Register)
        .map(|s| (s.id, s.kind))
        .collect();

    for car in &report.cars {
        assert_eq!(kinds[&car.stand_id], StationKind::Fuel(car.fuel));
    }
}

#[test]
fn test_average_is_total_over_count() {
    let report = run(config_with(15, 8));

    for stats in report.statistics.fuels.values().chain([&report.statistics.registers]) {
        if stats.total_cars == 0 {
            assert_eq!(stats.avg_queue_time, Duration::ZERO);
            continue;
        }
        let expected = stats.total_queue_time.as_nanos() / stats.total_cars as u128;
        assert_eq!(stats.avg_queue_time.as_nanos(), expected);
        assert!(stats.max_queue_time <= stats.total_queue_time);
    }
}

#[test]
fn test_unserved_fuel_never_arrives() {
    let mut config = config_with(12, 4);
    config.stands.lpg.count = 0;
    config.stands.electric.count = 0;
    let report = run(config);

    assert_eq!(report.statistics.fuel(FuelKind::Lpg).total_cars, 0);
    assert_eq!(report.statistics.fuel(FuelKind::Electric).total_cars, 0);
    assert_eq!(report.statistics.total_cars(), 12);
}

#[test]
fn test_config_from_toml_runs() {
    let toml = r#"
        car_count = 6
        arrival = { min = 0, max = 1 }
        seed = 99

        [stands]
        buffer = 1
        gas = { count = 1, min = 1, max = 2 }
        diesel = { count = 1, min = 1, max = 3 }
        lpg = { count = 0, min = 1, max = 1 }
        electric = { count = 0, min = 1, max = 1 }

        [registers]
        count = 1
        min = 1
        max = 2
    "#;
    let config = SimulationConfig::from_toml_str(toml, Path::new("inline.toml")).unwrap();
    assert_eq!(config.stand_count(), 2);
    assert_eq!(config.registers.buffer, 3);

    let report = run(config);
    assert_each_car_exactly_once(&report.cars, 6);
    assert!(report.cars.iter().all(|c| matches!(c.fuel, FuelKind::Gas | FuelKind::Diesel)));
}

#[test]
fn test_report_renders_completed_run() {
    let report = run(single_lane(3));

    let text = render_statistics(&report.statistics);
    assert!(text.contains("Gas:\n  total_cars: 3\n  total_time: 3 u"));

    let csv = render_cars_csv(&report.cars);
    assert_eq!(csv.lines().count(), 4);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["statistics"]["registers"]["total_cars"], 3);
}
