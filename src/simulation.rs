//! # Módulo de Simulación Principal
//!
//! Arma la red de colas de la estación de servicio, lanza un hilo por rol y
//! ejecuta el protocolo de apagado por etapas:
//!
//! 1. el generador cierra las llegadas y el enrutador de surtidores cierra
//!    la cola de cada surtidor;
//! 2. cuando todos los surtidores terminan se cierra la cola de pago y el
//!    enrutador de cajas cierra la cola de cada caja;
//! 3. cuando todas las cajas terminan se cierra la salida y el agregador
//!    entrega las estadísticas.
//!
//! Ninguna etapa cierra su salida antes de agotar su entrada, así que ningún
//! auto se pierde.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::sync::WaitGroup;
use log::{error, info};
use serde::Serialize;

use crate::aggregator::{AggregateStatistics, Aggregator, CarRecord};
use crate::arrivals::ArrivalGenerator;
use crate::car::{Car, FuelKind};
use crate::config::{SimulationConfig, ARRIVALS_BUFFER, PAYMENT_QUEUE_BUFFER};
use crate::error::SimulationError;
use crate::queue::BoundedQueue;
use crate::router::Router;
use crate::station::{Station, StationKind, StationPool, StationSummary};
use crate::worker::{RegisterWorker, StandWorker};

// Flujos del generador aleatorio por rol; deben ser distintos entre sí.
const ARRIVAL_STREAM: u64 = 0;
const STAND_STREAM_BASE: u64 = 1 << 16;
const REGISTER_STREAM_BASE: u64 = 2 << 16;

/// Resultado completo de una corrida.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Estadísticas por combustible y de cajas
    pub statistics: AggregateStatistics,
    /// Autos completados, en orden de finalización
    pub cars: Vec<CarRecord>,
    /// Surtidores y cajas con su cantidad de autos atendidos
    pub stations: Vec<StationSummary>,
    /// Duración real de la corrida
    pub elapsed: Duration,
}

/// Orquestador de la simulación de la estación de servicio.
pub struct Simulation {
    config: Arc<SimulationConfig>,
}

impl Simulation {
    /// Crea una simulación a partir de una configuración ya validada.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use petrol_station_simulator::{ServiceRange, Simulation, SimulationConfig};
    ///
    /// let mut config = SimulationConfig::default();
    /// config.car_count = 3;
    /// config.arrival = ServiceRange::new(0, 0);
    ///
    /// let report = Simulation::new(config).unwrap().run().unwrap();
    /// assert_eq!(report.statistics.total_cars(), 3);
    /// ```
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Ok(Self {
            config: Arc::new(config.validate()?),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Surtidores numerados desde 0 en el orden gas, diésel, LPG, eléctrico.
    fn build_stands(&self) -> StationPool {
        let mut stations = Vec::with_capacity(self.config.stand_count());
        for kind in FuelKind::ALL {
            for _ in 0..self.config.fuel(kind).count {
                let id = stations.len();
                stations.push(Arc::new(Station::new(id, StationKind::Fuel(kind), self.config.stands.buffer)));
            }
        }
        StationPool::new(stations)
    }

    fn build_registers(&self) -> StationPool {
        StationPool::new(
            (0..self.config.registers.count)
                .map(|id| Arc::new(Station::new(id, StationKind::Register, self.config.registers.buffer)))
                .collect(),
        )
    }

    /// Ejecuta la simulación completa.
    ///
    /// # Errors
    ///
    /// El primer error reportado por cualquiera de los hilos. Todos los hilos
    /// se esperan antes de devolver.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let config = &self.config;
        info!(
            "=== Estación de servicio: {} autos, {} surtidores, {} cajas ===",
            config.car_count,
            config.stand_count(),
            config.registers.count
        );

        let start = Instant::now();

        let arrivals = Arc::new(BoundedQueue::<Car>::new(ARRIVALS_BUFFER));
        let payments = Arc::new(BoundedQueue::<Car>::new(PAYMENT_QUEUE_BUFFER));
        let exit = Arc::new(BoundedQueue::<Car>::new(1));
        let stands = self.build_stands();
        let registers = self.build_registers();

        let mut handles: Vec<(String, thread::JoinHandle<Result<(), SimulationError>>)> = Vec::new();

        // Etapa final primero: el agregador ya espera cuando llegan autos.
        let aggregator = {
            let exit = Arc::clone(&exit);
            spawn("agregador", move || Aggregator::new(start).run(exit))?
        };

        let register_done = WaitGroup::new();
        for station in registers.stations() {
            let worker = RegisterWorker::new(
                Arc::clone(station),
                Arc::clone(&exit),
                Arc::clone(config),
                config.rng_for(REGISTER_STREAM_BASE + station.id() as u64),
                register_done.clone(),
            );
            let name = format!("caja-{}", station.id());
            handles.push((name.clone(), spawn(&name, move || worker.run().map(drop))?));
        }

        let stand_done = WaitGroup::new();
        for station in stands.stations() {
            let worker = StandWorker::new(
                Arc::clone(station),
                Arc::clone(&payments),
                Arc::clone(config),
                config.rng_for(STAND_STREAM_BASE + station.id() as u64),
                stand_done.clone(),
            );
            let name = format!("surtidor-{}", station.id());
            handles.push((name.clone(), spawn(&name, move || worker.run().map(drop))?));
        }

        let register_router = Router::registers(Arc::clone(&payments), registers.clone());
        handles.push(("enrutador-cajas".to_string(), spawn("enrutador-cajas", move || register_router.run())?));

        let stand_router = Router::stands(Arc::clone(&arrivals), stands.clone());
        handles.push((
            "enrutador-surtidores".to_string(),
            spawn("enrutador-surtidores", move || stand_router.run())?,
        ));

        let generator = ArrivalGenerator::new(Arc::clone(&arrivals), Arc::clone(config), config.rng_for(ARRIVAL_STREAM));
        handles.push(("generador".to_string(), spawn("generador", move || generator.run().map(drop))?));

        // Cierre por etapas.
        stand_done.wait();
        info!("[ESTACIÓN] Todos los surtidores cerrados, cerrando cola de pago");
        payments.close();

        register_done.wait();
        info!("[ESTACIÓN] Todas las cajas cerradas, cerrando salida");
        exit.close();

        let mut first_error = None;
        for (name, handle) in handles {
            if let Err(e) = join(&name, handle) {
                error!("[ESTACIÓN] {}", e);
                first_error.get_or_insert(e);
            }
        }
        let aggregation = join("agregador", aggregator);

        if let Some(e) = first_error {
            return Err(e);
        }
        let aggregation = aggregation?;

        let mut stations = stands.summaries();
        stations.extend(registers.summaries());
        let elapsed = start.elapsed();

        info!("=== Simulación completada en {:?} ===", elapsed);
        Ok(SimulationReport {
            statistics: aggregation.statistics,
            cars: aggregation.cars,
            stations,
            elapsed,
        })
    }
}

fn spawn<T, F>(name: &str, f: F) -> Result<thread::JoinHandle<Result<T, SimulationError>>, SimulationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SimulationError> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| SimulationError::Spawn { name: name.to_string(), source })
}

fn join<T>(name: &str, handle: thread::JoinHandle<Result<T, SimulationError>>) -> Result<T, SimulationError> {
    handle
        .join()
        .map_err(|_| SimulationError::WorkerPanicked(name.to_string()))?
}
