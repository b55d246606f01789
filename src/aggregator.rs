//! # Módulo de Agregación de Estadísticas
//!
//! El agregador consume los autos que terminaron de pagar y acumula
//! estadísticas por combustible y para el conjunto de cajas. Es el único
//! dueño de las estadísticas mientras dura la corrida; al cerrarse su
//! entrada calcula los promedios y entrega el resultado al llamador.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use serde::Serialize;

use crate::car::{Car, CarId, FuelKind};
use crate::error::SimulationError;
use crate::queue::BoundedQueue;

/// Estadísticas de una etapa (un combustible o las cajas).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    /// Autos atendidos
    pub total_cars: usize,
    /// Tiempo de servicio acumulado, en unidades abstractas
    pub total_service_time: u64,
    /// Espera en cola acumulada
    pub total_queue_time: Duration,
    /// Máxima espera en cola observada
    pub max_queue_time: Duration,
    /// Espera promedio; se calcula al finalizar
    pub avg_queue_time: Duration,
    /// Tiempo total en la estación acumulado
    pub total_time_in_system: Duration,
}

impl StageStats {
    /// Suma un auto atendido.
    ///
    /// # Arguments
    ///
    /// * `service` - Tiempo de servicio en unidades abstractas
    /// * `queue` - Espera en la cola de la estación
    /// * `in_system` - Tiempo total del auto en la estación
    pub fn record(&mut self, service: u64, queue: Duration, in_system: Duration) {
        self.total_cars += 1;
        self.total_service_time += service;
        self.total_queue_time += queue;
        self.max_queue_time = self.max_queue_time.max(queue);
        self.total_time_in_system += in_system;
    }

    /// Espera promedio en cola; cero si no se atendió ningún auto.
    pub fn average_queue_time(&self) -> Duration {
        if self.total_cars == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_queue_time.as_nanos() / self.total_cars as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn finalize(&mut self) {
        self.avg_queue_time = self.average_queue_time();
    }
}

/// Estadísticas finales de la corrida.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregateStatistics {
    /// Una entrada por combustible, en orden gas, diésel, LPG, eléctrico
    pub fuels: BTreeMap<FuelKind, StageStats>,
    /// Todas las cajas en conjunto
    pub registers: StageStats,
}

impl AggregateStatistics {
    /// Estadísticas vacías con los cuatro combustibles presentes.
    pub fn new() -> Self {
        Self {
            fuels: FuelKind::ALL.into_iter().map(|k| (k, StageStats::default())).collect(),
            registers: StageStats::default(),
        }
    }

    /// Estadísticas de un combustible (siempre presentes, aunque en cero).
    pub fn fuel(&self, kind: FuelKind) -> &StageStats {
        &self.fuels[&kind]
    }

    /// Autos que completaron el recorrido (todos pasan por una caja).
    pub fn total_cars(&self) -> usize {
        self.registers.total_cars
    }

    fn finalize(&mut self) {
        self.fuels.values_mut().for_each(StageStats::finalize);
        self.registers.finalize();
    }
}

impl Default for AggregateStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Registro de un auto completado. Las marcas de tiempo son relativas al
/// inicio de la simulación.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CarRecord {
    pub id: CarId,
    pub fuel: FuelKind,
    /// Surtidor que lo atendió (numeración global)
    pub stand_id: usize,
    /// Caja que lo cobró
    pub register_id: usize,
    /// Espera en la cola del surtidor
    pub stand_wait: Duration,
    /// Espera en la cola de la caja
    pub register_wait: Duration,
    /// Carga, en unidades abstractas
    pub fuel_service: u64,
    /// Cobro, en unidades abstractas
    pub payment_service: u64,
    /// Tiempo total en la estación
    pub total: Duration,
    /// Inicio de la carga
    pub fueling_started: Duration,
    /// Fin del cobro
    pub payment_completed: Duration,
}

impl CarRecord {
    fn from_car(car: &Car, start: Instant) -> Result<Self, SimulationError> {
        let id = car.id();
        let missing = |field| SimulationError::MissingTimestamp { car: id, field };

        Ok(Self {
            id,
            fuel: car.fuel(),
            stand_id: car.stand_id().ok_or_else(|| missing("stand_id"))?,
            register_id: car.register_id().ok_or_else(|| missing("register_id"))?,
            stand_wait: car.stand_wait().ok_or_else(|| missing("stand_wait"))?,
            register_wait: car.register_wait().ok_or_else(|| missing("register_wait"))?,
            fuel_service: car.fuel_service().ok_or_else(|| missing("fuel_service"))?,
            payment_service: car.payment_service().ok_or_else(|| missing("payment_service"))?,
            total: car.total().ok_or_else(|| missing("total"))?,
            fueling_started: car
                .fueling_started_at()
                .map(|t| t.saturating_duration_since(start))
                .ok_or_else(|| missing("fueling_started_at"))?,
            payment_completed: car
                .payment_completed_at()
                .map(|t| t.saturating_duration_since(start))
                .ok_or_else(|| missing("payment_completed_at"))?,
        })
    }
}

/// Resultado del agregador: estadísticas y autos en orden de finalización.
#[derive(Clone, Debug)]
pub struct Aggregation {
    /// Estadísticas finales con promedios calculados
    pub statistics: AggregateStatistics,
    /// Autos completados en orden de finalización
    pub cars: Vec<CarRecord>,
}

/// Consumidor de la cola de salida; único dueño de las estadísticas.
pub struct Aggregator {
    start: Instant,
    statistics: AggregateStatistics,
    cars: Vec<CarRecord>,
}

impl Aggregator {
    /// # Arguments
    ///
    /// * `start` - Inicio de la simulación, base de las marcas relativas
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            statistics: AggregateStatistics::new(),
            cars: Vec::new(),
        }
    }

    /// Incorpora un auto completado en el instante `at`.
    pub fn record(&mut self, mut car: Car, at: Instant) -> Result<(), SimulationError> {
        car.complete(at).ok_or(SimulationError::MissingTimestamp {
            car: car.id(),
            field: "stand_queue_entered_at",
        })?;
        let record = CarRecord::from_car(&car, self.start)?;

        self.statistics
            .fuels
            .entry(record.fuel)
            .or_default()
            .record(record.fuel_service, record.stand_wait, record.total);
        self.statistics
            .registers
            .record(record.payment_service, record.register_wait, record.total);

        debug!(
            "[AGREGADOR] Auto {:02} ({}) esperó {:?}, cargó {} u y pagó {} u; total {:?}",
            record.id, record.fuel, record.stand_wait, record.fuel_service, record.payment_service, record.total
        );
        self.cars.push(record);
        Ok(())
    }

    /// Calcula los promedios y entrega el resultado.
    pub fn finish(mut self) -> Aggregation {
        self.statistics.finalize();
        Aggregation {
            statistics: self.statistics,
            cars: self.cars,
        }
    }

    /// Consume la cola de salida hasta que se cierre.
    pub fn run(mut self, exit: Arc<BoundedQueue<Car>>) -> Result<Aggregation, SimulationError> {
        while let Some(car) = exit.pop() {
            if let Err(e) = self.record(car, Instant::now()) {
                error!("[AGREGADOR] abortando: {}", e);
                exit.close();
                while exit.pop().is_some() {}
                return Err(e);
            }
        }

        let aggregation = self.finish();
        info!("[AGREGADOR] {} autos completados", aggregation.statistics.total_cars());
        Ok(aggregation)
    }
}
