//! Generador de llegadas: crea `N` autos con combustible aleatorio y los
//! escalona en el tiempo antes de cerrar la cola de llegadas.

use std::sync::Arc;
use std::thread;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::car::{Car, FuelKind};
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::queue::BoundedQueue;
use crate::router::Stage;

/// Fuente de autos de la simulación; corre en su propio hilo.
pub struct ArrivalGenerator {
    output: Arc<BoundedQueue<Car>>,
    config: Arc<SimulationConfig>,
    fuels: Vec<FuelKind>,
    rng: StdRng,
}

impl ArrivalGenerator {
    /// # Arguments
    ///
    /// * `output` - Cola de llegadas que consume el enrutador de surtidores
    /// * `config` - Cantidad de autos, escalonamiento y surtidores por combustible
    /// * `rng` - Generador propio del hilo
    pub fn new(output: Arc<BoundedQueue<Car>>, config: Arc<SimulationConfig>, rng: StdRng) -> Self {
        let fuels = config.served_fuel_kinds();
        Self { output, config, fuels, rng }
    }

    /// Sortea el combustible de un auto entre los que tienen surtidor.
    fn pick_fuel(&mut self) -> Result<FuelKind, SimulationError> {
        self.fuels
            .choose(&mut self.rng)
            .copied()
            .ok_or(SimulationError::NoStations(Stage::Stands))
    }

    /// Emite los autos `0..car_count` y cierra la cola de llegadas.
    ///
    /// Si la cola está llena el generador se bloquea: ningún auto se descarta.
    pub fn run(mut self) -> Result<usize, SimulationError> {
        let total = self.config.car_count;
        info!("[GENERADOR] Iniciando llegada de {} autos", total);

        let result = self.emit_all(total);
        self.output.close();

        if result.is_ok() {
            info!("[GENERADOR] Llegadas completas, cola de entrada cerrada");
        }
        result.map(|_| total)
    }

    fn emit_all(&mut self, total: usize) -> Result<(), SimulationError> {
        for id in 0..total {
            let car = Car::new(id, self.pick_fuel()?);
            debug!("[GENERADOR] Auto {:02} ({}) llega", id, car.fuel());
            self.output
                .push(car)
                .map_err(|_| SimulationError::QueueClosed("llegadas".to_string()))?;

            if id + 1 < total {
                let stagger = self.config.arrival.sample(&mut self.rng);
                thread::sleep(self.config.units_to_duration(stagger));
            }
        }
        Ok(())
    }
}
