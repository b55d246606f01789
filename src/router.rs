//! # Módulo de Enrutamiento
//!
//! Los enrutadores consumen una cola de entrada y reparten cada auto a la
//! estación con menos autos en cola. Es una heurística golosa: solo mira la
//! profundidad de la cola, no el auto que la estación esté atendiendo.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};

use crate::car::Car;
use crate::error::SimulationError;
use crate::queue::BoundedQueue;
use crate::station::{StationKind, StationPool};

/// Elige la estación con la cola más corta.
///
/// Recibe una foto de `(id, profundidad)`; los empates se resuelven a favor
/// del id más bajo. Devuelve `None` si no hay candidatas.
///
/// # Examples
///
/// ```rust
/// use petrol_station_simulator::shortest_queue;
///
/// assert_eq!(shortest_queue([(0, 2), (1, 1), (2, 1)]), Some(1));
/// assert_eq!(shortest_queue(Vec::new()), None);
/// ```
pub fn shortest_queue<I>(depths: I) -> Option<usize>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    depths
        .into_iter()
        .min_by_key(|&(id, depth)| (depth, id))
        .map(|(id, _)| id)
}

/// Etapa que alimenta un enrutador.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Llegadas → surtidores del combustible del auto.
    Stands,
    /// Autos que terminaron de cargar → cualquier caja.
    Registers,
}

/// Enrutador de una etapa de la estación.
pub struct Router {
    stage: Stage,
    input: Arc<BoundedQueue<Car>>,
    pool: StationPool,
}

impl Router {
    /// Enrutador de llegadas hacia surtidores.
    pub fn stands(arrivals: Arc<BoundedQueue<Car>>, stands: StationPool) -> Self {
        Self { stage: Stage::Stands, input: arrivals, pool: stands }
    }

    /// Enrutador de la cola de pago hacia cajas.
    pub fn registers(payments: Arc<BoundedQueue<Car>>, registers: StationPool) -> Self {
        Self { stage: Stage::Registers, input: payments, pool: registers }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Asigna un auto a una estación y lo encola (bloquea si está llena).
    ///
    /// # Returns
    ///
    /// El id de la estación elegida.
    pub fn route(&self, mut car: Car) -> Result<usize, SimulationError> {
        let depths = match self.stage {
            Stage::Stands => {
                let kind = StationKind::Fuel(car.fuel());
                self.pool.depths(|s| s.kind() == kind)
            }
            Stage::Registers => self.pool.depths(|_| true),
        };

        let target = shortest_queue(depths)
            .and_then(|id| self.pool.get(id))
            .ok_or(match self.stage {
                Stage::Stands => SimulationError::NoStandForFuel(car.fuel()),
                Stage::Registers => SimulationError::NoStations(Stage::Registers),
            })?;

        let now = Instant::now();
        match self.stage {
            Stage::Stands => car.enter_stand_queue(now),
            Stage::Registers => car.enter_register_queue(now),
        }

        debug!(
            "[ENRUTADOR] Auto {:02} ({}) → {} {} (en cola: {})",
            car.id(),
            car.fuel(),
            target.kind(),
            target.id(),
            target.queue_depth()
        );

        target
            .inbox()
            .push(car)
            .map_err(|_| SimulationError::QueueClosed(format!("{} {}", target.kind(), target.id())))?;

        Ok(target.id())
    }

    /// Reparte autos hasta que la cola de entrada se cierre y vacíe; después
    /// cierra la cola de todas las estaciones de la etapa.
    ///
    /// Si el reparto falla, también cierra y vacía la entrada: el productor no
    /// queda bloqueado y los autos descartados sueltan su señal de pago.
    pub fn run(self) -> Result<(), SimulationError> {
        info!("[ENRUTADOR] {:?} iniciado ({} estaciones)", self.stage, self.pool.len());

        let mut routed = 0usize;
        let mut result = Ok(());
        while let Some(car) = self.input.pop() {
            if let Err(e) = self.route(car) {
                error!("[ENRUTADOR] {:?} abortando: {}", self.stage, e);
                self.input.close();
                while self.input.pop().is_some() {}
                result = Err(e);
                break;
            }
            routed += 1;
        }

        self.pool.close_all();
        info!("[ENRUTADOR] {:?} finalizado tras repartir {} autos", self.stage, routed);
        result
    }
}
