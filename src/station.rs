//! # Módulo de Estaciones
//!
//! Surtidores y cajas comparten la misma abstracción: una estación con un
//! identificador, un tipo y una cola de entrada acotada que drena un único
//! trabajador. Las estaciones se crean una vez al arrancar y su cola solo se
//! cierra cuando el enrutador que la alimenta agotó todas sus fuentes.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::car::{Car, FuelKind};
use crate::queue::BoundedQueue;

/// Tipo de estación: surtidor de un combustible o caja (sin tipo).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    Fuel(FuelKind),
    Register,
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fuel(fuel) => write!(f, "surtidor {}", fuel),
            Self::Register => write!(f, "caja"),
        }
    }
}

/// Una estación física de la estación de servicio.
pub struct Station {
    id: usize,
    kind: StationKind,
    inbox: BoundedQueue<Car>,
    occupancy: AtomicUsize,
    peak_occupancy: AtomicUsize,
    served: AtomicUsize,
}

impl Station {
    /// Crea una estación con una cola de entrada de `capacity` autos.
    pub fn new(id: usize, kind: StationKind, capacity: usize) -> Self {
        Self {
            id,
            kind,
            inbox: BoundedQueue::new(capacity),
            occupancy: AtomicUsize::new(0),
            peak_occupancy: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> StationKind {
        self.kind
    }

    pub fn inbox(&self) -> &BoundedQueue<Car> {
        &self.inbox
    }

    /// Autos esperando en la cola (no cuenta el que está en servicio).
    pub fn queue_depth(&self) -> usize {
        self.inbox.len()
    }

    /// Marca la estación como ocupada por un auto más.
    pub(crate) fn occupy(&self) {
        let now = self.occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_occupancy.fetch_max(now, Ordering::SeqCst);
    }

    /// Libera la estación después de atender un auto.
    pub(crate) fn release(&self) {
        self.occupancy.fetch_sub(1, Ordering::SeqCst);
        self.served.fetch_add(1, Ordering::SeqCst);
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::SeqCst)
    }

    /// Máximo de autos atendidos a la vez desde que arrancó la estación.
    pub fn peak_occupancy(&self) -> usize {
        self.peak_occupancy.load(Ordering::SeqCst)
    }

    pub fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    pub fn summary(&self) -> StationSummary {
        StationSummary {
            id: self.id,
            kind: self.kind,
            served: self.served(),
            peak_occupancy: self.peak_occupancy(),
        }
    }
}

/// Resumen de una estación al final de la simulación.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StationSummary {
    pub id: usize,
    pub kind: StationKind,
    pub served: usize,
    pub peak_occupancy: usize,
}

/// Conjunto de estaciones de una misma familia (surtidores o cajas).
#[derive(Clone, Default)]
pub struct StationPool {
    stations: Vec<Arc<Station>>,
}

impl StationPool {
    pub fn new(stations: Vec<Arc<Station>>) -> Self {
        Self { stations }
    }

    pub fn stations(&self) -> &[Arc<Station>] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Foto de `(id, profundidad de cola)` de las estaciones que cumplen `filter`.
    pub fn depths<F>(&self, filter: F) -> Vec<(usize, usize)>
    where
        F: Fn(&Station) -> bool,
    {
        self.stations
            .iter()
            .filter(|s| filter(s))
            .map(|s| (s.id(), s.queue_depth()))
            .collect()
    }

    pub fn get(&self, id: usize) -> Option<&Arc<Station>> {
        self.stations.iter().find(|s| s.id() == id)
    }

    /// Cierra la cola de entrada de todas las estaciones.
    pub fn close_all(&self) {
        for station in &self.stations {
            station.inbox().close();
        }
    }

    pub fn summaries(&self) -> Vec<StationSummary> {
        self.stations.iter().map(|s| s.summary()).collect()
    }
}
