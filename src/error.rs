//! # Módulo de Errores
//!
//! Taxonomía de fallos del simulador: errores de configuración (fatales al
//! arrancar) y violaciones de invariantes de coordinación durante la corrida.
//! El agotamiento de capacidad de una cola nunca es un error: se resuelve
//! bloqueando al productor.

use std::path::PathBuf;

use crate::car::{CarId, FuelKind};
use crate::router::Stage;

/// Errores producidos al cargar o validar la configuración.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Falta una clave obligatoria.
    #[error("falta la variable de configuración '{key}'")]
    Missing { key: String },

    /// El valor existe pero no es aceptable.
    #[error("valor inválido para '{key}': {reason}")]
    Invalid { key: String, reason: String },

    /// Rango con mínimo mayor que el máximo.
    #[error("rango '{key}' invertido: mínimo {min} mayor que máximo {max}")]
    InvertedRange { key: String, min: u64, max: u64 },

    /// Ningún surtidor configurado para ningún combustible.
    #[error("no hay surtidores configurados")]
    NoStands,

    /// Error de deserialización del archivo.
    #[error("error de formato en {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fallos del punto de encuentro entre surtidor y caja.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RendezvousError {
    #[error("el auto ya tenía un punto de encuentro armado")]
    AlreadyArmed,

    #[error("el auto llegó a la caja sin punto de encuentro armado")]
    NotArmed,

    /// La señal se descartó sin resolverse.
    #[error("el punto de encuentro se abandonó sin confirmar el pago")]
    Abandoned,
}

/// Errores durante la ejecución de la simulación.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("auto {car}: {source}")]
    Rendezvous {
        car: CarId,
        #[source]
        source: RendezvousError,
    },

    #[error("ningún surtidor atiende combustible {0}")]
    NoStandForFuel(FuelKind),

    /// La etapa no tiene ninguna estación a la cual enviar autos.
    #[error("la etapa {0:?} no tiene estaciones")]
    NoStations(Stage),

    #[error("la cola '{0}' se cerró mientras aún se le enviaban autos")]
    QueueClosed(String),

    #[error("auto {car}: falta la marca de tiempo '{field}'")]
    MissingTimestamp { car: CarId, field: &'static str },

    #[error("no se pudo lanzar el hilo '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("el hilo '{0}' terminó con pánico")]
    WorkerPanicked(String),

    /// No se pudo escribir un archivo de resultados.
    #[error("no se pudo escribir {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
