//! # Simulador de Estación de Servicio
//!
//! Esta biblioteca simula una estación de servicio como una red de colas de
//! dos etapas: los autos llegan, esperan y ocupan un surtidor de su tipo de
//! combustible, y después esperan y ocupan una caja para pagar antes de irse.
//!
//! ## Características principales
//!
//! - **Un hilo por rol**: generador de llegadas, enrutadores, un trabajador
//!   por surtidor y por caja, y el agregador de estadísticas.
//! - **Colas acotadas con contrapresión**: un productor se bloquea cuando la
//!   cola destino está llena; nunca se descartan autos.
//! - **Enrutamiento por cola más corta**: con desempate por id más bajo.
//! - **Punto de encuentro surtidor ↔ caja**: el surtidor queda ocupado hasta
//!   que la caja confirma el pago del auto.
//! - **Apagado por etapas**: cada etapa cierra su salida solo después de
//!   agotar su entrada.
//!
//! ## Estructura del proyecto
//!
//! - `car`: autos, combustibles y marcas de tiempo
//! - `queue`: cola acotada bloqueante con cierre
//! - `station`: surtidores, cajas y conjuntos de estaciones
//! - `rendezvous`: señal de pago de un solo uso
//! - `arrivals`: generador de llegadas
//! - `router`: enrutamiento por cola más corta
//! - `worker`: trabajadores de surtidor y de caja
//! - `aggregator`: estadísticas finales
//! - `simulation`: orquestación y protocolo de apagado
//! - `config`: configuración y su carga desde archivos
//! - `report`: formato y persistencia de resultados

pub mod aggregator;
pub mod arrivals;
pub mod car;
pub mod config;
pub mod error;
pub mod queue;
pub mod rendezvous;
pub mod report;
pub mod router;
pub mod simulation;
pub mod station;
pub mod worker;

// Re-exportar las estructuras principales para facilitar su uso
pub use aggregator::{AggregateStatistics, CarRecord, StageStats};
pub use car::{Car, CarId, FuelKind};
pub use config::{ServiceRange, SimulationConfig};
pub use error::{ConfigError, RendezvousError, SimulationError};
pub use router::shortest_queue;
pub use simulation::{Simulation, SimulationReport};
pub use station::{StationKind, StationSummary};
