//! # Módulo de Autos
//!
//! Este módulo define los autos que atraviesan la estación de servicio y
//! las marcas de tiempo y duraciones que se registran durante su paso por
//! surtidor y caja.
//!
//! Un auto se mueve por valor entre las colas: en cada momento pertenece a
//! una sola cola o a un solo trabajador, por lo que no necesita `Mutex`.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::RendezvousError;
use crate::rendezvous::{self, PaymentSignal, PaymentWait};

/// Identificador ordinal de un auto (0-indexado, nunca se reutiliza).
pub type CarId = usize;

/// Tipos de combustible atendidos por la estación.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelKind {
    Gas,
    Diesel,
    Lpg,
    Electric,
}

impl FuelKind {
    /// Todos los combustibles, en el orden en que se numeran los surtidores.
    pub const ALL: [FuelKind; 4] = [
        FuelKind::Gas,
        FuelKind::Diesel,
        FuelKind::Lpg,
        FuelKind::Electric,
    ];

    /// Nombre usado en los reportes ("Gas", "Diesel", "LPG", "Electric").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gas => "Gas",
            Self::Diesel => "Diesel",
            Self::Lpg => "LPG",
            Self::Electric => "Electric",
        }
    }
}

impl fmt::Display for FuelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gas => write!(f, "gas"),
            Self::Diesel => write!(f, "diesel"),
            Self::Lpg => write!(f, "LPG"),
            Self::Electric => write!(f, "electric"),
        }
    }
}

/// Representa un auto que llega a la estación.
///
/// Las duraciones se escriben una sola vez, en el punto del ciclo de vida
/// que corresponde:
///
/// | Campo             | Lo escribe              |
/// |-------------------|-------------------------|
/// | `stand_wait`      | surtidor al tomar el auto |
/// | `fuel_service`    | surtidor al terminar de cargar |
/// | `register_wait`   | caja al tomar el auto   |
/// | `payment_service` | caja al terminar de cobrar |
/// | `total`           | agregador               |
#[derive(Debug)]
pub struct Car {
    id: CarId,
    fuel: FuelKind,
    stand_queue_entered_at: Option<Instant>,
    register_queue_entered_at: Option<Instant>,
    stand_wait: Option<Duration>,
    register_wait: Option<Duration>,
    fuel_service: Option<u64>,
    payment_service: Option<u64>,
    total: Option<Duration>,
    stand_id: Option<usize>,
    register_id: Option<usize>,
    fueling_started_at: Option<Instant>,
    payment_completed_at: Option<Instant>,
    rendezvous: Option<PaymentSignal>,
}

impl Car {
    /// Crea un auto nuevo sin marcas de tiempo.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use petrol_station_simulator::{Car, FuelKind};
    ///
    /// let car = Car::new(3, FuelKind::Diesel);
    /// assert_eq!(car.id(), 3);
    /// assert_eq!(car.fuel(), FuelKind::Diesel);
    /// assert!(car.stand_wait().is_none());
    /// ```
    pub fn new(id: CarId, fuel: FuelKind) -> Self {
        Self {
            id,
            fuel,
            stand_queue_entered_at: None,
            register_queue_entered_at: None,
            stand_wait: None,
            register_wait: None,
            fuel_service: None,
            payment_service: None,
            total: None,
            stand_id: None,
            register_id: None,
            fueling_started_at: None,
            payment_completed_at: None,
            rendezvous: None,
        }
    }

    /// Identificador único del auto (orden de llegada)
    pub fn id(&self) -> CarId {
        self.id
    }

    /// Combustible que necesita el auto
    pub fn fuel(&self) -> FuelKind {
        self.fuel
    }

    /// Instante en que entró a la cola de un surtidor
    pub fn stand_queue_entered_at(&self) -> Option<Instant> {
        self.stand_queue_entered_at
    }

    /// Instante en que entró a la cola de una caja
    pub fn register_queue_entered_at(&self) -> Option<Instant> {
        self.register_queue_entered_at
    }

    /// Tiempo esperando en la cola del surtidor
    pub fn stand_wait(&self) -> Option<Duration> {
        self.stand_wait
    }

    /// Tiempo esperando en la cola de la caja
    pub fn register_wait(&self) -> Option<Duration> {
        self.register_wait
    }

    /// Duración de la carga en unidades abstractas de tiempo.
    pub fn fuel_service(&self) -> Option<u64> {
        self.fuel_service
    }

    /// Duración del cobro en unidades abstractas de tiempo.
    pub fn payment_service(&self) -> Option<u64> {
        self.payment_service
    }

    /// Tiempo total en la estación, desde la cola del surtidor hasta la salida
    pub fn total(&self) -> Option<Duration> {
        self.total
    }

    /// Surtidor que atendió al auto
    pub fn stand_id(&self) -> Option<usize> {
        self.stand_id
    }

    /// Caja que cobró al auto
    pub fn register_id(&self) -> Option<usize> {
        self.register_id
    }

    /// Instante en que el surtidor empezó a cargar
    pub fn fueling_started_at(&self) -> Option<Instant> {
        self.fueling_started_at
    }

    /// Instante en que la caja terminó de cobrar
    pub fn payment_completed_at(&self) -> Option<Instant> {
        self.payment_completed_at
    }

    /// Marca la entrada a la cola del surtidor elegido por el enrutador.
    pub(crate) fn enter_stand_queue(&mut self, at: Instant) {
        debug_assert!(self.stand_queue_entered_at.is_none(), "auto {} ya entró a un surtidor", self.id);
        self.stand_queue_entered_at = Some(at);
    }

    /// Marca la entrada a la cola de la caja elegida por el enrutador.
    pub(crate) fn enter_register_queue(&mut self, at: Instant) {
        debug_assert!(self.register_queue_entered_at.is_none(), "auto {} ya entró a una caja", self.id);
        self.register_queue_entered_at = Some(at);
    }

    /// Registra que el surtidor `stand_id` tomó el auto en `at`.
    ///
    /// Calcula la espera en cola como `at - stand_queue_entered_at`.
    pub(crate) fn start_fueling(&mut self, stand_id: usize, at: Instant) -> Option<Duration> {
        let entered = self.stand_queue_entered_at?;
        debug_assert!(self.stand_wait.is_none());
        let wait = at.saturating_duration_since(entered);
        self.stand_wait = Some(wait);
        self.stand_id = Some(stand_id);
        self.fueling_started_at = Some(at);
        Some(wait)
    }

    pub(crate) fn finish_fueling(&mut self, units: u64) {
        debug_assert!(self.fuel_service.is_none());
        self.fuel_service = Some(units);
    }

    /// Registra que la caja `register_id` tomó el auto en `at`.
    pub(crate) fn start_payment(&mut self, register_id: usize, at: Instant) -> Option<Duration> {
        let entered = self.register_queue_entered_at?;
        debug_assert!(self.register_wait.is_none());
        let wait = at.saturating_duration_since(entered);
        self.register_wait = Some(wait);
        self.register_id = Some(register_id);
        Some(wait)
    }

    pub(crate) fn finish_payment(&mut self, units: u64, at: Instant) {
        debug_assert!(self.payment_service.is_none());
        self.payment_service = Some(units);
        self.payment_completed_at = Some(at);
    }

    /// Calcula el tiempo total en la estación, desde la entrada a la cola del
    /// surtidor hasta `at`.
    pub(crate) fn complete(&mut self, at: Instant) -> Option<Duration> {
        let entered = self.stand_queue_entered_at?;
        debug_assert!(self.total.is_none());
        let total = at.saturating_duration_since(entered);
        self.total = Some(total);
        Some(total)
    }

    /// Arma el punto de encuentro del auto y devuelve la mitad que espera el
    /// surtidor.
    ///
    /// # Errors
    ///
    /// [`RendezvousError::AlreadyArmed`] si el auto ya llevaba una señal.
    pub(crate) fn arm_rendezvous(&mut self) -> Result<PaymentWait, RendezvousError> {
        if self.rendezvous.is_some() {
            return Err(RendezvousError::AlreadyArmed);
        }
        let (signal, wait) = rendezvous::rendezvous();
        self.rendezvous = Some(signal);
        Ok(wait)
    }

    /// Entrega la señal de pago para que la caja la resuelva.
    ///
    /// # Errors
    ///
    /// [`RendezvousError::NotArmed`] si el auto no lleva señal (nunca se armó
    /// o ya se resolvió).
    pub(crate) fn take_rendezvous(&mut self) -> Result<PaymentSignal, RendezvousError> {
        self.rendezvous.take().ok_or(RendezvousError::NotArmed)
    }
}
