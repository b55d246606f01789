//! # Punto de Encuentro Surtidor ↔ Caja
//!
//! Celda de finalización de un solo uso. El surtidor arma el punto de
//! encuentro al terminar de cargar combustible, entrega la mitad
//! [`PaymentSignal`] al auto y se queda bloqueado en la mitad [`PaymentWait`]
//! hasta que la caja confirma el pago.
//!
//! Ambas mitades se consumen al usarse, de modo que una señal no puede
//! dispararse dos veces ni reutilizarse con otro auto.

use std::sync::mpsc;

use crate::error::RendezvousError;

/// Mitad emisora: viaja con el auto hasta la caja.
#[derive(Debug)]
pub struct PaymentSignal {
    sender: mpsc::SyncSender<()>,
}

/// Mitad receptora: queda en poder del surtidor que despachó el auto.
#[derive(Debug)]
pub struct PaymentWait {
    receiver: mpsc::Receiver<()>,
}

/// Crea un punto de encuentro nuevo que requiere exactamente una señal.
pub fn rendezvous() -> (PaymentSignal, PaymentWait) {
    // Capacidad 1: la caja nunca se bloquea al confirmar el pago.
    let (sender, receiver) = mpsc::sync_channel(1);
    (PaymentSignal { sender }, PaymentWait { receiver })
}

impl PaymentSignal {
    /// Confirma el pago y despierta al surtidor que espera.
    ///
    /// # Errors
    ///
    /// [`RendezvousError::Abandoned`] si el surtidor ya no está esperando.
    pub fn resolve(self) -> Result<(), RendezvousError> {
        self.sender.send(()).map_err(|_| RendezvousError::Abandoned)
    }
}

impl PaymentWait {
    /// Bloquea hasta que la caja confirme el pago.
    ///
    /// # Errors
    ///
    /// [`RendezvousError::Abandoned`] si la señal se descartó sin resolverse
    /// (por ejemplo, si la caja terminó con pánico).
    pub fn wait(self) -> Result<(), RendezvousError> {
        self.receiver.recv().map_err(|_| RendezvousError::Abandoned)
    }
}
