//! # Módulo de Trabajadores
//!
//! Un trabajador por estación. Cada uno drena la cola de su estación en orden
//! FIFO y termina cuando la cola se cierra y queda vacía.
//!
//! El surtidor no toma el siguiente auto hasta que la caja confirma el pago
//! del anterior: el cliente sigue ocupando el surtidor mientras espera y paga.
//!
//! ```text
//! Libre → Cargando → EsperandoPago → Libre … → Cerrado
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam::sync::WaitGroup;
use log::{debug, error, info};
use rand::rngs::StdRng;

use crate::car::Car;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::queue::BoundedQueue;
use crate::station::Station;

/// Trabajador de un surtidor.
pub struct StandWorker {
    station: Arc<Station>,
    payments: Arc<BoundedQueue<Car>>,
    config: Arc<SimulationConfig>,
    rng: StdRng,
    _done: WaitGroup,
}

impl StandWorker {
    /// Crea el trabajador de `station`.
    ///
    /// # Arguments
    ///
    /// * `station` - Surtidor que atiende
    /// * `payments` - Cola hacia el enrutador de cajas
    /// * `config` - Configuración compartida de la corrida
    /// * `rng` - Generador propio del hilo
    /// * `done` - Barrera de finalización de surtidores; se libera al terminar
    pub fn new(
        station: Arc<Station>,
        payments: Arc<BoundedQueue<Car>>,
        config: Arc<SimulationConfig>,
        rng: StdRng,
        done: WaitGroup,
    ) -> Self {
        Self { station, payments, config, rng, _done: done }
    }

    /// Atiende autos hasta que la cola del surtidor se cierre.
    ///
    /// # Returns
    ///
    /// Cantidad de autos atendidos.
    pub fn run(mut self) -> Result<usize, SimulationError> {
        let label = format!("{} {}", self.station.kind(), self.station.id());
        info!("[{}] abierto", label);

        let mut served = 0usize;
        while let Some(car) = self.station.inbox().pop() {
            if let Err(e) = self.serve(car) {
                error!("[{}] abortando: {}", label, e);
                abort_inbox(&self.station);
                return Err(e);
            }
            served += 1;
        }

        info!("[{}] cerrado tras atender {} autos", label, served);
        Ok(served)
    }

    fn serve(&mut self, mut car: Car) -> Result<(), SimulationError> {
        let car_id = car.id();
        self.station.occupy();

        let wait = car
            .start_fueling(self.station.id(), Instant::now())
            .ok_or(SimulationError::MissingTimestamp { car: car_id, field: "stand_queue_entered_at" })?;

        let units = self.config.fuel(car.fuel()).service.sample(&mut self.rng);
        debug!(
            "[surtidor {}] Auto {:02} ({}) esperó {:?}, carga {} u",
            self.station.id(),
            car_id,
            car.fuel(),
            wait,
            units
        );
        thread::sleep(self.config.units_to_duration(units));
        car.finish_fueling(units);

        let payment = car
            .arm_rendezvous()
            .map_err(|source| SimulationError::Rendezvous { car: car_id, source })?;

        self.payments
            .push(car)
            .map_err(|_| SimulationError::QueueClosed("cola de pago".to_string()))?;

        payment
            .wait()
            .map_err(|source| SimulationError::Rendezvous { car: car_id, source })?;

        self.station.release();
        debug!("[surtidor {}] Auto {:02} pagó y liberó el surtidor", self.station.id(), car_id);
        Ok(())
    }
}

/// Trabajador de una caja.
pub struct RegisterWorker {
    station: Arc<Station>,
    exit: Arc<BoundedQueue<Car>>,
    config: Arc<SimulationConfig>,
    rng: StdRng,
    _done: WaitGroup,
}

impl RegisterWorker {
    pub fn new(
        station: Arc<Station>,
        exit: Arc<BoundedQueue<Car>>,
        config: Arc<SimulationConfig>,
        rng: StdRng,
        done: WaitGroup,
    ) -> Self {
        Self { station, exit, config, rng, _done: done }
    }

    /// Cobra autos hasta que la cola de la caja se cierre.
    pub fn run(mut self) -> Result<usize, SimulationError> {
        let id = self.station.id();
        info!("[caja {}] abierta", id);

        let mut served = 0usize;
        while let Some(car) = self.station.inbox().pop() {
            if let Err(e) = self.serve(car) {
                error!("[caja {}] abortando: {}", id, e);
                abort_inbox(&self.station);
                return Err(e);
            }
            served += 1;
        }

        info!("[caja {}] cerrada tras cobrar {} autos", id, served);
        Ok(served)
    }

    fn serve(&mut self, mut car: Car) -> Result<(), SimulationError> {
        let car_id = car.id();
        self.station.occupy();

        car.start_payment(self.station.id(), Instant::now())
            .ok_or(SimulationError::MissingTimestamp { car: car_id, field: "register_queue_entered_at" })?;

        let units = self.config.registers.payment.sample(&mut self.rng);
        thread::sleep(self.config.units_to_duration(units));
        car.finish_payment(units, Instant::now());

        // Exactamente una señal por auto: libera al surtidor que lo despachó.
        car.take_rendezvous()
            .and_then(|signal| signal.resolve())
            .map_err(|source| SimulationError::Rendezvous { car: car_id, source })?;
        self.station.release();

        debug!("[caja {}] Auto {:02} cobrado en {} u", self.station.id(), car_id, units);
        self.exit
            .push(car)
            .map_err(|_| SimulationError::QueueClosed("salida".to_string()))
    }
}

// Cierra la cola y descarta lo pendiente: los autos descartados sueltan su
// señal de pago y ningún surtidor queda esperando para siempre.
fn abort_inbox(station: &Station) {
    station.inbox().close();
    while station.inbox().pop().is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::FuelKind;
    use crate::config::ServiceRange;
    use crate::error::RendezvousError;
    use crate::station::StationKind;
    use std::time::Duration;

    fn test_config() -> Arc<SimulationConfig> {
        let mut config = SimulationConfig::default();
        config.stands.gas.service = ServiceRange::new(2, 2);
        config.registers.payment = ServiceRange::new(1, 1);
        config.seed = Some(1);
        Arc::new(config)
    }

    fn queued_car(id: usize) -> Car {
        let mut car = Car::new(id, FuelKind::Gas);
        car.enter_stand_queue(Instant::now());
        car
    }

    #[test]
    fn test_stand_holds_car_until_payment() {
        let config = test_config();
        let station = Arc::new(Station::new(0, StationKind::Fuel(FuelKind::Gas), 2));
        let payments = Arc::new(BoundedQueue::new(2));
        station.inbox().push(queued_car(0)).unwrap();
        station.inbox().push(queued_car(1)).unwrap();
        station.inbox().close();

        let done = WaitGroup::new();
        let worker = StandWorker::new(
            Arc::clone(&station),
            Arc::clone(&payments),
            Arc::clone(&config),
            config.rng_for(1),
            done.clone(),
        );
        let handle = thread::spawn(move || worker.run());

        let mut first = payments.pop().unwrap();
        assert_eq!(first.id(), 0);
        assert_eq!(first.fuel_service(), Some(2));

        // Sin pago, el surtidor no avanza al segundo auto.
        thread::sleep(Duration::from_millis(30));
        assert!(payments.is_empty());
        assert_eq!(station.occupancy(), 1);
        assert_eq!(station.inbox().len(), 1);

        first.take_rendezvous().unwrap().resolve().unwrap();

        let mut second = payments.pop().unwrap();
        assert_eq!(second.id(), 1);
        second.take_rendezvous().unwrap().resolve().unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), 2);
        done.wait();
        assert_eq!(station.peak_occupancy(), 1);
        assert_eq!(station.served(), 2);
    }

    #[test]
    fn test_abandoned_payment_is_reported() {
        let config = test_config();
        let station = Arc::new(Station::new(0, StationKind::Fuel(FuelKind::Gas), 2));
        let payments = Arc::new(BoundedQueue::new(2));
        station.inbox().push(queued_car(0)).unwrap();
        station.inbox().close();

        let worker = StandWorker::new(
            Arc::clone(&station),
            Arc::clone(&payments),
            Arc::clone(&config),
            config.rng_for(1),
            WaitGroup::new(),
        );
        let handle = thread::spawn(move || worker.run());

        drop(payments.pop().unwrap());

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Rendezvous { car: 0, source: RendezvousError::Abandoned }
        ));
    }

    #[test]
    fn test_register_resolves_and_forwards() {
        let config = test_config();
        let station = Arc::new(Station::new(0, StationKind::Register, 2));
        let exit = Arc::new(BoundedQueue::new(2));

        let mut car = queued_car(5);
        car.start_fueling(0, Instant::now());
        car.finish_fueling(2);
        let payment = car.arm_rendezvous().unwrap();
        car.enter_register_queue(Instant::now());
        station.inbox().push(car).unwrap();
        station.inbox().close();

        let worker = RegisterWorker::new(
            Arc::clone(&station),
            Arc::clone(&exit),
            Arc::clone(&config),
            config.rng_for(2),
            WaitGroup::new(),
        );
        assert_eq!(worker.run().unwrap(), 1);

        assert_eq!(payment.wait(), Ok(()));
        let car = exit.pop().unwrap();
        assert_eq!(car.payment_service(), Some(1));
        assert_eq!(car.register_id(), Some(0));
        assert!(car.payment_completed_at().is_some());
    }

    #[test]
    fn test_register_rejects_unarmed_car() {
        let config = test_config();
        let station = Arc::new(Station::new(0, StationKind::Register, 2));
        let mut car = queued_car(9);
        car.enter_register_queue(Instant::now());
        station.inbox().push(car).unwrap();
        station.inbox().push(queued_car(10)).unwrap();

        let worker = RegisterWorker::new(
            Arc::clone(&station),
            Arc::new(BoundedQueue::new(2)),
            Arc::clone(&config),
            config.rng_for(2),
            WaitGroup::new(),
        );
        let err = worker.run().unwrap_err();

        assert!(matches!(
            err,
            SimulationError::Rendezvous { car: 9, source: RendezvousError::NotArmed }
        ));
        // La cola quedó cerrada y drenada.
        assert!(station.inbox().is_closed());
        assert!(station.inbox().is_empty());
    }
}
