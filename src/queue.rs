//! Cola acotada bloqueante con cierre explícito.
//!
//! `push` bloquea mientras la cola está llena (contrapresión) y `pop` bloquea
//! mientras está vacía. Una vez cerrada, `pop` entrega lo que quede y luego
//! devuelve `None`; `push` devuelve el elemento al llamador.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Cola FIFO de capacidad fija compartida entre hilos productores y consumidores.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct Inner<T> {
    buf: VecDeque<T>,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    /// Crea una cola con la capacidad indicada (mínimo 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    // Los datos protegidos siguen siendo coherentes aunque otro hilo haya
    // entrado en pánico con el lock tomado.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola `item`, bloqueando mientras la cola esté llena.
    ///
    /// # Errors
    ///
    /// Devuelve `Err(item)` si la cola está cerrada.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut g = self.lock();
        while g.buf.len() >= self.capacity && !g.closed {
            g = self.not_full.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
        if g.closed {
            return Err(item);
        }
        g.buf.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola el siguiente elemento en orden FIFO.
    ///
    /// Devuelve `None` solo cuando la cola está cerrada y vacía.
    pub fn pop(&self) -> Option<T> {
        let mut g = self.lock();
        loop {
            if let Some(item) = g.buf.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if g.closed {
                return None;
            }
            g = self.not_empty.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cierra la cola y despierta a todos los hilos bloqueados. Idempotente.
    pub fn close(&self) {
        let mut g = self.lock();
        g.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Indica si ya se llamó a [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Cantidad de elementos encolados en este momento.
    pub fn len(&self) -> usize {
        self.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacidad máxima; `push` bloquea al alcanzarla.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
