//! Fixed-capacity byte pipe
//!
//! One circular buffer fronted by two kinds of endpoints:
//! - [`Writer`] (write-only) copies bytes into free space
//! - [`Reader`] (read-only) copies bytes out, each byte reaches exactly one reader
//!
//! Writers wait while the buffer is full, readers wait while it is empty.
//! A transfer moves as many bytes as currently fit (write) or are present
//! (read) and returns that count; the caller loops for the remainder.

use std::fmt;
use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::config::{ConfigError, PipeConfig};
use crate::error::PipeError;
use crate::interrupt::Interrupt;
use crate::region::{DestRegion, SourceRegion};
use crate::ring::{Direction, Ring};
use crate::signal::{Boundary, Signal};

/// Move up to `len` bytes from `src` into the locked ring
fn fill<S: SourceRegion + ?Sized>(
    signal: &Signal,
    mut ring: MutexGuard<'_, Ring>,
    src: &S,
    len: usize,
) -> Result<usize, PipeError> {
    let plan = ring.plan(len, Direction::Fill);
    if let Err(fault) = ring.fill(&plan, src) {
        log::error!("pipe {}: copy from caller failed: {fault}", signal.debug_hint());
        signal.abandon(ring, Boundary::HasSpace);
        return Err(PipeError::TransferFault(fault));
    }
    ring.commit(&plan);
    log::trace!(
        "pipe {}: wrote {} of {} bytes (short={}, wraps={}), {:?}",
        signal.debug_hint(),
        plan.len(),
        len,
        plan.is_short(),
        plan.wraps(),
        ring.cursors()
    );
    signal.release(ring, Direction::Fill);
    Ok(plan.len())
}

/// Move up to `len` bytes from the locked ring into `dst`
fn drain<D: DestRegion + ?Sized>(
    signal: &Signal,
    mut ring: MutexGuard<'_, Ring>,
    dst: &mut D,
    len: usize,
) -> Result<usize, PipeError> {
    let plan = ring.plan(len, Direction::Drain);
    if let Err(fault) = ring.drain(&plan, dst) {
        log::error!("pipe {}: copy to caller failed: {fault}", signal.debug_hint());
        signal.abandon(ring, Boundary::HasData);
        return Err(PipeError::TransferFault(fault));
    }
    ring.commit(&plan);
    log::trace!(
        "pipe {}: read {} of {} bytes (short={}, wraps={}), {:?}",
        signal.debug_hint(),
        plan.len(),
        len,
        plan.is_short(),
        plan.wraps(),
        ring.cursors()
    );
    signal.release(ring, Direction::Drain);
    Ok(plan.len())
}

/// Write-only endpoint
///
/// # Thread Safety
///
/// Writers are cheap to clone and every method takes `&self`, so one
/// endpoint may be shared between threads or each thread may own a clone.
/// Concurrent writes are serialized on the pipe lock; the bytes of a single
/// call are stored contiguously in the stream.
#[derive(Clone)]
pub struct Writer {
    shared: Arc<Signal>,
    interrupt: Option<Interrupt>,
}

impl Writer {
    /// Make blocking writes on this endpoint interruptible by `interrupt`
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    #[must_use]
    pub fn interrupt(&self) -> Option<&Interrupt> {
        self.interrupt.as_ref()
    }

    /// Write bytes, waiting while the pipe is full
    ///
    /// Returns the number of bytes written, which is less than `data.len()`
    /// when the pipe had less free space.
    ///
    /// # Errors
    /// [`PipeError::Retry`] if the endpoint's interrupt fired while waiting.
    pub fn write(&self, data: &[u8]) -> Result<usize, PipeError> {
        self.write_region(data, data.len())
    }

    /// Write `len` bytes taken from `src`
    ///
    /// Zero-length writes return immediately without touching the lock.
    ///
    /// # Errors
    /// - [`PipeError::Retry`] if the endpoint's interrupt fired while waiting
    /// - [`PipeError::TransferFault`] if `src` could not supply the bytes
    pub fn write_region<S: SourceRegion + ?Sized>(
        &self,
        src: &S,
        len: usize,
    ) -> Result<usize, PipeError> {
        if len == 0 {
            return Ok(0);
        }
        let ring = self
            .shared
            .acquire(Boundary::HasSpace, self.interrupt.as_ref())?;
        fill(&self.shared, ring, src, len)
    }

    /// Write without waiting
    ///
    /// # Errors
    /// [`PipeError::WouldBlock`] if the pipe is full.
    pub fn try_write(&self, data: &[u8]) -> Result<usize, PipeError> {
        if data.is_empty() {
            return Ok(0);
        }
        let ring = self.shared.try_acquire(Boundary::HasSpace)?;
        fill(&self.shared, ring, data, data.len())
    }

    /// Write bytes, awaiting free space
    ///
    /// Dropping the future before it completes leaves the pipe unchanged.
    /// Interrupts are not consulted and a slice cannot fault, so for
    /// slices this always resolves to `Ok`.
    pub async fn write_async(&self, data: &[u8]) -> Result<usize, PipeError> {
        loop {
            match self.try_write(data) {
                Err(PipeError::WouldBlock) => {}
                result => return result,
            }
            self.shared.wait_async(Boundary::HasSpace).await;
        }
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipe.Writer(hint={}, interruptible={})",
            self.shared.debug_hint(),
            self.interrupt.is_some()
        )
    }
}

/// Read-only endpoint
///
/// # Thread Safety
///
/// Same as [`Writer`]: cloneable, `&self` methods, reads serialized on the
/// pipe lock. With several readers each byte is delivered to exactly one of
/// them.
#[derive(Clone)]
pub struct Reader {
    shared: Arc<Signal>,
    interrupt: Option<Interrupt>,
}

impl Reader {
    /// Make blocking reads on this endpoint interruptible by `interrupt`
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    #[must_use]
    pub fn interrupt(&self) -> Option<&Interrupt> {
        self.interrupt.as_ref()
    }

    /// Read into `buf`, waiting while the pipe is empty
    ///
    /// Returns the number of bytes read, which is less than `buf.len()` when
    /// the pipe held fewer bytes.
    ///
    /// # Errors
    /// [`PipeError::Retry`] if the endpoint's interrupt fired while waiting.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, PipeError> {
        let len = buf.len();
        self.read_region(buf, len)
    }

    /// Read up to `len` bytes into `dst`
    ///
    /// Zero-length reads return immediately without touching the lock.
    ///
    /// # Errors
    /// - [`PipeError::Retry`] if the endpoint's interrupt fired while waiting
    /// - [`PipeError::TransferFault`] if `dst` could not take the bytes; the
    ///   bytes stay in the pipe
    pub fn read_region<D: DestRegion + ?Sized>(
        &self,
        dst: &mut D,
        len: usize,
    ) -> Result<usize, PipeError> {
        if len == 0 {
            return Ok(0);
        }
        let ring = self
            .shared
            .acquire(Boundary::HasData, self.interrupt.as_ref())?;
        drain(&self.shared, ring, dst, len)
    }

    /// Read without waiting
    ///
    /// # Errors
    /// [`PipeError::WouldBlock`] if the pipe is empty.
    pub fn try_read(&self, buf: &mut [u8]) -> Result<usize, PipeError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        let ring = self.shared.try_acquire(Boundary::HasData)?;
        drain(&self.shared, ring, buf, len)
    }

    /// Read into `buf`, awaiting data
    ///
    /// Dropping the future before it completes leaves the pipe unchanged.
    /// Interrupts are not consulted and a slice cannot fault, so for
    /// slices this always resolves to `Ok`.
    pub async fn read_async(&self, buf: &mut [u8]) -> Result<usize, PipeError> {
        loop {
            match self.try_read(buf) {
                Err(PipeError::WouldBlock) => {}
                result => return result,
            }
            self.shared.wait_async(Boundary::HasData).await;
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipe.Reader(hint={}, interruptible={})",
            self.shared.debug_hint(),
            self.interrupt.is_some()
        )
    }
}

/// Pipe factory and owner of the shared buffer
///
/// The buffer lives as long as the pipe or any endpoint created from it.
pub struct Pipe {
    shared: Arc<Signal>,
}

impl Pipe {
    /// Create a pipe with an empty, zeroed buffer
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PipeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(&config))
    }

    fn build(config: &PipeConfig) -> Self {
        log::info!(
            "pipe {} init, capacity={}",
            config.debug_hint,
            config.capacity
        );
        Self {
            shared: Arc::new(Signal::new(config.capacity, &config.debug_hint)),
        }
    }

    /// Get a new write-only endpoint
    #[must_use]
    pub fn writer(&self) -> Writer {
        Writer {
            shared: Arc::clone(&self.shared),
            interrupt: None,
        }
    }

    /// Get a new read-only endpoint
    #[must_use]
    pub fn reader(&self) -> Reader {
        Reader {
            shared: Arc::clone(&self.shared),
            interrupt: None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity()
    }

    /// Bytes waiting to be read
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Bytes that can be written without waiting
    #[must_use]
    pub fn free(&self) -> usize {
        self.shared.lock().free()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.shared.lock().is_full()
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Self::build(&PipeConfig::default())
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipe({:?})", self.shared)
    }
}

// Blocking I/O traits

impl embedded_io::ErrorType for Writer {
    type Error = PipeError;
}

impl embedded_io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Writer::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::ErrorType for Reader {
    type Error = PipeError;
}

impl embedded_io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Reader::read(self, buf)
    }
}

impl std::io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(Writer::write(self, buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(Reader::read(self, buf)?)
    }
}

// Async I/O traits

impl embedded_io_async::Write for Writer {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_async(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io_async::Read for Reader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_async(buf).await
    }
}
