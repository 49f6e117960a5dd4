use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::events::{ReceiverEvent, StatusSink};
use crate::frontend::CaptureDevice;
use crate::receiver::{ReceiverSession, ReceiverState};
use log::{debug, info};
use std::time::Duration;

/// Receive driver: owns the capture device and at most one session.
///
/// Every call takes `&mut self`, so ticks run to completion one at a time
/// and a tick can never re-enter the state machine.
pub struct Listener<C: CaptureDevice> {
    device: C,
    session: Option<ReceiverSession>,
}

impl<C: CaptureDevice> Listener<C> {
    pub fn new(device: C) -> Self {
        Self {
            device,
            session: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> Option<ReceiverState> {
        self.session.as_ref().map(ReceiverSession::state)
    }

    pub fn device(&self) -> &C {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut C {
        &mut self.device
    }

    /// Open the capture device and begin a fresh session.
    ///
    /// Fails with `SessionActive` if already listening, or with the device's
    /// own error (`DEVICE_ERROR`) if it cannot be opened.
    pub fn start<K: StatusSink + ?Sized>(&mut self, config: &ModemConfig, sink: &mut K) -> Result<()> {
        if self.session.is_some() {
            return Err(ModemError::SessionActive);
        }
        config.validate()?;
        self.device.open()?;

        self.session = Some(ReceiverSession::new(*config));
        info!("Listening for preamble");
        sink.emit(ReceiverEvent::Listening);
        Ok(())
    }

    /// Run one step of the sampling clock.
    ///
    /// Returns `false` when not listening or when the device has no more
    /// input.
    pub fn tick<K: StatusSink + ?Sized>(&mut self, config: &ModemConfig, now: Duration, sink: &mut K) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !self.device.advance(now) {
            return false;
        }
        session.tick(config, now, &mut self.device, sink);
        true
    }

    /// Halt sampling, release the device and discard any partial packet
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(
                "Stopping in {:?} with {} nibbles discarded",
                session.state(),
                session.nibbles().len()
            );
            self.device.close();
        }
    }

    /// Drive the sampling clock from zero until the device runs dry.
    ///
    /// Ticks fall exactly on multiples of the tick interval. The clock runs
    /// as fast as the device answers, which suits recorded input; live
    /// devices are expected to block in `advance` until `now` is reached.
    pub fn run<K: StatusSink + ?Sized>(&mut self, config: &ModemConfig, sink: &mut K) -> Result<()> {
        self.start(config, sink)?;
        let interval = config.tick_interval();
        let mut k: u32 = 0;
        while self.tick(config, interval * k, sink) {
            k += 1;
        }
        debug!("Input exhausted after {} ticks", k);
        self.stop();
        Ok(())
    }
}

impl<C: CaptureDevice> Drop for Listener<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
