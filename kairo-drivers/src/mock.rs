//! Scripted bus and delay for driver tests
//!
//! [`MockBus`] is both the port and the recorder: every open, write, read
//! and delay lands in one ordered event log, and reads are answered from a
//! queue of canned responses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use kairo_hal::{BusPort, BusSlave};

/// One recorded bus or delay event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(u8),
    Write(u8, Vec<u8>),
    Read(u8, usize),
    Delay(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// Nothing answered at this address
    Nack(u8),
    /// Injected transport failure
    Io,
}

#[derive(Default)]
struct State {
    present: Vec<u8>,
    events: Vec<Event>,
    responses: VecDeque<Vec<u8>>,
    fail_io: bool,
}

#[derive(Clone, Default)]
pub struct MockBus {
    state: Rc<RefCell<State>>,
}

impl MockBus {
    /// Bus with devices answering at `present`
    pub fn new(present: &[u8]) -> Self {
        let bus = Self::default();
        bus.state.borrow_mut().present = present.to_vec();
        bus
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            state: self.state.clone(),
        }
    }

    /// Queue the bytes returned by the next read
    pub fn respond(&self, bytes: &[u8]) {
        self.state.borrow_mut().responses.push_back(bytes.to_vec());
    }

    /// Make every following transaction fail
    pub fn fail_io(&self, fail: bool) {
        self.state.borrow_mut().fail_io = fail;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Payloads of all writes, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Write(_, data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sum of all recorded delays
    pub fn total_delay_ns(&self) -> u64 {
        self.state
            .borrow()
            .events
            .iter()
            .map(|e| match e {
                Event::Delay(ns) => *ns,
                _ => 0,
            })
            .sum()
    }

    pub fn pending_responses(&self) -> usize {
        self.state.borrow().responses.len()
    }
}

impl BusPort for MockBus {
    type Error = MockError;
    type Slave = MockSlave;

    async fn open(&self, address: u8) -> Result<Self::Slave, Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.present.contains(&address) {
            return Err(MockError::Nack(address));
        }
        state.events.push(Event::Open(address));
        Ok(MockSlave {
            address,
            state: self.state.clone(),
        })
    }
}

pub struct MockSlave {
    address: u8,
    state: Rc<RefCell<State>>,
}

impl BusSlave for MockSlave {
    type Error = MockError;

    fn address(&self) -> u8 {
        self.address
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_io {
            return Err(MockError::Io);
        }
        state.events.push(Event::Write(self.address, bytes.to_vec()));
        Ok(())
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_io {
            return Err(MockError::Io);
        }
        state.events.push(Event::Read(self.address, buf.len()));
        let response = state.responses.pop_front().unwrap_or_default();
        let n = response.len().min(buf.len());
        buf[..n].copy_from_slice(&response[..n]);
        Ok(n)
    }
}

#[derive(Clone)]
pub struct MockDelay {
    state: Rc<RefCell<State>>,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().events.push(Event::Delay(ns as u64));
    }

    async fn delay_us(&mut self, us: u32) {
        self.state
            .borrow_mut()
            .events
            .push(Event::Delay(us as u64 * 1_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.state
            .borrow_mut()
            .events
            .push(Event::Delay(ms as u64 * 1_000_000));
    }
}

/// Delay event for a whole number of milliseconds
pub fn ms(ms: u64) -> Event {
    Event::Delay(ms * 1_000_000)
}
