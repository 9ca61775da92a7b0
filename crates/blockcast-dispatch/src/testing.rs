//! In-process connector for pool and dispatch tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::connection::{Connection, Connector};
use crate::error::{DispatchError, DispatchResult};

#[derive(Default)]
struct State {
    opened: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed: Mutex<Vec<usize>>,
    received: Mutex<Vec<String>>,
}

#[derive(Default)]
pub struct MockConnector {
    state: Arc<State>,
    refuse_after: Option<usize>,
    fail_on: Option<String>,
    break_on: Option<String>,
    latency: Duration,
}

impl MockConnector {
    pub fn refusing_after(mut self, count: usize) -> Self {
        self.refuse_after = Some(count);
        self
    }

    /// Connections fail `command` and report themselves broken afterwards.
    pub fn breaking_on(command: &str) -> Self {
        Self {
            break_on: Some(command.to_owned()),
            ..Default::default()
        }
    }

    pub fn failing_on(command: &str) -> Self {
        Self {
            fail_on: Some(command.to_owned()),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn closed_ids(&self) -> Vec<usize> {
        let mut ids = self.state.closed.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }

    pub fn received(&self) -> Vec<String> {
        let mut commands = self.received_in_order();
        commands.sort();
        commands
    }

    /// Successful commands in the order the connections executed them.
    pub fn received_in_order(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect(&self) -> DispatchResult<MockConnection> {
        let id = self.state.opened.load(Ordering::SeqCst);
        if self.refuse_after.is_some_and(|limit| id >= limit) {
            return Err(DispatchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id,
            state: Arc::clone(&self.state),
            fail_on: self.fail_on.clone(),
            break_on: self.break_on.clone(),
            broken: false,
            latency: self.latency,
        })
    }
}

pub struct MockConnection {
    id: usize,
    state: Arc<State>,
    fail_on: Option<String>,
    break_on: Option<String>,
    broken: bool,
    latency: Duration,
}

impl Connection for MockConnection {
    fn command(&mut self, command: &str) -> DispatchResult<String> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(command) {
            return Err(DispatchError::protocol("rejected"));
        }
        if self.broken || self.break_on.as_deref() == Some(command) {
            self.broken = true;
            return Err(DispatchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )));
        }
        self.state.received.lock().unwrap().push(command.to_owned());
        Ok(format!("ok {command}"))
    }

    fn is_broken(&self) -> bool {
        self.broken
    }

    fn close(self) -> DispatchResult<()> {
        self.state.closed.lock().unwrap().push(self.id);
        Ok(())
    }
}
