// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Scripted in-process device for tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::session::{Connector, Session};
use super::types::{Params, Record, Reply};
use crate::config::RouterConfig;
use crate::error::DeviceError;

type Handler = Arc<dyn Fn(&Params) -> Reply + Send + Sync>;

#[derive(Default)]
struct State {
    handlers: HashMap<String, Handler>,
    hanging: HashSet<String>,
    calls: Vec<(String, Params)>,
    sessions_opened: usize,
    channel_closes: usize,
    session_closes: usize,
    connect_error: Option<DeviceError>,
    hang_connect: bool,
    fail_close: bool,
}

/// Fake device answering per command path; unscripted commands succeed empty
#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    state: Arc<Mutex<State>>,
}

impl FakeDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn respond(&self, path: &str, reply: Reply) {
        self.on(path, move |_| reply.clone());
    }

    pub(crate) fn respond_records(&self, path: &str, records: Vec<Record>) {
        self.respond(path, Reply::Done(records));
    }

    pub(crate) fn on(&self, path: &str, handler: impl Fn(&Params) -> Reply + Send + Sync + 'static) {
        self.with(|s| s.handlers.insert(path.to_string(), Arc::new(handler)));
    }

    pub(crate) fn hang_on(&self, path: &str) {
        self.with(|s| s.hanging.insert(path.to_string()));
    }

    pub(crate) fn hang_on_connect(&self) {
        self.with(|s| s.hang_connect = true);
    }

    pub(crate) fn fail_connect(&self, error: DeviceError) {
        self.with(|s| s.connect_error = Some(error));
    }

    pub(crate) fn fail_close(&self) {
        self.with(|s| s.fail_close = true);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Params)> {
        self.with(|s| s.calls.clone())
    }

    pub(crate) fn calls_to(&self, path: &str) -> Vec<Params> {
        self.with(|s| {
            s.calls
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, params)| params.clone())
                .collect()
        })
    }

    pub(crate) fn sessions_opened(&self) -> usize {
        self.with(|s| s.sessions_opened)
    }

    pub(crate) fn channel_closes(&self) -> usize {
        self.with(|s| s.channel_closes)
    }

    pub(crate) fn session_closes(&self) -> usize {
        self.with(|s| s.session_closes)
    }
}

pub(crate) struct FakeSession {
    device: FakeDevice,
}

impl Connector for FakeDevice {
    type Session = FakeSession;

    async fn open(&self, _router: &RouterConfig) -> Result<FakeSession, DeviceError> {
        let (hang, error) = self.with(|s| (s.hang_connect, s.connect_error.clone()));
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(error) = error {
            return Err(error);
        }
        self.with(|s| s.sessions_opened += 1);
        Ok(FakeSession {
            device: self.clone(),
        })
    }
}

impl Session for FakeSession {
    async fn send(&mut self, path: &str, params: &Params) -> Reply {
        let (hang, handler) = self.device.with(|s| {
            s.calls.push((path.to_string(), params.clone()));
            (s.hanging.contains(path), s.handlers.get(path).cloned())
        });
        if hang {
            std::future::pending::<()>().await;
        }
        match handler {
            Some(handler) => handler(params),
            None => Reply::Done(Vec::new()),
        }
    }

    async fn close_channel(&mut self) -> Result<(), DeviceError> {
        self.device.with(|s| {
            s.channel_closes += 1;
            if s.fail_close {
                Err(DeviceError::Transport("channel already closed".into()))
            } else {
                Ok(())
            }
        })
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.device.with(|s| {
            s.session_closes += 1;
            if s.fail_close {
                Err(DeviceError::Transport("session already closed".into()))
            } else {
                Ok(())
            }
        })
    }
}

/// Builds a record from literal pairs
pub(crate) fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
