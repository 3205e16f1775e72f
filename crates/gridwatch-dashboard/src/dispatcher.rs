//! Backend calls as spawned tasks
//!
//! Each call runs on its own task and reports back over a channel, so the
//! controller keeps handling input while requests are in flight. Completions
//! are handled in arrival order, which need not match issuance order.

use gridwatch_client::{ApiError, Backend, ControlResponse, MessageResponse};
use gridwatch_core::{AdminCommand, Mutation, Snapshot};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Outcome of one backend call
#[derive(Debug)]
pub enum Completion {
    Poll {
        seq: u64,
        result: Result<Snapshot, ApiError>,
    },
    TokenValidated {
        result: Result<(), ApiError>,
    },
    Mutated {
        mutation: Mutation,
        result: Result<MessageResponse, ApiError>,
    },
    AdminValidated {
        result: Result<(), ApiError>,
    },
    AdminControlled {
        command: AdminCommand,
        result: Result<ControlResponse, ApiError>,
    },
}

pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    tx: mpsc::UnboundedSender<Completion>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> (Self, CompletionReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                tx,
                in_flight: 0,
            },
            rx,
        )
    }

    /// Requests issued whose completion has not been handled yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Mark one completion as handled
    pub fn completed(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = call.await;
            if tx.send(completion).is_err() {
                debug!("Dashboard gone, dropping completion");
            }
        });
    }

    pub fn poll(&mut self, seq: u64) {
        let backend = self.backend.clone();
        self.spawn(async move {
            Completion::Poll {
                seq,
                result: backend.devices().await,
            }
        });
    }

    pub fn validate_token(&mut self, token: String) {
        let backend = self.backend.clone();
        self.spawn(async move {
            Completion::TokenValidated {
                result: backend.validate_token(&token).await,
            }
        });
    }

    pub fn mutate(&mut self, mutation: Mutation, token: String) {
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = match &mutation {
                Mutation::Power {
                    device_id,
                    power_level,
                } => backend.adjust_power(&token, device_id, *power_level).await,
                Mutation::Voltage { device_id, voltage } => {
                    backend.adjust_voltage(&token, device_id, *voltage).await
                }
            };
            Completion::Mutated { mutation, result }
        });
    }

    pub fn validate_admin(&mut self, token: String) {
        let backend = self.backend.clone();
        self.spawn(async move {
            Completion::AdminValidated {
                result: backend.validate_admin(&token).await,
            }
        });
    }

    pub fn admin_control(&mut self, command: AdminCommand, token: String) {
        let backend = self.backend.clone();
        self.spawn(async move {
            Completion::AdminControlled {
                command,
                result: backend.admin_control(&token, command).await,
            }
        });
    }
}
