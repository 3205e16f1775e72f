//! Administrator authorization gate
//!
//! Stricter than the operator panel: unlocking needs a second token, the
//! unlock is one-way for the life of the session, and every command must be
//! reconfirmed by name before it is sent.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Locked,
    /// An `admin/validate` call is in flight
    Unlocking,
    Unlocked,
}

/// Fleet-wide destructive command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminCommand {
    Shutdown,
    Isolate,
    CompromiseAll,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 3] = [
        AdminCommand::Shutdown,
        AdminCommand::Isolate,
        AdminCommand::CompromiseAll,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCommand::Shutdown => "shutdown",
            AdminCommand::Isolate => "isolate",
            AdminCommand::CompromiseAll => "compromise_all",
        }
    }
}

impl std::fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown admin command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for AdminCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminCommand::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    EditToken(String),
    /// "Insert admin key" pressed
    InsertKey,
    ValidationPassed,
    ValidationRejected,
    ValidationFailed { error: String },
    Invoke(AdminCommand),
    /// Answer to the pending confirmation prompt
    Confirm(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEffect {
    ValidateAdminToken { token: String },
    /// Ask the user to reconfirm; the answer comes back as [`GateEvent::Confirm`]
    AskConfirmation { command: AdminCommand, prompt: String },
    Dispatch { command: AdminCommand, token: String },
    Status(String),
}

#[derive(Debug, Clone)]
pub struct AdminGate {
    state: GateState,
    token: String,
    pending: Option<AdminCommand>,
}

impl Default for AdminGate {
    fn default() -> Self {
        Self {
            state: GateState::Locked,
            token: String::new(),
            pending: None,
        }
    }
}

/// Prompt text naming the exact command
pub fn confirmation_prompt(command: AdminCommand) -> String {
    format!(
        "ARE YOU SURE? This action: {}!",
        command.as_str().to_uppercase()
    )
}

impl AdminGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_editable(&self) -> bool {
        self.state == GateState::Locked
    }

    /// Command waiting for a yes/no answer
    pub fn pending_confirmation(&self) -> Option<AdminCommand> {
        self.pending
    }

    pub fn handle(&mut self, event: GateEvent) -> Vec<GateEffect> {
        match event {
            GateEvent::EditToken(token) => {
                if !self.token_editable() {
                    debug!(state = ?self.state, "Admin token edit refused");
                    return vec![GateEffect::Status("admin token is locked".to_string())];
                }
                self.token = token;
                Vec::new()
            }
            GateEvent::InsertKey => self.insert_key(),
            GateEvent::ValidationPassed => {
                if self.state != GateState::Unlocking {
                    warn!(state = ?self.state, "Unexpected admin validation result");
                    return Vec::new();
                }
                self.state = GateState::Unlocked;
                info!("Admin commands unlocked");
                vec![GateEffect::Status(
                    "admin key accepted, commands unlocked".to_string(),
                )]
            }
            GateEvent::ValidationRejected => {
                self.relock_after_failure();
                vec![GateEffect::Status("admin token rejected".to_string())]
            }
            GateEvent::ValidationFailed { error } => {
                self.relock_after_failure();
                vec![GateEffect::Status(format!("error: {}", error))]
            }
            GateEvent::Invoke(command) => self.invoke(command),
            GateEvent::Confirm(accepted) => self.confirm(accepted),
        }
    }

    fn insert_key(&mut self) -> Vec<GateEffect> {
        match self.state {
            GateState::Locked => {
                let token = self.token.trim();
                if token.is_empty() {
                    return vec![GateEffect::Status("admin token required".to_string())];
                }
                self.state = GateState::Unlocking;
                vec![GateEffect::ValidateAdminToken {
                    token: token.to_string(),
                }]
            }
            GateState::Unlocking => Vec::new(),
            GateState::Unlocked => vec![GateEffect::Status(
                "admin key already accepted".to_string(),
            )],
        }
    }

    // Only an in-flight unlock can fall back; Unlocked never returns to Locked
    fn relock_after_failure(&mut self) {
        if self.state == GateState::Unlocking {
            self.state = GateState::Locked;
        }
        warn!("Admin token not accepted");
    }

    fn invoke(&mut self, command: AdminCommand) -> Vec<GateEffect> {
        if !self.is_unlocked() {
            debug!(command = %command, "Admin command ignored while locked");
            return vec![GateEffect::Status("admin commands are locked".to_string())];
        }
        if self.token.trim().is_empty() {
            return vec![GateEffect::Status("admin token required".to_string())];
        }
        self.pending = Some(command);
        vec![GateEffect::AskConfirmation {
            command,
            prompt: confirmation_prompt(command),
        }]
    }

    fn confirm(&mut self, accepted: bool) -> Vec<GateEffect> {
        let Some(command) = self.pending.take() else {
            return Vec::new();
        };
        if !accepted {
            info!(command = %command, "Admin command declined");
            return Vec::new();
        }
        vec![GateEffect::Dispatch {
            command,
            token: self.token.trim().to_string(),
        }]
    }
}
