//! The dashboard controller
//!
//! One [`Dashboard`] owns every piece of client state. Poll ticks, operator
//! input and backend completions are handled one at a time on a single task;
//! the state machines in `gridwatch-core` decide, and this module carries out
//! their effects.

use anyhow::Result;
use gridwatch_client::{ApiError, Backend, MessageResponse};
use gridwatch_core::{
    project, AdminGate, ApplyOutcome, ControlPanel, DashboardView, GateEffect, GateEvent,
    IncidentLog, LogSource, Mutation, NoticeLevel, Notices, PanelEffect, PanelEvent,
    PreviewLayer, Slider, SnapshotStore,
};
use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatcher::{Completion, CompletionReceiver, Dispatcher};
use crate::input::{is_affirmative, Command, HELP};
use crate::poll::PollTicker;
use crate::render::{render, Screen};

/// Whether the event loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Dashboard {
    store: SnapshotStore,
    preview: PreviewLayer,
    panel: ControlPanel,
    gate: AdminGate,
    log: IncidentLog,
    notices: Notices,
    operator_text: Option<String>,
    admin_text: Option<String>,
    message: Option<String>,
    prompt: Option<String>,
    dispatcher: Dispatcher,
    dirty: bool,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> (Self, CompletionReceiver) {
        let (dispatcher, completions) = Dispatcher::new(backend);
        let dashboard = Self {
            store: SnapshotStore::new(),
            preview: PreviewLayer::new(),
            panel: ControlPanel::new(),
            gate: AdminGate::new(),
            log: IncidentLog::new(config.log.max_entries),
            notices: Notices::default(),
            operator_text: None,
            admin_text: None,
            message: None,
            prompt: None,
            dispatcher,
            dirty: true,
        };
        (dashboard, completions)
    }

    /// Issue a snapshot fetch with a fresh sequence number
    pub fn poll(&mut self) {
        let seq = self.store.issue();
        debug!(seq, "Polling devices");
        self.dispatcher.poll(seq);
    }

    /// Current list and chart view-models
    pub fn view(&self) -> DashboardView {
        project(self.store.current(), &self.preview)
    }

    pub fn render(&self) -> String {
        let view = self.view();
        render(&Screen {
            view: &view,
            updated_at: self.store.updated_at(),
            panel: &self.panel,
            gate: &self.gate,
            operator_text: self.operator_text.as_deref(),
            admin_text: self.admin_text.as_deref(),
            message: self.message.as_deref(),
            prompt: self.prompt.as_deref(),
            notices: &self.notices,
            log: &self.log,
        })
    }

    /// Handle one line of operator input
    pub fn handle_line(&mut self, line: &str) -> Flow {
        self.dirty = true;
        self.message = None;

        if self.gate.pending_confirmation().is_some() {
            let effects = self.gate.handle(GateEvent::Confirm(is_affirmative(line)));
            self.prompt = None;
            self.apply_gate_effects(effects);
            return Flow::Continue;
        }

        match line.parse::<Command>() {
            Ok(command) => self.handle_command(command),
            Err(e) => {
                self.message = Some(e.to_string());
                Flow::Continue
            }
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Flow {
        self.dirty = true;
        match command {
            Command::Token(token) => self.panel_event(PanelEvent::EditToken(token)),
            Command::Submit => self.panel_event(PanelEvent::Submit),
            Command::Target(id) => self.panel_event(PanelEvent::SelectTarget(id)),
            Command::Drag { slider, value } => {
                self.panel_event(PanelEvent::SliderInput { slider, value })
            }
            Command::Set { slider, value } => {
                self.panel_event(PanelEvent::SliderCommit { slider, value })
            }
            Command::AdminToken(token) => self.gate_event(GateEvent::EditToken(token)),
            Command::Unlock => self.gate_event(GateEvent::InsertKey),
            Command::Admin(command) => self.gate_event(GateEvent::Invoke(command)),
            Command::Refresh => self.poll(),
            Command::Dismiss(n) => {
                if n == 0 || self.notices.dismiss(n - 1).is_none() {
                    self.message = Some(format!("no notification {}", n));
                }
            }
            Command::Status => {
                self.message = Some(format!(
                    "panel {:?}, admin {:?}, {} request(s) in flight, last poll {}",
                    self.panel.state(),
                    self.gate.state(),
                    self.dispatcher.in_flight(),
                    self.store
                        .applied_seq()
                        .map(|s| format!("#{}", s))
                        .unwrap_or_else(|| "none".to_string())
                ))
            }
            Command::Help => self.message = Some(HELP.to_string()),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn panel_event(&mut self, event: PanelEvent) {
        let effects = self.panel.handle(event, self.store.current());
        self.apply_panel_effects(effects);
    }

    fn gate_event(&mut self, event: GateEvent) {
        let effects = self.gate.handle(event);
        self.apply_gate_effects(effects);
    }

    fn apply_panel_effects(&mut self, effects: Vec<PanelEffect>) {
        for effect in effects {
            match effect {
                PanelEffect::ValidateToken { token } => self.dispatcher.validate_token(token),
                PanelEffect::Preview {
                    device_id,
                    slider,
                    value,
                } => match slider {
                    Slider::Power => self.preview.set_power(&device_id, value),
                    Slider::Voltage => self.preview.set_voltage(&device_id, value),
                },
                PanelEffect::Dispatch { mutation, token } => {
                    info!(
                        device = %mutation.device_id(),
                        slider = mutation.slider().as_str(),
                        "Dispatching mutation"
                    );
                    self.dispatcher.mutate(mutation, token);
                }
                PanelEffect::Warn(text) => {
                    self.notices
                        .raise(NoticeLevel::Warning, text, Instant::now())
                }
                PanelEffect::Status(text) => self.operator_text = Some(text),
            }
        }
    }

    fn apply_gate_effects(&mut self, effects: Vec<GateEffect>) {
        for effect in effects {
            match effect {
                GateEffect::ValidateAdminToken { token } => self.dispatcher.validate_admin(token),
                GateEffect::AskConfirmation { prompt, .. } => self.prompt = Some(prompt),
                GateEffect::Dispatch { command, token } => {
                    info!(command = %command, "Dispatching admin command");
                    self.dispatcher.admin_control(command, token);
                }
                GateEffect::Status(text) => self.admin_text = Some(text),
            }
        }
    }

    /// Log the outcome of an action, then reconcile with a fresh poll
    fn after_action(&mut self, source: LogSource, entry: String) {
        self.log.record(source, entry);
        self.poll();
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        self.dispatcher.completed();
        self.dirty = true;

        match completion {
            Completion::Poll { seq, result } => match result {
                Ok(snapshot) => {
                    if self.store.apply(seq, snapshot) == ApplyOutcome::Applied {
                        self.preview.clear();
                        debug!(seq, devices = self.store.current().len(), "Snapshot applied");
                    }
                }
                Err(e) => warn!(seq, error = %e, "Device poll failed"),
            },
            Completion::TokenValidated { result } => {
                let event = match result {
                    Ok(()) => PanelEvent::ValidationPassed,
                    Err(ApiError::Server { detail, .. }) => {
                        PanelEvent::ValidationRejected { detail }
                    }
                    Err(e) => PanelEvent::ValidationFailed {
                        error: e.to_string(),
                    },
                };
                self.panel_event(event);
            }
            Completion::Mutated { mutation, result } => self.mutated(mutation, result),
            Completion::AdminValidated { result } => {
                let event = match result {
                    Ok(()) => GateEvent::ValidationPassed,
                    Err(e) if e.is_auth_failure() => GateEvent::ValidationRejected,
                    Err(e) => GateEvent::ValidationFailed {
                        error: e.to_string(),
                    },
                };
                self.gate_event(event);
            }
            Completion::AdminControlled { command, result } => match result {
                Ok(response) => {
                    info!(command = %command, message = %response.message, "Admin command answered");
                    if let Some(alert) = &response.alert {
                        self.notices
                            .raise(NoticeLevel::Danger, alert.clone(), Instant::now());
                    }
                    self.admin_text = Some(response.message.clone());
                    self.after_action(LogSource::Admin, response.message);
                }
                Err(ApiError::Server { status, detail }) => {
                    let text =
                        detail.unwrap_or_else(|| format!("{} failed (HTTP {})", command, status));
                    warn!(command = %command, status, "Admin command refused");
                    self.admin_text = Some(text.clone());
                    self.after_action(LogSource::Admin, text);
                }
                Err(e) => {
                    warn!(command = %command, error = %e, "Admin command failed");
                    self.admin_text = Some(format!("error: {}", e));
                    self.notices.raise(
                        NoticeLevel::Danger,
                        format!("{} failed: {}", command, e),
                        Instant::now(),
                    );
                }
            },
        }
    }

    fn mutated(&mut self, mutation: Mutation, result: Result<MessageResponse, ApiError>) {
        let what = match mutation.slider() {
            Slider::Power => "power adjustment",
            Slider::Voltage => "voltage adjustment",
        };
        match result {
            Ok(response) => {
                info!(device = %mutation.device_id(), message = %response.message, "Mutation applied");
                self.operator_text = Some(response.message.clone());
                self.after_action(LogSource::Operator, response.message);
            }
            Err(e @ ApiError::Server { .. }) => {
                warn!(device = %mutation.device_id(), error = %e, "Mutation refused");
                let text = format!("{} failed: {}", what, e);
                self.notices
                    .raise(NoticeLevel::Danger, text.clone(), Instant::now());
                self.after_action(LogSource::Operator, text);
            }
            Err(e) => {
                // No answer, so nothing to log against; the next tick reconciles
                warn!(device = %mutation.device_id(), error = %e, "Mutation failed");
                self.notices.raise(
                    NoticeLevel::Danger,
                    format!("{} failed: {}", what, e),
                    Instant::now(),
                );
            }
        }
    }

    pub fn expire_notices(&mut self) {
        if self.notices.expire(Instant::now()) > 0 {
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "\x1b[2J\x1b[H{}> ", self.render())?;
        stdout.flush()?;
        Ok(())
    }

    /// Drive the dashboard until `quit`
    ///
    /// Closing stdin leaves the dashboard running as a read-only monitor.
    pub async fn run(
        mut self,
        mut completions: CompletionReceiver,
        mut ticker: PollTicker,
    ) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut housekeeping = tokio::time::interval(Duration::from_secs(1));

        info!(period_ms = ticker.period().as_millis() as u64, "Dashboard running");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(),
                Some(completion) = completions.recv() => self.handle_completion(completion),
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => {
                        if self.handle_line(&line) == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Input closed, continuing as monitor");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        stdin_open = false;
                    }
                },
                _ = housekeeping.tick() => self.expire_notices(),
            }
            self.draw()?;
        }

        info!("Dashboard stopped");
        Ok(())
    }
}
