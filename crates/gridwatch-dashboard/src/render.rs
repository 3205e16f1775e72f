//! Plain-text rendering of the dashboard

use chrono::{DateTime, Local, Utc};
use gridwatch_core::{
    AdminGate, ControlPanel, DashboardView, GateState, IncidentLog, Notices, PanelState, Series,
};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;
const LOG_LINES: usize = 10;

/// Everything a frame is drawn from
pub struct Screen<'a> {
    pub view: &'a DashboardView,
    pub updated_at: Option<DateTime<Utc>>,
    pub panel: &'a ControlPanel,
    pub gate: &'a AdminGate,
    pub operator_text: Option<&'a str>,
    pub admin_text: Option<&'a str>,
    pub message: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub notices: &'a Notices,
    pub log: &'a IncidentLog,
}

fn bar(value: f64, max: f64) -> String {
    let ratio = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn mask(token: &str) -> String {
    if token.is_empty() {
        "(empty)".to_string()
    } else {
        "*".repeat(token.chars().count().min(12))
    }
}

fn series(out: &mut String, series: &Series) {
    let _ = writeln!(out, "  {} ({:.0}-{:.0})", series.label, series.min, series.max);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let _ = writeln!(
            out,
            "    {:<24} {} {:>6.1}",
            label,
            bar(*value, series.max),
            value
        );
    }
}

/// Draw one frame
pub fn render(screen: &Screen<'_>) -> String {
    let mut out = String::new();
    let view = screen.view;

    let updated = screen
        .updated_at
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(
        out,
        "GRIDWATCH  {} devices  updated {}",
        view.devices.len(),
        updated
    );

    let _ = writeln!(out, "\nDEVICES");
    if view.devices.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for device in &view.devices {
        let _ = writeln!(
            out,
            "  {:<8} {:<24} [{}] {} / {} / {}  load {:.1}%",
            device.id,
            device.name,
            device.status,
            device.kind,
            device.role,
            device.location,
            device.load
        );
        for (key, value) in &device.extra {
            let _ = writeln!(out, "           {}: {}", key, value);
        }
    }

    let _ = writeln!(out, "\nCHARTS");
    series(&mut out, &view.charts.load);
    let histogram: Vec<String> = view
        .charts
        .status
        .iter()
        .map(|(status, count)| format!("{} {}", status, count))
        .collect();
    let _ = writeln!(out, "  Status  {}", histogram.join("  "));
    series(&mut out, &view.charts.power);
    series(&mut out, &view.charts.temperature);

    let panel = screen.panel;
    let state = match panel.state() {
        PanelState::Closed => "closed",
        PanelState::Validating => "validating",
        PanelState::Open => "open",
    };
    let _ = writeln!(
        out,
        "\nCONTROL PANEL [{}]  token {}",
        state,
        mask(panel.token())
    );
    if panel.sliders_visible() {
        let (power, voltage) = panel.sliders();
        let target = panel.target().map(|t| t.as_str()).unwrap_or("none");
        let _ = writeln!(
            out,
            "  target {}  power {}  voltage {}",
            target, power, voltage
        );
    }
    if let Some(text) = screen.operator_text {
        let _ = writeln!(out, "  > {}", text);
    }

    let gate = screen.gate;
    let state = match gate.state() {
        GateState::Locked => "locked",
        GateState::Unlocking => "unlocking",
        GateState::Unlocked => "unlocked",
    };
    let _ = writeln!(out, "\nADMIN [{}]  token {}", state, mask(gate.token()));
    if let Some(text) = screen.admin_text {
        let _ = writeln!(out, "  > {}", text);
    }

    if !screen.notices.is_empty() {
        let _ = writeln!(out, "\nNOTIFICATIONS");
        for (i, notice) in screen.notices.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {}: {}",
                i + 1,
                notice.level.heading(),
                notice.message
            );
        }
    }

    let _ = writeln!(out, "\nLOG");
    if screen.log.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for entry in screen.log.entries().take(LOG_LINES) {
        let _ = writeln!(out, "  {}", entry);
    }

    if let Some(message) = screen.message {
        let _ = writeln!(out, "\n{}", message);
    }
    if let Some(prompt) = screen.prompt {
        let _ = writeln!(out, "\n{} [y/N]", prompt);
    }
    out
}
