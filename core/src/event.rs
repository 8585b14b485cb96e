//! The session journal.
//!
//! RULE: Every committed transition, result set and market event is
//! appended here by the engine, in the order it happened. The journal is
//! append-only and cleared only by a reset.

use crate::{
    genre::Genre,
    market_events::Polarity,
    state::{AcquisitionStep, Phase},
    types::{CampaignId, Dollars},
};
use serde::{Deserialize, Serialize};

/// Every event recorded during a session.
/// Variants are never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Session ────────────────────────────────────
    SessionStarted {
        seed: u64,
    },
    SessionReset,
    CommandApplied {
        command: String,
    },

    // ── Navigation ─────────────────────────────────
    PhaseEntered {
        from: Phase,
        to: Phase,
    },
    AcquisitionStepChanged {
        step: AcquisitionStep,
    },
    GenreChosen {
        genre: Genre,
    },

    // ── Results ────────────────────────────────────
    AcquisitionCommitted {
        installs: u64,
        cpi: Dollars,
        ctr: f64,
        cvr: f64,
    },
    RetentionCommitted {
        d1: f64,
        d7: f64,
        d30: f64,
        dau: u64,
    },
    MonetizationCommitted {
        arpdau: Dollars,
        projected_roas: f64,
    },
    CampaignFinished {
        total_spend: Dollars,
        total_revenue: Dollars,
        roas: f64,
    },

    // ── Perturbation ───────────────────────────────
    MarketEventShown {
        phase: Phase,
        event_id: String,
        title: String,
        polarity: Polarity,
    },
    FeedbackIssued {
        phase: Phase,
        messages: Vec<String>,
    },

    // ── History ────────────────────────────────────
    HistoryRecorded {
        campaign_id: CampaignId,
    },
    HistoryWriteFailed {
        reason: String,
    },
}

/// Stable name for a `SessionEvent` variant.
pub fn event_type_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::SessionStarted { .. }         => "session_started",
        SessionEvent::SessionReset                  => "session_reset",
        SessionEvent::CommandApplied { .. }         => "command_applied",
        SessionEvent::PhaseEntered { .. }           => "phase_entered",
        SessionEvent::AcquisitionStepChanged { .. } => "acquisition_step_changed",
        SessionEvent::GenreChosen { .. }            => "genre_chosen",
        SessionEvent::AcquisitionCommitted { .. }   => "acquisition_committed",
        SessionEvent::RetentionCommitted { .. }     => "retention_committed",
        SessionEvent::MonetizationCommitted { .. }  => "monetization_committed",
        SessionEvent::CampaignFinished { .. }       => "campaign_finished",
        SessionEvent::MarketEventShown { .. }       => "market_event_shown",
        SessionEvent::FeedbackIssued { .. }         => "feedback_issued",
        SessionEvent::HistoryRecorded { .. }        => "history_recorded",
        SessionEvent::HistoryWriteFailed { .. }     => "history_write_failed",
    }
}

/// One journal line, stamped with its position and the phase it happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub phase: Phase,
    pub event_type: String,
    pub event: SessionEvent,
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn record(&mut self, phase: Phase, event: SessionEvent) {
        let entry = JournalEntry {
            seq: self.entries.len() as u64,
            phase,
            event_type: event_type_name(&event).to_string(),
            event,
        };
        log::debug!("journal #{} [{phase}] {}", entry.seq, entry.event_type);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.entries.iter().filter(move |e| e.event_type == event_type)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// JSON lines, one entry per line.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}
