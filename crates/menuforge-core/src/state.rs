//! Orchestration state machine
//!
//! Phases, legal transitions, and the run state exclusively owned by the
//! controller task. History entries are immutable once appended; menu items
//! are never stored here because they are re-derived fresh each iteration.

use menuforge_agents::GroundingTopic;
use menuforge_model::{AnchorId, Artifact, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Before anything has happened
    Init,
    /// Parsing the source document
    Extracting,
    /// Image analysis and grounding retrieval
    Analyzing,
    /// Builder agent synthesizing an artifact version
    Building,
    /// Critique agent reviewing the just-built artifact
    Reviewing,
    /// Routing critique feedback back to the builder
    Revising,
    /// Terminal: a version passed review
    DonePassed,
    /// Terminal: iteration budget spent; best artifact returned with warning
    DoneExhausted,
    /// Terminal: unrecoverable failure
    Fatal,
}

impl Phase {
    /// Whether the phase is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::DonePassed | Phase::DoneExhausted | Phase::Fatal)
    }
}

/// Legal transitions out of a phase
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::{
        Analyzing, Building, DoneExhausted, DonePassed, Extracting, Fatal, Init, Reviewing,
        Revising,
    };
    match from {
        Init => vec![Extracting, Fatal],
        Extracting => vec![Analyzing, Fatal],
        Analyzing => vec![Building, Fatal],
        Building => vec![Reviewing, Fatal],
        Reviewing => vec![DonePassed, Revising, DoneExhausted, Fatal],
        Revising => vec![Building, Fatal],
        DonePassed | DoneExhausted | Fatal => vec![],
    }
}

/// Validate a transition
///
/// # Errors
/// Returns [`StateError::IllegalTransition`] when `to` is not reachable
/// from `from`
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), StateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition { from, to })
    }
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Transition not permitted by the machine
    #[error("illegal state transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Phase the machine was in
        from: Phase,
        /// Phase that was requested
        to: Phase,
    },
}

/// Outcome classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Still progressing
    Running,
    /// A version passed review
    Passed,
    /// Iteration budget spent without a passing verdict (warning, not error)
    Exhausted,
    /// Unrecoverable failure
    Fatal,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Running => "running",
            RunStatus::Passed => "passed",
            RunStatus::Exhausted => "exhausted",
            RunStatus::Fatal => "fatal",
        };
        write!(f, "{label}")
    }
}

/// A degradation absorbed during the run, recorded rather than dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Degradation {
    /// A retrieval topic proceeded ungrounded after its retry budget
    RetrievalDegraded {
        /// The affected topic
        topic: GroundingTopic,
    },
    /// An image analysis degraded to a placeholder description
    AnalysisPlaceholder {
        /// The affected anchor
        anchor: AnchorId,
    },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::RetrievalDegraded { topic } => {
                write!(f, "retrieval degraded for {}", topic.label())
            }
            Degradation::AnalysisPlaceholder { anchor } => {
                write!(f, "placeholder description for {anchor}")
            }
        }
    }
}

/// One iteration's immutable (artifact, verdict) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// The built artifact version
    pub artifact: Artifact,
    /// The verdict it received
    pub verdict: Verdict,
}

/// Run state, exclusively owned by the controller task
///
/// No component other than the controller holds cross-iteration mutable
/// state; everything else receives per-iteration inputs by value or
/// reference.
#[derive(Debug)]
pub struct OrchestrationState {
    phase: Phase,
    building_entries: u32,
    history: Vec<IterationRecord>,
    degradations: Vec<Degradation>,
    status: RunStatus,
}

impl OrchestrationState {
    /// Fresh state at `INIT`
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Init,
            building_entries: 0,
            history: Vec::new(),
            degradations: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Advance to a new phase
    ///
    /// Entering `Building` bumps the iteration counter (0-based: the first
    /// entry is iteration 0).
    ///
    /// # Errors
    /// Returns [`StateError`] on an illegal transition
    pub fn advance(&mut self, to: Phase) -> Result<(), StateError> {
        validate_transition(self.phase, to)?;
        tracing::debug!(from = ?self.phase, to = ?to, "state transition");
        if to == Phase::Building {
            self.building_entries += 1;
        }
        self.phase = to;
        self.status = match to {
            Phase::DonePassed => RunStatus::Passed,
            Phase::DoneExhausted => RunStatus::Exhausted,
            Phase::Fatal => RunStatus::Fatal,
            _ => RunStatus::Running,
        };
        Ok(())
    }

    /// Force the machine into `Fatal` from any non-terminal phase
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Fatal;
            self.status = RunStatus::Fatal;
        }
    }

    /// Append an iteration record; prior entries are never mutated
    pub fn record_iteration(&mut self, artifact: Artifact, verdict: Verdict) {
        self.history.push(IterationRecord { artifact, verdict });
    }

    /// Record an absorbed degradation
    pub fn record_degradation(&mut self, degradation: Degradation) {
        tracing::info!(%degradation, "degradation recorded");
        self.degradations.push(degradation);
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 0-based revision iteration (0 until the second `Building` entry)
    #[inline]
    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.building_entries.saturating_sub(1)
    }

    /// All (artifact, verdict) records so far
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Degradations recorded so far
    #[inline]
    #[must_use]
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// The most recent artifact, if any was built
    #[inline]
    #[must_use]
    pub fn best_artifact(&self) -> Option<&Artifact> {
        self.history.last().map(|record| &record.artifact)
    }
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}
