//! Status sum-types and the deployment transition table. §4.5, §4.6.
//!
//! Ported from the teacher's `Project` state enum (`gateway/src/project.rs`)
//! and `deployer/src/deployment/states.rs`'s `State` enum, but collapsed
//! into a single data-only status plus a pure transition function rather
//! than a trait-per-state object graph: the orchestrator (not this crate)
//! owns the IO that drives transitions, so nothing here needs `async`.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{Error, ErrorKind};

/// One of the two fixed blue/green labels. §GLOSSARY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Blue,
    Green,
}

impl Slot {
    pub fn opposite(self) -> Slot {
        match self {
            Slot::Blue => Slot::Green,
            Slot::Green => Slot::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Web,
    Worker,
    Cron,
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BuilderKind {
    Dockerfile,
    SourceGenerator,
    PreBuiltImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Stopped,
    Building,
    Running,
    Failed,
}

/// A deployment's place in the state machine. §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Preparing,
    Deploying,
    Running,
    Failed,
    Stopped,
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Running | Self::Failed | Self::Stopped)
    }
}

/// The outcome that drives a transition. Each variant corresponds to one
/// arrow in the §4.5 diagram; there is deliberately no "generic" variant,
/// so an unhandled combination is a compile error in [`DeploymentStatus::apply`]
/// rather than a runtime string comparison (see Design Note "Deployment
/// status as a sum type").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `pending -> preparing`, on pipeline start.
    PipelineStarted,
    /// `preparing -> deploying`, on `Prepare` success.
    PrepareSucceeded,
    /// `preparing -> failed`, on `Prepare` error.
    PrepareFailed,
    /// `deploying -> running`, on `Deploy` success and a healthy check.
    DeploySucceeded,
    /// `deploying -> failed`, on `Deploy` error or an unhealthy check.
    DeployFailed,
    /// `running -> stopped`, on supersession by a newer running deployment
    /// in the opposite slot for the same service.
    Superseded,
}

impl DeploymentStatus {
    /// Apply a transition, returning the new status or an `Internal` error
    /// if the transition is not legal from the current status. Illegal
    /// transitions are a programmer error (§4.5): every call site in the
    /// orchestrator is expected to only ever request the transition that
    /// is legal for the pipeline stage it just ran, so tests assert this
    /// function panics^H^H^H^Hreturns `Err` rather than silently fixing up
    /// the state for them.
    pub fn apply(self, transition: Transition) -> Result<DeploymentStatus, Error> {
        use DeploymentStatus::*;
        use Transition::*;

        match (self, transition) {
            (Pending, PipelineStarted) => Ok(Preparing),
            (Preparing, PrepareSucceeded) => Ok(Deploying),
            (Preparing, PrepareFailed) => Ok(Failed),
            (Deploying, DeploySucceeded) => Ok(Running),
            (Deploying, DeployFailed) => Ok(Failed),
            (Running, Superseded) => Ok(Stopped),
            (from, transition) => Err(Error::custom(
                ErrorKind::Internal,
                format!("illegal deployment transition: {from} + {transition:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_opposite_round_trips() {
        assert_eq!(Slot::Blue.opposite(), Slot::Green);
        assert_eq!(Slot::Green.opposite(), Slot::Blue);
        assert_eq!(Slot::Blue.opposite().opposite(), Slot::Blue);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        let s = DeploymentStatus::Pending;
        let s = s.apply(Transition::PipelineStarted).unwrap();
        assert_eq!(s, DeploymentStatus::Preparing);
        let s = s.apply(Transition::PrepareSucceeded).unwrap();
        assert_eq!(s, DeploymentStatus::Deploying);
        let s = s.apply(Transition::DeploySucceeded).unwrap();
        assert_eq!(s, DeploymentStatus::Running);
        let s = s.apply(Transition::Superseded).unwrap();
        assert_eq!(s, DeploymentStatus::Stopped);
    }

    #[test]
    fn prepare_and_deploy_failures_terminate() {
        assert_eq!(
            DeploymentStatus::Preparing
                .apply(Transition::PrepareFailed)
                .unwrap(),
            DeploymentStatus::Failed
        );
        assert_eq!(
            DeploymentStatus::Deploying
                .apply(Transition::DeployFailed)
                .unwrap(),
            DeploymentStatus::Failed
        );
    }

    /// Property 2 / 8 (§8): only the transitions in §4.5 ever occur. A
    /// brute-force sweep over every (state, transition) pair must agree
    /// with the explicit table below on legality.
    #[test]
    fn illegal_transitions_are_rejected() {
        use DeploymentStatus::*;
        use Transition::*;

        let legal: &[(DeploymentStatus, Transition)] = &[
            (Pending, PipelineStarted),
            (Preparing, PrepareSucceeded),
            (Preparing, PrepareFailed),
            (Deploying, DeploySucceeded),
            (Deploying, DeployFailed),
            (Running, Superseded),
        ];

        let all_states = [Pending, Preparing, Deploying, Running, Failed, Stopped];
        let all_transitions = [
            PipelineStarted,
            PrepareSucceeded,
            PrepareFailed,
            DeploySucceeded,
            DeployFailed,
            Superseded,
        ];

        for &state in &all_states {
            for &transition in &all_transitions {
                let should_succeed = legal.contains(&(state, transition));
                let result = state.apply(transition);
                assert_eq!(
                    result.is_ok(),
                    should_succeed,
                    "state={state:?} transition={transition:?} expected_ok={should_succeed}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(DeploymentStatus::Running.is_terminal());
        assert!(DeploymentStatus::Failed.is_terminal());
        assert!(DeploymentStatus::Stopped.is_terminal());
        assert!(!DeploymentStatus::Pending.is_terminal());
        assert!(!DeploymentStatus::Preparing.is_terminal());
        assert!(!DeploymentStatus::Deploying.is_terminal());
    }
}
