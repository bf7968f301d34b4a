use menuforge_core::{allowed_transitions, validate_transition, Phase};
use proptest::prelude::*;

const ALL_PHASES: [Phase; 9] = [
    Phase::Init,
    Phase::Extracting,
    Phase::Analyzing,
    Phase::Building,
    Phase::Reviewing,
    Phase::Revising,
    Phase::DonePassed,
    Phase::DoneExhausted,
    Phase::Fatal,
];

fn any_phase() -> impl Strategy<Value = Phase> {
    proptest::sample::select(ALL_PHASES.to_vec())
}

#[test]
fn reviewing_branches_cover_pass_revise_and_exhaust() {
    let out = allowed_transitions(Phase::Reviewing);
    assert!(out.contains(&Phase::DonePassed));
    assert!(out.contains(&Phase::Revising));
    assert!(out.contains(&Phase::DoneExhausted));
}

#[test]
fn revising_only_feeds_back_into_building() {
    assert!(validate_transition(Phase::Revising, Phase::Building).is_ok());
    assert!(validate_transition(Phase::Revising, Phase::Reviewing).is_err());
    assert!(validate_transition(Phase::Revising, Phase::DonePassed).is_err());
}

proptest! {
    #[test]
    fn prop_validation_agrees_with_allowed_transitions(
        from in any_phase(),
        to in any_phase(),
    ) {
        let allowed = allowed_transitions(from);
        if validate_transition(from, to).is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_terminal_phases_admit_no_transitions(to in any_phase()) {
        for terminal in [Phase::DonePassed, Phase::DoneExhausted, Phase::Fatal] {
            prop_assert!(validate_transition(terminal, to).is_err());
        }
    }

    #[test]
    fn prop_every_non_terminal_phase_can_reach_fatal(from in any_phase()) {
        if !from.is_terminal() {
            prop_assert!(validate_transition(from, Phase::Fatal).is_ok());
        }
    }
}
