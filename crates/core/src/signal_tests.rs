// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    complete     = { "COMPLETE", Promise::Complete },
    blocked      = { "BLOCKED", Promise::Blocked },
    already_done = { "ALREADY_DONE", Promise::AlreadyDone },
)]
fn promise_roundtrips(body: &str, expected: Promise) {
    let parsed = parse_output(&format!("<promise>{body}</promise>"));
    assert_eq!(parsed.promise, Some(expected));
}

#[test]
fn absorbed_by_captures_task_id() {
    let parsed = parse_output("<promise>ABSORBED_BY:US-007</promise>");
    assert_eq!(parsed.promise, Some(Promise::AbsorbedBy("US-007".to_string())));
}

#[test]
fn absorbed_by_without_id_needs_iteration() {
    let parsed = parse_output("<promise>ABSORBED_BY:</promise>");
    assert!(parsed.needs_iteration());
}

#[yare::parameterized(
    empty      = { "" },
    prose_only = { "I made good progress on the login endpoint." },
    unknown    = { "<promise>DONE</promise>" },
)]
fn no_recognized_promise_needs_iteration(output: &str) {
    assert!(parse_output(output).needs_iteration());
}

#[test]
fn last_approach_wins() {
    let output = "\
<approach>try the ORM</approach>
some prose
<approach>raw SQL instead</approach>";
    assert_eq!(parse_output(output).approach.as_deref(), Some("raw SQL instead"));
}

#[test]
fn learnings_and_backlog_accumulate() {
    let output = "\
<learning>the test db needs migrations</learning>
<backlog>extract a shared fixture</backlog>
<learning>CI uses postgres 16</learning>";
    let parsed = parse_output(output);
    assert_eq!(
        parsed.learnings,
        vec!["the test db needs migrations", "CI uses postgres 16"]
    );
    assert_eq!(parsed.backlog, vec!["extract a shared fixture"]);
}

#[test]
fn multiline_tag_bodies_are_permitted() {
    let output = "<approach>first line\nsecond line</approach>";
    assert_eq!(parse_output(output).approach.as_deref(), Some("first line\nsecond line"));
}

#[test]
fn review_pass_and_fail_with_reason() {
    assert_eq!(parse_output("<review>PASS</review>").review, Some(ReviewVerdict::Pass));
    let parsed = parse_output("<review>FAIL: criteria 2 not met,\nno tests added</review>");
    assert_eq!(
        parsed.review,
        Some(ReviewVerdict::Fail("criteria 2 not met,\nno tests added".to_string()))
    );
}

#[test]
fn fail_without_reason_yields_empty_reason() {
    let parsed = parse_output("<review>FAIL</review>");
    assert_eq!(parsed.review, Some(ReviewVerdict::Fail(String::new())));
}

#[yare::parameterized(
    retry = { "RETRY", WalkawayAction::Retry },
    skip  = { "SKIP", WalkawayAction::Skip },
    abort = { "ABORT", WalkawayAction::Abort },
)]
fn decisions_parse(body: &str, expected: WalkawayAction) {
    assert_eq!(parse_output(&format!("<decision>{body}</decision>")).decision, Some(expected));
}

#[test]
fn unrecognized_decision_is_none() {
    assert_eq!(parse_output("<decision>PUNT</decision>").decision, None);
}

#[test]
fn guidance_is_extracted() {
    let output = "<decision>RETRY</decision>\n<guidance>use stubs for the mail client</guidance>";
    let parsed = parse_output(output);
    assert_eq!(parsed.decision, Some(WalkawayAction::Retry));
    assert_eq!(parsed.guidance.as_deref(), Some("use stubs for the mail client"));
}

#[test]
fn scope_question_last_wins() {
    let output = "\
<scope-question>should I touch the schema?</scope-question>
<scope-question>is renaming the table in scope?</scope-question>";
    assert_eq!(
        parse_output(output).scope_question.as_deref(),
        Some("is renaming the table in scope?")
    );
}

#[test]
fn strip_tags_removes_all_recognized_spans() {
    let output = "\
working on it
<promise>COMPLETE</promise>
<approach>raw SQL</approach>
done now";
    let cleaned = strip_tags(output);
    assert!(!cleaned.contains("<promise>"));
    assert!(!cleaned.contains("<approach>"));
    assert!(cleaned.contains("working on it"));
    assert!(cleaned.contains("done now"));
}

#[test]
fn tag_position_invariance() {
    let output = "prose before <promise>COMPLETE</promise> prose after \
<approach>one way</approach> tail";
    let stripped = strip_tags(output);
    let reassembled =
        format!("{stripped}<promise>COMPLETE</promise><approach>one way</approach>");
    assert_eq!(parse_output(output), parse_output(&reassembled));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Prose without angle-bracket tags never produces signals.
        #[test]
        fn tagless_prose_is_silent(s in "[a-zA-Z0-9 .,\n]{0,200}") {
            let parsed = parse_output(&s);
            prop_assert!(parsed.needs_iteration());
            prop_assert!(parsed.approach.is_none());
            prop_assert!(parsed.learnings.is_empty());
        }

        /// Any body survives the approach tag round-trip, modulo trimming.
        #[test]
        fn approach_body_roundtrips(body in "[a-zA-Z0-9.,][a-zA-Z0-9 .,]{0,79}") {
            let parsed = parse_output(&format!("<approach>{body}</approach>"));
            prop_assert_eq!(parsed.approach, Some(body.trim().to_string()));
        }
    }
}
