//! Workflow definitions shared by the test suites of the workspace.

use wfcore::{
    ac::{
        Principal,
        User,
    },
    workflow::{
        ApprovalDef,
        StateDef,
        TransitionDef,
        WorkflowDef,
    },
};

fn workflow(
    content_type: &str,
    states: Vec<StateDef>,
    transitions: Vec<TransitionDef>,
) -> WorkflowDef {
    WorkflowDef {
        content_type: content_type.into(),
        field_name: "status".into(),
        states,
        transitions,
    }
}

/// A ticket workflow with a branch at `in_progress`; every step is
/// guarded differently.
///
/// ```text
/// open -> in_progress -> resolved -> closed
///                     -> on_hold
/// ```
pub fn linear_branch() -> WorkflowDef {
    workflow(
        "ticket",
        vec![
            StateDef::new("open").initial(),
            StateDef::new("in_progress"),
            StateDef::new("resolved"),
            StateDef::new("closed"),
            StateDef::new("on_hold"),
        ],
        vec![
            TransitionDef::new("open", "in_progress", [
                ApprovalDef::open().permission("ticket.assign"),
            ]),
            TransitionDef::new("in_progress", "resolved", [
                ApprovalDef::open().user(1),
            ]),
            TransitionDef::new("resolved", "closed", [
                ApprovalDef::open().permission("ticket.close"),
            ]),
            TransitionDef::new("in_progress", "on_hold", [
                ApprovalDef::open().permission("ticket.hold"),
            ]),
        ],
    )
}

/// Two chained transitions with a branch, the second transition carrying
/// two steps.
///
/// ```text
/// state1 -> state2 -> state3   (two steps)
///                  -> state4
/// ```
pub fn branching() -> WorkflowDef {
    workflow(
        "document",
        vec![
            StateDef::new("state1").initial(),
            StateDef::new("state2"),
            StateDef::new("state3"),
            StateDef::new("state4"),
        ],
        vec![
            TransitionDef::new("state1", "state2", [ApprovalDef::open()]),
            TransitionDef::new("state2", "state3", [
                ApprovalDef::open().priority(0),
                ApprovalDef::open().priority(1),
            ]),
            TransitionDef::new("state2", "state4", [ApprovalDef::open()]),
        ],
    )
}

/// A three state cycle with a tributary leaving the cycle.
///
/// ```text
/// cycle_state_1 -> cycle_state_2 -> cycle_state_3 -> cycle_state_1
///                                                  -> off_the_cycle_state
/// ```
pub fn cycle_with_tributary() -> WorkflowDef {
    workflow(
        "article",
        vec![
            StateDef::new("cycle_state_1").initial(),
            StateDef::new("cycle_state_2"),
            StateDef::new("cycle_state_3"),
            StateDef::new("off_the_cycle_state"),
        ],
        vec![
            TransitionDef::new("cycle_state_1", "cycle_state_2", [
                ApprovalDef::open().permission("article.edit"),
            ]),
            TransitionDef::new("cycle_state_2", "cycle_state_3", [
                ApprovalDef::open().permission("article.edit"),
                ApprovalDef::open().permission("article.review"),
            ]),
            TransitionDef::new("cycle_state_3", "cycle_state_1", [
                ApprovalDef::open().permission("article.edit"),
            ]),
            TransitionDef::new("cycle_state_3", "off_the_cycle_state", [
                ApprovalDef::open().permission("article.edit"),
            ]),
        ],
    )
}

/// An issue tracker where resolved issues may be re-opened.
///
/// ```text
/// open -> in_progress -> resolved -> closed -> final
///              ^            |
///              +- re_opened <-+
/// ```
pub fn advanced_cycle() -> WorkflowDef {
    workflow(
        "issue",
        vec![
            StateDef::new("open").initial(),
            StateDef::new("in_progress"),
            StateDef::new("resolved"),
            StateDef::new("re_opened"),
            StateDef::new("closed"),
            StateDef::new("final"),
        ],
        vec![
            TransitionDef::new("open", "in_progress", [
                ApprovalDef::open().permission("issue.work"),
            ]),
            TransitionDef::new("in_progress", "resolved", [
                ApprovalDef::open().permission("issue.work"),
            ]),
            TransitionDef::new("resolved", "re_opened", [
                ApprovalDef::open().permission("issue.review"),
            ]),
            TransitionDef::new("re_opened", "in_progress", [
                ApprovalDef::open().permission("issue.work"),
            ]),
            TransitionDef::new("resolved", "closed", [
                ApprovalDef::open().permission("issue.work"),
            ]),
            TransitionDef::new("closed", "final", [
                ApprovalDef::open().permission("issue.work"),
            ]),
        ],
    )
}

/// A draft that may be revised any number of times before publication.
pub fn self_loop() -> WorkflowDef {
    workflow(
        "page",
        vec![
            StateDef::new("draft").initial(),
            StateDef::new("published"),
        ],
        vec![
            TransitionDef::new("draft", "draft", [ApprovalDef::open()]),
            TransitionDef::new("draft", "published", [
                ApprovalDef::open().permission("page.publish"),
            ]),
        ],
    )
}

pub fn user(id: i64, name: &str) -> Principal {
    User {
        id,
        name: name.to_string(),
    }.into()
}
