//! # Protection Gate
//!
//! Stateless per-event policy deciding whether a block change or a command is
//! allowed near a capture point.
//!
//! ## Evaluation order
//!
//! 1. Privileged actors bypass every check.
//! 2. The first configured point whose capture or buffer ring holds the
//!    action's location decides; later points are never consulted.
//! 3. Block break/place inside either ring is denied, with different wording
//!    for the capture ring and the buffer ring.
//! 4. Commands are denied when they start with a blocked prefix (the point's
//!    own list first, then the global list), or when they are land-claim /
//!    town-creation commands issued in the buffer ring.
//!
//! A denial carries exactly one colorized message.

use crate::messages::{render, Colorizer, MessageTemplates};
use crate::types::{Location, PlayerId};
use crate::zone::{ZoneClass, ZoneIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Land-claim and town-creation commands refused in buffer rings even without
/// an explicit rule.
pub const CLAIM_COMMAND_PREFIXES: &[&str] = &[
    "/town claim",
    "/t claim",
    "/town new",
    "/t new",
    "/town create",
    "/t create",
    "/towny claim",
    "/plot claim",
];

/// Kind of block change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockAction {
    Break,
    Place,
}

/// The action being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedAction<'a> {
    Block(BlockAction),
    Command(&'a str),
}

/// Everything the gate needs to know about one inbound action.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    pub actor: &'a PlayerId,
    pub privileged: bool,
    pub location: &'a Location,
    pub action: GuardedAction<'a>,
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    BlockInCapture,
    BlockInBuffer,
    BlockedCommand { prefix: String },
    ClaimNearPoint { prefix: String },
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny {
        point_id: String,
        reason: DenyReason,
        message: String,
    },
}

impl GateDecision {
    pub fn is_denied(&self) -> bool {
        matches!(self, GateDecision::Deny { .. })
    }
}

/// Lowercases and trims a command, making sure it starts with `/`.
pub fn normalize_command(command: &str) -> String {
    let trimmed = command.trim().to_lowercase();
    if trimmed.starts_with('/') {
        trimmed
    } else {
        format!("/{trimmed}")
    }
}

/// Block and command protection around capture points.
pub struct ProtectionGate {
    zones: Arc<ZoneIndex>,
    global_blocked: Vec<String>,
    templates: MessageTemplates,
    colorizer: Arc<dyn Colorizer>,
}

impl ProtectionGate {
    pub fn new(
        zones: Arc<ZoneIndex>,
        global_blocked: Vec<String>,
        templates: MessageTemplates,
        colorizer: Arc<dyn Colorizer>,
    ) -> Self {
        Self {
            zones,
            global_blocked: global_blocked.iter().map(|c| normalize_command(c)).collect(),
            templates,
            colorizer,
        }
    }

    /// Replaces the global blocked-command list.
    pub fn set_global_blocked(&mut self, commands: Vec<String>) {
        self.global_blocked = commands.iter().map(|c| normalize_command(c)).collect();
    }

    pub fn evaluate(&self, request: &ActionRequest<'_>) -> GateDecision {
        if request.privileged {
            debug!("🛡️ {} bypasses zone protection", request.actor);
            return GateDecision::Allow;
        }

        let Some(found) = self.zones.find_containing(request.location) else {
            return GateDecision::Allow;
        };
        let point = &found.point;
        let class = found.membership.class;
        let templates = point.templates(&self.templates);

        let (reason, template, command) = match request.action {
            GuardedAction::Block(_) => match class {
                ZoneClass::InsideCapture => (DenyReason::BlockInCapture, &templates.block_in_capture, None),
                _ => (DenyReason::BlockInBuffer, &templates.block_in_buffer, None),
            },
            GuardedAction::Command(raw) => {
                let command = normalize_command(raw);
                let explicit = point
                    .blocked_commands
                    .iter()
                    .map(|prefix| normalize_command(prefix))
                    .chain(self.global_blocked.iter().cloned())
                    .find(|prefix| command.starts_with(prefix.as_str()));

                if let Some(prefix) = explicit {
                    (
                        DenyReason::BlockedCommand { prefix: prefix.clone() },
                        &templates.command_blocked,
                        Some(prefix),
                    )
                } else if class == ZoneClass::InsideBuffer {
                    match CLAIM_COMMAND_PREFIXES
                        .iter()
                        .find(|prefix| command.starts_with(**prefix))
                    {
                        Some(prefix) => (
                            DenyReason::ClaimNearPoint { prefix: prefix.to_string() },
                            &templates.claim_blocked,
                            Some(prefix.to_string()),
                        ),
                        None => return GateDecision::Allow,
                    }
                } else {
                    return GateDecision::Allow;
                }
            }
        };

        debug!(
            "🛡️ Denied {:?} by {} near '{}' ({:?})",
            request.action, request.actor, point.id, reason
        );
        let message = self
            .colorizer
            .colorize(&render(template, &point.id, command.as_deref()));

        GateDecision::Deny {
            point_id: point.id.clone(),
            reason,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PlainColorizer;
    use crate::types::Position;
    use crate::zone::CapturePoint;

    fn gate_with(points: Vec<CapturePoint>, global: &[&str]) -> ProtectionGate {
        let zones = Arc::new(ZoneIndex::new(points).unwrap());
        ProtectionGate::new(
            zones,
            global.iter().map(|s| s.to_string()).collect(),
            MessageTemplates::default(),
            Arc::new(PlainColorizer),
        )
    }

    fn hill() -> CapturePoint {
        let mut point = CapturePoint::new("HillA", "W", Position::new(0.0, 0.0, 0.0), 2);
        point.blocked_commands = vec!["/home".to_string()];
        point
    }

    fn at_chunks(chunks: f64) -> Location {
        Location::new("W", chunks * 16.0, 70.0, 0.0)
    }

    fn evaluate(gate: &ProtectionGate, privileged: bool, location: &Location, action: GuardedAction<'_>) -> GateDecision {
        let actor = PlayerId::from("mallory");
        gate.evaluate(&ActionRequest {
            actor: &actor,
            privileged,
            location,
            action,
        })
    }

    fn reason(decision: GateDecision) -> Option<DenyReason> {
        match decision {
            GateDecision::Deny { reason, .. } => Some(reason),
            GateDecision::Allow => None,
        }
    }

    #[test]
    fn block_changes_denied_by_ring() {
        let gate = gate_with(vec![hill()], &[]);
        let place = GuardedAction::Block(BlockAction::Place);

        assert_eq!(reason(evaluate(&gate, false, &at_chunks(1.5), place)), Some(DenyReason::BlockInCapture));
        assert_eq!(reason(evaluate(&gate, false, &at_chunks(2.8), place)), Some(DenyReason::BlockInBuffer));
        assert_eq!(evaluate(&gate, false, &at_chunks(3.5), place), GateDecision::Allow);
    }

    #[test]
    fn capture_and_buffer_messages_differ() {
        let gate = gate_with(vec![hill()], &[]);
        let brk = GuardedAction::Block(BlockAction::Break);

        let GateDecision::Deny { message: inner, .. } = evaluate(&gate, false, &at_chunks(0.0), brk) else {
            panic!("expected denial");
        };
        let GateDecision::Deny { message: outer, .. } = evaluate(&gate, false, &at_chunks(2.5), brk) else {
            panic!("expected denial");
        };

        assert_eq!(inner, "You cannot build inside the capture zone of HillA.");
        assert_eq!(outer, "You cannot build this close to HillA.");
    }

    #[test]
    fn privileged_actor_bypasses() {
        let gate = gate_with(vec![hill()], &["/spawn"]);
        let here = at_chunks(0.0);

        assert_eq!(evaluate(&gate, true, &here, GuardedAction::Block(BlockAction::Break)), GateDecision::Allow);
        assert_eq!(evaluate(&gate, true, &here, GuardedAction::Command("/spawn")), GateDecision::Allow);
    }

    #[test]
    fn blocked_prefix_matches_case_insensitively() {
        let gate = gate_with(vec![hill()], &["/SPAWN"]);
        let here = at_chunks(1.0);

        assert_eq!(
            reason(evaluate(&gate, false, &here, GuardedAction::Command("/Home bed"))),
            Some(DenyReason::BlockedCommand { prefix: "/home".to_string() })
        );
        assert_eq!(
            reason(evaluate(&gate, false, &here, GuardedAction::Command("/spawn"))),
            Some(DenyReason::BlockedCommand { prefix: "/spawn".to_string() })
        );
        assert_eq!(evaluate(&gate, false, &here, GuardedAction::Command("/msg bob hi")), GateDecision::Allow);
    }

    #[test]
    fn point_rules_are_checked_before_global_rules() {
        let gate = gate_with(vec![hill()], &["/ho"]);
        let decision = evaluate(&gate, false, &at_chunks(0.0), GuardedAction::Command("/home"));
        assert_eq!(reason(decision), Some(DenyReason::BlockedCommand { prefix: "/home".to_string() }));
    }

    #[test]
    fn claim_commands_denied_in_buffer_without_explicit_rule() {
        let gate = gate_with(vec![hill()], &[]);

        let decision = evaluate(&gate, false, &at_chunks(2.5), GuardedAction::Command("/town claim"));
        assert_eq!(
            reason(decision),
            Some(DenyReason::ClaimNearPoint { prefix: "/town claim".to_string() })
        );
        assert_eq!(
            evaluate(&gate, false, &at_chunks(5.0), GuardedAction::Command("/town claim")),
            GateDecision::Allow
        );
    }

    #[test]
    fn claim_commands_in_capture_ring_follow_explicit_rules_only() {
        let gate = gate_with(vec![hill()], &[]);
        assert_eq!(
            evaluate(&gate, false, &at_chunks(1.0), GuardedAction::Command("/t claim")),
            GateDecision::Allow
        );
    }

    #[test]
    fn first_configured_point_decides_on_overlap() {
        let mut first = CapturePoint::new("First", "W", Position::new(0.0, 0.0, 0.0), 2);
        first.blocked_commands = vec!["/fly".to_string()];
        let mut second = CapturePoint::new("Second", "W", Position::new(16.0, 0.0, 0.0), 2);
        second.blocked_commands = vec!["/tpa".to_string()];
        let gate = gate_with(vec![first, second], &[]);

        let here = at_chunks(1.0);
        assert_eq!(evaluate(&gate, false, &here, GuardedAction::Command("/tpa bob")), GateDecision::Allow);
        let GateDecision::Deny { point_id, .. } = evaluate(&gate, false, &here, GuardedAction::Command("/fly")) else {
            panic!("expected denial");
        };
        assert_eq!(point_id, "First");
    }

    #[test]
    fn point_templates_override_engine_templates() {
        let mut point = hill();
        point.messages = Some(MessageTemplates {
            block_in_capture: "&4{point} is under siege".to_string(),
            ..MessageTemplates::default()
        });
        let gate = gate_with(vec![point], &[]);

        let GateDecision::Deny { message, .. } =
            evaluate(&gate, false, &at_chunks(0.0), GuardedAction::Block(BlockAction::Place))
        else {
            panic!("expected denial");
        };
        assert_eq!(message, "HillA is under siege");
    }

    #[test]
    fn commands_without_slash_are_normalized() {
        assert_eq!(normalize_command("  HOME bed "), "/home bed");
        assert_eq!(normalize_command("/Spawn"), "/spawn");
    }
}
