//! Plan modifiers adjust planned values before the host computes a diff.

use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    fn modify(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

pub struct PlanModifyRequest {
    /// Value currently in state
    pub state: Dynamic,
    /// Value proposed by the plan
    pub plan: Dynamic,
    /// Value as written in configuration
    pub config: Dynamic,
    pub path: AttributePath,
}

pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Suppresses the diff when the configuration leaves an attribute empty
/// but the server has computed a value for it. The reverse direction
/// (configured value, empty on the server) still diffs.
pub struct IgnoreChangeFromEmpty;

impl PlanModifier for IgnoreChangeFromEmpty {
    fn description(&self) -> String {
        "keep the server-computed value when the configuration is empty".to_string()
    }

    fn modify(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = if request.config.is_unset() && !request.state.is_unset() {
            request.state
        } else {
            request.plan
        };
        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Keeps the state value when the plan would otherwise mark a computed
/// attribute unknown.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "use the prior state value while the plan is unknown".to_string()
    }

    fn modify(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if !matches!(state, Dynamic::Null | Dynamic::Unknown) => {
                request.state
            }
            _ => request.plan,
        };
        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Fills an attribute the configuration leaves unset with a fixed
/// value, so plans show the effective setting. A server-computed value
/// already in state still wins over the default.
pub struct StaticDefault(pub Dynamic);

impl PlanModifier for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.0)
    }

    fn modify(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = if !request.config.is_unset() {
            request.plan
        } else if !request.state.is_unset() {
            request.state
        } else {
            self.0.clone()
        };
        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(state: Dynamic, plan: Dynamic, config: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            state,
            plan,
            config,
            path: AttributePath::new("field"),
        }
    }

    #[test]
    fn ignore_change_from_empty_keeps_observed_value() {
        let response = IgnoreChangeFromEmpty.modify(request(
            Dynamic::String("server-computed".into()),
            Dynamic::String(String::new()),
            Dynamic::String(String::new()),
        ));
        assert_eq!(response.plan_value, Dynamic::String("server-computed".into()));
    }

    #[test]
    fn ignore_change_from_empty_does_not_suppress_reverse() {
        // configured value, server empty: the diff must remain
        let response = IgnoreChangeFromEmpty.modify(request(
            Dynamic::String(String::new()),
            Dynamic::String("declared".into()),
            Dynamic::String("declared".into()),
        ));
        assert_eq!(response.plan_value, Dynamic::String("declared".into()));
    }

    #[test]
    fn use_state_for_unknown_prefers_known_state() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("42".into()),
            Dynamic::Unknown,
            Dynamic::Null,
        ));
        assert_eq!(response.plan_value, Dynamic::String("42".into()));
    }

    #[test]
    fn static_default_fills_unset_attributes() {
        let modifier = StaticDefault(Dynamic::Number(300.0));
        let response = modifier.modify(request(Dynamic::Null, Dynamic::Null, Dynamic::Null));
        assert_eq!(response.plan_value, Dynamic::Number(300.0));
    }

    #[test]
    fn static_default_defers_to_config_and_state() {
        let modifier = StaticDefault(Dynamic::Number(300.0));

        let response = modifier.modify(request(
            Dynamic::Null,
            Dynamic::Number(80.0),
            Dynamic::Number(80.0),
        ));
        assert_eq!(response.plan_value, Dynamic::Number(80.0));

        // computed value from the server beats the default
        let response = modifier.modify(request(
            Dynamic::Number(120.0),
            Dynamic::Unknown,
            Dynamic::Null,
        ));
        assert_eq!(response.plan_value, Dynamic::Number(120.0));
    }

    #[test]
    fn use_state_for_unknown_keeps_known_plan() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("old".into()),
            Dynamic::String("new".into()),
            Dynamic::String("new".into()),
        ));
        assert_eq!(response.plan_value, Dynamic::String("new".into()));
    }
}
