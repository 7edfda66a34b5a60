use crate::constants::markers;
use crate::models::{AgentOutcome, AgentStep, PluginInvocation, PluginRegistry};
use crate::services::trace_parser::parse_failed_trace;
use crate::utils::query::{parse_call_target, CallTarget};
use crate::utils::text::strip_quote_layer;

/// Plugin invocations detected in one agent outcome. Unknown tools and
/// unusable inputs are dropped; plugins only ever come from `registry`.
pub fn extract_invocations(registry: &PluginRegistry, outcome: &AgentOutcome) -> Vec<PluginInvocation> {
    match outcome {
        AgentOutcome::Structured { steps, .. } => from_steps(registry, steps),
        AgentOutcome::Failed { raw_text } => from_failure_text(registry, raw_text),
    }
}

fn from_steps(registry: &PluginRegistry, steps: &[AgentStep]) -> Vec<PluginInvocation> {
    let mut invocations: Vec<PluginInvocation> = steps
        .iter()
        .filter_map(|step| registry.get_by_name(&step.tool))
        .map(PluginInvocation::new)
        .collect();

    for step in steps {
        let cleaned = strip_quote_layer(&step.tool_input);
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(markers::NONE_INPUT) {
            continue;
        }
        if let Some(target) = parse_call_target(cleaned) {
            attach(&mut invocations, &target);
        }
    }
    invocations
}

fn from_failure_text(registry: &PluginRegistry, raw_text: &str) -> Vec<PluginInvocation> {
    let recovered = parse_failed_trace(raw_text);
    let mut invocations: Vec<PluginInvocation> = recovered
        .tool_names
        .iter()
        .filter_map(|name| registry.get_by_name(name))
        .map(PluginInvocation::new)
        .collect();

    for url in &recovered.quoted_urls {
        if let Some(target) = parse_call_target(url) {
            attach(&mut invocations, &target);
        }
    }
    invocations
}

/// Every invocation whose plugin owns the endpoint gets it, not just the one from the same step.
fn attach(invocations: &mut [PluginInvocation], target: &CallTarget) {
    for invocation in invocations
        .iter_mut()
        .filter(|inv| inv.plugin.has_api_endpoint(&target.endpoint))
    {
        invocation.api_called = Some(target.endpoint.clone());
        invocation.mapped_operation_parameters = Some(target.parameters.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::extract_invocations;
    use crate::models::{AgentOutcome, AgentStep, Plugin, PluginRegistry};
    use serde_json::json;
    use std::sync::Arc;

    const FORECAST: &str = "https://api.example.com/forecast";

    fn registry() -> PluginRegistry {
        PluginRegistry::new(vec![
            Plugin::new("Weather").with_endpoint(FORECAST),
            Plugin::new("Todo").with_endpoint("https://todo.example.com/items"),
        ])
    }

    fn structured(steps: Vec<AgentStep>) -> AgentOutcome {
        AgentOutcome::Structured {
            answer: "done".to_string(),
            steps,
        }
    }

    #[test]
    fn structured_step_gets_endpoint_and_parameters() {
        let outcome = structured(vec![AgentStep::new(
            "Weather",
            "https://api.example.com/forecast?city=Boston",
        )]);
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin.name, "Weather");
        assert_eq!(found[0].api_called.as_deref(), Some(FORECAST));
        let params = found[0].mapped_operation_parameters.as_ref().expect("params");
        assert_eq!(params.get("city"), Some(&json!("Boston")));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn quoted_none_input_attaches_nothing() {
        let outcome = structured(vec![AgentStep::new("Weather", "'none'")]);
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 1);
        assert!(found[0].api_called.is_none());
        assert!(found[0].mapped_operation_parameters.is_none());
    }

    #[test]
    fn quoted_url_input_is_unwrapped() {
        let outcome = structured(vec![AgentStep::new(
            "Weather",
            "'https://api.example.com/forecast?city=Austin&day=1&day=2'",
        )]);
        let found = extract_invocations(&registry(), &outcome);
        let params = found[0].mapped_operation_parameters.as_ref().expect("params");
        assert_eq!(params.get("city"), Some(&json!("Austin")));
        assert_eq!(params.get("day"), Some(&json!(["1", "2"])));
    }

    #[test]
    fn unknown_tools_and_garbage_inputs_are_dropped() {
        let outcome = structured(vec![
            AgentStep::new("requests_get", "https://api.example.com/forecast?city=Oslo"),
            AgentStep::new("Todo", "list my todos"),
        ]);
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin.name, "Todo");
        assert!(found[0].api_called.is_none());
    }

    #[test]
    fn url_from_any_step_attaches_to_every_owning_invocation() {
        // The plugin is named in two steps but the URL shows up only in a generic tool's input.
        let outcome = structured(vec![
            AgentStep::new("Weather", ""),
            AgentStep::new("requests_get", "https://api.example.com/forecast?city=Lima"),
            AgentStep::new("Weather", "none"),
        ]);
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 2);
        for invocation in &found {
            assert_eq!(invocation.api_called.as_deref(), Some(FORECAST));
            assert_eq!(
                invocation
                    .mapped_operation_parameters
                    .as_ref()
                    .and_then(|p| p.get("city")),
                Some(&json!("Lima"))
            );
        }
    }

    #[test]
    fn endpoint_outside_the_plugin_is_not_attached() {
        let outcome = structured(vec![AgentStep::new(
            "Weather",
            "https://todo.example.com/items?owner=me",
        )]);
        let found = extract_invocations(&registry(), &outcome);
        assert!(found[0].api_called.is_none());
    }

    #[test]
    fn failure_text_is_parsed_for_actions_and_urls() {
        let outcome = AgentOutcome::Failed {
            raw_text: "Could not parse LLM output:\nAction: Weather\nAction Input: \"https://api.example.com/forecast?city=Reno\"".to_string(),
        };
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin.name, "Weather");
        assert_eq!(found[0].api_called.as_deref(), Some(FORECAST));
        assert_eq!(
            found[0].mapped_operation_parameters.as_ref().and_then(|p| p.get("city")),
            Some(&json!("Reno"))
        );
    }

    #[test]
    fn failure_text_action_with_trailing_note_still_matches() {
        let outcome = AgentOutcome::Failed {
            raw_text: "Action: Weather: get forecast\nAction Input: \"https://api.example.com/forecast?city=Reno\"".to_string(),
        };
        let found = extract_invocations(&registry(), &outcome);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin.name, "Weather");
        assert_eq!(found[0].api_called.as_deref(), Some(FORECAST));
    }

    #[test]
    fn failure_text_never_invents_plugins() {
        let outcome = AgentOutcome::Failed {
            raw_text: "Action: Calendar\nAction Input: \"https://cal.example.com/events?day=1\"".to_string(),
        };
        assert!(extract_invocations(&registry(), &outcome).is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let registry = registry();
        let outcome = structured(vec![
            AgentStep::new("Weather", "https://api.example.com/forecast?city=Boston"),
            AgentStep::new("Todo", "https://todo.example.com/items?owner=me"),
        ]);
        let first = extract_invocations(&registry, &outcome);
        let second = extract_invocations(&registry, &outcome);
        assert_eq!(first, second);
        assert!(first
            .iter()
            .all(|inv| registry.iter().any(|p| Arc::ptr_eq(p, &inv.plugin))));
    }
}
