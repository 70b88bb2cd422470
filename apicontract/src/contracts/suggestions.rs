//! Suggestion registry mapping extraction error codes to remediation hints.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::codes;

/// Structured remediation info for an extraction failure.
#[derive(Debug, Clone)]
pub struct ContractSuggestion {
    /// Error code this suggestion applies to.
    pub code: String,
    /// Short title for the error.
    pub title: String,
    /// Detailed summary of the issue.
    pub summary: String,
    /// Steps to fix the issue.
    pub fix_steps: Vec<String>,
}

impl ContractSuggestion {
    /// Creates a new contract suggestion.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        fix_steps: Vec<String>,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            summary: summary.into(),
            fix_steps,
        }
    }

    /// Single-line remediation text built from the fix steps.
    #[must_use]
    pub fn remediation(&self) -> String {
        if self.fix_steps.is_empty() {
            return self.summary.clone();
        }
        self.fix_steps.join("; ")
    }
}

fn steps(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

static SUGGESTIONS: LazyLock<RwLock<HashMap<String, ContractSuggestion>>> = LazyLock::new(|| {
    let defaults = [
        ContractSuggestion::new(
            codes::ROUTE_INVALID_ACTION_FORMAT,
            "Invalid Route Action",
            "The route action could not be split into a handler and a method.",
            steps(&["Declare the action as 'Handler@method' or 'Handler::method'"]),
        ),
        ContractSuggestion::new(
            codes::ROUTE_HANDLER_NOT_FOUND,
            "Handler Not Registered",
            "The route points at a handler that the handler registry does not know.",
            steps(&[
                "Register the handler with HandlerRegistry::register_handler",
                "Check the handler name for typos or a missing namespace",
            ]),
        ),
        ContractSuggestion::new(
            codes::ROUTE_METHOD_NOT_FOUND,
            "Handler Method Not Found",
            "The handler is registered but does not declare the routed method.",
            steps(&["Add the method to the handler definition", "Or fix the route action"]),
        ),
        ContractSuggestion::new(
            codes::ROUTE_REFLECTION_FAILED,
            "Handler Reflection Failed",
            "Metadata for the handler could not be produced.",
            steps(&["Inspect the handler introspector for errors"]),
        ),
        ContractSuggestion::new(
            codes::FORM_REQUEST_NOT_FOUND,
            "Validator Not Registered",
            "The handler names a validator that is not registered.",
            steps(&["Register the validator with HandlerRegistry::register_validator"]),
        ),
        ContractSuggestion::new(
            codes::FORM_REQUEST_INSTANTIATION_FAILED,
            "Validator Instantiation Failed",
            "The validator factory returned an error.",
            steps(&[
                "Make sure the validator can be built without a live request",
                "Avoid touching external services in the validator constructor",
            ]),
        ),
        ContractSuggestion::new(
            codes::FORM_REQUEST_RULES_MISSING,
            "Validator Has No Rules",
            "The validator does not expose a rule set.",
            steps(&["Implement Validator::rules for the validator"]),
        ),
        ContractSuggestion::new(
            codes::FORM_REQUEST_INVALID_RULES,
            "Validator Rules Malformed",
            "Rules must be a map of field name to a rule string or list of rule strings.",
            steps(&["Return a JSON object such as {\"title\": \"required|string\"}"]),
        ),
        ContractSuggestion::new(
            codes::RESOURCE_CLASS_NOT_FOUND,
            "Transformer Not Registered",
            "The handler declares a response transformer that is not registered.",
            steps(&[
                "Register the transformer with TransformerRegistry::register",
                "Check the transformer name against the preload directory",
            ]),
        ),
        ContractSuggestion::new(
            codes::RESOURCE_MODEL_NOT_FOUND,
            "Model Not Resolved",
            "No model could be associated with the transformer by mapping or naming convention.",
            steps(&[
                "Set an explicit model on the transformer registration",
                "Or name the transformer '<Model>Resource'",
            ]),
        ),
        ContractSuggestion::new(
            codes::RESOURCE_INSTANCE_CREATION_FAILED,
            "Model Instance Synthesis Failed",
            "The instance synthesizer could not build a representative model instance.",
            steps(&[
                "Provide a factory for the model",
                "Or declare model attributes in the model catalog",
            ]),
        ),
        ContractSuggestion::new(
            codes::RESOURCE_TRANSFORMER_INSTANTIATION_FAILED,
            "Transformer Instantiation Failed",
            "The transformer factory returned an error.",
            steps(&["Make the transformer constructible without request state"]),
        ),
        ContractSuggestion::new(
            codes::RESOURCE_TRANSFORM_FAILED,
            "Transformer Execution Failed",
            "Every attempt to run the transformer failed and no declared field list exists.",
            steps(&[
                "Guard optional relations in the transformer",
                "Or declare the transformer's fields on its registration",
            ]),
        ),
    ];

    let map = defaults
        .into_iter()
        .map(|s| (s.code.clone(), s))
        .collect::<HashMap<_, _>>();
    RwLock::new(map)
});

/// Register a suggestion for an error code.
pub fn register_suggestion(suggestion: ContractSuggestion) {
    SUGGESTIONS.write().insert(suggestion.code.clone(), suggestion);
}

/// Return suggestion metadata for an error code if registered.
#[must_use]
pub fn get_contract_suggestion(code: &str) -> Option<ContractSuggestion> {
    SUGGESTIONS.read().get(code).cloned()
}

/// Returns all registered suggestions.
#[must_use]
pub fn list_suggestions() -> Vec<ContractSuggestion> {
    SUGGESTIONS.read().values().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_a_suggestion() {
        for code in codes::ALL {
            let suggestion = get_contract_suggestion(code);
            assert!(suggestion.is_some(), "missing suggestion for {code}");
            assert!(!suggestion.unwrap().remediation().is_empty());
        }
    }

    #[test]
    fn test_get_unknown_suggestion() {
        assert!(get_contract_suggestion("UNKNOWN-CODE").is_none());
    }

    #[test]
    fn test_register_custom_suggestion() {
        register_suggestion(ContractSuggestion::new(
            "CUSTOM_001",
            "Custom Error",
            "A custom error for testing",
            vec!["Fix step 1".to_string(), "Fix step 2".to_string()],
        ));

        let suggestion = get_contract_suggestion("CUSTOM_001").unwrap();
        assert_eq!(suggestion.title, "Custom Error");
        assert_eq!(suggestion.remediation(), "Fix step 1; Fix step 2");
    }

    #[test]
    fn test_remediation_falls_back_to_summary() {
        let suggestion = ContractSuggestion::new("X", "T", "Just a summary", Vec::new());
        assert_eq!(suggestion.remediation(), "Just a summary");
    }

    #[test]
    fn test_list_suggestions() {
        assert!(list_suggestions().len() >= codes::ALL.len());
    }
}
