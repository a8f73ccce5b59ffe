use serde::{Deserialize, Serialize};

/// The kind of form control a probe is trying to locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldIntent {
    /// Username or email input
    Username,
    /// Password input
    Password,
    /// Submit control for the form
    Submit,
}

/// A single typed strategy for locating an element.
///
/// Strategies render to CSS selectors and are tried in the order they
/// appear in a [`MatcherPlan`]; the first visible match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum MatcherStrategy {
    /// Match an input by its `type` attribute
    InputType(String),

    /// Match an input whose placeholder contains a substring (case-insensitive)
    PlaceholderContains(String),

    /// Match an input whose name contains a substring (case-insensitive)
    NameContains(String),

    /// Raw CSS selector escape hatch
    Css(String),
}

impl MatcherStrategy {
    /// Render the strategy as a CSS selector
    pub fn to_css(&self) -> String {
        match self {
            MatcherStrategy::InputType(t) => format!("input[type='{}']", t),
            MatcherStrategy::PlaceholderContains(s) => format!("input[placeholder*='{}' i]", s),
            MatcherStrategy::NameContains(s) => format!("input[name*='{}' i]", s),
            MatcherStrategy::Css(s) => s.clone(),
        }
    }
}

/// An ordered list of matcher strategies for one field intent.
///
/// Exhausting the list is not an error; it yields [`MatchResult::NoMatch`],
/// which callers route to a secondary classification path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherPlan {
    /// What the plan is trying to find
    pub intent: FieldIntent,

    /// Strategies in priority order
    pub strategies: Vec<MatcherStrategy>,
}

impl MatcherPlan {
    /// Create a plan with an explicit strategy list
    pub fn new(intent: FieldIntent, strategies: Vec<MatcherStrategy>) -> Self {
        Self { intent, strategies }
    }

    /// Default strategy chain for a field intent, highest priority first
    pub fn for_intent(intent: FieldIntent) -> Self {
        let strategies = match intent {
            FieldIntent::Username => vec![
                MatcherStrategy::InputType("email".to_string()),
                MatcherStrategy::PlaceholderContains("email".to_string()),
                MatcherStrategy::PlaceholderContains("user".to_string()),
                MatcherStrategy::NameContains("email".to_string()),
                MatcherStrategy::NameContains("user".to_string()),
                MatcherStrategy::InputType("text".to_string()),
            ],
            FieldIntent::Password => vec![
                MatcherStrategy::InputType("password".to_string()),
                MatcherStrategy::PlaceholderContains("password".to_string()),
                MatcherStrategy::NameContains("pass".to_string()),
            ],
            FieldIntent::Submit => vec![
                MatcherStrategy::Css("button[type='submit']".to_string()),
                MatcherStrategy::Css("input[type='submit']".to_string()),
                MatcherStrategy::Css("form button".to_string()),
            ],
        };
        Self { intent, strategies }
    }

    /// Rendered selectors in priority order
    pub fn selectors(&self) -> impl Iterator<Item = String> + '_ {
        self.strategies.iter().map(|s| s.to_css())
    }
}

/// Result of evaluating a matcher plan against a live page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// A visible element matched; `priority` is the index of the winning
    /// strategy within the plan
    Found { selector: String, priority: usize },

    /// Every strategy was tried and none matched a visible element
    NoMatch,
}

impl MatchResult {
    /// Selector of the winning strategy, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            MatchResult::Found { selector, .. } => Some(selector),
            MatchResult::NoMatch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_to_css() {
        assert_eq!(
            MatcherStrategy::InputType("email".to_string()).to_css(),
            "input[type='email']"
        );
        assert_eq!(
            MatcherStrategy::PlaceholderContains("user".to_string()).to_css(),
            "input[placeholder*='user' i]"
        );
        assert_eq!(
            MatcherStrategy::NameContains("pass".to_string()).to_css(),
            "input[name*='pass' i]"
        );
        assert_eq!(
            MatcherStrategy::Css("button[type='submit']".to_string()).to_css(),
            "button[type='submit']"
        );
    }

    #[test]
    fn test_default_username_plan_priority() {
        let plan = MatcherPlan::for_intent(FieldIntent::Username);
        let selectors: Vec<String> = plan.selectors().collect();

        // Input-type matches outrank placeholder matches, which outrank
        // name matches; a bare text input is the last resort.
        assert_eq!(selectors[0], "input[type='email']");
        assert_eq!(*selectors.last().unwrap(), "input[type='text']");
        let placeholder_pos = selectors
            .iter()
            .position(|s| s.contains("placeholder"))
            .unwrap();
        let name_pos = selectors.iter().position(|s| s.contains("name*=")).unwrap();
        assert!(placeholder_pos < name_pos);
    }

    #[test]
    fn test_match_result_selector() {
        let found = MatchResult::Found {
            selector: "input[type='password']".to_string(),
            priority: 0,
        };
        assert_eq!(found.selector(), Some("input[type='password']"));
        assert_eq!(MatchResult::NoMatch.selector(), None);
    }
}
