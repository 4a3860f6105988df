use crate::models::GenerationResult;
use std::collections::VecDeque;

/// Past results, most recent first. Lives as long as the session.
#[derive(Debug, Clone, Default)]
pub struct GenerationHistory {
    entries: VecDeque<GenerationResult>,
}

impl GenerationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty results are never stored.
    pub fn push(&mut self, result: GenerationResult) -> bool {
        if result.is_empty() {
            return false;
        }
        self.entries.push_front(result);
        true
    }

    pub fn pop(&mut self) -> Option<GenerationResult> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&GenerationResult> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationResult> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRef;

    fn result(prompt: &str) -> GenerationResult {
        GenerationResult::new(vec![ImageRef::url(format!("https://x/{}.png", prompt))], prompt)
    }

    #[test]
    fn most_recent_first() {
        let mut history = GenerationHistory::new();
        history.push(result("one"));
        history.push(result("two"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.peek().map(|r| r.prompt()), Some("two"));
        let prompts: Vec<&str> = history.iter().map(|r| r.prompt()).collect();
        assert_eq!(prompts, vec!["two", "one"]);

        assert_eq!(history.pop().map(|r| r.prompt().to_string()), Some("two".into()));
        assert_eq!(history.pop().map(|r| r.prompt().to_string()), Some("one".into()));
        assert!(history.pop().is_none());
    }

    #[test]
    fn empty_results_are_not_stored() {
        let mut history = GenerationHistory::new();
        assert!(!history.push(GenerationResult::new(Vec::new(), "nothing")));
        assert!(history.is_empty());
    }
}
