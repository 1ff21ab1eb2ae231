//! Keyword-based intent classification for incoming questions.

/// Words that route a question to the fixed visualization instead of the agent.
pub const VISUALIZATION_KEYWORDS: [&str; 4] = ["histogram", "plot", "graph", "chart"];

/// What the query service should do with a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Render the fixed histogram.
    Visualization,
    /// Forward the question to the dataset agent.
    Analytical,
}

impl Intent {
    /// Classify a question by case-insensitive substring match against
    /// [`VISUALIZATION_KEYWORDS`].
    pub fn classify(question: &str) -> Self {
        let lower = question.to_lowercase();
        if VISUALIZATION_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            Intent::Visualization
        } else {
            Intent::Analytical
        }
    }
}
