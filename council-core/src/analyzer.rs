//! # Analyzer
//!
//! Converts a raw request into `(Intent, Complexity, [Subtask])`. The
//! algorithm itself is explicitly left pluggable by spec §9 Open Question
//! (1); `Analyzer` is a trait and [`HeuristicAnalyzer`] is the default,
//! dependency-free implementation shipped with the core.

use crate::models::{Complexity, ExecutionMode, Intent, RequestId, Subtask, SubtaskId, TaskKind};
use async_trait::async_trait;

pub const MAX_CONTENT_LEN: usize = 5000;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub intent: Intent,
    pub complexity: Complexity,
    pub subtasks: Vec<Subtask>,
    /// Set when the input was unusable (empty or over the length cap) and
    /// analysis fell back to a single mirrored subtask (spec §4.4).
    pub degraded: bool,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        request_id: RequestId,
        content: &str,
        mode: ExecutionMode,
    ) -> AnalysisOutcome;
}

/// Rule-based default analyzer. Simple complexity always yields exactly one
/// subtask mirroring the input; Moderate/Complex split on sentence
/// boundaries into a handful of subtasks, each tagged by a keyword
/// heuristic over the sentence content. This is intentionally simple — the
/// spec does not pin a decomposition algorithm, only its contract.
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    fn classify_intent(content: &str) -> Intent {
        let lower = content.to_lowercase();
        if lower.contains("write") || lower.contains("generate") || lower.contains("create") {
            Intent::Generation
        } else if lower.contains("verify") || lower.contains("fact") || lower.contains("true or false")
        {
            Intent::FactCheck
        } else if lower.trim_end().ends_with('?') {
            Intent::Question
        } else {
            Intent::Reasoning
        }
    }

    fn classify_complexity(content: &str) -> Complexity {
        let sentence_count = content.split(['.', '?', '!']).filter(|s| !s.trim().is_empty()).count();
        let word_count = content.split_whitespace().count();
        if sentence_count <= 1 && word_count <= 20 {
            Complexity::Simple
        } else if sentence_count <= 3 && word_count <= 80 {
            Complexity::Moderate
        } else {
            Complexity::Complex
        }
    }

    fn classify_kind(sentence: &str) -> TaskKind {
        let lower = sentence.to_lowercase();
        if lower.contains("code") || lower.contains("function") || lower.contains("implement") {
            TaskKind::CodeGeneration
        } else if lower.contains("bug") || lower.contains("fix") || lower.contains("debug") {
            TaskKind::Debugging
        } else if lower.contains("write") || lower.contains("story") || lower.contains("poem") {
            TaskKind::CreativeOutput
        } else if lower.contains("verify") || lower.contains("fact") || lower.contains("true") {
            TaskKind::FactChecking
        } else if lower.contains("research") || lower.contains("find") || lower.contains("compare")
        {
            TaskKind::Research
        } else {
            TaskKind::Reasoning
        }
    }
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    async fn analyze(
        &self,
        request_id: RequestId,
        content: &str,
        mode: ExecutionMode,
    ) -> AnalysisOutcome {
        let accuracy = mode.default_accuracy_requirement();

        if content.trim().is_empty() || content.len() > MAX_CONTENT_LEN {
            let subtask = Subtask {
                id: SubtaskId::new(),
                parent_id: request_id,
                content: content.to_string(),
                kind: TaskKind::Reasoning,
                priority: 0,
                risk: 0.5,
                accuracy_requirement: accuracy,
            };
            return AnalysisOutcome {
                intent: Intent::Question,
                complexity: Complexity::Simple,
                subtasks: vec![subtask],
                degraded: true,
            };
        }

        let intent = Self::classify_intent(content);
        let complexity = Self::classify_complexity(content);

        let subtasks = if complexity == Complexity::Simple {
            vec![Subtask {
                id: SubtaskId::new(),
                parent_id: request_id,
                content: content.to_string(),
                kind: Self::classify_kind(content),
                priority: 0,
                risk: 0.2,
                accuracy_requirement: accuracy,
            }]
        } else {
            content
                .split(['.', '?', '!'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .enumerate()
                .map(|(index, sentence)| Subtask {
                    id: SubtaskId::new(),
                    parent_id: request_id,
                    content: sentence.to_string(),
                    kind: Self::classify_kind(sentence),
                    priority: index as u8,
                    risk: if complexity == Complexity::Complex { 0.4 } else { 0.3 },
                    accuracy_requirement: accuracy,
                })
                .collect()
        };

        AnalysisOutcome { intent, complexity, subtasks, degraded: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simple_input_yields_exactly_one_subtask() {
        let analyzer = HeuristicAnalyzer;
        let outcome = analyzer.analyze(RequestId::new(), "What is 2+2?", ExecutionMode::Balanced).await;
        assert_eq!(outcome.complexity, Complexity::Simple);
        assert_eq!(outcome.subtasks.len(), 1);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn empty_input_degrades_to_one_mirrored_subtask() {
        let analyzer = HeuristicAnalyzer;
        let outcome = analyzer.analyze(RequestId::new(), "", ExecutionMode::Balanced).await;
        assert!(outcome.degraded);
        assert_eq!(outcome.subtasks.len(), 1);
    }

    #[tokio::test]
    async fn oversized_input_degrades() {
        let analyzer = HeuristicAnalyzer;
        let content = "a".repeat(MAX_CONTENT_LEN + 1);
        let outcome = analyzer.analyze(RequestId::new(), &content, ExecutionMode::Fast).await;
        assert!(outcome.degraded);
    }

    #[tokio::test]
    async fn accuracy_requirement_defaults_from_mode() {
        let analyzer = HeuristicAnalyzer;
        let outcome = analyzer.analyze(RequestId::new(), "Explain gravity.", ExecutionMode::BestQuality).await;
        assert!(outcome.subtasks.iter().all(|s| (s.accuracy_requirement - 0.95).abs() < 1e-9));
    }

    #[tokio::test]
    async fn moderate_complexity_splits_into_multiple_subtasks() {
        let analyzer = HeuristicAnalyzer;
        let content = "Research the history of Rome. Compare it to Greece. Summarize the key differences and also explain why they diverged politically over several centuries of conflict.";
        let outcome = analyzer.analyze(RequestId::new(), content, ExecutionMode::Balanced).await;
        assert!(outcome.subtasks.len() > 1);
    }
}
