use keymind_ai::RelevanceJudge;
use keymind_storage::SettingsSnapshot;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ai_classifier::AiClassifier;
use crate::enforcement::Task;

/// Why a relevance verdict could not be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// No API key configured
    MissingCredential,
    /// The AI call did not answer in time
    Timeout,
    /// Network or API failure
    Transport(String),
    /// The model answered something other than `1` or `0`
    UnexpectedResponse(String),
}

/// Tri-state relevance outcome
///
/// Only [`RelevanceVerdict::NotRelevant`] ever leads to a corrective action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceVerdict {
    Relevant,
    NotRelevant,
    Unknown(UnknownReason),
}

impl RelevanceVerdict {
    #[must_use]
    pub const fn triggers_action(&self) -> bool {
        matches!(self, Self::NotRelevant)
    }
}

/// Which tier produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Matched a user allow-list entry
    AllowList,
    /// Matched a user deny-list entry
    DenyList,
    /// Answered by the AI service
    Ai,
    /// Answered from a previous AI verdict
    AiCache,
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllowList => "allow-list",
            Self::DenyList => "deny-list",
            Self::Ai => "ai",
            Self::AiCache => "ai-cache",
        })
    }
}

/// Classification result with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub verdict: RelevanceVerdict,
    pub source: ClassificationSource,
    /// The list entry that matched, for the rule tiers
    pub matched_entry: Option<String>,
}

/// Return the first entry contained in `label`, ignoring case on both sides
///
/// Blank entries never match.
#[must_use]
pub fn first_match<'a>(label: &str, entries: &'a BTreeSet<String>) -> Option<&'a str> {
    let label = label.to_lowercase();
    entries.iter().map(String::as_str).find(|entry| {
        let entry = entry.trim().to_lowercase();
        !entry.is_empty() && label.contains(&entry)
    })
}

/// Decides whether an activity is relevant to the current task
/// Priority: allow list > deny list > AI
pub struct RelevanceClassifier {
    ai: AiClassifier,
}

impl RelevanceClassifier {
    #[must_use]
    pub fn new(judge: Arc<dyn RelevanceJudge>, ai_timeout: Duration, cache_size: usize) -> Self {
        Self {
            ai: AiClassifier::new(judge, ai_timeout, cache_size),
        }
    }

    /// Classify an activity label against the task
    pub async fn classify(
        &self,
        task: &Task,
        activity_label: &str,
        settings: &SettingsSnapshot,
    ) -> RelevanceVerdict {
        self.classify_full(task, activity_label, settings).await.verdict
    }

    /// Classify with full result metadata
    pub async fn classify_full(
        &self,
        task: &Task,
        activity_label: &str,
        settings: &SettingsSnapshot,
    ) -> ClassificationResult {
        // 1. User allow list (highest priority)
        if let Some(entry) = first_match(activity_label, &settings.allowed) {
            log::debug!("'{activity_label}' allowed by '{entry}'");
            return ClassificationResult {
                verdict: RelevanceVerdict::Relevant,
                source: ClassificationSource::AllowList,
                matched_entry: Some(entry.to_string()),
            };
        }

        // 2. User deny list
        if let Some(entry) = first_match(activity_label, &settings.banned) {
            log::debug!("'{activity_label}' banned by '{entry}'");
            return ClassificationResult {
                verdict: RelevanceVerdict::NotRelevant,
                source: ClassificationSource::DenyList,
                matched_entry: Some(entry.to_string()),
            };
        }

        // 3. Ask the AI service
        let result = self
            .ai
            .classify(settings.api_key(), &task.description, activity_label)
            .await;
        let source = if result.cached {
            ClassificationSource::AiCache
        } else {
            ClassificationSource::Ai
        };
        log::debug!("'{activity_label}' classified by {source}: {:?}", result.verdict);

        ClassificationResult {
            verdict: result.verdict,
            source,
            matched_entry: None,
        }
    }
}
