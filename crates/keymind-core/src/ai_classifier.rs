use keymind_ai::{AiError, RelevanceJudge};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::classifier::{RelevanceVerdict, UnknownReason};

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(v) => v,
    None => unreachable!(),
};

/// Longest slice of an unexpected answer kept for logging
const MAX_ANSWER_PREVIEW: usize = 40;

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct CacheKey {
    task: String,
    activity: String,
}

/// Outcome of one AI classification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiVerdict {
    pub verdict: RelevanceVerdict,
    pub cached: bool,
}

/// AI tier of the relevance classifier, bounded by a timeout and cached
///
/// Only definite answers are cached. `Unknown` is returned as-is so the same
/// activity is asked about again on its next qualifying change.
pub struct AiClassifier {
    judge: Arc<dyn RelevanceJudge>,
    timeout: Duration,
    cache: RwLock<LruCache<CacheKey, RelevanceVerdict>>,
}

impl AiClassifier {
    #[must_use]
    pub fn new(judge: Arc<dyn RelevanceJudge>, timeout: Duration, cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(DEFAULT_CACHE_SIZE);
        Self {
            judge,
            timeout,
            cache: RwLock::new(LruCache::new(cache_size)),
        }
    }

    pub async fn classify(&self, api_key: Option<&str>, task: &str, activity: &str) -> AiVerdict {
        let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) else {
            return AiVerdict {
                verdict: RelevanceVerdict::Unknown(UnknownReason::MissingCredential),
                cached: false,
            };
        };

        let key = CacheKey {
            task: task.to_string(),
            activity: activity.to_string(),
        };

        // 1. Check cache
        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(&key) {
                return AiVerdict {
                    verdict: cached.clone(),
                    cached: true,
                };
            }
        }

        // 2. Cache miss - call AI
        let verdict = match tokio::time::timeout(self.timeout, self.judge.judge(api_key, task, activity)).await {
            Ok(Ok(answer)) => parse_answer(&answer),
            Ok(Err(e)) => RelevanceVerdict::Unknown(unknown_reason(&e)),
            Err(_) => RelevanceVerdict::Unknown(UnknownReason::Timeout),
        };

        // 3. Update cache
        if !matches!(verdict, RelevanceVerdict::Unknown(_)) {
            self.cache.write().await.put(key, verdict.clone());
        }

        AiVerdict {
            verdict,
            cached: false,
        }
    }
}

/// Map the model's answer to a verdict; only a bare `1` or `0` counts
#[must_use]
pub fn parse_answer(answer: &str) -> RelevanceVerdict {
    match answer.trim() {
        "1" => RelevanceVerdict::Relevant,
        "0" => RelevanceVerdict::NotRelevant,
        other => RelevanceVerdict::Unknown(UnknownReason::UnexpectedResponse(
            other.chars().take(MAX_ANSWER_PREVIEW).collect(),
        )),
    }
}

fn unknown_reason(error: &AiError) -> UnknownReason {
    match error {
        AiError::MissingApiKey { .. } => UnknownReason::MissingCredential,
        e if e.is_timeout() => UnknownReason::Timeout,
        e => UnknownReason::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedJudge {
        answer: Result<&'static str, &'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedJudge {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RelevanceJudge for ScriptedJudge {
        async fn judge(&self, _api_key: &str, _task: &str, _activity: &str) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer
                .map(ToString::to_string)
                .map_err(|e| AiError::InvalidResponse(e.to_string()))
        }
    }

    #[test]
    fn test_parse_answer_accepts_only_bare_digits() {
        assert_eq!(parse_answer("1"), RelevanceVerdict::Relevant);
        assert_eq!(parse_answer(" 0\n"), RelevanceVerdict::NotRelevant);
        assert!(matches!(
            parse_answer("1 - relevant"),
            RelevanceVerdict::Unknown(UnknownReason::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_answer("yes"),
            RelevanceVerdict::Unknown(UnknownReason::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_skips_judge() {
        let judge = ScriptedJudge::answering("1");
        let classifier = AiClassifier::new(judge.clone(), Duration::from_secs(1), 8);

        let result = classifier.classify(Some("  "), "task", "activity").await;
        assert_eq!(
            result.verdict,
            RelevanceVerdict::Unknown(UnknownReason::MissingCredential)
        );
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_definite_answers_are_cached() {
        let judge = ScriptedJudge::answering("0");
        let classifier = AiClassifier::new(judge.clone(), Duration::from_secs(1), 8);

        let first = classifier.classify(Some("key"), "task", "Reddit").await;
        let second = classifier.classify(Some("key"), "task", "Reddit").await;

        assert_eq!(first.verdict, RelevanceVerdict::NotRelevant);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_answers_are_not_cached() {
        let judge = ScriptedJudge::answering("maybe");
        let classifier = AiClassifier::new(judge.clone(), Duration::from_secs(1), 8);

        classifier.classify(Some("key"), "task", "Reddit").await;
        classifier.classify(Some("key"), "task", "Reddit").await;

        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_unknown() {
        let judge = Arc::new(ScriptedJudge {
            answer: Err("boom"),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        });
        let classifier = AiClassifier::new(judge, Duration::from_secs(1), 8);

        let result = classifier.classify(Some("key"), "task", "Reddit").await;
        assert!(matches!(
            result.verdict,
            RelevanceVerdict::Unknown(UnknownReason::Transport(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_judge_times_out() {
        let judge = Arc::new(ScriptedJudge {
            answer: Ok("1"),
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        });
        let classifier = AiClassifier::new(judge, Duration::from_secs(5), 8);

        let result = classifier.classify(Some("key"), "task", "Reddit").await;
        assert_eq!(result.verdict, RelevanceVerdict::Unknown(UnknownReason::Timeout));
    }
}
