use crate::errors::{Result, ScorecardError};
use crate::model::{NewCaseResult, RunStatus, RunSummary, TestCase, TestRun};
use crate::providers::{Answerer, Scorer};
use crate::storage::{RunStore, TestCatalog};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::{timeout, Duration};

/// Prefix of the reasoning stored for a case whose answerer or scorer failed.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Upper bound for each answerer call and each scorer call.
    pub case_timeout: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            case_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub answer: String,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Answer,
    Score,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseFailure {
    pub stage: FailedStage,
    pub message: String,
}

impl CaseFailure {
    fn new(stage: FailedStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn reasoning(&self) -> String {
        format!("{}{}", ERROR_PREFIX, self.message)
    }
}

pub type CaseResultKind = std::result::Result<CaseOutcome, CaseFailure>;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    success: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: &CaseResultKind) {
        match outcome {
            Ok(_) => self.success += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Drives one test set through the answerer and scorer, one case at a time.
#[derive(Clone)]
pub struct Runner {
    pub catalog: Arc<dyn TestCatalog>,
    pub runs: Arc<dyn RunStore>,
    pub answerer: Arc<dyn Answerer>,
    pub scorer: Arc<dyn Scorer>,
    pub policy: RunPolicy,
    active: Arc<Mutex<HashSet<i64>>>,
}

impl Runner {
    pub fn new(
        catalog: Arc<dyn TestCatalog>,
        runs: Arc<dyn RunStore>,
        answerer: Arc<dyn Answerer>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            catalog,
            runs,
            answerer,
            scorer,
            policy: RunPolicy::default(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn execute(&self, test_set_id: i64) -> Result<RunSummary> {
        let set = self
            .catalog
            .get_test_set(test_set_id)?
            .ok_or_else(|| ScorecardError::not_found("test set", test_set_id))?;

        let cases = self.catalog.list_cases(set.id)?;
        if cases.is_empty() {
            return Err(ScorecardError::EmptyInput(set.id));
        }

        let _guard = ActiveRun::acquire(&self.active, set.id)?;
        let run = self.runs.create_run(set.id)?;
        tracing::info!(
            event = "scorecard.run.started",
            run_id = run.id,
            test_set_id = set.id,
            cases = cases.len(),
            answerer = self.answerer.name(),
            scorer = self.scorer.name(),
            "run {} started for test set '{}'", run.id, set.name
        );

        let finished = match self.run_cases(&run, &cases).await {
            Ok(tally) => self
                .runs
                .finalize_run(run.id, RunStatus::Completed)
                .map(|done| (tally, done)),
            Err(e) => Err(e),
        };

        match finished {
            Ok((tally, done)) => {
                tracing::info!(
                    event = "scorecard.run.completed",
                    run_id = run.id,
                    total = cases.len(),
                    success = tally.success,
                    failed = tally.failed,
                );
                Ok(RunSummary {
                    test_run_id: run.id,
                    test_set_id: set.id,
                    status: done.status,
                    total: cases.len(),
                    success_count: tally.success,
                    failed_count: tally.failed,
                })
            }
            Err(e) => {
                tracing::error!(
                    event = "scorecard.run.failed",
                    run_id = run.id,
                    error = %e,
                    "run {} aborted", run.id
                );
                if let Err(fe) = self.runs.finalize_run(run.id, RunStatus::Failed) {
                    tracing::error!(
                        event = "scorecard.run.finalize_failed",
                        run_id = run.id,
                        error = %fe,
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_cases(&self, run: &TestRun, cases: &[TestCase]) -> Result<Tally> {
        let mut tally = Tally::default();

        for tc in cases {
            let outcome = self.attempt_case(tc).await;
            let record = match &outcome {
                Ok(ok) => NewCaseResult {
                    test_run_id: run.id,
                    test_case_id: tc.id,
                    actual: ok.answer.clone(),
                    score: ok.score,
                    reasoning: ok.reasoning.clone(),
                },
                Err(failure) => {
                    tracing::warn!(
                        event = "scorecard.case.failed",
                        run_id = run.id,
                        case_id = %tc.case_id,
                        stage = ?failure.stage,
                        error = %failure.message,
                    );
                    NewCaseResult {
                        test_run_id: run.id,
                        test_case_id: tc.id,
                        actual: String::new(),
                        score: 0.0,
                        reasoning: failure.reasoning(),
                    }
                }
            };

            self.runs.insert_result(&record)?;
            tally.record(&outcome);
            tracing::debug!(
                event = "scorecard.case.done",
                run_id = run.id,
                case_id = %tc.case_id,
                score = record.score,
            );
        }

        Ok(tally)
    }

    /// Answer then score one case. Every collaborator error, including a
    /// timeout, becomes a [`CaseFailure`].
    pub async fn attempt_case(&self, tc: &TestCase) -> CaseResultKind {
        let limit = self.policy.case_timeout;
        let row = tc.to_row();

        let answer = match timeout(limit, self.answerer.respond(&row)).await {
            Ok(Ok(a)) => a.answer,
            Ok(Err(e)) => return Err(CaseFailure::new(FailedStage::Answer, format!("{e:#}"))),
            Err(_) => {
                return Err(CaseFailure::new(
                    FailedStage::Answer,
                    format!("answerer timed out after {}s", limit.as_secs_f64()),
                ))
            }
        };

        let graded = match timeout(limit, self.scorer.score(&tc.input, &tc.expected, &answer)).await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(CaseFailure::new(FailedStage::Score, format!("{e:#}"))),
            Err(_) => {
                return Err(CaseFailure::new(
                    FailedStage::Score,
                    format!("scorer timed out after {}s", limit.as_secs_f64()),
                ))
            }
        };

        if !graded.score.is_finite() {
            return Err(CaseFailure::new(
                FailedStage::Score,
                format!("scorer returned a non-finite score ({})", graded.score),
            ));
        }

        Ok(CaseOutcome {
            answer,
            score: graded.score,
            reasoning: graded.reasoning,
        })
    }
}

/// Marks a test set as having a run in flight for as long as it lives.
struct ActiveRun {
    active: Arc<Mutex<HashSet<i64>>>,
    test_set_id: i64,
}

impl ActiveRun {
    fn acquire(active: &Arc<Mutex<HashSet<i64>>>, test_set_id: i64) -> Result<Self> {
        let mut sets = active
            .lock()
            .map_err(|_| ScorecardError::Other(anyhow::anyhow!("active run registry poisoned")))?;
        if !sets.insert(test_set_id) {
            return Err(ScorecardError::RunInProgress(test_set_id));
        }
        Ok(Self {
            active: active.clone(),
            test_set_id,
        })
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if let Ok(mut sets) = self.active.lock() {
            sets.remove(&self.test_set_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Row;
    use crate::providers::{Answer, Score};
    use crate::storage::Store;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct Slow;

    #[async_trait]
    impl Answerer for Slow {
        async fn respond(&self, _row: &Row) -> anyhow::Result<Answer> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Answer {
                answer: "late".into(),
            })
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct NanScorer;

    #[async_trait]
    impl Scorer for NanScorer {
        async fn score(&self, _i: &str, _e: &str, _a: &str) -> anyhow::Result<Score> {
            Ok(Score {
                score: f64::NAN,
                reasoning: String::new(),
            })
        }
        fn name(&self) -> &'static str {
            "nan"
        }
    }

    fn case() -> TestCase {
        TestCase {
            id: 1,
            test_set_id: 1,
            case_id: "1".into(),
            input: "2+2?".into(),
            expected: "4".into(),
            extra: BTreeMap::new(),
            created_at: chrono::Utc::now(),
        }
    }

    fn runner(answerer: Arc<dyn Answerer>, scorer: Arc<dyn Scorer>) -> Runner {
        let store = Arc::new(Store::memory().unwrap());
        Runner::new(store.clone(), store, answerer, scorer).with_policy(RunPolicy {
            case_timeout: Duration::from_millis(50),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_answerer_times_out_as_case_failure() {
        let r = runner(Arc::new(Slow), Arc::new(NanScorer));
        let failure = r.attempt_case(&case()).await.unwrap_err();
        assert_eq!(failure.stage, FailedStage::Answer);
        assert!(failure.message.contains("timed out"), "{}", failure.message);
        assert!(failure.reasoning().starts_with(ERROR_PREFIX));
    }

    #[tokio::test]
    async fn non_finite_score_is_a_scoring_failure() {
        let r = runner(
            Arc::new(crate::providers::echo::EchoAnswerer),
            Arc::new(NanScorer),
        );
        let failure = r.attempt_case(&case()).await.unwrap_err();
        assert_eq!(failure.stage, FailedStage::Score);
    }

    #[test]
    fn active_run_guard_rejects_second_holder_until_dropped() {
        let active = Arc::new(Mutex::new(HashSet::new()));
        let first = ActiveRun::acquire(&active, 7).unwrap();
        assert!(matches!(
            ActiveRun::acquire(&active, 7),
            Err(ScorecardError::RunInProgress(7))
        ));
        assert!(ActiveRun::acquire(&active, 8).is_ok());
        drop(first);
        assert!(ActiveRun::acquire(&active, 7).is_ok());
    }
}
