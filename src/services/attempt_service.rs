use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::test_attempt::{AnswerMap, AttemptStatus, TestAttempt},
    models::domain::TestStatus,
    models::dto::request::validate_answer_keys,
    repositories::{AttemptFinalization, TestAttemptRepository, TestRepository, UserRepository},
    services::countdown::{self, Countdown},
    services::scoring,
};

/// Result of `start`: the attempt plus whether it was picked up mid-flight.
#[derive(Clone, Debug)]
pub struct StartedAttempt {
    pub attempt: TestAttempt,
    pub resumed: bool,
}

/// Governs the single in-flight attempt per (student, test) pair.
///
/// Transitions: no row -> `in_progress` -> `completed` | `timed_out`.
/// Terminal attempts are immutable; every terminal transition is a
/// compare-and-set on `status == in_progress` at the storage layer.
pub struct AttemptService {
    attempts: Arc<dyn TestAttemptRepository>,
    tests: Arc<dyn TestRepository>,
    users: Arc<dyn UserRepository>,
}

impl AttemptService {
    pub fn new(
        attempts: Arc<dyn TestAttemptRepository>,
        tests: Arc<dyn TestRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            attempts,
            tests,
            users,
        }
    }

    /// Creates a fresh attempt, or resumes the student's existing in-progress
    /// attempt with its saved answer map.
    pub async fn start(&self, test_id: &str, student_id: &str) -> AppResult<StartedAttempt> {
        let test = self
            .tests
            .find_by_id(test_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test with id '{}' not found", test_id)))?;

        if test.status != TestStatus::Published {
            return Err(AppError::BadRequest(
                "Test is not available for taking".to_string(),
            ));
        }

        if let Some(existing) = self.attempts.find_in_progress(test_id, student_id).await? {
            return Ok(StartedAttempt {
                attempt: existing,
                resumed: true,
            });
        }

        let attempt = TestAttempt::start(&test, student_id);
        match self.attempts.create(attempt).await {
            Ok(created) => Ok(StartedAttempt {
                attempt: created,
                resumed: false,
            }),
            // Lost the race against another start for the same pair: the
            // unique partial index kept a single row, resume that one.
            Err(AppError::AlreadyExists(_)) => {
                let existing = self
                    .attempts
                    .find_in_progress(test_id, student_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(
                            "In-progress attempt vanished during start".to_string(),
                        )
                    })?;
                Ok(StartedAttempt {
                    attempt: existing,
                    resumed: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Persists the full answer map (last write wins). Only valid while the
    /// attempt is in progress.
    pub async fn update_answers(&self, attempt_id: &str, answers: &AnswerMap) -> AppResult<()> {
        let attempt = self.require_in_progress(attempt_id).await?;

        validate_answer_keys(answers, attempt.total_questions)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        if !self.attempts.update_answers(attempt_id, answers).await? {
            // Finalized between the read above and the guarded write.
            return Err(AppError::AttemptFinalized(attempt_id.to_string()));
        }

        Ok(())
    }

    /// Explicit submit: scores the supplied answer map and finalizes the
    /// attempt. A submit arriving after the deadline is downgraded to
    /// `timed_out` — the server clock is authoritative, not the client's.
    pub async fn complete(
        &self,
        attempt_id: &str,
        answers: &AnswerMap,
        now: DateTime<Utc>,
    ) -> AppResult<TestAttempt> {
        let attempt = self.require_in_progress(attempt_id).await?;

        validate_answer_keys(answers, attempt.total_questions)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let status = if now > attempt.deadline {
            AttemptStatus::TimedOut
        } else {
            AttemptStatus::Completed
        };
        let time_taken = (now - attempt.start_time)
            .num_seconds()
            .clamp(0, attempt.allotted_seconds());

        self.finalize(attempt, answers.clone(), status, time_taken, now)
            .await
    }

    /// Deadline-driven finalization using whatever answers were last
    /// auto-saved. Rejected while the clock is still running.
    pub async fn timeout(&self, attempt_id: &str, now: DateTime<Utc>) -> AppResult<TestAttempt> {
        let attempt = self.require_in_progress(attempt_id).await?;

        if attempt.remaining_seconds(now) > 0 {
            return Err(AppError::BadRequest(
                "Attempt has not reached its deadline".to_string(),
            ));
        }

        let answers = attempt.answers.clone();
        let time_taken = attempt.allotted_seconds();

        self.finalize(attempt, answers, AttemptStatus::TimedOut, time_taken, now)
            .await
    }

    /// Marks every overdue in-progress attempt as timed out. Returns how many
    /// attempts were finalized; individual failures are logged and skipped so
    /// one bad row cannot stall the sweep.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let in_progress = self.attempts.list_in_progress().await?;

        let mut swept = 0;
        for attempt in in_progress {
            if !attempt.is_overdue(now) {
                continue;
            }
            match self.timeout(&attempt.id, now).await {
                Ok(_) => swept += 1,
                // Someone else finalized it first; nothing left to do.
                Err(AppError::AttemptFinalized(_)) => {}
                Err(err) => {
                    log::error!("Failed to time out overdue attempt {}: {}", attempt.id, err);
                }
            }
        }

        if swept > 0 {
            log::info!("Timed out {} overdue attempt(s)", swept);
        }
        Ok(swept)
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> AppResult<TestAttempt> {
        self.attempts.find_by_id(attempt_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id))
        })
    }

    async fn require_in_progress(&self, attempt_id: &str) -> AppResult<TestAttempt> {
        let attempt = self.get_attempt(attempt_id).await?;

        if attempt.status.is_terminal() {
            return Err(AppError::AttemptFinalized(attempt_id.to_string()));
        }

        Ok(attempt)
    }

    async fn finalize(
        &self,
        mut attempt: TestAttempt,
        answers: AnswerMap,
        status: AttemptStatus,
        time_taken_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<TestAttempt> {
        let test = self
            .tests
            .find_by_id(&attempt.test_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test with id '{}' not found", attempt.test_id))
            })?;

        let summary = scoring::score(&test.questions, &answers);

        let finalization = AttemptFinalization {
            status,
            answers: answers.clone(),
            score_achieved: summary.achieved,
            correct_answer_count: summary.correct_count,
            time_taken_seconds,
            end_time: now,
        };

        if !self.attempts.finalize(&attempt.id, finalization).await? {
            // Lost the race against a concurrent submit or timeout.
            return Err(AppError::AttemptFinalized(attempt.id.clone()));
        }

        // The attempt row is authoritative; the aggregate counters follow it
        // as atomic single-document updates.
        self.tests
            .record_completion(&attempt.test_id, summary.achieved)
            .await?;
        self.users
            .increment_attempted_tests(&attempt.student_id)
            .await?;

        attempt.status = status;
        attempt.answers = answers;
        attempt.score_achieved = summary.achieved;
        attempt.correct_answer_count = summary.correct_count;
        attempt.time_taken_seconds = time_taken_seconds;
        attempt.end_time = Some(now);
        attempt.modified_at = Some(now);
        Ok(attempt)
    }
}

/// Spawns a countdown that times the attempt out when its deadline passes.
/// Losing the race to a manual submit is expected and ignored.
pub fn schedule_auto_timeout(service: Arc<AttemptService>, attempt: &TestAttempt) {
    let remaining = attempt.remaining_seconds(Utc::now());
    let attempt_id = attempt.id.clone();

    tokio::spawn(countdown::drive(
        Countdown::from_seconds(remaining),
        move || async move {
            match service.timeout(&attempt_id, Utc::now()).await {
                Ok(_) => log::info!("Attempt {} timed out at deadline", attempt_id),
                Err(AppError::AttemptFinalized(_)) => {
                    log::debug!("Attempt {} was already finalized", attempt_id)
                }
                Err(err) => log::error!("Auto-timeout of attempt {} failed: {}", attempt_id, err),
            }
        },
    ));
}
