use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::test_attempt::{AnswerMap, AttemptStatus, TestAttempt},
};

/// The full terminal-state write applied by `finalize`: status, the
/// authoritative answer map, and the scoring fields.
#[derive(Clone, Debug)]
pub struct AttemptFinalization {
    pub status: AttemptStatus,
    pub answers: AnswerMap,
    pub score_achieved: i16,
    pub correct_answer_count: i16,
    pub time_taken_seconds: i64,
    pub end_time: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestAttemptRepository: Send + Sync {
    async fn create(&self, attempt: TestAttempt) -> AppResult<TestAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestAttempt>>;
    async fn find_in_progress(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Option<TestAttempt>>;
    /// Overwrites the whole answer map, but only while the attempt is still
    /// in progress. Returns false when no in-progress row matched.
    async fn update_answers(&self, id: &str, answers: &AnswerMap) -> AppResult<bool>;
    /// Compare-and-set terminal transition guarded on `status == in_progress`.
    /// Returns false when no in-progress row matched, so concurrent
    /// submit/timeout races can never finalize twice.
    async fn finalize(&self, id: &str, update: AttemptFinalization) -> AppResult<bool>;
    async fn list_by_student(
        &self,
        student_id: &str,
        test_id: Option<String>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestAttempt>, i64)>;
    async fn list_by_test(
        &self,
        test_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestAttempt>, i64)>;
    async fn list_in_progress(&self) -> AppResult<Vec<TestAttempt>>;
}

pub struct MongoTestAttemptRepository {
    collection: Collection<TestAttempt>,
}

impl MongoTestAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("test_attempts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for test_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // At most one in-progress attempt per (student, test). The partial
        // filter keeps finished attempts out of the constraint so a student
        // can retake a test later without tripping it.
        let active_attempt_index = IndexModel::builder()
            .keys(doc! { "test_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "status": "in_progress" })
                    .name("one_active_attempt".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(IndexOptions::builder().name("student_id".to_string()).build())
            .build();

        let test_index = IndexModel::builder()
            .keys(doc! { "test_id": 1 })
            .options(IndexOptions::builder().name("test_id".to_string()).build())
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(active_attempt_index).await?;
        self.collection.create_index(student_index).await?;
        self.collection.create_index(test_index).await?;
        self.collection.create_index(status_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TestAttemptRepository for MongoTestAttemptRepository {
    async fn create(&self, attempt: TestAttempt) -> AppResult<TestAttempt> {
        self.collection.insert_one(&attempt).await.map_err(|err| {
            if super::is_duplicate_key_error(&err) {
                AppError::AlreadyExists(
                    "An in-progress attempt already exists for this student and test".to_string(),
                )
            } else {
                err.into()
            }
        })?;
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_in_progress(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Option<TestAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "test_id": test_id,
                "student_id": student_id,
                "status": AttemptStatus::InProgress.as_str(),
            })
            .await?;
        Ok(attempt)
    }

    async fn update_answers(&self, id: &str, answers: &AnswerMap) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                doc! { "$set": {
                    "answers": to_bson(answers)?,
                    "modified_at": to_bson(&Utc::now())?,
                } },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn finalize(&self, id: &str, update: AttemptFinalization) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                doc! { "$set": {
                    "status": update.status.as_str(),
                    "answers": to_bson(&update.answers)?,
                    "score_achieved": update.score_achieved as i32,
                    "correct_answer_count": update.correct_answer_count as i32,
                    "time_taken_seconds": update.time_taken_seconds,
                    "end_time": to_bson(&update.end_time)?,
                    "modified_at": to_bson(&Utc::now())?,
                } },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn list_by_student(
        &self,
        student_id: &str,
        test_id: Option<String>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestAttempt>, i64)> {
        let mut filter = doc! { "student_id": student_id };
        if let Some(test_id) = test_id {
            filter.insert("test_id", test_id);
        }

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let find_options = FindOptions::builder()
            .skip(Some(offset as u64))
            .limit(Some(limit))
            .sort(doc! { "start_time": -1 })
            .build();

        let attempts = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok((attempts, total))
    }

    async fn list_by_test(
        &self,
        test_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestAttempt>, i64)> {
        let filter = doc! { "test_id": test_id };

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let find_options = FindOptions::builder()
            .skip(Some(offset as u64))
            .limit(Some(limit))
            .sort(doc! { "start_time": -1 })
            .build();

        let attempts = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok((attempts, total))
    }

    async fn list_in_progress(&self) -> AppResult<Vec<TestAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "status": AttemptStatus::InProgress.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }
}
