use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{Test, TestStatus},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn create(&self, test: Test) -> AppResult<Test>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>>;
    async fn find_by_name_in_organization(
        &self,
        organization_id: &str,
        name: &str,
    ) -> AppResult<Option<Test>>;
    async fn list_by_organization(
        &self,
        organization_id: &str,
        status: Option<TestStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)>;
    async fn update(&self, test: Test) -> AppResult<Test>;
    /// Atomically bumps the attempt counter and raises the highest-score
    /// watermark; `$max` keeps the watermark monotonic without a
    /// read-modify-write round-trip.
    async fn record_completion(&self, test_id: &str, score: i16) -> AppResult<()>;
}

pub struct MongoTestRepository {
    collection: Collection<Test>,
}

impl MongoTestRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("tests");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for tests collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // Test names are unique inside one organization, not globally.
        let org_name_index = IndexModel::builder()
            .keys(doc! { "organization_id": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("org_name_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(org_name_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn create(&self, test: Test) -> AppResult<Test> {
        self.collection.insert_one(&test).await.map_err(|err| {
            if super::is_duplicate_key_error(&err) {
                AppError::AlreadyExists(format!(
                    "A test named '{}' already exists in this organization",
                    test.name
                ))
            } else {
                err.into()
            }
        })?;
        Ok(test)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
    }

    async fn find_by_name_in_organization(
        &self,
        organization_id: &str,
        name: &str,
    ) -> AppResult<Option<Test>> {
        let test = self
            .collection
            .find_one(doc! { "organization_id": organization_id, "name": name })
            .await?;
        Ok(test)
    }

    async fn list_by_organization(
        &self,
        organization_id: &str,
        status: Option<TestStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        let mut filter = doc! { "organization_id": organization_id };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let find_options = FindOptions::builder()
            .skip(Some(offset as u64))
            .limit(Some(limit))
            .sort(doc! { "name": 1 })
            .build();

        let cursor = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?;
        let tests: Vec<Test> = cursor.try_collect().await?;

        Ok((tests, total))
    }

    async fn update(&self, test: Test) -> AppResult<Test> {
        let result = self
            .collection
            .replace_one(doc! { "id": &test.id }, &test)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Test with id '{}' not found",
                test.id
            )));
        }

        Ok(test)
    }

    async fn record_completion(&self, test_id: &str, score: i16) -> AppResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "id": test_id },
                doc! {
                    "$inc": { "attempts": 1_i64 },
                    "$max": { "highest_score": score as i32 },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Test with id '{}' not found",
                test_id
            )));
        }

        Ok(())
    }
}
