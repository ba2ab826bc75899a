use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::Organization,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, organization: Organization) -> AppResult<Organization>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Organization>>;
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Organization>>;
}

pub struct MongoOrganizationRepository {
    collection: Collection<Organization>,
}

impl MongoOrganizationRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("organizations");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for organizations collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(name_index).await?;

        Ok(())
    }
}

#[async_trait]
impl OrganizationRepository for MongoOrganizationRepository {
    async fn create(&self, organization: Organization) -> AppResult<Organization> {
        self.collection
            .insert_one(&organization)
            .await
            .map_err(|err| {
                if super::is_duplicate_key_error(&err) {
                    AppError::AlreadyExists(format!(
                        "Organization '{}' already exists",
                        organization.name
                    ))
                } else {
                    err.into()
                }
            })?;
        Ok(organization)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Organization>> {
        let organization = self.collection.find_one(doc! { "id": id }).await?;
        Ok(organization)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Organization>> {
        let organization = self.collection.find_one(doc! { "name": name }).await?;
        Ok(organization)
    }
}
