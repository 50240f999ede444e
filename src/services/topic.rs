//! Topic service
//!
//! Listing with name search and pagination, plus create/update/delete with
//! unique names.

use crate::db::is_unique_violation;
use crate::db::repositories::TopicRepository;
use crate::models::{InvalidPage, PageRequest, PagedResult, Topic, TopicInput};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TopicServiceError {
    #[error("Topic not found: {0}")]
    NotFound(i64),

    #[error("Topic name already exists: {0}")]
    DuplicateName(String),

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TopicService {
    repo: Arc<dyn TopicRepository>,
}

impl TopicService {
    pub fn new(repo: Arc<dyn TopicRepository>) -> Self {
        Self { repo }
    }

    /// One page of topics whose name contains `needle`.
    pub async fn list(
        &self,
        needle: &str,
        page: PageRequest,
        per_page: u32,
    ) -> Result<PagedResult<Topic>, TopicServiceError> {
        let total = self
            .repo
            .count_matching(needle)
            .await
            .context("Failed to count topics")?;
        let params = page.resolve(total, per_page)?;
        let items = self
            .repo
            .find_page(needle, &params)
            .await
            .context("Failed to list topics")?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn filter_by_substring(&self, needle: &str) -> Result<Vec<Topic>, TopicServiceError> {
        Ok(self.repo.filter_by_substring(needle).await?)
    }

    /// All topics, for select boxes
    pub async fn list_all(&self) -> Result<Vec<Topic>, TopicServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Topic>, TopicServiceError> {
        Ok(self.repo.get_by_id(id).await?)
    }

    pub async fn create(&self, input: TopicInput) -> Result<Topic, TopicServiceError> {
        if self.repo.get_by_name(&input.name).await?.is_some() {
            return Err(TopicServiceError::DuplicateName(input.name));
        }

        let topic = Topic::new(input.name);
        match self.repo.create(&topic).await {
            Ok(created) => {
                tracing::info!(topic_id = created.id, name = %created.name, "Topic created");
                Ok(created)
            }
            // Lost a race with a concurrent insert
            Err(e) if is_unique_violation(&e) => Err(TopicServiceError::DuplicateName(topic.name)),
            Err(e) => Err(e.context("Failed to create topic").into()),
        }
    }

    pub async fn update(&self, id: i64, input: TopicInput) -> Result<Topic, TopicServiceError> {
        let mut topic = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(TopicServiceError::NotFound(id))?;

        if let Some(existing) = self.repo.get_by_name(&input.name).await? {
            if existing.id != id {
                return Err(TopicServiceError::DuplicateName(input.name));
            }
        }

        topic.name = input.name;
        match self.repo.update(&topic).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => Err(TopicServiceError::DuplicateName(topic.name)),
            Err(e) => Err(e.context("Failed to update topic").into()),
        }
    }

    /// Delete a topic. Its newspapers stay, without a topic.
    pub async fn delete(&self, id: i64) -> Result<(), TopicServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete topic")? {
            return Err(TopicServiceError::NotFound(id));
        }
        tracing::info!(topic_id = id, "Topic deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, TopicServiceError> {
        Ok(self.repo.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTopicRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> TopicService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TopicService::new(SqlxTopicRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;
        let topic = service.create(TopicInput::new("Sport")).await.unwrap();
        let fetched = service.get_by_id(topic.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Sport");
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let service = setup_test_service().await;
        service.create(TopicInput::new("Sport")).await.unwrap();
        let result = service.create(TopicInput::new("Sport")).await;
        assert!(matches!(result, Err(TopicServiceError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_update_to_other_topics_name_rejected() {
        let service = setup_test_service().await;
        service.create(TopicInput::new("Sport")).await.unwrap();
        let politics = service.create(TopicInput::new("Politics")).await.unwrap();

        let result = service.update(politics.id, TopicInput::new("Sport")).await;
        assert!(matches!(result, Err(TopicServiceError::DuplicateName(_))));

        // Keeping its own name is fine
        let same = service.update(politics.id, TopicInput::new("Politics")).await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_topic() {
        let service = setup_test_service().await;
        let result = service.update(99, TopicInput::new("x")).await;
        assert!(matches!(result, Err(TopicServiceError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_test_service().await;
        let topic = service.create(TopicInput::new("Sport")).await.unwrap();
        service.delete(topic.id).await.unwrap();
        assert!(matches!(
            service.delete(topic.id).await,
            Err(TopicServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_pages_and_filters() {
        let service = setup_test_service().await;
        for name in ["Sport", "Politics", "Science", "Space"] {
            service.create(TopicInput::new(name)).await.unwrap();
        }

        let first = service.list("", PageRequest::Number(1), 3).await.unwrap();
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.total_pages(), 2);

        let last = service.list("", PageRequest::Last, 3).await.unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.items[0].name, "Sport");

        let sp = service.list("SP", PageRequest::Number(1), 3).await.unwrap();
        assert_eq!(sp.total, 2);

        let out_of_range = service.list("", PageRequest::Number(3), 3).await;
        assert!(matches!(out_of_range, Err(TopicServiceError::InvalidPage(_))));
    }

    #[tokio::test]
    async fn test_oversized_page_size_reaches_every_topic() {
        let service = setup_test_service().await;
        for i in 0..150 {
            service
                .create(TopicInput::new(format!("Topic {:03}", i)))
                .await
                .unwrap();
        }

        let first = service.list("", PageRequest::Number(1), 150).await.unwrap();
        assert_eq!(first.items.len(), 100);
        assert_eq!(first.total_pages(), 2);

        let second = service.list("", PageRequest::Number(2), 150).await.unwrap();
        assert_eq!(second.items.len(), 50);
        assert_eq!(second.items[0].name, "Topic 100");
        assert_eq!(second.items[49].name, "Topic 149");
    }

    #[tokio::test]
    async fn test_empty_list_has_first_page() {
        let service = setup_test_service().await;
        let page = service.list("", PageRequest::Number(1), 3).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 1);
    }
}
