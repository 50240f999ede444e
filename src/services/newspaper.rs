//! Newspaper service
//!
//! Newspapers reference an optional topic and any number of publishing
//! redactors. Both references are checked before anything is written.

use crate::db::repositories::{NewspaperRepository, RedactorRepository, TopicRepository};
use crate::models::{
    InvalidPage, Newspaper, NewspaperDetail, NewspaperInput, NewspaperWithTopic, PageRequest,
    PagedResult,
};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NewspaperServiceError {
    #[error("Newspaper not found: {0}")]
    NotFound(i64),

    #[error("Topic not found: {0}")]
    TopicNotFound(i64),

    #[error("Publisher not found: {0}")]
    PublisherNotFound(i64),

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NewspaperService {
    repo: Arc<dyn NewspaperRepository>,
    topic_repo: Arc<dyn TopicRepository>,
    redactor_repo: Arc<dyn RedactorRepository>,
}

impl NewspaperService {
    pub fn new(
        repo: Arc<dyn NewspaperRepository>,
        topic_repo: Arc<dyn TopicRepository>,
        redactor_repo: Arc<dyn RedactorRepository>,
    ) -> Self {
        Self {
            repo,
            topic_repo,
            redactor_repo,
        }
    }

    /// One page of newspapers whose topic name contains `needle`.
    pub async fn list(
        &self,
        needle: &str,
        page: PageRequest,
        per_page: u32,
    ) -> Result<PagedResult<NewspaperWithTopic>, NewspaperServiceError> {
        let total = self
            .repo
            .count_matching(needle)
            .await
            .context("Failed to count newspapers")?;
        let params = page.resolve(total, per_page)?;
        let items = self
            .repo
            .find_page(needle, &params)
            .await
            .context("Failed to list newspapers")?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn filter_by_topic_name(
        &self,
        needle: &str,
    ) -> Result<Vec<NewspaperWithTopic>, NewspaperServiceError> {
        Ok(self.repo.filter_by_topic_name(needle).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Newspaper>, NewspaperServiceError> {
        Ok(self.repo.get_by_id(id).await?)
    }

    /// Newspaper with its topic and publishers
    pub async fn get_detail(
        &self,
        id: i64,
    ) -> Result<Option<NewspaperDetail>, NewspaperServiceError> {
        let Some(newspaper) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        let topic = match newspaper.topic_id {
            Some(topic_id) => self.topic_repo.get_by_id(topic_id).await?,
            None => None,
        };
        let publishers = self
            .repo
            .publishers_of(id)
            .await
            .context("Failed to load publishers")?;

        Ok(Some(NewspaperDetail {
            newspaper,
            topic,
            publishers,
        }))
    }

    pub async fn create(&self, input: NewspaperInput) -> Result<Newspaper, NewspaperServiceError> {
        self.check_references(&input).await?;
        let created = self
            .repo
            .create(&input)
            .await
            .context("Failed to create newspaper")?;
        tracing::info!(newspaper_id = created.id, title = %created.title, "Newspaper created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        input: NewspaperInput,
    ) -> Result<Newspaper, NewspaperServiceError> {
        if self.repo.get_by_id(id).await?.is_none() {
            return Err(NewspaperServiceError::NotFound(id));
        }
        self.check_references(&input).await?;
        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update newspaper")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), NewspaperServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete newspaper")? {
            return Err(NewspaperServiceError::NotFound(id));
        }
        tracing::info!(newspaper_id = id, "Newspaper deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, NewspaperServiceError> {
        Ok(self.repo.count().await?)
    }

    /// Admin listing: title search and topic filter, oldest first
    pub async fn list_for_admin(
        &self,
        search: &str,
        topic_id: Option<i64>,
    ) -> Result<Vec<NewspaperWithTopic>, NewspaperServiceError> {
        Ok(self.repo.list_for_admin(search.trim(), topic_id).await?)
    }

    async fn check_references(&self, input: &NewspaperInput) -> Result<(), NewspaperServiceError> {
        if let Some(topic_id) = input.topic_id {
            if self.topic_repo.get_by_id(topic_id).await?.is_none() {
                return Err(NewspaperServiceError::TopicNotFound(topic_id));
            }
        }

        let found: HashSet<i64> = self
            .redactor_repo
            .get_many(&input.publisher_ids)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if let Some(missing) = input.publisher_ids.iter().find(|id| !found.contains(id)) {
            return Err(NewspaperServiceError::PublisherNotFound(*missing));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxNewspaperRepository, SqlxRedactorRepository, SqlxTopicRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Redactor, Topic};
    use chrono::NaiveDate;

    struct Fixture {
        service: NewspaperService,
        topics: Arc<dyn TopicRepository>,
        redactors: Arc<dyn RedactorRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let topics = SqlxTopicRepository::boxed(pool.clone());
        let redactors = SqlxRedactorRepository::boxed(pool.clone());
        let service = NewspaperService::new(
            SqlxNewspaperRepository::boxed(pool),
            topics.clone(),
            redactors.clone(),
        );
        Fixture {
            service,
            topics,
            redactors,
        }
    }

    fn input(title: &str, topic_id: Option<i64>, publisher_ids: Vec<i64>) -> NewspaperInput {
        NewspaperInput {
            title: title.to_string(),
            content: "content".to_string(),
            published_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            topic_id,
            publisher_ids,
        }
    }

    #[tokio::test]
    async fn test_create_with_references_and_detail() {
        let fx = setup().await;
        let topic = fx.topics.create(&Topic::new("Sport")).await.unwrap();
        let ann = fx.redactors.create(&Redactor::new("ann", "h")).await.unwrap();

        let paper = fx
            .service
            .create(input("Daily", Some(topic.id), vec![ann.id]))
            .await
            .unwrap();

        let detail = fx.service.get_detail(paper.id).await.unwrap().unwrap();
        assert_eq!(detail.topic.unwrap().name, "Sport");
        assert_eq!(detail.publishers.len(), 1);
        assert_eq!(detail.publishers[0].username, "ann");
    }

    #[tokio::test]
    async fn test_unknown_topic_rejected() {
        let fx = setup().await;
        let result = fx.service.create(input("Daily", Some(42), vec![])).await;
        assert!(matches!(result, Err(NewspaperServiceError::TopicNotFound(42))));
        assert_eq!(fx.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_publisher_rejected() {
        let fx = setup().await;
        let ann = fx.redactors.create(&Redactor::new("ann", "h")).await.unwrap();
        let result = fx.service.create(input("Daily", None, vec![ann.id, 77])).await;
        assert!(matches!(
            result,
            Err(NewspaperServiceError::PublisherNotFound(77))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_publishers() {
        let fx = setup().await;
        let ann = fx.redactors.create(&Redactor::new("ann", "h")).await.unwrap();
        let bob = fx.redactors.create(&Redactor::new("bob", "h")).await.unwrap();
        let paper = fx
            .service
            .create(input("Daily", None, vec![ann.id]))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(paper.id, input("Weekly", None, vec![bob.id]))
            .await
            .unwrap();
        assert_eq!(updated.title, "Weekly");

        let detail = fx.service.get_detail(paper.id).await.unwrap().unwrap();
        let names: Vec<&str> = detail.publishers.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let fx = setup().await;
        assert!(matches!(
            fx.service.update(5, input("x", None, vec![])).await,
            Err(NewspaperServiceError::NotFound(5))
        ));
        assert!(matches!(
            fx.service.delete(5).await,
            Err(NewspaperServiceError::NotFound(5))
        ));
        assert!(fx.service.get_detail(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_topic_name() {
        let fx = setup().await;
        let sport = fx.topics.create(&Topic::new("Sport")).await.unwrap();
        let tech = fx.topics.create(&Topic::new("Tech")).await.unwrap();
        fx.service.create(input("A", Some(sport.id), vec![])).await.unwrap();
        fx.service.create(input("B", Some(tech.id), vec![])).await.unwrap();
        fx.service.create(input("C", None, vec![])).await.unwrap();

        let all = fx.service.list("", PageRequest::Number(1), 3).await.unwrap();
        assert_eq!(all.total, 3);

        let sport_only = fx.service.list("spo", PageRequest::Number(1), 3).await.unwrap();
        assert_eq!(sport_only.total, 1);
        assert_eq!(sport_only.items[0].newspaper.title, "A");
    }
}
