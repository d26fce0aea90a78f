use std::collections::HashMap;
use std::time::Duration;

use sea_orm::{sea_query::OnConflict, DatabaseConnection};
use tracing::debug;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ThreadError,
    ids::ActorId,
    thread::{
        deadline::{self, DEFAULT_DEADLINE},
        AuthorSummary, MAX_BOUND_IDS,
    },
};

/// Display summaries for `ids`. Actors that never registered are absent
/// from the map; renderers fall back to [`AuthorSummary::anonymous`].
pub(crate) async fn summaries<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = ActorId>,
) -> Result<HashMap<ActorId, AuthorSummary>, DbErr> {
    let mut ids: Vec<ActorId> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();

    let mut summaries = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BOUND_IDS) {
        let rows = ForumAuthor::find()
            .filter(ForumAuthorColumn::Id.is_in(chunk.iter().cloned()))
            .all(conn)
            .await?;

        summaries.extend(rows.into_iter().map(|row| {
            let summary = AuthorSummary {
                id: row.id.clone(),
                display_name: row.display_name,
            };
            (row.id, summary)
        }));
    }

    Ok(summaries)
}

#[derive(Clone)]
pub struct AuthorsService {
    db: DatabaseConnection,
    deadline: Duration,
}

impl AuthorsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Register an actor's display name, replacing any earlier one
    pub async fn _register_author(
        &self,
        actor: ActorId,
        display_name: String,
    ) -> Result<ForumAuthorModel, ThreadError> {
        let author = ForumAuthorActiveModel {
            id: Set(actor.clone()),
            display_name: Set(display_name),
        };

        ForumAuthor::insert(author)
            .on_conflict(
                OnConflict::column(ForumAuthorColumn::Id)
                    .update_column(ForumAuthorColumn::DisplayName)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let stored = self._get_author(actor).await?;
        debug!(actor = %stored.id, display_name = %stored.display_name, "author registered");
        Ok(stored)
    }

    /// Display summary for an actor, registered or not
    pub async fn _get_author(&self, actor: ActorId) -> Result<ForumAuthorModel, ThreadError> {
        let found = ForumAuthor::find_by_id(actor.clone()).one(&self.db).await?;

        Ok(found.unwrap_or_else(|| ForumAuthorModel {
            display_name: actor.to_string(),
            id: actor,
        }))
    }
}

#[zel_service(name = "authors")]
trait Authors {
    #[doc = "Register or rename an author"]
    #[method(name = "register_author")]
    async fn register_author(
        &self,
        actor: ActorId,
        display_name: String,
    ) -> Result<ForumAuthorModel, ResourceError>;

    #[doc = "Get an author's display summary"]
    #[method(name = "get_author")]
    async fn get_author(&self, actor: ActorId) -> Result<ForumAuthorModel, ResourceError>;
}

#[async_trait]
impl AuthorsServer for AuthorsService {
    async fn register_author(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
        display_name: String,
    ) -> Result<ForumAuthorModel, ResourceError> {
        let registered =
            deadline::within(self.deadline, self._register_author(actor, display_name)).await?;
        Ok(registered)
    }

    async fn get_author(
        &self,
        _ctx: RequestContext,
        actor: ActorId,
    ) -> Result<ForumAuthorModel, ResourceError> {
        Ok(deadline::within(self.deadline, self._get_author(actor)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::migrator::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn setup_test_service() -> AuthorsService {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        AuthorsService::new(db)
    }

    #[tokio::test]
    async fn test_register_author_upserts() {
        let service = setup_test_service().await;

        let first = service
            ._register_author("alice".into(), "Alice".to_string())
            .await
            .unwrap();
        assert_eq!(first.display_name, "Alice");

        let renamed = service
            ._register_author("alice".into(), "Alice L.".to_string())
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "Alice L.");

        let count = ForumAuthor::find().count(&service.db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unregistered_author_uses_actor_id() {
        let service = setup_test_service().await;

        let author = service._get_author("ghost".into()).await.unwrap();
        assert_eq!(author.id, ActorId::from("ghost"));
        assert_eq!(author.display_name, "ghost");
    }

    #[tokio::test]
    async fn test_summaries_skip_unknown_actors() {
        let service = setup_test_service().await;
        service
            ._register_author("alice".into(), "Alice".to_string())
            .await
            .unwrap();

        let found = summaries(
            &service.db,
            vec![ActorId::from("alice"), ActorId::from("bob"), ActorId::from("alice")],
        )
        .await
        .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[&ActorId::from("alice")].display_name, "Alice");
    }

    #[tokio::test]
    async fn test_summaries_span_many_actors() {
        let service = setup_test_service().await;
        let total = MAX_BOUND_IDS * 2 + 7;

        for i in (0..total).step_by(MAX_BOUND_IDS / 2) {
            service
                ._register_author(format!("actor-{i}").into(), format!("Actor {i}"))
                .await
                .unwrap();
        }

        let found = summaries(&service.db, (0..total).map(|i| ActorId::from(format!("actor-{i}"))))
            .await
            .unwrap();

        assert_eq!(found.len(), (0..total).step_by(MAX_BOUND_IDS / 2).count());
        let last = (0..total).step_by(MAX_BOUND_IDS / 2).last().unwrap();
        assert_eq!(
            found[&ActorId::from(format!("actor-{last}"))].display_name,
            format!("Actor {last}")
        );
    }
}
