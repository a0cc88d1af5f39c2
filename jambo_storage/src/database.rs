use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use jambo_core::{
    Conversation, ConversationContext, ConversationPatch, ConversationStatus, ConversationStore,
    Language, Message, NewMessage, Sender,
};
use jambo_entities::{conversations, messages};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

fn is_table_already_exists_error(err: &DbErr) -> bool {
    err.to_string().contains("table") && err.to_string().contains("already exists")
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

/// Conversation store backed by any database sea-orm can reach.
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to conversation database");
        let db = Database::connect(database_url).await?;
        let store = Self { db };
        store.create_tables().await?;
        info!("Conversation database ready");
        Ok(store)
    }

    async fn create_tables(&self) -> anyhow::Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let statements = [
            schema.create_table_from_entity(conversations::Entity),
            schema.create_table_from_entity(messages::Entity),
        ];
        for stmt in statements {
            match self
                .db
                .execute_unprepared(&backend.build(&stmt).to_string())
                .await
            {
                Ok(_) => {}
                Err(e) if is_table_already_exists_error(&e) => {
                    debug!("Table already exists, skipping creation");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn to_conversation(model: conversations::Model) -> Conversation {
        let context: ConversationContext = serde_json::from_str(&model.context)
            .unwrap_or_else(|e| {
                warn!(
                    "Conversation {} has an unreadable context ({e}); starting fresh",
                    model.id
                );
                ConversationContext::default()
            });
        Conversation {
            id: model.id,
            contact_address: model.contact_address,
            customer_name: model.customer_name,
            status: ConversationStatus::parse(&model.status),
            language: Language::from_code(&model.language),
            context,
            last_message_at: utc(model.last_message_at),
            created_at: utc(model.created_at),
        }
    }

    fn to_message(model: messages::Model) -> Message {
        Message {
            id: model.id,
            conversation_id: model.conversation_id,
            content: model.content,
            sender: Sender::parse(&model.sender),
            intent: model.intent,
            entities: serde_json::from_str(&model.entities).unwrap_or_default(),
            timestamp: utc(model.timestamp),
        }
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn find_conversation_by_contact(
        &self,
        contact_address: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        let model = conversations::Entity::find()
            .filter(conversations::Column::ContactAddress.eq(contact_address))
            .one(&self.db)
            .await?;
        Ok(model.map(Self::to_conversation))
    }

    async fn find_conversation(&self, id: &Uuid) -> anyhow::Result<Option<Conversation>> {
        let model = conversations::Entity::find_by_id(*id).one(&self.db).await?;
        Ok(model.map(Self::to_conversation))
    }

    async fn create_conversation(
        &self,
        contact_address: &str,
        initial_context: &ConversationContext,
    ) -> anyhow::Result<Conversation> {
        if let Some(existing) = self.find_conversation_by_contact(contact_address).await? {
            return Ok(existing);
        }

        let now = Utc::now().naive_utc();
        let model = conversations::ActiveModel {
            id: Set(Uuid::now_v7()),
            contact_address: Set(contact_address.to_string()),
            customer_name: Set(None),
            status: Set(ConversationStatus::Active.as_str().to_string()),
            language: Set(initial_context.preferences.language.code().to_string()),
            context: Set(serde_json::to_string(initial_context)?),
            last_message_at: Set(now),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!("Created conversation {} for {contact_address}", model.id);
        Ok(Self::to_conversation(model))
    }

    async fn update_conversation_context(
        &self,
        id: &Uuid,
        patch: &ConversationPatch,
    ) -> anyhow::Result<()> {
        conversations::Entity::update(conversations::ActiveModel {
            id: Set(*id),
            customer_name: Set(patch.customer_name.clone()),
            language: Set(patch.language.code().to_string()),
            context: Set(serde_json::to_string(&patch.context)?),
            last_message_at: Set(patch.last_message_at.naive_utc()),
            ..Default::default()
        })
        .exec(&self.db)
        .await?;
        debug!("Updated context for conversation {id}");
        Ok(())
    }

    async fn append_message(&self, message: &NewMessage) -> anyhow::Result<Message> {
        let model = messages::ActiveModel {
            id: Set(Uuid::now_v7()),
            conversation_id: Set(message.conversation_id),
            content: Set(message.content.clone()),
            sender: Set(message.sender.as_str().to_string()),
            intent: Set(message.intent.clone()),
            entities: Set(serde_json::to_string(&message.entities)?),
            timestamp: Set(message.timestamp.naive_utc()),
        }
        .insert(&self.db)
        .await?;
        Ok(Self::to_message(model))
    }

    async fn list_recent_messages(
        &self,
        id: &Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<Message>> {
        let mut models = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(*id))
            .order_by_desc(messages::Column::Timestamp)
            .limit(u64::try_from(limit).unwrap_or(u64::MAX))
            .all(&self.db)
            .await?;
        models.reverse();
        Ok(models.into_iter().map(Self::to_message).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn sqlite_round_trip() {
        let store = DatabaseStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should open");

        let mut context = ConversationContext::default();
        context.client_details = "destination:Dubai".to_string();
        let created = store
            .create_conversation("254700000001", &context)
            .await
            .expect("create should succeed");
        let again = store
            .create_conversation("254700000001", &ConversationContext::default())
            .await
            .expect("second create should return the existing row");
        assert_eq!(created.id, again.id);
        assert_eq!(again.context.client_details, "destination:Dubai");

        for n in 0..3 {
            store
                .append_message(&NewMessage {
                    conversation_id: created.id,
                    content: format!("m{n}"),
                    sender: Sender::User,
                    intent: Some("general".to_string()),
                    entities: vec!["date:kesho".to_string()],
                    timestamp: Utc::now() + chrono::Duration::seconds(n),
                })
                .await
                .expect("append should succeed");
        }
        let recent = store
            .list_recent_messages(&created.id, 2)
            .await
            .expect("list should succeed");
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
        assert_eq!(recent[0].entities, vec!["date:kesho".to_string()]);

        let mut patched = created.context.clone();
        patched.is_human_takeover = true;
        store
            .update_conversation_context(
                &created.id,
                &ConversationPatch {
                    context: patched,
                    customer_name: Some("Amina".to_string()),
                    language: Language::Swahili,
                    last_message_at: Utc::now(),
                },
            )
            .await
            .expect("update should succeed");
        let found = store
            .find_conversation(&created.id)
            .await
            .expect("find should succeed")
            .expect("conversation should exist");
        assert!(found.context.is_human_takeover);
        assert_eq!(found.customer_name.as_deref(), Some("Amina"));
        assert_eq!(found.language, Language::Swahili);
    }
}
