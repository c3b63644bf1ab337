use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::errors::ResponderError;
use crate::domain::entities::Autoresponder;
use crate::domain::traits::AutoresponderStore;

/// Keyword autoresponders, grouped by guild
pub struct AutoresponderService {
    store: Arc<dyn AutoresponderStore>,
    responders: RwLock<HashMap<String, Vec<Autoresponder>>>,
}

impl AutoresponderService {
    pub fn new(store: Arc<dyn AutoresponderStore>) -> Self {
        Self {
            store,
            responders: RwLock::new(HashMap::new()),
        }
    }

    /// Load every responder from the store; failures leave the set empty
    pub async fn load(&self) -> usize {
        let rows = match self.store.load_autoresponders().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to load autoresponders: {}", e);
                Vec::new()
            }
        };

        let count = rows.len();
        let mut responders = self.responders.write().await;
        responders.clear();
        for responder in rows {
            responders
                .entry(responder.guild_id.clone())
                .or_insert_with(Vec::new)
                .push(responder);
        }

        tracing::info!("Loaded {} autoresponders", count);
        count
    }

    pub async fn add(
        &self,
        guild_id: &str,
        trigger: &str,
        response: &str,
        channel_id: Option<String>,
    ) -> Result<Autoresponder, ResponderError> {
        let responder = Autoresponder::new(guild_id, trigger.trim(), response.trim(), channel_id);
        if responder.trigger.is_empty() || responder.response.is_empty() {
            return Err(ResponderError::InvalidInput(
                "both trigger and response are required".to_string(),
            ));
        }

        let exists = self.responders.read().await.get(guild_id).map_or(false, |list| {
            list.iter()
                .any(|r| r.trigger == responder.trigger && r.channel_id == responder.channel_id)
        });
        if exists {
            return Err(ResponderError::Duplicate(responder.trigger));
        }

        self.store.save_autoresponder(&responder).await?;

        self.responders
            .write()
            .await
            .entry(guild_id.to_string())
            .or_insert_with(Vec::new)
            .push(responder.clone());

        tracing::info!("Autoresponder added in {} for \"{}\"", guild_id, responder.trigger);
        Ok(responder)
    }

    /// Delete the first responder in the guild with this trigger
    pub async fn delete(&self, guild_id: &str, trigger: &str) -> Result<Autoresponder, ResponderError> {
        let trigger = trigger.trim().to_lowercase();
        if trigger.is_empty() {
            return Err(ResponderError::InvalidInput("a trigger is required".to_string()));
        }

        let found = self
            .responders
            .read()
            .await
            .get(guild_id)
            .and_then(|list| list.iter().find(|r| r.trigger == trigger).cloned())
            .ok_or_else(|| ResponderError::NotFound(trigger.clone()))?;

        self.store
            .delete_autoresponder(guild_id, &found.trigger, found.channel_id.as_deref())
            .await?;

        if let Some(list) = self.responders.write().await.get_mut(guild_id) {
            list.retain(|r| !(r.trigger == found.trigger && r.channel_id == found.channel_id));
        }

        tracing::info!("Autoresponder deleted in {} for \"{}\"", guild_id, found.trigger);
        Ok(found)
    }

    /// Response for the first responder matching this message, if any
    pub async fn find_response(&self, guild_id: &str, channel_id: &str, content: &str) -> Option<String> {
        self.responders
            .read()
            .await
            .get(guild_id)?
            .iter()
            .find(|r| r.matches(channel_id, content))
            .map(|r| r.response.clone())
    }
}
