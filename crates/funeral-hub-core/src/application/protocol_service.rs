use crate::{
    application::workflow_engine::WorkflowEngine,
    domain::action::{Action, NewProtocol},
    domain::actor::Actor,
    domain::burial::BurialProgress,
    domain::document::Document,
    domain::identity::IdentityProvider,
    domain::protocol::{Protocol, ProtocolId},
    domain::repository::ProtocolQuery,
    CoreError,
};
use std::sync::Arc;
use tracing::debug;

/// Token-facing entry point: resolves callers, then delegates to the engine
pub struct ProtocolService {
    identity: Arc<dyn IdentityProvider>,
    engine: Arc<WorkflowEngine>,
}

impl ProtocolService {
    pub fn new(identity: Arc<dyn IdentityProvider>, engine: Arc<WorkflowEngine>) -> Self {
        Self { identity, engine }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    async fn actor(&self, token: &str) -> Result<Actor, CoreError> {
        let actor = self.identity.resolve(token).await?;
        debug!(actor = %actor, "Actor resolved");
        Ok(actor)
    }

    pub async fn create(&self, token: &str, request: NewProtocol) -> Result<Protocol, CoreError> {
        let actor = self.actor(token).await?;
        self.engine.create_protocol(&actor, request).await
    }

    /// Run an action, retrying automatically on lock contention
    pub async fn transition(
        &self,
        token: &str,
        id: &ProtocolId,
        action: Action,
    ) -> Result<Protocol, CoreError> {
        let actor = self.actor(token).await?;
        self.engine.transition_with_retry(id, action, &actor).await
    }

    pub async fn get(&self, token: &str, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.actor(token).await?;
        self.engine.store().read_protocol(id).await
    }

    pub async fn documents(&self, token: &str, id: &ProtocolId) -> Result<Vec<Document>, CoreError> {
        self.actor(token).await?;
        let store = self.engine.store();
        // Distinguish an unknown protocol from one without documents
        store.read_protocol(id).await?;
        store.list_documents(id).await
    }

    pub async fn burial_progress(
        &self,
        token: &str,
        id: &ProtocolId,
    ) -> Result<Option<BurialProgress>, CoreError> {
        self.actor(token).await?;
        let store = self.engine.store();
        store.read_protocol(id).await?;
        store.read_burial_progress(id).await
    }

    pub async fn list(&self, token: &str, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError> {
        self.actor(token).await?;
        self.engine.store().list_protocols(query).await
    }
}
