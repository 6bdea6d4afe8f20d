//! Mock implementation of the ProtocolStore trait.

use async_trait::async_trait;
use funeral_hub_core::{
    BurialProgress, CoreError, Document, Protocol, ProtocolId, ProtocolQuery, ProtocolStore,
    ProtocolTransaction,
};
use mockall::mock;

mock! {
    pub ProtocolStore {}

    #[async_trait]
    impl ProtocolStore for ProtocolStore {
        async fn begin(&self) -> Result<Box<dyn ProtocolTransaction>, CoreError>;
        async fn read_protocol(&self, id: &ProtocolId) -> Result<Protocol, CoreError>;
        async fn list_documents(&self, id: &ProtocolId) -> Result<Vec<Document>, CoreError>;
        async fn read_burial_progress(&self, id: &ProtocolId) -> Result<Option<BurialProgress>, CoreError>;
        async fn list_protocols(&self, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError>;
    }
}

/// Store whose every call fails as if the database were unreachable
pub fn create_unavailable_store() -> MockProtocolStore {
    let unavailable = || CoreError::Internal("database unavailable".to_string());
    let mut store = MockProtocolStore::new();
    store.expect_begin().returning(move || Err(unavailable()));
    store.expect_read_protocol().returning(move |_| Err(unavailable()));
    store.expect_list_documents().returning(move |_| Err(unavailable()));
    store
        .expect_read_burial_progress()
        .returning(move |_| Err(unavailable()));
    store.expect_list_protocols().returning(move |_| Err(unavailable()));
    store
}
