//! Mocks of identity, access revocation and notification delivery.

use async_trait::async_trait;
use funeral_hub_core::{
    AccessRevoker, Actor, CoreError, IdentityProvider, Notification, NotificationDispatcher,
    UserId,
};
use mockall::mock;

mock! {
    pub IdentityProvider {}

    #[async_trait]
    impl IdentityProvider for IdentityProvider {
        async fn resolve(&self, token: &str) -> Result<Actor, CoreError>;
    }
}

mock! {
    pub AccessRevoker {}

    #[async_trait]
    impl AccessRevoker for AccessRevoker {
        async fn revoke_access(&self, user_id: UserId) -> Result<bool, CoreError>;
    }
}

mock! {
    pub NotificationDispatcher {}

    impl NotificationDispatcher for NotificationDispatcher {
        fn notify(&self, notification: Notification) -> Result<(), CoreError>;
    }
}

/// Identity provider that resolves every token to `actor`
pub fn create_fixed_identity(actor: Actor) -> MockIdentityProvider {
    let mut identity = MockIdentityProvider::new();
    identity.expect_resolve().returning(move |_| Ok(actor));
    identity
}

/// Dispatcher that rejects every notification
pub fn create_failing_dispatcher() -> MockNotificationDispatcher {
    let mut dispatcher = MockNotificationDispatcher::new();
    dispatcher
        .expect_notify()
        .returning(|_| Err(CoreError::Internal("transport down".to_string())));
    dispatcher
}
