//! Microphone permission and signed-in identity
//!
//! Both are owned by the host platform; the session manager only asks.

/// Asynchronous microphone capability check, consulted before every session
#[async_trait::async_trait]
pub trait PermissionCheck: Send + Sync {
    async fn microphone_access(&self) -> bool;
}

/// Fixed answer, taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub bool);

#[async_trait::async_trait]
impl PermissionCheck for StaticPermission {
    async fn microphone_access(&self) -> bool {
        self.0
    }
}

/// Who is signed in, if anyone
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<String>);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        self.0.clone().filter(|user| !user.trim().is_empty())
    }
}
