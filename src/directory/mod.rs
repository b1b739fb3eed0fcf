use dashmap::DashMap;
use tracing::info;

/// Resolves a customer id to the device registration token that addresses
/// the customer's handset on the push backend.
///
/// A missing token is a normal outcome — the customer simply has no
/// registered device — and is surfaced by the dispatcher as an unresolved
/// recipient, not by this trait.
pub trait TokenDirectory: Send + Sync {
    fn device_token(&self, customer_id: &str) -> Option<String>;
}

/// In-memory token directory populated by provisioning.
pub struct InMemoryTokenDirectory {
    tokens: DashMap<String, String>,
}

impl InMemoryTokenDirectory {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Register (or replace) the device token for a customer.
    pub fn register(&self, customer_id: &str, device_token: &str) {
        info!(customer_id = %customer_id, "Device token registered");
        self.tokens
            .insert(customer_id.to_string(), device_token.to_string());
    }

    /// Remove a customer's device token. Returns true if one existed.
    pub fn remove(&self, customer_id: &str) -> bool {
        self.tokens.remove(customer_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for InMemoryTokenDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDirectory for InMemoryTokenDirectory {
    fn device_token(&self, customer_id: &str) -> Option<String> {
        self.tokens.get(customer_id).map(|t| t.value().clone())
    }
}
