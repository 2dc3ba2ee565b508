//! Client credential registry
//!
//! Maps OAuth client ids to their secrets. Populated once from the
//! environment at startup and shared read-only across requests — no interior
//! mutability, no locking. Insertion order is preserved because the first
//! configured client doubles as the default when a request names none.

use common::Secret;

/// Immutable client-id → secret mapping.
///
/// Secrets are wrapped in [`Secret`] so the registry can be logged or
/// debug-printed without leaking credential material.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<(String, Secret<String>)>,
}

/// A resolved credential pair, borrowed from the registry.
pub struct ResolvedClient<'a> {
    pub id: &'a str,
    pub secret: &'a Secret<String>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. A repeated id replaces the earlier secret without
    /// changing its position in the default ordering.
    pub fn insert(&mut self, id: String, secret: Secret<String>) {
        if let Some(entry) = self.clients.iter_mut().find(|(existing, _)| *existing == id) {
            entry.1 = secret;
        } else {
            self.clients.push((id, secret));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Client ids in registration order (safe to expose publicly).
    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.iter().map(|(id, _)| id.as_str())
    }

    /// Secret for an exact client id.
    pub fn secret(&self, id: &str) -> Option<&Secret<String>> {
        self.clients
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, secret)| secret)
    }

    /// The first-registered client, used when a request names none.
    pub fn default_client_id(&self) -> Option<&str> {
        self.clients.first().map(|(id, _)| id.as_str())
    }

    /// Resolve a credential pair for a request.
    ///
    /// An explicitly requested id must match exactly — an unknown id does NOT
    /// fall back to the default, since exchanging a code against the wrong
    /// OAuth app would fail confusingly downstream. Only an absent id selects
    /// the default client.
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> Option<ResolvedClient<'a>> {
        match requested {
            Some(id) => self
                .secret(id)
                .map(|secret| ResolvedClient { id, secret }),
            None => self.clients.first().map(|(id, secret)| ResolvedClient {
                id: id.as_str(),
                secret,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(pairs: &[(&str, &str)]) -> ClientRegistry {
        let mut reg = ClientRegistry::new();
        for (id, secret) in pairs {
            reg.insert(id.to_string(), Secret::new(secret.to_string()));
        }
        reg
    }

    #[test]
    fn resolves_explicit_id() {
        let reg = registry(&[("app-one", "s1"), ("app-two", "s2")]);
        let resolved = reg.resolve(Some("app-two")).unwrap();
        assert_eq!(resolved.id, "app-two");
        assert_eq!(resolved.secret.expose(), "s2");
    }

    #[test]
    fn unknown_explicit_id_does_not_fall_back() {
        let reg = registry(&[("app-one", "s1")]);
        assert!(reg.resolve(Some("app-unknown")).is_none());
    }

    #[test]
    fn absent_id_resolves_first_registered() {
        let reg = registry(&[("app-one", "s1"), ("app-two", "s2")]);
        let resolved = reg.resolve(None).unwrap();
        assert_eq!(resolved.id, "app-one");
        assert_eq!(resolved.secret.expose(), "s1");
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let reg = ClientRegistry::new();
        assert!(reg.resolve(None).is_none());
        assert!(reg.resolve(Some("any")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn repeated_insert_replaces_secret_keeps_order() {
        let mut reg = registry(&[("app-one", "old"), ("app-two", "s2")]);
        reg.insert("app-one".into(), Secret::new("new".into()));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.default_client_id(), Some("app-one"));
        assert_eq!(reg.secret("app-one").unwrap().expose(), "new");
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let reg = registry(&[("app-one", "super-secret-value")]);
        let debug = format!("{reg:?}");
        assert!(debug.contains("app-one"));
        assert!(!debug.contains("super-secret-value"));
    }
}
