//! Client identity
//!
//! Every request a client sends is tagged with an identity. A seed makes the
//! identity reproducible across runs; without one a random seed is generated.

use uuid::Uuid;

/// Identity presented to nodes in the `x-ferry-client` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    seed: String,
    id: Uuid,
}

impl ClientIdentity {
    /// Derives the identity deterministically from a seed
    pub fn from_seed(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self { seed, id }
    }

    /// Creates an identity from a freshly generated seed
    pub fn generate() -> Self {
        Self::from_seed(Uuid::new_v4().simple().to_string())
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_deterministic() {
        let a = ClientIdentity::from_seed("deploy-bot");
        let b = ClientIdentity::from_seed("deploy-bot");
        assert_eq!(a, b);
        assert_ne!(a.id(), ClientIdentity::from_seed("other").id());
    }

    #[test]
    fn test_generated_identities_differ() {
        let a = ClientIdentity::generate();
        let b = ClientIdentity::generate();
        assert_ne!(a.seed(), b.seed());
        assert_eq!(a.to_string(), a.id().to_string());
    }
}
