use crate::instagram::UserShort;
use anyhow::Result;
use async_trait::async_trait;

/// Which side of the follow graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Followers,
    Following,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Followers => "followers",
            Relationship::Following => "following",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of an account's follow graph.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Resolve the numeric account id behind a username.
    async fn user_id_from_username(&self, username: &str) -> Result<String>;

    /// Every account on one side of the relationship, across all pages.
    async fn relationship(&self, user_id: &str, kind: Relationship) -> Result<Vec<UserShort>>;

    async fn followers(&self, user_id: &str) -> Result<Vec<UserShort>> {
        self.relationship(user_id, Relationship::Followers).await
    }

    async fn following(&self, user_id: &str) -> Result<Vec<UserShort>> {
        self.relationship(user_id, Relationship::Following).await
    }
}
