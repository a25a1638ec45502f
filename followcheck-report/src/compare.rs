use std::collections::BTreeSet;

/// Both sides of an account's follow graph, as sets of usernames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub followers: BTreeSet<String>,
    pub following: BTreeSet<String>,
}

impl Relationships {
    /// Duplicates collapse; names are trimmed and blank ones dropped.
    pub fn new<F, G, S, T>(followers: F, following: G) -> Self
    where
        F: IntoIterator<Item = S>,
        G: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            followers: normalize(followers),
            following: normalize(following),
        }
    }
}

fn normalize<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|n| {
            let n = n.as_ref().trim();
            (!n.is_empty()).then(|| n.to_string())
        })
        .collect()
}

/// The two set differences, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// followers − following: they follow you, you don't follow them.
    pub fans: Vec<String>,
    /// following − followers: you follow them, they don't follow you.
    pub not_following_back: Vec<String>,
    /// |followers ∩ following|
    pub mutual_count: usize,
}

impl Comparison {
    pub fn between(rel: &Relationships) -> Self {
        let fans: Vec<String> = rel.followers.difference(&rel.following).cloned().collect();
        let not_following_back: Vec<String> =
            rel.following.difference(&rel.followers).cloned().collect();
        let mutual_count = rel.followers.intersection(&rel.following).count();

        tracing::debug!(
            followers = rel.followers.len(),
            following = rel.following.len(),
            fans = fans.len(),
            not_following_back = not_following_back.len(),
            mutual_count,
            "report.compare"
        );

        Self {
            fans,
            not_following_back,
            mutual_count,
        }
    }
}
