use std::collections::BTreeSet;

use super::mention::MentionId;

pub type ClusterId = usize;

/// A set of mentions believed to denote one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorefCluster {
    pub cluster_id: ClusterId,
    pub members: BTreeSet<MentionId>,
}

impl CorefCluster {
    pub fn new(cluster_id: ClusterId) -> Self {
        Self {
            cluster_id,
            members: BTreeSet::new(),
        }
    }

    pub fn singleton(mention: MentionId) -> Self {
        Self {
            cluster_id: mention,
            members: BTreeSet::from([mention]),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Retired clusters have had all their members moved into a winner
    pub fn is_retired(&self) -> bool {
        self.members.is_empty()
    }

    /// Earliest mention id; ids follow document order
    pub fn first_mention(&self) -> Option<MentionId> {
        self.members.first().copied()
    }
}
