use tracing::debug;

use crate::error::{DocumentError, DocumentResult};
use crate::models::{CorefCluster, Document, MentionId};

/// One singleton cluster per predicted mention, keyed by the mention id
pub fn initialize_clusters(doc: &mut Document) {
    doc.coref_clusters.clear();
    let ids: Vec<MentionId> = doc.predicted_mentions.iter().flatten().copied().collect();
    for id in ids {
        doc.coref_clusters.insert(id, CorefCluster::singleton(id));
        if let Some(mention) = doc.mention_mut(id) {
            mention.coref_cluster_id = Some(id);
        }
    }
    debug!("Initialized {} clusters", doc.coref_clusters.len());
}

/// Group gold mentions by gold cluster id
pub fn extract_gold_clusters(doc: &mut Document) -> DocumentResult<()> {
    doc.gold_clusters.clear();
    let Some(gold) = &doc.gold_mentions else {
        return Ok(());
    };
    for &id in gold.iter().flatten() {
        let cluster = doc
            .gold_mentions_by_id
            .get(&id)
            .and_then(|m| m.gold_cluster_id)
            .ok_or(DocumentError::MissingGoldCluster { id })?;
        doc.gold_clusters
            .entry(cluster)
            .or_insert_with(|| CorefCluster::new(cluster))
            .members
            .insert(id);
    }
    Ok(())
}

/// Final document-wide order of the surviving predicted mentions
pub fn assign_mention_numbers(doc: &mut Document) {
    let mut ids: Vec<MentionId> = doc.predicted_mentions_by_id.keys().copied().collect();
    let by_id = &doc.predicted_mentions_by_id;
    ids.sort_by(|a, b| by_id[a].document_order(&by_id[b]));
    for (num, id) in ids.into_iter().enumerate() {
        if let Some(mention) = doc.mention_mut(id) {
            mention.mention_num = Some(num);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mention;

    fn doc_with_mentions(spans: &[(usize, usize, usize, MentionId)]) -> Document {
        let mut doc = Document::new("c", Vec::new());
        for &(sent, start, end, id) in spans {
            let mut m = Mention::new(sent, start, end, end - 1);
            m.mention_id = id;
            doc.insert_predicted_mention(m);
        }
        doc
    }

    #[test]
    fn test_singleton_clusters_partition_mentions() {
        let mut doc = doc_with_mentions(&[(0, 0, 1, 4), (0, 2, 3, 7), (1, 0, 2, 9)]);
        initialize_clusters(&mut doc);

        assert_eq!(doc.coref_clusters.len(), 3);
        assert_eq!(doc.cluster_of(7), Some(7));
        assert!(doc.clusters_partition_mentions());

        doc.merge_clusters(4, 7);
        assert!(doc.clusters_partition_mentions());
        assert_eq!(doc.cluster_of(7), Some(4));
        assert!(doc.coref_clusters[&7].is_retired());
    }

    #[test]
    fn test_gold_clusters_grouped_by_id() {
        let mut doc = Document::new("g", Vec::new());
        for (id, cluster) in [(0, Some(3)), (1, Some(5)), (2, Some(3))] {
            let mut m = Mention::new(0, id, id + 1, id);
            m.mention_id = id;
            m.gold_cluster_id = cluster;
            doc.gold_mentions_by_id.insert(id, m);
        }
        doc.gold_mentions = Some(vec![vec![0, 1, 2]]);
        extract_gold_clusters(&mut doc).unwrap();

        assert_eq!(doc.gold_clusters.len(), 2);
        assert_eq!(doc.gold_clusters[&3].members.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(doc.is_coref(0, 2));
        assert!(!doc.is_coref(0, 1));
    }

    #[test]
    fn test_gold_mention_without_cluster_is_fatal() {
        let mut doc = Document::new("g", Vec::new());
        let mut m = Mention::new(0, 0, 1, 0);
        m.mention_id = 0;
        doc.gold_mentions_by_id.insert(0, m);
        doc.gold_mentions = Some(vec![vec![0]]);
        assert_eq!(
            extract_gold_clusters(&mut doc),
            Err(DocumentError::MissingGoldCluster { id: 0 })
        );
    }

    #[test]
    fn test_mention_numbers_follow_document_order() {
        let mut doc = doc_with_mentions(&[(1, 0, 1, 0), (0, 3, 4, 1), (0, 0, 4, 2)]);
        assign_mention_numbers(&mut doc);
        assert_eq!(doc.mention(2).and_then(|m| m.mention_num), Some(0));
        assert_eq!(doc.mention(1).and_then(|m| m.mention_num), Some(1));
        assert_eq!(doc.mention(0).and_then(|m| m.mention_num), Some(2));
    }
}
