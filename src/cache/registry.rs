//! Tag → key reverse index.
//!
//! Tracks which cached queries were stored under which tags so a tag
//! invalidation can find every affected entry. Not synchronised on its own;
//! the store keeps it behind the same lock as the entries.

use std::collections::{HashMap, HashSet};

use super::keys::{CacheTag, QueryKey};

#[derive(Debug, Default)]
pub struct TagIndex {
    keys_by_tag: HashMap<CacheTag, HashSet<QueryKey>>,
    tags_by_key: HashMap<QueryKey, Vec<CacheTag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` under `tags`, replacing any earlier registration.
    pub fn register(&mut self, key: QueryKey, tags: &[CacheTag]) {
        self.unregister(&key);
        for tag in tags {
            self.keys_by_tag.entry(*tag).or_default().insert(key.clone());
        }
        self.tags_by_key.insert(key, tags.to_vec());
    }

    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<QueryKey> {
        self.keys_by_tag.get(tag).cloned().unwrap_or_default()
    }

    pub fn unregister(&mut self, key: &QueryKey) {
        let Some(tags) = self.tags_by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.keys_by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys_by_tag.remove(&tag);
                }
            }
        }
    }

    /// Removes every key registered under `tag`, including its links to other
    /// tags, and returns the removed keys.
    pub fn take_tag(&mut self, tag: &CacheTag) -> HashSet<QueryKey> {
        let keys = self.keys_by_tag.remove(tag).unwrap_or_default();
        for key in &keys {
            self.unregister(key);
        }
        keys
    }

    pub fn clear(&mut self) {
        self.keys_by_tag.clear();
        self.tags_by_key.clear();
    }

    pub fn tag_count(&self) -> usize {
        self.keys_by_tag.len()
    }

    pub fn key_count(&self) -> usize {
        self.tags_by_key.len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn taking_a_tag_unlinks_keys_from_their_other_tags() {
        let mut index = TagIndex::new();
        let active = QueryKey::SurveysByActive(true);
        let all = QueryKey::AllSurveys;

        index.register(active.clone(), &active.tags());
        index.register(all.clone(), &all.tags());
        assert_eq!(index.keys_for_tag(&CacheTag::Surveys).len(), 2);

        let removed = index.take_tag(&CacheTag::ActiveSurveys);

        assert_eq!(removed, HashSet::from([active]));
        assert_eq!(index.keys_for_tag(&CacheTag::Surveys), HashSet::from([all]));
        assert_eq!(index.key_count(), 1);
        assert_eq!(index.tag_count(), 1);
    }

    #[test]
    fn re_registering_replaces_old_tags() {
        let mut index = TagIndex::new();
        let key = QueryKey::QuestionsBySurvey(Uuid::new_v4());
        index.register(key.clone(), &[CacheTag::Surveys]);
        index.register(key.clone(), &key.tags());

        assert!(index.keys_for_tag(&CacheTag::Surveys).is_empty());
        assert_eq!(index.key_count(), 1);
    }

    #[test]
    fn unknown_tag_takes_nothing() {
        let mut index = TagIndex::new();
        assert!(index.take_tag(&CacheTag::CompletedResponses).is_empty());
    }
}
