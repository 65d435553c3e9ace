use super::{QnaStore, StorageError};
use crate::models::{NewQnaEntry, QnaEntry, ScoredEntry};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Process-local store for tests and database-less runs.
///
/// Scores questions with the same trigram-set overlap `pg_trgm` uses, so the
/// chat thresholds behave comparably.
#[derive(Clone, Default)]
pub struct InMemoryQnaStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    entries: Vec<QnaEntry>,
}

impl InMemoryQnaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))
    }
}

#[async_trait::async_trait]
impl QnaStore for InMemoryQnaStore {
    async fn list(&self) -> Result<Vec<QnaEntry>, StorageError> {
        Ok(self.lock()?.entries.clone())
    }

    async fn insert(&self, entry: NewQnaEntry) -> Result<QnaEntry, StorageError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let created = QnaEntry {
            id: inner.next_id,
            question: entry.question,
            answer: entry.answer,
            category: entry.category,
            subcategory: entry.subcategory,
        };
        inner.entries.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let mut inner = self.lock()?;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        Ok(inner.entries.len() != before)
    }

    async fn find_similar(
        &self,
        question: &str,
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StorageError> {
        let query = trigrams(question);
        let inner = self.lock()?;

        let mut scored: Vec<ScoredEntry> = inner
            .entries
            .iter()
            .map(|entry| ScoredEntry {
                score: similarity(&query, &trigrams(&entry.question)),
                entry: entry.clone(),
            })
            .filter(|s| s.score > min_score)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Lowercased words padded with two leading blanks and one trailing blank
fn trigrams(text: &str) -> HashSet<[char; 3]> {
    let mut set = HashSet::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.to_lowercase().chars())
            .chain(" ".chars())
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }
    set
}

fn similarity(a: &HashSet<[char; 3]>, b: &HashSet<[char; 3]>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str) -> NewQnaEntry {
        NewQnaEntry {
            question: question.to_string(),
            answer: format!("answer to {question}"),
            category: None,
            subcategory: None,
        }
    }

    #[test]
    fn identical_text_scores_one() {
        let a = trigrams("What services does WellNet provide?");
        assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let a = trigrams("Do you offer PBM services?");
        let b = trigrams("do you offer pbm services");
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn word_trigrams_match_pg_trgm() {
        let set = trigrams("cat");
        let expected: HashSet<[char; 3]> = [
            [' ', ' ', 'c'],
            [' ', 'c', 'a'],
            ['c', 'a', 't'],
            ['a', 't', ' '],
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let a = trigrams("How are claims adjudicated?");
        let b = trigrams("Where is the office parking?");
        assert!(similarity(&a, &b) < 0.15);
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_survive_deletes() {
        let store = InMemoryQnaStore::new();
        let first = store.insert(entry("one")).await.unwrap();
        let second = store.insert(entry("two")).await.unwrap();
        assert!(store.delete(second.id).await.unwrap());
        let third = store.insert(entry("three")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(third.id, 3);
        assert!(!store.delete(second.id).await.unwrap());

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn find_similar_ranks_and_caps() {
        let store = InMemoryQnaStore::new();
        store.insert(entry("What is your claims turnaround time?")).await.unwrap();
        store.insert(entry("What is your claims turnaround?")).await.unwrap();
        store.insert(entry("Describe your parking policy")).await.unwrap();

        let found = store
            .find_similar("What is your claims turnaround time?", 0.15, 1)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry.question, "What is your claims turnaround time?");
        assert_eq!(found[0].score, 1.0);
    }
}
