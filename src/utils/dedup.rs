//! Deduplication of records harvested from several sources.

use std::collections::{HashMap, HashSet};

use crate::models::{IdentityKey, Record};

/// Find records that share an identity key.
///
/// Returns groups of record indices (in input order) for every key seen more
/// than once. The first index of each group is the record that
/// [`deduplicate_records`] keeps.
pub fn find_duplicates(records: &[Record]) -> Vec<Vec<usize>> {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut groups: HashMap<IdentityKey, Vec<usize>> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let key = record.identity_key();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(idx);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|group| group.len() > 1)
        .collect()
}

/// Remove duplicate records, keeping the first occurrence of each identity key.
///
/// Later records with a colliding key are dropped whole; fields are never
/// merged. The output preserves first-seen order, so running this on its own
/// output returns it unchanged.
pub fn deduplicate_records(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<IdentityKey> = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.identity_key()) {
            unique.push(record);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordBuilder, SourceKind};

    fn make_record(source: SourceKind, title: &str, doi: &str, date: &str) -> Record {
        RecordBuilder::new(source, "keyword")
            .title(title)
            .doi(doi)
            .publication_date(date)
            .build()
    }

    fn sample() -> Vec<Record> {
        vec![
            make_record(SourceKind::PubMed, "Paper A", "10.1/a", "2024"),
            make_record(SourceKind::Crossref, "Paper A (Crossref)", "10.1/A", "2024-01"),
            make_record(SourceKind::OpenAlex, "Untitled Study", "", "2023"),
            make_record(SourceKind::Crossref, "untitled study ", "", "2023"),
            make_record(SourceKind::OpenAlex, "Untitled Study", "", "2022"),
            make_record(SourceKind::PubMed, "Paper B", "10.1/b", ""),
        ]
    }

    #[test]
    fn test_first_write_wins_on_doi() {
        let unique = deduplicate_records(vec![
            make_record(SourceKind::PubMed, "First title", "10.1/x", "2024"),
            make_record(SourceKind::Crossref, "Second title", "10.1/X", "2024"),
        ]);

        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].title(), "First title");
        assert_eq!(unique[0].source(), SourceKind::PubMed);
    }

    #[test]
    fn test_title_date_fallback() {
        let unique = deduplicate_records(sample());
        let titles: Vec<&str> = unique.iter().map(|r| r.title()).collect();

        assert_eq!(titles, vec!["Paper A", "Untitled Study", "Untitled Study", "Paper B"]);
        assert_eq!(unique[1].publication_date(), "2023");
        assert_eq!(unique[2].publication_date(), "2022");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let once = deduplicate_records(sample());
        let twice = deduplicate_records(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedup_keys_unique_and_length_bounded() {
        let input = sample();
        let input_len = input.len();
        let unique = deduplicate_records(input);

        assert!(unique.len() <= input_len);
        let keys: HashSet<IdentityKey> = unique.iter().map(Record::identity_key).collect();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn test_dedup_empty() {
        assert!(deduplicate_records(Vec::new()).is_empty());
    }

    #[test]
    fn test_find_duplicates() {
        let groups = find_duplicates(&sample());
        assert_eq!(groups, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_find_duplicates_none() {
        let records = vec![
            make_record(SourceKind::PubMed, "One", "10.1/one", ""),
            make_record(SourceKind::PubMed, "Two", "10.1/two", ""),
        ];
        assert!(find_duplicates(&records).is_empty());
    }
}
