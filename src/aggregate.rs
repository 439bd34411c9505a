//! Grouped counting of bucketed records.

use crate::models::{AggregateRow, AggregateTable, BucketedRecord, Measurement};

use hashbrown::HashMap;

/// Counts bucketed records per distinct (gender, bucket, sport) key.
///
/// Partial aggregators built over disjoint parts of the input can be combined with
/// [Aggregator::merge] in any order and grouping, giving the same result as a single aggregator
/// over the whole input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregator<'a> {
    counts: HashMap<BucketedRecord<'a>, u64>,
}

impl<'a> Aggregator<'a> {
    /// Count one record.
    pub fn insert(&mut self, record: BucketedRecord<'a>) {
        *self.counts.entry(record).or_insert(0) += 1;
    }

    /// Combine the counts of another aggregator into this one.
    pub fn merge(self, other: Aggregator<'a>) -> Self {
        // Fold the smaller map into the larger.
        let (mut into, from) = if self.counts.len() >= other.counts.len() {
            (self.counts, other.counts)
        } else {
            (other.counts, self.counts)
        };
        for (key, count) in from {
            *into.entry(key).or_insert(0) += count;
        }
        Aggregator { counts: into }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no records have been counted.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Convert into an aggregate table with rows sorted by key.
    pub fn into_table(self, measurement: Measurement) -> AggregateTable {
        let mut counts: Vec<_> = self.counts.into_iter().collect();
        counts.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        let rows = counts
            .iter()
            .map(|(key, count)| AggregateRow::new(key, *count))
            .collect();
        AggregateTable { measurement, rows }
    }
}

impl<'a> FromIterator<BucketedRecord<'a>> for Aggregator<'a> {
    fn from_iter<I: IntoIterator<Item = BucketedRecord<'a>>>(iter: I) -> Self {
        let mut aggregator = Aggregator::default();
        for record in iter {
            aggregator.insert(record);
        }
        aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;
    use crate::test_utils;

    fn key<'a>(gender: &'a str, min: i64, sport: &'a str) -> BucketedRecord<'a> {
        BucketedRecord {
            gender,
            bucket: Bucket { min, max: min + 10 },
            sport,
        }
    }

    #[test]
    fn aggregate_empty() {
        let aggregator = Aggregator::default();
        assert!(aggregator.is_empty());
        let table = aggregator.into_table(Measurement::HeartRate);
        assert!(table.rows.is_empty());
        assert_eq!(0, table.total_count());
    }

    #[test]
    fn aggregate_groups_identical_keys() {
        let aggregator: Aggregator = [
            key("F", 100, "run"),
            key("F", 100, "run"),
            key("F", 100, "run"),
        ]
        .into_iter()
        .collect();
        assert_eq!(1, aggregator.len());
        let table = aggregator.into_table(Measurement::HeartRate);
        assert_eq!(vec![test_utils::row("F", 100, "run", 3)], table.rows);
    }

    #[test]
    fn aggregate_separates_each_field() {
        let aggregator: Aggregator = [
            key("F", 100, "run"),
            key("M", 100, "run"),
            key("F", 110, "run"),
            key("F", 100, "swim"),
        ]
        .into_iter()
        .collect();
        assert_eq!(4, aggregator.len());
        let table = aggregator.into_table(Measurement::HeartRate);
        assert_eq!(
            vec![
                test_utils::row("F", 100, "run", 1),
                test_utils::row("F", 100, "swim", 1),
                test_utils::row("F", 110, "run", 1),
                test_utils::row("M", 100, "run", 1),
            ],
            table.rows
        );
    }

    #[test]
    fn aggregate_order_independent() {
        let keys = vec![
            key("F", 100, "run"),
            key("M", 150, "cycle"),
            key("F", 100, "run"),
            key("F", 110, "run"),
            key("M", 150, "cycle"),
        ];
        let forward: Aggregator = keys.iter().copied().collect();
        let backward: Aggregator = keys.iter().rev().copied().collect();
        assert_eq!(forward, backward);
        assert_eq!(
            forward.into_table(Measurement::Speed),
            backward.into_table(Measurement::Speed)
        );
    }

    #[test]
    fn aggregate_merge() {
        let keys = vec![
            key("F", 100, "run"),
            key("M", 150, "cycle"),
            key("F", 100, "run"),
            key("F", 110, "run"),
            key("M", 150, "cycle"),
            key("M", 150, "cycle"),
        ];
        let whole: Aggregator = keys.iter().copied().collect();
        for split in 0..=keys.len() {
            let left: Aggregator = keys[..split].iter().copied().collect();
            let right: Aggregator = keys[split..].iter().copied().collect();
            assert_eq!(whole, left.clone().merge(right.clone()));
            assert_eq!(whole, right.merge(left));
        }
    }

    #[test]
    fn aggregate_merge_associative() {
        let a: Aggregator = [key("F", 100, "run")].into_iter().collect();
        let b: Aggregator = [key("F", 100, "run"), key("M", 0, "walk")]
            .into_iter()
            .collect();
        let c: Aggregator = [key("M", 0, "walk"), key("X", 10, "row")]
            .into_iter()
            .collect();
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
        assert_eq!(5, left.into_table(Measurement::Speed).total_count());
    }
}
