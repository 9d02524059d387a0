//! LO-coding key decoding shared by the normalizer and the aggregator.
//!
//! Every key row of the intermediate table is a string of digits; digit `i`
//! names the learning objective that question `i` of that test measures.
//!
//! ```text
//! key rows          questions per LO        learning objectives
//! ┌──────────┐      ┌───────────────┐
//! │ 1123     │ ──▶  │ 1 → 3         │  ──▶  1..=max digit = 1..=3
//! │ 31       │      │ 2 → 1, 3 → 2  │
//! └──────────┘      └───────────────┘
//! ```

use std::collections::BTreeMap;

use crate::models::{LoId, LoKey};

/// Question counts per learning objective, derived from all keys combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearningObjectiveMap {
    questions_per_lo: BTreeMap<LoId, usize>,
    num_learning_objectives: u8,
}

impl LearningObjectiveMap {
    pub fn from_keys(keys: &[LoKey]) -> Self {
        let mut questions_per_lo = BTreeMap::new();
        for id in keys.iter().flat_map(|key| key.ids()) {
            *questions_per_lo.entry(*id).or_insert(0) += 1;
        }
        let num_learning_objectives = questions_per_lo
            .keys()
            .next_back()
            .map(|id: &LoId| id.get())
            .unwrap_or(0);

        Self {
            questions_per_lo,
            num_learning_objectives,
        }
    }

    /// Highest LO digit seen in any key. Digits below it may have no questions.
    pub fn num_learning_objectives(&self) -> u8 {
        self.num_learning_objectives
    }

    pub fn questions_for(&self, id: LoId) -> usize {
        self.questions_per_lo.get(&id).copied().unwrap_or(0)
    }

    /// Learning objectives that appear in the report, `1..=num_learning_objectives`.
    ///
    /// LO `0` is counted but never reported.
    pub fn reported(&self) -> impl Iterator<Item = LoId> {
        (1..=self.num_learning_objectives).filter_map(LoId::new)
    }
}

/// Count leading rows whose first cell starts with a decimal digit.
///
/// A student identifier starting with a digit would be taken for a key row,
/// and an empty key row ends the count early. Pass an explicit test count
/// to the aggregator when either can happen.
pub fn detect_num_tests(grid: &[Vec<String>]) -> usize {
    grid.iter()
        .take_while(|row| {
            row.first()
                .and_then(|cell| cell.trim_start().chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .count()
}

/// Report header: an empty corner cell then `Learning Objective 1..=n`.
pub fn header_row(num_learning_objectives: u8) -> Vec<String> {
    std::iter::once(String::new())
        .chain((1..=num_learning_objectives).map(|i| format!("Learning Objective {}", i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<LoKey> {
        raw.iter().map(|k| LoKey::parse(k).unwrap()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_questions_per_lo_across_keys() {
        let map = LearningObjectiveMap::from_keys(&keys(&["1123", "31"]));
        assert_eq!(map.num_learning_objectives(), 3);
        assert_eq!(map.questions_for(LoId::new(1).unwrap()), 3);
        assert_eq!(map.questions_for(LoId::new(2).unwrap()), 1);
        assert_eq!(map.questions_for(LoId::new(3).unwrap()), 2);
    }

    #[test]
    fn test_gap_in_learning_objectives() {
        let map = LearningObjectiveMap::from_keys(&keys(&["113"]));
        assert_eq!(map.num_learning_objectives(), 3);
        assert_eq!(map.questions_for(LoId::new(2).unwrap()), 0);
        assert_eq!(map.reported().count(), 3);
    }

    #[test]
    fn test_lo_zero_not_reported() {
        let map = LearningObjectiveMap::from_keys(&keys(&["0012"]));
        assert_eq!(map.questions_for(LoId::new(0).unwrap()), 2);
        let reported: Vec<u8> = map.reported().map(LoId::get).collect();
        assert_eq!(reported, vec![1, 2]);
    }

    #[test]
    fn test_no_keys() {
        let map = LearningObjectiveMap::from_keys(&[]);
        assert_eq!(map.num_learning_objectives(), 0);
        assert_eq!(map.reported().count(), 0);
    }

    #[test]
    fn test_detect_num_tests() {
        let grid = vec![row(&["112"]), row(&["3"]), row(&["SMITH", "101", "1"])];
        assert_eq!(detect_num_tests(&grid), 2);
    }

    #[test]
    fn test_detect_stops_at_empty_cell() {
        let grid = vec![row(&["1"]), row(&[""]), row(&["2"])];
        assert_eq!(detect_num_tests(&grid), 1);
    }

    #[test]
    fn test_digit_leading_student_is_misread() {
        let grid = vec![row(&["11"]), row(&["7JONES", "10"])];
        assert_eq!(detect_num_tests(&grid), 2);
    }

    #[test]
    fn test_header_row() {
        assert_eq!(
            header_row(2),
            vec!["", "Learning Objective 1", "Learning Objective 2"]
        );
        assert_eq!(header_row(0), vec![""]);
    }
}
