//! Binary answer checking for interactive slides.

use std::collections::HashSet;

use crate::model::{CorrectAnswer, OptionId};

/// Returns true when `selection` matches `correct` exactly.
///
/// Single-answer slides need exactly one selected id equal to the answer.
/// Multi-answer slides compare as sets: order does not matter, and a subset
/// or superset of the correct ids is wrong. There is no partial credit.
#[must_use]
pub fn evaluate(correct: &CorrectAnswer, selection: &[OptionId]) -> bool {
    match correct {
        CorrectAnswer::Single(expected) => selection.len() == 1 && &selection[0] == expected,
        CorrectAnswer::Multiple(expected) => {
            let selected: HashSet<&OptionId> = selection.iter().collect();
            let wanted: HashSet<&OptionId> = expected.iter().collect();
            !wanted.is_empty() && selected == wanted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[&str]) -> Vec<OptionId> {
        raw.iter().map(|id| OptionId::new(*id).unwrap()).collect()
    }

    #[test]
    fn single_answer_needs_exact_match() {
        let correct = CorrectAnswer::Single(OptionId::new("a").unwrap());
        assert!(evaluate(&correct, &ids(&["a"])));
        assert!(!evaluate(&correct, &ids(&["b"])));
        assert!(!evaluate(&correct, &ids(&["a", "b"])));
        assert!(!evaluate(&correct, &[]));
    }

    #[test]
    fn multi_answer_is_order_independent() {
        let correct = CorrectAnswer::Multiple(ids(&["a", "c"]));
        assert!(evaluate(&correct, &ids(&["c", "a"])));
    }

    #[test]
    fn multi_answer_rejects_subset_and_superset() {
        let correct = CorrectAnswer::Multiple(ids(&["a", "c"]));
        assert!(!evaluate(&correct, &ids(&["a"])));
        assert!(!evaluate(&correct, &ids(&["a", "b", "c"])));
        assert!(!evaluate(&correct, &[]));
    }

    fn option_pool() -> impl Strategy<Value = Vec<OptionId>> {
        proptest::sample::subsequence(vec!["a", "b", "c", "d", "e"], 0..=5)
            .prop_map(|raw| ids(&raw))
    }

    proptest! {
        #[test]
        fn single_is_true_iff_singleton_of_answer(selection in option_pool(), pick in 0usize..5) {
            let answer = ids(&["a", "b", "c", "d", "e"])[pick].clone();
            let expected = selection.len() == 1 && selection[0] == answer;
            prop_assert_eq!(evaluate(&CorrectAnswer::Single(answer), &selection), expected);
        }

        #[test]
        fn multiple_is_true_iff_set_equal(
            answer in option_pool().prop_filter("non-empty", |v| !v.is_empty()),
            selection in option_pool(),
            reversed in any::<bool>(),
        ) {
            let mut selection = selection;
            if reversed {
                selection.reverse();
            }
            let a: HashSet<_> = answer.iter().collect();
            let s: HashSet<_> = selection.iter().collect();
            prop_assert_eq!(evaluate(&CorrectAnswer::Multiple(answer.clone()), &selection), a == s);
        }
    }
}
