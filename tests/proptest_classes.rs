use proptest::prelude::*;
use weldprep::ir::{normalize_label, ClassTable};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn resolve_is_total_and_in_range(label in "\\PC{0,40}") {
        let table = ClassTable::default();
        if let Some(index) = table.resolve(&label) {
            prop_assert!(index.as_usize() < table.len());
        }
    }

    #[test]
    fn resolve_is_idempotent_under_normalization(label in proptest_helpers::arb_label()) {
        let table = ClassTable::default();
        let normalized = normalize_label(&label);
        prop_assert_eq!(normalize_label(&normalized), normalized.clone());
        prop_assert_eq!(table.resolve(&label), table.resolve(&normalized));
    }

    #[test]
    fn case_and_spacing_do_not_matter(
        index in 0usize..10,
        upper in any::<bool>(),
        padding in "[ \\t]{0,3}",
    ) {
        let table = ClassTable::default();
        let name = table.names()[index].replace('_', " ");
        let label = if upper { name.to_uppercase() } else { name.to_lowercase() };
        let label = format!("{padding}{label}{padding}");

        prop_assert_eq!(table.resolve(&label).map(|c| c.as_usize()), Some(index));
    }
}
