//! Property coverage for the audit engine and redaction.

use proptest::prelude::*;
use rowgate_core::{diff_words, Auditor, RedactionList};
use rowgate_testkit::{config_text_strategy, line_strategy, Channel};

fn channel(setup: &str) -> Channel {
    Channel {
        id: 1,
        name: "n".into(),
        setup: setup.into(),
        active: true,
        aggregate_size: None,
    }
}

proptest! {
    #[test]
    fn diff_of_identical_snapshots_is_always_empty(setup in config_text_strategy()) {
        let auditor = Auditor::default();
        let entity = channel(&setup);
        prop_assert_eq!(auditor.diff(&entity, &entity, true), "");
        prop_assert_eq!(auditor.diff(&entity, &entity, false), "");
    }

    #[test]
    fn diff_is_byte_identical_across_calls(
        old in config_text_strategy(),
        new in config_text_strategy(),
    ) {
        let auditor = Auditor::default();
        let before = channel(&old);
        let after = channel(&new);
        prop_assert_eq!(
            auditor.diff(&before, &after, true),
            auditor.diff(&before, &after, true)
        );
        prop_assert_eq!(
            auditor.diff(&before, &after, false),
            auditor.diff(&before, &after, false)
        );
    }

    #[test]
    fn volatile_rewrites_never_diff(
        base in config_text_strategy(),
        stamp_a in "[0-9]{1,8}",
        stamp_b in "[0-9]{1,8}",
    ) {
        let auditor = Auditor::default();
        let before = channel(&format!("{base}\nectrans.lastupdate = \"{stamp_a}\""));
        let after = channel(&format!("{base}\nectrans.lastupdate = \"{stamp_b}\""));
        prop_assert_eq!(auditor.diff(&before, &after, true), "");
    }

    #[test]
    fn strip_is_idempotent(text in config_text_strategy()) {
        let list = RedactionList::default();
        let once = list.strip(&text);
        prop_assert_eq!(list.strip(&once), once.clone());
    }

    #[test]
    fn equal_lines_produce_no_markers(line in line_strategy()) {
        let diff = diff_words(&line, &line);
        prop_assert!(!diff.merged.contains("[-"));
        prop_assert!(!diff.merged.contains("{+"), "merged diff should contain no insertion markers");
    }

    #[test]
    fn word_diff_sides_reassemble_their_inputs(
        old in line_strategy(),
        new in line_strategy(),
    ) {
        let diff = diff_words(&old, &new);
        let strip_markers = |text: &str| {
            text.replace("[-", "")
                .replace("-]", "")
                .replace("{+", "")
                .replace("+}", "")
        };
        let old_words: Vec<String> =
            old.split_whitespace().map(str::to_string).collect();
        let new_words: Vec<String> =
            new.split_whitespace().map(str::to_string).collect();
        let old_side: Vec<String> = strip_markers(&diff.old_side)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let new_side: Vec<String> = strip_markers(&diff.new_side)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        prop_assert_eq!(old_side, old_words);
        prop_assert_eq!(new_side, new_words);
    }
}
