//! Slide identity matching.
//!
//! Maps freshly split document blocks onto the previous slide history so that
//! unchanged slides keep their stable id, server id, notes and presentation
//! attributes across edits, reorders and deletions.

use crate::model::SlideRecord;
use crate::stable_id::StableId;
use std::collections::HashSet;

/// Build the new slide sequence for `blocks` given the `previous` slides.
///
/// Each block claims the first previous slide (in original order) with equal
/// content whose identity has not been claimed yet, so a previous slide is
/// reused at most once even when the document repeats a block. Blocks with no
/// match become new slides styled like the deck's first slide, or with the
/// default style for an empty history. Positions are reassigned as `1..=N`
/// in block order; unmatched previous slides are dropped.
pub fn reconcile(blocks: &[String], previous: &[SlideRecord]) -> Vec<SlideRecord> {
    let inherited = previous
        .first()
        .map(SlideRecord::style)
        .unwrap_or_default();

    let mut claimed: HashSet<&StableId> = HashSet::with_capacity(previous.len());

    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let content = block.trim();
            let position = index as u32 + 1;

            let matched = previous
                .iter()
                .find(|slide| slide.content == content && !claimed.contains(&slide.stable_id));

            match matched {
                Some(slide) => {
                    claimed.insert(&slide.stable_id);
                    SlideRecord {
                        position,
                        content: content.to_string(),
                        ..slide.clone()
                    }
                }
                None => SlideRecord::new(content, position, inherited.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{serialize, split};
    use crate::model::{DEFAULT_COLOR_VARIANT, DEFAULT_THEME};

    fn slide(id: u64, stable_id: &str, position: u32, content: &str) -> SlideRecord {
        SlideRecord {
            id,
            stable_id: StableId::from(stable_id),
            position,
            content: content.to_string(),
            notes: format!("notes for {}", stable_id),
            theme: "ocean".to_string(),
            color_variant: 4,
            layout: Some("center".to_string()),
        }
    }

    fn blocks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ids(slides: &[SlideRecord]) -> Vec<&str> {
        slides.iter().map(|s| s.stable_id.as_str()).collect()
    }

    #[test]
    fn test_new_deck_gets_default_style() {
        let result = reconcile(&split("# Here is slide 1\n---\n# Slide 2"), &[]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 0);
        assert_eq!(result[0].position, 1);
        assert_eq!(result[1].position, 2);
        for slide in &result {
            assert_eq!(slide.theme, DEFAULT_THEME);
            assert_eq!(slide.color_variant, DEFAULT_COLOR_VARIANT);
            assert_eq!(slide.layout, None);
            assert!(!slide.stable_id.is_empty());
        }
        assert_ne!(result[0].stable_id, result[1].stable_id);
    }

    #[test]
    fn test_insert_at_beginning_keeps_identity() {
        let previous = vec![slide(1, "A", 1, "# One"), slide(2, "B", 2, "# Two")];
        let result = reconcile(&split("# Zero\n---\n# One\n---\n# Two\n"), &previous);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].content, "# Zero");
        assert_eq!(result[0].position, 1);
        assert_eq!(result[0].id, 0);
        assert!(result[0].stable_id != previous[0].stable_id && result[0].stable_id != previous[1].stable_id);

        assert_eq!(result[1].stable_id.as_str(), "A");
        assert_eq!(result[1].content, "# One");
        assert_eq!(result[1].position, 2);
        assert_eq!(result[1].id, 1);

        assert_eq!(result[2].stable_id.as_str(), "B");
        assert_eq!(result[2].content, "# Two");
        assert_eq!(result[2].position, 3);
        assert_eq!(result[2].id, 2);
    }

    #[test]
    fn test_insert_in_middle_inherits_first_slide_style() {
        let previous = vec![slide(1, "A", 1, "# One"), slide(2, "B", 2, "# Two")];
        let result = reconcile(&blocks(&["# One", "# New", "# Two"]), &previous);

        assert_eq!(ids(&result)[0], "A");
        assert_eq!(ids(&result)[2], "B");
        let new = &result[1];
        assert_eq!(new.id, 0);
        assert_eq!(new.theme, "ocean");
        assert_eq!(new.color_variant, 4);
        assert_eq!(new.layout.as_deref(), Some("center"));
        assert_eq!(new.notes, "");
    }

    #[test]
    fn test_matched_slide_carries_metadata() {
        let previous = vec![slide(9, "A", 1, "# One")];
        let result = reconcile(&blocks(&["# One"]), &previous);
        assert_eq!(result, previous);
    }

    #[test]
    fn test_reorder_preserves_identity() {
        let previous = vec![
            slide(1, "A", 1, "# One"),
            slide(2, "B", 2, "# Two"),
            slide(3, "C", 3, "# Three"),
        ];
        let result = reconcile(&blocks(&["# Three", "# One", "# Two"]), &previous);

        assert_eq!(ids(&result), vec!["C", "A", "B"]);
        assert_eq!(result.iter().map(|s| s.position).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(result.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }

    #[test]
    fn test_duplicates_claim_each_previous_slide_once() {
        // Two previous "# Same" slides, four in the new document.
        let previous = vec![
            slide(1, "A", 1, "# Same"),
            slide(2, "X", 2, "# Other"),
            slide(3, "B", 3, "# Same"),
        ];
        let result = reconcile(&blocks(&["# Same", "# Same", "# Same", "# Same"]), &previous);

        assert_eq!(result.len(), 4);
        assert_eq!(result[0].stable_id.as_str(), "A");
        assert_eq!(result[1].stable_id.as_str(), "B");

        let fresh: Vec<&SlideRecord> = result[2..].iter().collect();
        for slide in &fresh {
            assert_eq!(slide.id, 0);
            assert!(!["A", "B", "X"].contains(&slide.stable_id.as_str()));
        }
        assert_ne!(fresh[0].stable_id, fresh[1].stable_id);

        let unique: HashSet<&StableId> = result.iter().map(|s| &s.stable_id).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_removing_unique_block_drops_only_that_slide() {
        let previous = vec![
            slide(1, "A", 1, "# One"),
            slide(2, "B", 2, "# Two"),
            slide(3, "C", 3, "# Three"),
        ];
        let result = reconcile(&blocks(&["# One", "# Three"]), &previous);

        assert_eq!(ids(&result), vec!["A", "C"]);
        assert_eq!(result[1].position, 2);
    }

    #[test]
    fn test_empty_document_yields_one_inheriting_slide() {
        let previous = vec![slide(1, "A", 1, "# One"), slide(2, "B", 2, "# Two")];
        let result = reconcile(&split(""), &previous);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].content, "");
        assert_eq!(result[0].position, 1);
        assert_eq!(result[0].id, 0);
        assert_eq!(result[0].theme, "ocean");
        assert_eq!(result[0].color_variant, 4);
        assert!(!["A", "B"].contains(&result[0].stable_id.as_str()));
    }

    #[test]
    fn test_empty_blocks_yield_empty_deck() {
        let previous = vec![slide(1, "A", 1, "# One")];
        assert!(reconcile(&[], &previous).is_empty());
    }

    #[test]
    fn test_blocks_are_compared_trimmed() {
        let previous = vec![slide(1, "A", 1, "# One")];
        let result = reconcile(&blocks(&["  # One\n\n"]), &previous);
        assert_eq!(result[0].stable_id.as_str(), "A");
        assert_eq!(result[0].content, "# One");
    }

    #[test]
    fn test_content_round_trips_through_serialize() {
        let previous = vec![slide(1, "A", 1, "# One"), slide(2, "B", 2, "# Two")];
        let documents = [
            "",
            "# One",
            "# Two\n---\n# One\n---\n# Two\n",
            "\n# Intro\n\nText\n---\n\n---\n- list\n- items\n",
        ];

        for document in documents {
            let expected = split(document);
            let slides = reconcile(&expected, &previous);
            assert_eq!(split(&serialize(&slides)), expected, "document {:?}", document);
        }
    }
}
