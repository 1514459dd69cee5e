//! Partition the aux frames of one object by (filter, exposure).

use std::collections::BTreeMap;

use crate::calibrate::AuxFrame;
use crate::frame::{ObjectName, Tag};

/// Group the aux frames of `object` by tag.
///
/// Every frame lands in exactly one group and frames keep their input order
/// within a group.
pub fn group_frames(object: &ObjectName, frames: Vec<AuxFrame>) -> BTreeMap<Tag, Vec<AuxFrame>> {
    let mut groups: BTreeMap<Tag, Vec<AuxFrame>> = BTreeMap::new();
    for frame in frames {
        debug_assert_eq!(
            &frame.identity.object, object,
            "aux frame grouped under the wrong object"
        );
        groups.entry(frame.tag()).or_default().push(frame);
    }

    tracing::debug!("Object '{}' split into {} tags", object, groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{constant_frame, identity};

    fn aux(filter: &str, exposure: u32, seq: &str) -> AuxFrame {
        AuxFrame {
            identity: identity("M1", filter, exposure),
            seq: seq.to_string(),
            frame: constant_frame(2, 2, 0.0),
        }
    }

    #[test]
    fn test_groups_partition_input() {
        let frames = vec![
            aux("V", 100, "1"),
            aux("R", 100, "1"),
            aux("V", 200, "1"),
            aux("V", 100, "2"),
            aux("R", 100, "2"),
        ];
        let mut input_keys: Vec<String> = frames.iter().map(|f| f.key().to_string()).collect();

        let groups = group_frames(&ObjectName::new("M1"), frames);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&identity("M1", "V", 100).tag()].len(), 2);
        assert_eq!(groups[&identity("M1", "R", 100).tag()].len(), 2);
        assert_eq!(groups[&identity("M1", "V", 200).tag()].len(), 1);

        for (tag, members) in &groups {
            assert!(members.iter().all(|f| &f.tag() == tag));
        }

        let mut output_keys: Vec<String> = groups
            .values()
            .flatten()
            .map(|f| f.key().to_string())
            .collect();
        input_keys.sort();
        output_keys.sort();
        assert_eq!(input_keys, output_keys);
    }

    #[test]
    fn test_group_keeps_input_order() {
        let frames = vec![aux("V", 100, "3"), aux("V", 100, "1"), aux("V", 100, "2")];
        let groups = group_frames(&ObjectName::new("M1"), frames);
        let seqs: Vec<&str> = groups
            .values()
            .flatten()
            .map(|f| f.seq.as_str())
            .collect();
        assert_eq!(seqs, ["3", "1", "2"]);
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        assert!(group_frames(&ObjectName::new("M1"), Vec::new()).is_empty());
    }
}
