//! Per-split statistics and quality checks for a built file list.

use crate::file_list::FileList;
use crate::types::{
    ClassSummary, FileListSummary, Split, SplitSummary, ValidationOutcome, ValidationReport,
};

pub fn summarize(file_list: &FileList) -> FileListSummary {
    let classes = file_list.classes();
    let splits = Split::ALL
        .iter()
        .map(|&split| {
            let samples = file_list.split(split);
            let mut per_class = vec![ClassSummary::default(); classes.len()];
            let class_of = |label: usize| per_class_slot(label, classes.len());

            for record in &samples.face_samples {
                if let Some(slot) = class_of(record.label) {
                    per_class[slot].frames += 1;
                }
            }
            for &position in &samples.valid_positions {
                let label = samples.face_samples.get(position).map(|r| r.label);
                if let Some(slot) = label.and_then(class_of) {
                    per_class[slot].anchors += 1;
                }
            }
            for video in 0..samples.video_count() {
                let start = samples.video_range(video).start;
                let label = samples.face_samples.get(start).map(|r| r.label);
                if let Some(slot) = label.and_then(class_of) {
                    per_class[slot].videos += 1;
                }
            }

            SplitSummary {
                split,
                frames: samples.len(),
                anchors: samples.valid_positions.len(),
                videos: samples.video_count(),
                per_class: classes.iter().cloned().zip(per_class).collect(),
            }
        })
        .collect();

    FileListSummary {
        root: file_list.root().display().to_string(),
        min_sequence_length: file_list.min_sequence_length(),
        splits,
    }
}

fn per_class_slot(label: usize, classes: usize) -> Option<usize> {
    (label < classes).then_some(label)
}

/// Invariant violations fail; empty splits and classes without anchors warn.
pub fn validate_file_list(file_list: &FileList) -> ValidationReport {
    let summary = summarize(file_list);
    let mut outcome = ValidationOutcome::Pass;
    let mut reasons = Vec::new();

    if let Err(e) = file_list.validate() {
        outcome = ValidationOutcome::Fail;
        reasons.push(e.to_string());
    }
    for split in &summary.splits {
        if split.anchors == 0 {
            if outcome == ValidationOutcome::Pass {
                outcome = ValidationOutcome::Warn;
            }
            reasons.push(format!("{}: no valid positions", split.split));
            continue;
        }
        for (class, stats) in &split.per_class {
            if stats.anchors == 0 {
                if outcome == ValidationOutcome::Pass {
                    outcome = ValidationOutcome::Warn;
                }
                reasons.push(format!("{}: class `{class}` has no valid positions", split.split));
            }
        }
    }

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_list::FileListBuilder;

    fn paths(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}/{i}.png")).collect()
    }

    #[test]
    fn counts_frames_anchors_and_videos_per_class() {
        let mut b = FileListBuilder::new("/data", ["real", "fake"], 3).unwrap();
        b.add_data_points(&paths("f/a", 4), &paths("o/a", 4), "real", Split::Train, &[0, 3])
            .unwrap();
        b.add_data_points(&paths("f/b", 3), &paths("o/b", 3), "fake", Split::Train, &[1])
            .unwrap();
        b.add_data_points(&paths("f/c", 3), &paths("o/c", 3), "fake", Split::Train, &[0, 2])
            .unwrap();
        let list = b.finalize();
        let summary = summarize(&list);
        let train = &summary.splits[0];
        assert_eq!(train.split, Split::Train);
        assert_eq!((train.frames, train.anchors, train.videos), (10, 5, 3));
        let (name, fake) = &train.per_class[1];
        assert_eq!(name, "fake");
        assert_eq!((fake.frames, fake.anchors, fake.videos), (6, 3, 2));
        assert_eq!(summary.splits[1].frames, 0);

        let report = validate_file_list(&list);
        assert_eq!(report.outcome, ValidationOutcome::Warn);
        assert!(report.reasons.iter().any(|r| r == "val: no valid positions"));
    }

    #[test]
    fn invariant_violation_fails() {
        let doc = serde_json::json!({
            "root": "/data",
            "classes": ["real"],
            "class_to_idx": {"real": 0},
            "splits": {
                "train": {"face_samples": [["a", 0]], "flow_samples": [], "valid_positions": [0]},
                "val": {"face_samples": [], "flow_samples": [], "valid_positions": []},
                "test": {"face_samples": [], "flow_samples": [], "valid_positions": []}
            },
            "min_sequence_length": 1
        });
        let list = FileList::from_document(doc).unwrap();
        let report = validate_file_list(&list);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
    }
}
