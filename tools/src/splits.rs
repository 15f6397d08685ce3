//! Split membership files: `train.json`, `val.json`, `test.json`, each a
//! list of `[source_id, target_id]` pairs.

use anyhow::Context;
use ff_dataset::Split;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SplitMembership {
    by_id: HashMap<String, Split>,
}

impl SplitMembership {
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let mut membership = Self::default();
        for split in Split::ALL {
            let path = dir.join(format!("{}.json", split.as_str()));
            let raw = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let pairs: Vec<Vec<String>> = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            membership.insert(split, pairs.into_iter().flatten())?;
        }
        Ok(membership)
    }

    /// Register ids for `split`; an id may belong to one split only.
    pub fn insert<I, S>(&mut self, split: Split, ids: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if let Some(prev) = self.by_id.insert(id.clone(), split) {
                if prev != split {
                    anyhow::bail!("video id {id} listed in both {prev} and {split}");
                }
            }
        }
        Ok(())
    }

    pub fn split_of(&self, video_id: &str) -> Option<Split> {
        self.by_id.get(video_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_pair_lists() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        fs::write(tmp.path().join("train.json"), r#"[["000", "003"], ["001", "870"]]"#)?;
        fs::write(tmp.path().join("val.json"), r#"[["002", "006"]]"#)?;
        fs::write(tmp.path().join("test.json"), r#"[]"#)?;
        let membership = SplitMembership::load(tmp.path())?;
        assert_eq!(membership.len(), 6);
        assert_eq!(membership.split_of("870"), Some(Split::Train));
        assert_eq!(membership.split_of("006"), Some(Split::Val));
        assert_eq!(membership.split_of("999"), None);
        Ok(())
    }

    #[test]
    fn overlapping_splits_rejected() {
        let mut membership = SplitMembership::default();
        membership.insert(Split::Train, ["000"]).unwrap();
        assert!(membership.insert(Split::Test, ["000"]).is_err());
    }
}
