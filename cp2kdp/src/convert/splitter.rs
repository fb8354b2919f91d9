//! Contiguous partitioning of the stacked frames into DeePMD sets.

use std::ops::Range;

use crate::error::ConvertError;


pub fn set_name(index: usize) -> String {
    format!("set.{:03}", index)
}


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetRange {
    pub name:  String,
    pub range: Range<usize>,
}


impl SetRange {
    pub fn len(&self) -> usize { self.range.len() }
    pub fn is_empty(&self) -> bool { self.range.is_empty() }
}


/// Requested number of sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitPlan {
    nsets: usize,
}


impl SplitPlan {
    pub fn new(nsets: usize) -> Self { Self { nsets } }

    /// Everything goes into `set.000`.
    pub fn single() -> Self { Self { nsets: 1 } }

    pub fn nsets(&self) -> usize { self.nsets }

    /// Cuts `[0, nframes)` into `nsets` non-empty contiguous ranges in start order.
    ///
    /// Sizes differ by at most one, the earlier sets taking the extra frames.
    pub fn partition(&self, nframes: usize) -> Result<Vec<SetRange>, ConvertError> {
        if self.nsets < 1 {
            return Err(ConvertError::InvalidSplit("the number of sets must be at least 1".into()));
        }
        if self.nsets > nframes {
            return Err(ConvertError::InvalidSplit(format!(
                "cannot split {} frames into {} non-empty sets", nframes, self.nsets)));
        }

        let base  = nframes / self.nsets;
        let extra = nframes % self.nsets;

        let mut start = 0;
        Ok((0 .. self.nsets).map(|i| {
            let len = base + usize::from(i < extra);
            let range = start .. start + len;
            start += len;
            SetRange { name: set_name(i), range }
        }).collect())
    }
}


impl Default for SplitPlan {
    fn default() -> Self { Self::single() }
}


/// Leading share of frames used for training, the rest for testing.
///
/// Each part is cut into the requested number of sets only if its flag is on;
/// otherwise it lands whole in its own `set.000`. The train part is split by
/// default, the test part is not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainTestSplit {
    train_fraction: f64,
    split_train:    bool,
    split_test:     bool,
}


impl TrainTestSplit {
    pub fn new(train_fraction: f64) -> Self {
        Self { train_fraction, split_train: true, split_test: false }
    }

    pub fn with_split_parts(self, split_train: bool, split_test: bool) -> Self {
        Self { split_train, split_test, ..self }
    }

    pub fn train_fraction(&self) -> f64 { self.train_fraction }
    pub fn split_train(&self) -> bool { self.split_train }
    pub fn split_test(&self) -> bool { self.split_test }

    /// Returns the `(train, test)` ranges, `train` holding the first `floor(f * n)` frames.
    pub fn split(&self, nframes: usize) -> Result<(Range<usize>, Range<usize>), ConvertError> {
        let f = self.train_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(ConvertError::InvalidSplit(format!(
                "train fraction must lie strictly between 0 and 1, got {}", f)));
        }

        let ntrain = (f * nframes as f64).floor() as usize;
        if ntrain == 0 || ntrain == nframes {
            return Err(ConvertError::InvalidSplit(format!(
                "train fraction {} leaves an empty {} part out of {} frames",
                f, if ntrain == 0 { "train" } else { "test" }, nframes)));
        }

        Ok((0 .. ntrain, ntrain .. nframes))
    }
}


/// A directory of sets sharing one type map: the output root itself, or `train/` / `test/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subset {
    pub dir:  Option<&'static str>,
    /// Frame ranges into the whole trajectory.
    pub sets: Vec<SetRange>,
}


impl Subset {
    pub fn nframes(&self) -> usize {
        self.sets.iter().map(SetRange::len).sum()
    }
}


/// Lays out every output set before anything is written.
pub fn plan_subsets(nframes: usize, plan: SplitPlan, train_test: Option<TrainTestSplit>) -> Result<Vec<Subset>, ConvertError> {
    let part_plan = |split: bool| if split { plan } else { SplitPlan::single() };
    let parts = match train_test {
        None => vec![(None, 0 .. nframes, plan)],
        Some(tt) => {
            let (train, test) = tt.split(nframes)?;
            vec![(Some("train"), train, part_plan(tt.split_train)),
                 (Some("test"),  test,  part_plan(tt.split_test))]
        },
    };

    parts.into_iter()
        .map(|(dir, part, plan)| {
            let sets = plan.partition(part.len())
                .map_err(|e| match (e, dir) {
                    (ConvertError::InvalidSplit(msg), Some(d)) => ConvertError::InvalidSplit(format!("{} part: {}", d, msg)),
                    (e, _) => e,
                })?
                .into_iter()
                .map(|s| SetRange { name: s.name, range: s.range.start + part.start .. s.range.end + part.start })
                .collect();
            Ok(Subset { dir, sets })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lens(sets: &[SetRange]) -> Vec<usize> {
        sets.iter().map(SetRange::len).collect()
    }

    #[test]
    fn test_uneven_partition() {
        let sets = SplitPlan::new(3).partition(7).unwrap();
        assert_eq!(lens(&sets), vec![3, 2, 2]);
        assert_eq!(sets[0].range, 0 .. 3);
        assert_eq!(sets[2].range, 5 .. 7);
        assert_eq!(sets[2].name, "set.002");
    }

    #[test]
    fn test_one_frame_per_set() {
        let sets = SplitPlan::new(5).partition(5).unwrap();
        assert_eq!(lens(&sets), vec![1; 5]);
    }

    #[test]
    fn test_too_many_sets() {
        assert!(matches!(SplitPlan::new(6).partition(5), Err(ConvertError::InvalidSplit(_))));
        assert!(matches!(SplitPlan::new(0).partition(5), Err(ConvertError::InvalidSplit(_))));
    }

    #[test]
    fn test_partition_is_lossless() {
        for n in 1 .. 40 {
            for k in 1 ..= n {
                let sets = SplitPlan::new(k).partition(n).unwrap();
                assert_eq!(sets.len(), k);
                assert_eq!(sets[0].range.start, 0);
                assert_eq!(sets[k - 1].range.end, n);
                assert!(sets.windows(2).all(|w| w[0].range.end == w[1].range.start));
                assert!(sets.windows(2).all(|w| w[0].len() >= w[1].len() && w[0].len() - w[1].len() <= 1));
                assert!(sets.iter().all(|s| !s.is_empty()));
            }
        }
    }

    #[test]
    fn test_single_set() {
        let sets = SplitPlan::default().partition(12).unwrap();
        assert_eq!(sets, vec![SetRange { name: "set.000".into(), range: 0 .. 12 }]);
    }

    #[test]
    fn test_train_test() {
        let (train, test) = TrainTestSplit::new(0.8).split(10).unwrap();
        assert_eq!(train, 0 .. 8);
        assert_eq!(test, 8 .. 10);

        let (train, test) = TrainTestSplit::new(0.5).split(7).unwrap();
        assert_eq!(train, 0 .. 3);
        assert_eq!(test, 3 .. 7);
    }

    #[test]
    fn test_train_test_invalid() {
        assert!(TrainTestSplit::new(1.0).split(10).is_err());
        assert!(TrainTestSplit::new(0.0).split(10).is_err());
        assert!(TrainTestSplit::new(0.05).split(10).is_err());
        assert!(TrainTestSplit::new(f64::NAN).split(10).is_err());
    }

    #[test]
    fn test_plan_without_train_test() {
        let subsets = plan_subsets(7, SplitPlan::new(3), None).unwrap();
        assert_eq!(subsets.len(), 1);
        assert_eq!(subsets[0].dir, None);
        assert_eq!(lens(&subsets[0].sets), vec![3, 2, 2]);
    }

    #[test]
    fn test_plan_with_train_test() {
        let subsets = plan_subsets(10, SplitPlan::new(2), Some(TrainTestSplit::new(0.8))).unwrap();
        assert_eq!(subsets[0].dir, Some("train"));
        assert_eq!(subsets[0].sets[1].range, 4 .. 8);
        assert_eq!(subsets[1].dir, Some("test"));
        assert_eq!(subsets[1].sets, vec![SetRange { name: "set.000".into(), range: 8 .. 10 }]);
        assert_eq!(subsets.iter().map(Subset::nframes).sum::<usize>(), 10);
    }

    #[test]
    fn test_plan_keeps_small_test_part_whole() {
        let subsets = plan_subsets(40, SplitPlan::new(10), Some(TrainTestSplit::new(0.8))).unwrap();
        assert_eq!(lens(&subsets[0].sets), vec![4, 4, 3, 3, 3, 3, 3, 3, 3, 3]);
        assert_eq!(subsets[0].sets[9].name, "set.009");
        assert_eq!(subsets[1].sets, vec![SetRange { name: "set.000".into(), range: 32 .. 40 }]);
    }

    #[test]
    fn test_plan_split_parts_flags() {
        let tt = TrainTestSplit::new(0.8).with_split_parts(true, true);
        let subsets = plan_subsets(10, SplitPlan::new(2), Some(tt)).unwrap();
        assert_eq!(subsets[1].sets[0].range, 8 .. 9);
        assert_eq!(subsets[1].sets[1].range, 9 .. 10);
        assert_eq!(subsets[1].sets[1].name, "set.001");

        let tt = TrainTestSplit::new(0.8).with_split_parts(false, true);
        let subsets = plan_subsets(10, SplitPlan::new(2), Some(tt)).unwrap();
        assert_eq!(subsets[0].sets, vec![SetRange { name: "set.000".into(), range: 0 .. 8 }]);
        assert_eq!(subsets[1].sets.len(), 2);
    }

    #[test]
    fn test_plan_test_part_too_small() {
        let tt = TrainTestSplit::new(0.8).with_split_parts(true, true);
        let err = plan_subsets(10, SplitPlan::new(3), Some(tt)).unwrap_err();
        assert!(err.to_string().contains("test part"), "{}", err);

        plan_subsets(10, SplitPlan::new(3), Some(TrainTestSplit::new(0.8))).unwrap();
    }
}
