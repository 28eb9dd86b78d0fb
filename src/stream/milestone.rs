use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MilestoneTier {
    Small,
    Medium,
    Large,
}

impl MilestoneTier {
    /// Medium and large milestones get the full-screen confetti treatment;
    /// small ones only a toast.
    pub fn is_full_screen(self) -> bool {
        !matches!(self, MilestoneTier::Small)
    }
}

/// "Every `every`-th post is a `tier` milestone."
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRule {
    pub every: u32,
    pub tier: MilestoneTier,
}

impl MilestoneRule {
    pub fn new(every: u32, tier: MilestoneTier) -> Self {
        Self { every, tier }
    }

    fn matches(&self, count: usize) -> bool {
        self.every > 0 && count > 0 && count % self.every as usize == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub count: usize,
    pub tier: MilestoneTier,
}

impl Milestone {
    pub fn message(&self) -> String {
        match self.tier {
            MilestoneTier::Large => format!("{} posts! What a day to remember 🎉", self.count),
            MilestoneTier::Medium => format!("{} memories shared! 🎊", self.count),
            MilestoneTier::Small => format!("{} posts and counting ✨", self.count),
        }
    }
}

/// The milestone reached at `count`, if any. When several rules match (100
/// is a multiple of 10, 25 and 50) the one with the largest threshold wins.
pub fn check_milestone(count: usize, rules: &[MilestoneRule]) -> Option<Milestone> {
    rules
        .iter()
        .filter(|rule| rule.matches(count))
        .max_by_key(|rule| rule.every)
        .map(|rule| Milestone {
            count,
            tier: rule.tier,
        })
}
