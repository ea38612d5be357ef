use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, ParseIdError};

/// Fixed contiguous lesson ranges grouped under a C++ memory-management topic.
///
/// The buckets partition the whole catalog: every lesson belongs to exactly one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    RawPointers,
    SmartPointers,
    AllocationContracts,
    CustomDeleters,
    AbiAndAlignment,
    StringOptimization,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::RawPointers,
        Topic::SmartPointers,
        Topic::AllocationContracts,
        Topic::CustomDeleters,
        Topic::AbiAndAlignment,
        Topic::StringOptimization,
    ];

    /// Lesson numbers covered by this topic.
    #[must_use]
    pub fn lessons(self) -> RangeInclusive<u16> {
        match self {
            Topic::RawPointers => 1..=20,
            Topic::SmartPointers => 21..=40,
            Topic::AllocationContracts => 41..=60,
            Topic::CustomDeleters => 61..=80,
            Topic::AbiAndAlignment => 81..=100,
            Topic::StringOptimization => 101..=120,
        }
    }

    /// Number of lessons in the bucket.
    #[must_use]
    pub fn lesson_count(self) -> u16 {
        let range = self.lessons();
        range.end() - range.start() + 1
    }

    #[must_use]
    pub fn contains(self, lesson: LessonId) -> bool {
        self.lessons().contains(&lesson.value())
    }

    #[must_use]
    pub fn for_lesson(lesson: LessonId) -> Topic {
        Self::ALL
            .into_iter()
            .find(|topic| topic.contains(lesson))
            .unwrap_or(Topic::StringOptimization)
    }

    /// Stable identifier, matching the serialized form.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Topic::RawPointers => "raw-pointers",
            Topic::SmartPointers => "smart-pointers",
            Topic::AllocationContracts => "allocation-contracts",
            Topic::CustomDeleters => "custom-deleters",
            Topic::AbiAndAlignment => "abi-and-alignment",
            Topic::StringOptimization => "string-optimization",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Topic::RawPointers => "Raw Pointers",
            Topic::SmartPointers => "Smart Pointers",
            Topic::AllocationContracts => "Allocation Contracts",
            Topic::CustomDeleters => "Custom Deleters & RAII",
            Topic::AbiAndAlignment => "ABI & Memory Alignment",
            Topic::StringOptimization => "String & Layout Optimization",
        }
    }
}

impl FromStr for Topic {
    type Err = ParseIdError;

    /// Accepts the kebab-case slug, e.g. `smart-pointers`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|topic| topic.slug() == wanted)
            .ok_or_else(|| ParseIdError::new("Topic"))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::LESSON_COUNT;

    #[test]
    fn buckets_partition_the_catalog() {
        let total: u16 = Topic::ALL.iter().map(|t| t.lesson_count()).sum();
        assert_eq!(total, LESSON_COUNT);

        for lesson in LessonId::all() {
            let owners = Topic::ALL.iter().filter(|t| t.contains(lesson)).count();
            assert_eq!(owners, 1, "lesson {lesson} must belong to exactly one topic");
        }
    }

    #[test]
    fn bucket_boundaries() {
        let lesson = |n| LessonId::new(n).unwrap();
        assert_eq!(Topic::for_lesson(lesson(1)), Topic::RawPointers);
        assert_eq!(Topic::for_lesson(lesson(20)), Topic::RawPointers);
        assert_eq!(Topic::for_lesson(lesson(21)), Topic::SmartPointers);
        assert_eq!(Topic::for_lesson(lesson(100)), Topic::AbiAndAlignment);
        assert_eq!(Topic::for_lesson(lesson(120)), Topic::StringOptimization);
    }

    #[test]
    fn slugs_match_serde_and_parse_back() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.slug()));
            assert_eq!(topic.slug().parse::<Topic>().unwrap(), topic);
        }
        assert!("pointers".parse::<Topic>().is_err());
    }
}
