use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Number of lessons in the course catalog.
pub const LESSON_COUNT: u16 = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson id must be between 1 and {max}, got {value}")]
    OutOfRange { value: u32, max: u16 },
}

/// Unique identifier for a lesson (1..=120).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u16")]
pub struct LessonId(u16);

impl LessonId {
    /// Creates a new `LessonId`.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::OutOfRange` if `id` is outside the catalog.
    pub fn new(id: u16) -> Result<Self, LessonError> {
        if id == 0 || id > LESSON_COUNT {
            return Err(LessonError::OutOfRange {
                value: u32::from(id),
                max: LESSON_COUNT,
            });
        }
        Ok(Self(id))
    }

    /// Returns the underlying lesson number
    #[must_use]
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Iterates every lesson in catalog order.
    pub fn all() -> impl Iterator<Item = LessonId> {
        (1..=LESSON_COUNT).map(LessonId)
    }
}

impl TryFrom<u32> for LessonId {
    type Error = LessonError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let narrowed = u16::try_from(value).map_err(|_| LessonError::OutOfRange {
            value,
            max: LESSON_COUNT,
        })?;
        Self::new(narrowed)
    }
}

impl From<LessonId> for u16 {
    fn from(id: LessonId) -> Self {
        id.0
    }
}

/// Stable identifier of an achievement in the catalog.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(String);

impl AchievementId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AchievementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a study session
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Debug for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AchievementId({})", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl ParseIdError {
    pub(crate) fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
        }
    }
}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(|value| LessonId::try_from(value).ok())
            .ok_or_else(|| ParseIdError {
                kind: "LessonId".to_string(),
            })
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(SessionId)
            .map_err(|_| ParseIdError {
                kind: "SessionId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_id_rejects_zero_and_overflow() {
        assert!(LessonId::new(0).is_err());
        assert!(LessonId::new(LESSON_COUNT + 1).is_err());
        assert!(LessonId::new(1).is_ok());
        assert!(LessonId::new(LESSON_COUNT).is_ok());
    }

    #[test]
    fn lesson_id_display() {
        let id = LessonId::new(42).unwrap();
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn lesson_id_from_str() {
        let id: LessonId = "17".parse().unwrap();
        assert_eq!(id, LessonId::new(17).unwrap());
    }

    #[test]
    fn lesson_id_from_str_invalid() {
        assert!("not-a-number".parse::<LessonId>().is_err());
        assert!("121".parse::<LessonId>().is_err());
        assert!("-3".parse::<LessonId>().is_err());
    }

    #[test]
    fn lesson_id_deserialize_validates_range() {
        let ok: LessonId = serde_json::from_str("5").unwrap();
        assert_eq!(ok.value(), 5);
        assert!(serde_json::from_str::<LessonId>("0").is_err());
        assert!(serde_json::from_str::<LessonId>("70000").is_err());
    }

    #[test]
    fn all_lessons_cover_catalog() {
        let all: Vec<_> = LessonId::all().collect();
        assert_eq!(all.len(), usize::from(LESSON_COUNT));
        assert_eq!(all.first().map(LessonId::value), Some(1));
        assert_eq!(all.last().map(LessonId::value), Some(LESSON_COUNT));
    }

    #[test]
    fn session_id_roundtrip() {
        let original = SessionId::generate();
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
