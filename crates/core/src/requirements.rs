use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{GradeLevel, LessonNumber, LessonNumberError};

//
// ─── GRADE REQUIREMENTS ────────────────────────────────────────────────────────
//

/// The lesson sets and denominators that define on-track status for one
/// grade level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRequirements {
    /// Lessons that count toward the grade's minimum completion.
    pub min_lessons: Vec<LessonNumber>,
    /// Lessons introduced in the current school year; empty when the grade
    /// has no current-year span (PreK, KG).
    pub current_year_lessons: Vec<LessonNumber>,
    /// Fixed denominator for the benchmark percentage.
    pub benchmark_denominator: u32,
    /// PreK tracks letter mastery rather than full lessons.
    pub letter_based: bool,
}

//
// ─── GRADE CONFIG ──────────────────────────────────────────────────────────────
//

/// Per-grade requirement table. Requirement lists are supplied data, not
/// code branches, so tests can sweep every grade the same way.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradeConfig {
    entries: BTreeMap<GradeLevel, GradeRequirements>,
}

impl GradeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, grade: GradeLevel, requirements: GradeRequirements) {
        self.entries.insert(grade, requirements);
    }

    #[must_use]
    pub fn get(&self, grade: GradeLevel) -> Option<&GradeRequirements> {
        self.entries.get(&grade)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GradeLevel, &GradeRequirements)> {
        self.entries.iter().map(|(g, r)| (*g, r))
    }

    /// The published requirement table for all ten grade levels.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in ranges fall outside `1..=128`, which is
    /// covered by tests.
    #[must_use]
    pub fn standard() -> Self {
        fn span(first: u8, last: u8) -> Vec<LessonNumber> {
            LessonNumber::range(first, last).expect("standard grade span in range")
        }
        fn joined(a: Vec<LessonNumber>, b: Vec<LessonNumber>) -> Vec<LessonNumber> {
            let mut out = a;
            out.extend(b);
            out
        }

        let mut config = Self::new();

        config.insert(
            GradeLevel::PreK,
            GradeRequirements {
                min_lessons: span(1, 26),
                current_year_lessons: Vec::new(),
                benchmark_denominator: 26,
                letter_based: true,
            },
        );
        config.insert(
            GradeLevel::KG,
            GradeRequirements {
                min_lessons: span(1, 34),
                current_year_lessons: Vec::new(),
                benchmark_denominator: 34,
                letter_based: false,
            },
        );
        config.insert(
            GradeLevel::G1,
            GradeRequirements {
                min_lessons: joined(span(1, 34), span(42, 53)),
                current_year_lessons: span(42, 53),
                benchmark_denominator: 44,
                letter_based: false,
            },
        );
        config.insert(
            GradeLevel::G2,
            GradeRequirements {
                min_lessons: joined(span(1, 34), span(42, 62)),
                current_year_lessons: span(54, 62),
                benchmark_denominator: 56,
                letter_based: false,
            },
        );
        config.insert(
            GradeLevel::G3,
            GradeRequirements {
                min_lessons: joined(span(1, 34), span(42, 62)),
                current_year_lessons: span(63, 83),
                benchmark_denominator: 56,
                letter_based: false,
            },
        );
        for grade in [GradeLevel::G4, GradeLevel::G5] {
            config.insert(
                grade,
                GradeRequirements {
                    min_lessons: joined(span(1, 34), span(42, 110)),
                    current_year_lessons: span(84, 110),
                    benchmark_denominator: 103,
                    letter_based: false,
                },
            );
        }
        for grade in [GradeLevel::G6, GradeLevel::G7, GradeLevel::G8] {
            config.insert(
                grade,
                GradeRequirements {
                    min_lessons: joined(span(1, 34), span(42, 110)),
                    current_year_lessons: span(84, 128),
                    benchmark_denominator: 103,
                    letter_based: false,
                },
            );
        }

        config
    }

    /// Builds a single-grade config from raw lesson numbers, mostly for
    /// tests and external configuration loaders.
    ///
    /// # Errors
    ///
    /// Returns `LessonNumberError` if any number is out of range.
    pub fn single(
        grade: GradeLevel,
        min_lessons: &[u8],
        current_year_lessons: &[u8],
        benchmark_denominator: u32,
    ) -> Result<Self, LessonNumberError> {
        let min = min_lessons
            .iter()
            .map(|n| LessonNumber::new(*n))
            .collect::<Result<Vec<_>, _>>()?;
        let current = current_year_lessons
            .iter()
            .map(|n| LessonNumber::new(*n))
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = Self::new();
        config.insert(
            grade,
            GradeRequirements {
                min_lessons: min,
                current_year_lessons: current,
                benchmark_denominator,
                letter_based: false,
            },
        );
        Ok(config)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_covers_all_grades() {
        let config = GradeConfig::standard();
        for grade in GradeLevel::ALL {
            assert!(config.get(grade).is_some(), "missing {grade}");
        }
    }

    #[test]
    fn kg_min_set_is_foundational() {
        let config = GradeConfig::standard();
        let kg = config.get(GradeLevel::KG).unwrap();
        assert_eq!(kg.min_lessons.len(), 34);
        assert_eq!(kg.benchmark_denominator, 34);
        assert!(kg.current_year_lessons.is_empty());
    }

    #[test]
    fn g1_adds_digraphs() {
        let config = GradeConfig::standard();
        let g1 = config.get(GradeLevel::G1).unwrap();
        assert_eq!(g1.min_lessons.len(), 34 + 12);
        assert_eq!(g1.current_year_lessons.len(), 12);
        assert_eq!(g1.benchmark_denominator, 44);
    }

    #[test]
    fn prek_is_letter_based() {
        let config = GradeConfig::standard();
        let prek = config.get(GradeLevel::PreK).unwrap();
        assert!(prek.letter_based);
        assert_eq!(prek.min_lessons.len(), 26);
    }

    #[test]
    fn single_rejects_out_of_range_numbers() {
        let err = GradeConfig::single(GradeLevel::KG, &[1, 2, 200], &[], 3);
        assert!(err.is_err());
    }

    #[test]
    fn upper_grades_share_min_set() {
        let config = GradeConfig::standard();
        let g4 = config.get(GradeLevel::G4).unwrap();
        let g5 = config.get(GradeLevel::G5).unwrap();
        assert_eq!(g4.min_lessons, g5.min_lessons);
        assert_eq!(g4.benchmark_denominator, 103);
    }
}
