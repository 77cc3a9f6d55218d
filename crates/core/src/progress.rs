use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::LessonCatalog;
use crate::model::{GradeLevel, LessonNumber, OutcomeSet};
use crate::requirements::GradeConfig;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// Configuration error: the grade has no requirement entry. Fatal to the
    /// calculation; surfaced, never retried.
    #[error("no requirement list configured for grade {grade}")]
    MissingGradeConfig { grade: GradeLevel },

    /// Reference error: an outcome cites a lesson the catalog does not
    /// carry. Indicates upstream data corruption; surfaced, never dropped.
    #[error("outcome references unknown lesson {number}")]
    UnknownLesson { number: u8 },
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Per-section completion, with the counts behind the percentage so callers
/// can render "n/a" for a section that has no countable lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section_id: u8,
    pub name: String,
    /// Non-review lessons in the section.
    pub lesson_count: u32,
    /// Passed non-review lessons.
    pub completed_count: u32,
    pub percentage: f64,
}

/// Everything the calculator derives for one student, suitable for direct
/// serialization or persistence as a summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub grade: GradeLevel,
    /// Highest passed lesson, or `None` when nothing has been passed.
    pub current_lesson: Option<LessonNumber>,
    pub foundational_count: u32,
    pub foundational_pct: f64,
    pub min_grade_count: u32,
    pub min_grade_pct: f64,
    pub full_grade_count: u32,
    pub full_grade_pct: f64,
    pub benchmark_count: u32,
    pub benchmark_pct: f64,
    pub sections: Vec<SectionProgress>,
}

impl ProgressReport {
    /// Section id to completion percentage, the compact shape used by
    /// summary rows.
    #[must_use]
    pub fn section_percentages(&self) -> BTreeMap<u8, f64> {
        self.sections
            .iter()
            .map(|s| (s.section_id, s.percentage))
            .collect()
    }
}

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Number of foundational lessons; the baseline denominator for all grades.
pub const FOUNDATIONAL_LESSON_COUNT: u8 = 34;

/// Computes percentage-based progress for one student.
///
/// Pure: a single deterministic pass from (catalog, grade config, outcome
/// set) to a report. Holds only shared references to static reference data,
/// so one calculator can serve any number of concurrent calculations.
#[derive(Debug, Clone, Copy)]
pub struct ProgressCalculator<'a> {
    catalog: &'a LessonCatalog,
    config: &'a GradeConfig,
}

/// Round to two decimal places, the precision persisted and reported.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pct(count: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(f64::from(count) / f64::from(denominator) * 100.0)
}

impl<'a> ProgressCalculator<'a> {
    #[must_use]
    pub fn new(catalog: &'a LessonCatalog, config: &'a GradeConfig) -> Self {
        Self { catalog, config }
    }

    /// Calculates the full progress report for a student's current outcomes.
    ///
    /// Missing outcomes count as not passed; they never shrink a
    /// denominator. A student with zero outcomes is valid and scores 0%
    /// everywhere.
    ///
    /// # Errors
    ///
    /// - `ProgressError::MissingGradeConfig` if the grade has no
    ///   requirement entry.
    /// - `ProgressError::UnknownLesson` if an outcome cites a lesson number
    ///   outside the catalog.
    pub fn calculate(
        &self,
        grade: GradeLevel,
        outcomes: &OutcomeSet,
    ) -> Result<ProgressReport, ProgressError> {
        let requirements =
            self.config
                .get(grade)
                .ok_or(ProgressError::MissingGradeConfig { grade })?;

        for (number, _) in outcomes.iter() {
            if !self.catalog.contains(number) {
                return Err(ProgressError::UnknownLesson {
                    number: number.value(),
                });
            }
        }

        let foundational_count = self.count_passed_span(outcomes, 1, FOUNDATIONAL_LESSON_COUNT);
        let foundational_pct = pct(foundational_count, u32::from(FOUNDATIONAL_LESSON_COUNT));

        // Review lessons are excluded from the min-grade set; the published
        // benchmark denominators assume that filtering.
        let min_set: Vec<LessonNumber> = requirements
            .min_lessons
            .iter()
            .copied()
            .filter(|n| !self.catalog.is_review(*n))
            .collect();
        let min_grade_count = count_passed(outcomes, &min_set);
        let min_grade_pct = pct(min_grade_count, u32::try_from(min_set.len()).unwrap_or(0));

        let full_grade_count = count_passed(outcomes, &requirements.current_year_lessons);
        let full_grade_pct = pct(
            full_grade_count,
            u32::try_from(requirements.current_year_lessons.len()).unwrap_or(0),
        );

        let benchmark_count = min_grade_count;
        let benchmark_pct = pct(benchmark_count, requirements.benchmark_denominator);

        let sections = self
            .catalog
            .sections()
            .iter()
            .map(|section| self.section_progress(outcomes, section))
            .collect();

        Ok(ProgressReport {
            grade,
            current_lesson: outcomes.highest_passed(),
            foundational_count,
            foundational_pct,
            min_grade_count,
            min_grade_pct,
            full_grade_count,
            full_grade_pct,
            benchmark_count,
            benchmark_pct,
            sections,
        })
    }

    /// Section rule: when a section has review lessons and every one of
    /// them is passed (a missing outcome counts as not passed), the section
    /// reports 100% regardless of its non-review outcomes. Otherwise the
    /// percentage is passed non-review lessons over all non-review lessons.
    /// A section with no non-review lessons that misses the review
    /// short-circuit reports 0%.
    fn section_progress(
        &self,
        outcomes: &OutcomeSet,
        section: &crate::catalog::SkillSection,
    ) -> SectionProgress {
        let (review, non_review): (Vec<LessonNumber>, Vec<LessonNumber>) = section
            .lessons
            .iter()
            .copied()
            .partition(|n| self.catalog.is_review(*n));

        let completed_count = count_passed(outcomes, &non_review);
        let lesson_count = u32::try_from(non_review.len()).unwrap_or(0);

        let all_reviews_passed =
            !review.is_empty() && review.iter().all(|n| outcomes.is_passed(*n));

        let percentage = if all_reviews_passed {
            100.0
        } else {
            pct(completed_count, lesson_count)
        };

        SectionProgress {
            section_id: section.id,
            name: section.name.clone(),
            lesson_count,
            completed_count,
            percentage,
        }
    }

    fn count_passed_span(&self, outcomes: &OutcomeSet, first: u8, last: u8) -> u32 {
        let mut count = 0u32;
        for n in first..=last {
            if let Ok(number) = LessonNumber::new(n)
                && outcomes.is_passed(number)
            {
                count += 1;
            }
        }
        count
    }
}

fn count_passed(outcomes: &OutcomeSet, lessons: &[LessonNumber]) -> u32 {
    let passed = lessons.iter().filter(|n| outcomes.is_passed(**n)).count();
    u32::try_from(passed).unwrap_or(0)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lesson, LessonStatus};

    fn lesson(n: u8) -> LessonNumber {
        LessonNumber::new(n).unwrap()
    }

    fn passed(numbers: impl IntoIterator<Item = u8>) -> OutcomeSet {
        let mut set = OutcomeSet::new();
        for n in numbers {
            set.set(lesson(n), LessonStatus::Y);
        }
        set
    }

    fn standard() -> (LessonCatalog, GradeConfig) {
        (LessonCatalog::standard(), GradeConfig::standard())
    }

    #[test]
    fn empty_outcomes_score_zero_everywhere() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let report = calc.calculate(GradeLevel::KG, &OutcomeSet::new()).unwrap();
        assert_eq!(report.current_lesson, None);
        assert_eq!(report.foundational_count, 0);
        assert_eq!(report.foundational_pct, 0.0);
        assert_eq!(report.min_grade_pct, 0.0);
        assert_eq!(report.benchmark_pct, 0.0);
        assert!(report.sections.iter().all(|s| s.percentage == 0.0));
    }

    #[test]
    fn kg_worked_example_rounds_to_88_24() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // Y for lessons 1-30, nothing entered for 31-34.
        let report = calc.calculate(GradeLevel::KG, &passed(1..=30)).unwrap();
        assert_eq!(report.min_grade_count, 30);
        assert_eq!(report.min_grade_pct, 88.24);
        assert_eq!(report.foundational_count, 30);
        assert_eq!(report.foundational_pct, 88.24);
        assert_eq!(report.current_lesson, Some(lesson(30)));
    }

    #[test]
    fn min_grade_is_100_iff_every_required_lesson_passed() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let full = calc.calculate(GradeLevel::KG, &passed(1..=34)).unwrap();
        assert_eq!(full.min_grade_pct, 100.0);
        assert_eq!(full.benchmark_pct, 100.0);

        let short = calc.calculate(GradeLevel::KG, &passed(1..=33)).unwrap();
        assert!(short.min_grade_pct < 100.0);
    }

    #[test]
    fn foundational_ignores_lessons_past_34() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let base = calc.calculate(GradeLevel::G1, &passed(1..=20)).unwrap();

        let mut with_later = passed(1..=20);
        for n in 42..=53 {
            with_later.set(lesson(n), LessonStatus::Y);
        }
        let extended = calc.calculate(GradeLevel::G1, &with_later).unwrap();

        assert_eq!(base.foundational_count, extended.foundational_count);
        assert_eq!(base.foundational_pct, extended.foundational_pct);
        assert!(extended.min_grade_count > base.min_grade_count);
    }

    #[test]
    fn alphabet_review_section_short_circuits_to_100() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // Section 3 spans 35-41; its review lessons are 35,36,37,39,40,41
        // (38 is the lone non-review lesson). Pass only the reviews.
        let report = calc
            .calculate(GradeLevel::KG, &passed([35, 36, 37, 39, 40, 41]))
            .unwrap();
        let section = report.sections.iter().find(|s| s.section_id == 3).unwrap();
        assert_eq!(section.percentage, 100.0);
        assert_eq!(section.lesson_count, 1);
        assert_eq!(section.completed_count, 0);
    }

    #[test]
    fn digraph_section_reviews_override_non_review_ratio() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // Section 4 spans 42-53 with reviews 49 and 53. Both reviews pass
        // but only 4 of the 10 non-review lessons do: still 100, not 40.
        let report = calc
            .calculate(GradeLevel::G1, &passed([42, 43, 44, 45, 49, 53]))
            .unwrap();
        let section = report.sections.iter().find(|s| s.section_id == 4).unwrap();
        assert_eq!(section.completed_count, 4);
        assert_eq!(section.lesson_count, 10);
        assert_eq!(section.percentage, 100.0);
    }

    #[test]
    fn failed_review_falls_back_to_non_review_ratio() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // Review 53 missing: short circuit off, 4/10 non-review passed.
        let report = calc
            .calculate(GradeLevel::G1, &passed([42, 43, 44, 45, 49]))
            .unwrap();
        let section = report.sections.iter().find(|s| s.section_id == 4).unwrap();
        assert_eq!(section.percentage, 40.0);
    }

    #[test]
    fn missing_review_outcome_counts_as_not_passed() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let mut outcomes = passed([35, 36, 37, 39, 40]);
        outcomes.set(lesson(41), LessonStatus::A);
        let report = calc.calculate(GradeLevel::KG, &outcomes).unwrap();
        let section = report.sections.iter().find(|s| s.section_id == 3).unwrap();
        assert_ne!(section.percentage, 100.0);
    }

    #[test]
    fn non_y_statuses_never_count() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let mut outcomes = OutcomeSet::new();
        outcomes.set(lesson(1), LessonStatus::N);
        outcomes.set(lesson(2), LessonStatus::A);
        outcomes.set(lesson(3), LessonStatus::U);

        let report = calc.calculate(GradeLevel::KG, &outcomes).unwrap();
        assert_eq!(report.foundational_count, 0);
        assert_eq!(report.current_lesson, None);
    }

    #[test]
    fn benchmark_uses_grade_denominator() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // G1: min set minus reviews is 44 lessons, benchmark denominator 44.
        let mut outcomes = passed(1..=34);
        for n in [42, 43, 44, 45, 46, 47, 48, 50, 51, 52] {
            outcomes.set(lesson(n), LessonStatus::Y);
        }
        let report = calc.calculate(GradeLevel::G1, &outcomes).unwrap();
        assert_eq!(report.min_grade_count, 44);
        assert_eq!(report.min_grade_pct, 100.0);
        assert_eq!(report.benchmark_pct, 100.0);
    }

    #[test]
    fn full_grade_tracks_current_year_lessons() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        // G1 current year is 42-53 (12 lessons, reviews included).
        let report = calc
            .calculate(GradeLevel::G1, &passed([42, 43, 44]))
            .unwrap();
        assert_eq!(report.full_grade_count, 3);
        assert_eq!(report.full_grade_pct, 25.0);

        // KG has no current-year list.
        let kg = calc.calculate(GradeLevel::KG, &passed(1..=10)).unwrap();
        assert_eq!(kg.full_grade_count, 0);
        assert_eq!(kg.full_grade_pct, 0.0);
    }

    #[test]
    fn identical_inputs_give_identical_reports() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);
        let outcomes = passed([1, 2, 3, 35, 36, 42, 49]);

        let a = calc.calculate(GradeLevel::G1, &outcomes).unwrap();
        let b = calc.calculate(GradeLevel::G1, &outcomes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_grades_bounded_and_complete_at_full_pass() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);
        let everything = passed(1..=128);

        for grade in GradeLevel::ALL {
            let report = calc.calculate(grade, &everything).unwrap();
            assert_eq!(report.min_grade_pct, 100.0, "{grade}");
            assert!(report.benchmark_pct >= 0.0 && report.benchmark_pct <= 100.0);
            assert!(report.sections.iter().all(|s| s.percentage == 100.0));
            assert_eq!(report.current_lesson, Some(lesson(128)));
        }
    }

    #[test]
    fn missing_grade_config_is_an_error() {
        let catalog = LessonCatalog::standard();
        let config =
            GradeConfig::single(GradeLevel::KG, &[1, 2, 3], &[], 3).unwrap();
        let calc = ProgressCalculator::new(&catalog, &config);

        let err = calc
            .calculate(GradeLevel::G1, &OutcomeSet::new())
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::MissingGradeConfig {
                grade: GradeLevel::G1
            }
        );
    }

    #[test]
    fn unknown_lesson_is_an_error() {
        // Catalog that only knows lessons 1-10.
        let lessons: Vec<Lesson> = (1..=10u8)
            .map(|n| Lesson {
                number: lesson(n),
                section_id: 1,
                is_review: false,
                name: format!("lesson {n}"),
            })
            .collect();
        let section = crate::catalog::SkillSection {
            id: 1,
            name: "short".to_string(),
            lessons: (1..=10u8).map(lesson).collect(),
        };
        let catalog = LessonCatalog::new(lessons, vec![section]).unwrap();
        let config =
            GradeConfig::single(GradeLevel::KG, &[1, 2, 3, 4, 5], &[], 5).unwrap();
        let calc = ProgressCalculator::new(&catalog, &config);

        let err = calc
            .calculate(GradeLevel::KG, &passed([11]))
            .unwrap_err();
        assert_eq!(err, ProgressError::UnknownLesson { number: 11 });
    }

    #[test]
    fn degenerate_section_reports_zero() {
        // One section made only of a review lesson that is not passed.
        let lessons = vec![Lesson {
            number: lesson(1),
            section_id: 1,
            is_review: true,
            name: "review only".to_string(),
        }];
        let section = crate::catalog::SkillSection {
            id: 1,
            name: "degenerate".to_string(),
            lessons: vec![lesson(1)],
        };
        let catalog = LessonCatalog::new(lessons, vec![section]).unwrap();
        let config = GradeConfig::single(GradeLevel::KG, &[], &[], 1).unwrap();
        let calc = ProgressCalculator::new(&catalog, &config);

        let report = calc.calculate(GradeLevel::KG, &OutcomeSet::new()).unwrap();
        let section = &report.sections[0];
        assert_eq!(section.lesson_count, 0);
        assert_eq!(section.percentage, 0.0);

        // With the review passed the short circuit still applies.
        let report = calc.calculate(GradeLevel::KG, &passed([1])).unwrap();
        assert_eq!(report.sections[0].percentage, 100.0);
    }

    #[test]
    fn section_percentages_map_is_ordered_by_id() {
        let (catalog, config) = standard();
        let calc = ProgressCalculator::new(&catalog, &config);
        let report = calc.calculate(GradeLevel::KG, &passed(1..=34)).unwrap();

        let map = report.section_percentages();
        assert_eq!(map.len(), 17);
        assert_eq!(map.get(&1), Some(&100.0));
    }
}
