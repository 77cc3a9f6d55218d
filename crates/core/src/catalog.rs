use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Lesson, LessonNumber};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate lesson number: {number}")]
    DuplicateLesson { number: u8 },
    #[error("section {section_id} references lesson {number} that is not in the catalog")]
    UnknownSectionLesson { section_id: u8, number: u8 },
    #[error("lesson {number} references section {section_id} which does not exist")]
    UnknownSection { number: u8, section_id: u8 },
    #[error("lesson {number} is not listed by its own section {section_id}")]
    SectionMismatch { number: u8, section_id: u8 },
    #[error("duplicate section id: {section_id}")]
    DuplicateSection { section_id: u8 },
}

//
// ─── SKILL SECTION ─────────────────────────────────────────────────────────────
//

/// One of the named phonics-skill groupings of lessons.
///
/// Sections are ordered and mostly contiguous; the published curriculum has
/// one overlap (the blends section re-lists two lessons from the first
/// section), so membership is carried as an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSection {
    pub id: u8,
    pub name: String,
    pub lessons: Vec<LessonNumber>,
}

//
// ─── LESSON CATALOG ────────────────────────────────────────────────────────────
//

/// Read-only reference data: the full lesson list plus section groupings.
///
/// Built once at startup. `standard()` carries the published 128-lesson
/// curriculum; custom catalogs (for tests or future revisions) go through
/// the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonCatalog {
    lessons: BTreeMap<LessonNumber, Lesson>,
    sections: Vec<SkillSection>,
}

impl LessonCatalog {
    /// Validates and assembles a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if lesson numbers repeat, a section lists a
    /// lesson the catalog lacks, or a lesson's primary section does not
    /// list it back.
    pub fn new(lessons: Vec<Lesson>, sections: Vec<SkillSection>) -> Result<Self, CatalogError> {
        let mut by_number: BTreeMap<LessonNumber, Lesson> = BTreeMap::new();
        for lesson in lessons {
            let number = lesson.number;
            if by_number.insert(number, lesson).is_some() {
                return Err(CatalogError::DuplicateLesson {
                    number: number.value(),
                });
            }
        }

        let mut seen_sections = Vec::with_capacity(sections.len());
        for section in &sections {
            if seen_sections.contains(&section.id) {
                return Err(CatalogError::DuplicateSection {
                    section_id: section.id,
                });
            }
            seen_sections.push(section.id);

            for number in &section.lessons {
                if !by_number.contains_key(number) {
                    return Err(CatalogError::UnknownSectionLesson {
                        section_id: section.id,
                        number: number.value(),
                    });
                }
            }
        }

        for lesson in by_number.values() {
            let Some(section) = sections.iter().find(|s| s.id == lesson.section_id) else {
                return Err(CatalogError::UnknownSection {
                    number: lesson.number.value(),
                    section_id: lesson.section_id,
                });
            };
            if !section.lessons.contains(&lesson.number) {
                return Err(CatalogError::SectionMismatch {
                    number: lesson.number.value(),
                    section_id: lesson.section_id,
                });
            }
        }

        Ok(Self {
            lessons: by_number,
            sections,
        })
    }

    /// The published UFLI catalog: 128 lessons across 17 sections.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in tables are inconsistent, which is covered
    /// by tests.
    #[must_use]
    pub fn standard() -> Self {
        let sections: Vec<SkillSection> = STANDARD_SECTIONS
            .iter()
            .map(|(id, name, numbers)| SkillSection {
                id: *id,
                name: (*name).to_string(),
                lessons: numbers
                    .iter()
                    .map(|n| LessonNumber::new(*n).expect("standard section lesson in range"))
                    .collect(),
            })
            .collect();

        let lessons: Vec<Lesson> = (1..=128u8)
            .map(|n| {
                let number = LessonNumber::new(n).expect("1..=128 is in range");
                // First listed section containing the lesson is its primary
                // section; the blends overlap resolves to the first section.
                let section_id = sections
                    .iter()
                    .find(|s| s.lessons.contains(&number))
                    .map(|s| s.id)
                    .expect("standard sections cover 1..=128");
                Lesson {
                    number,
                    section_id,
                    is_review: STANDARD_REVIEW_LESSONS.contains(&n),
                    name: STANDARD_LESSON_NAMES[usize::from(n) - 1].to_string(),
                }
            })
            .collect();

        Self::new(lessons, sections).expect("standard catalog data is consistent")
    }

    #[must_use]
    pub fn lesson(&self, number: LessonNumber) -> Option<&Lesson> {
        self.lessons.get(&number)
    }

    #[must_use]
    pub fn contains(&self, number: LessonNumber) -> bool {
        self.lessons.contains_key(&number)
    }

    /// Missing lessons are reported as non-review; callers that need to
    /// distinguish should check `contains` first.
    #[must_use]
    pub fn is_review(&self, number: LessonNumber) -> bool {
        self.lessons.get(&number).is_some_and(|l| l.is_review)
    }

    #[must_use]
    pub fn sections(&self) -> &[SkillSection] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: u8) -> Option<&SkillSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }
}

//
// ─── STANDARD CURRICULUM DATA ──────────────────────────────────────────────────
//

/// Review lessons re-test prior content; they carry special weight in
/// section percentages and are excluded from min-grade counting.
pub const STANDARD_REVIEW_LESSONS: [u8; 23] = [
    35, 36, 37, 39, 40, 41, 49, 53, 57, 59, 62, 71, 76, 79, 83, 88, 92, 97, 102, 104, 105, 106,
    128,
];

const STANDARD_SECTIONS: [(u8, &str, &[u8]); 17] = [
    (
        1,
        "Single Consonants & Short Vowels",
        &[
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34,
        ],
    ),
    (2, "Blends", &[25, 27]),
    (3, "Alphabet Review", &[35, 36, 37, 38, 39, 40, 41]),
    (
        4,
        "Digraphs",
        &[42, 43, 44, 45, 46, 47, 48, 49, 50, 51, 52, 53],
    ),
    (5, "VCE (Vowel-Consonant-E)", &[54, 55, 56, 57, 58, 59, 60, 61, 62]),
    (6, "Reading Longer Words", &[63, 64, 65, 66, 67, 68]),
    (7, "Ending Spelling Patterns", &[69, 70, 71, 72, 73, 74, 75, 76]),
    (8, "R-Controlled Vowels", &[77, 78, 79, 80, 81, 82, 83]),
    (9, "Long Vowel Teams", &[84, 85, 86, 87, 88]),
    (10, "Other Vowel Teams", &[89, 90, 91, 92, 93, 94]),
    (11, "Diphthongs", &[95, 96, 97]),
    (12, "Silent Letters", &[98]),
    (13, "Suffixes & Prefixes", &[99, 100, 101, 102, 103, 104, 105, 106]),
    (14, "Suffix Spelling Changes", &[107, 108, 109, 110]),
    (
        15,
        "Low Frequency Spellings",
        &[111, 112, 113, 114, 115, 116, 117, 118],
    ),
    (
        16,
        "Additional Affixes",
        &[119, 120, 121, 122, 123, 124, 125, 126],
    ),
    (17, "Affixes Review 2", &[127, 128]),
];

const STANDARD_LESSON_NAMES: [&str; 128] = [
    "a/ā/",
    "m",
    "t",
    "s",
    "i/ī/",
    "f",
    "d",
    "r",
    "o/ō/",
    "g",
    "l",
    "h",
    "u/ū/",
    "c",
    "b",
    "n",
    "k",
    "e/ē/",
    "v",
    "y",
    "w",
    "j",
    "p",
    "x",
    "blends (initial)",
    "z",
    "blends (final)",
    "qu",
    "-ck",
    "-ll, -ss",
    "-zz, -ff",
    "-ng",
    "-nk",
    "Review 1-33",
    "Review a",
    "Review i",
    "Review o",
    "Review u",
    "Review e",
    "Review 35-39",
    "Review all vowels",
    "ch",
    "sh",
    "th",
    "wh",
    "-tch",
    "ph",
    "wr",
    "Review digraphs",
    "kn",
    "gn",
    "mb",
    "Review 50-52",
    "a_e",
    "i_e",
    "o_e",
    "Review 54-56",
    "u_e",
    "Review 54-58",
    "e_e",
    "Soft c",
    "Soft g",
    "Compound words",
    "Syllable division (VC/CV)",
    "Syllable division (V/CV)",
    "Syllable division (VC/V)",
    "Syllable division (review)",
    "Open syllables",
    "-ed (/ed/)",
    "-ed (/d/)",
    "-ed (/t/)",
    "-ing",
    "-er, -est",
    "-s, -es",
    "-ful, -less",
    "Review suffixes",
    "ar",
    "or",
    "Review ar, or",
    "er",
    "ir",
    "ur",
    "Review er, ir, ur",
    "ai",
    "ay",
    "ee",
    "ea",
    "Review vowel teams",
    "igh",
    "ie",
    "oa",
    "ow (/ō/)",
    "ew",
    "ue",
    "oi",
    "oy",
    "Review diphthongs",
    "Silent letters",
    "Prefixes un-, re-",
    "Prefixes pre-, mis-",
    "Prefixes dis-, non-",
    "Review prefixes",
    "Suffixes -ly, -y",
    "Suffixes -ment, -ness",
    "Suffixes -able, -ible",
    "Review suffixes 2",
    "Doubling rule",
    "Drop e rule",
    "Change y rule",
    "Review spelling rules",
    "oo (/o͞o/)",
    "oo (/o͝o/)",
    "ou",
    "ow (/ou/)",
    "au, aw",
    "al, all",
    "wa, qua",
    "Review 111-117",
    "-tion",
    "-sion",
    "-ture, -sure",
    "-cial, -tial",
    "-ous, -eous",
    "-ible, -able (advanced)",
    "Greek roots",
    "Latin roots",
    "Review affixes 1",
    "Review affixes 2",
];

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(n: u8) -> LessonNumber {
        LessonNumber::new(n).unwrap()
    }

    #[test]
    fn standard_catalog_has_128_lessons_and_17_sections() {
        let catalog = LessonCatalog::standard();
        assert_eq!(catalog.len(), 128);
        assert_eq!(catalog.sections().len(), 17);
    }

    #[test]
    fn standard_catalog_review_flags_match_review_list() {
        let catalog = LessonCatalog::standard();
        for n in 1..=128u8 {
            let expected = STANDARD_REVIEW_LESSONS.contains(&n);
            assert_eq!(catalog.is_review(lesson(n)), expected, "lesson {n}");
        }
    }

    #[test]
    fn standard_sections_cover_every_lesson() {
        let catalog = LessonCatalog::standard();
        for n in 1..=128u8 {
            let number = lesson(n);
            let covered = catalog
                .sections()
                .iter()
                .any(|s| s.lessons.contains(&number));
            assert!(covered, "lesson {n} not covered by any section");
        }
    }

    #[test]
    fn blends_section_overlaps_first_section() {
        let catalog = LessonCatalog::standard();
        let blends = catalog.section(2).unwrap();
        assert_eq!(blends.lessons, vec![lesson(25), lesson(27)]);

        // primary section for the overlapping lessons is the first section
        assert_eq!(catalog.lesson(lesson(25)).unwrap().section_id, 1);
        assert_eq!(catalog.lesson(lesson(27)).unwrap().section_id, 1);
    }

    #[test]
    fn duplicate_lesson_is_rejected() {
        let make = |n: u8| Lesson {
            number: lesson(n),
            section_id: 1,
            is_review: false,
            name: format!("lesson {n}"),
        };
        let section = SkillSection {
            id: 1,
            name: "only".to_string(),
            lessons: vec![lesson(1)],
        };

        let err = LessonCatalog::new(vec![make(1), make(1)], vec![section]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateLesson { number: 1 });
    }

    #[test]
    fn section_citing_missing_lesson_is_rejected() {
        let lesson_one = Lesson {
            number: lesson(1),
            section_id: 1,
            is_review: false,
            name: "one".to_string(),
        };
        let section = SkillSection {
            id: 1,
            name: "bad".to_string(),
            lessons: vec![lesson(1), lesson(2)],
        };

        let err = LessonCatalog::new(vec![lesson_one], vec![section]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownSectionLesson {
                section_id: 1,
                number: 2
            }
        );
    }

    #[test]
    fn lesson_with_unlisted_section_is_rejected() {
        let lesson_one = Lesson {
            number: lesson(1),
            section_id: 9,
            is_review: false,
            name: "one".to_string(),
        };
        let section = SkillSection {
            id: 1,
            name: "only".to_string(),
            lessons: vec![lesson(1)],
        };

        let err = LessonCatalog::new(vec![lesson_one], vec![section]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownSection {
                number: 1,
                section_id: 9
            }
        );
    }

    #[test]
    fn missing_lesson_lookup_is_none() {
        let catalog = LessonCatalog::standard();
        assert!(catalog.lesson(lesson(128)).is_some());
        assert!(catalog.contains(lesson(1)));
    }
}
