//! crates/pintarai_core/src/constants.rs
//!
//! Static curriculum tables: the selectable class levels, the subjects
//! available per level group, the icon names the prompt generator may use,
//! and the default example prompts served when generation fails.

use crate::domain::ExamplePrompt;

pub const CLASS_LEVELS: &[&str] = &[
    "SD Kelas 1",
    "SD Kelas 2",
    "SD Kelas 3",
    "SD Kelas 4",
    "SD Kelas 5",
    "SD Kelas 6",
    "SMP Kelas 7",
    "SMP Kelas 8",
    "SMP Kelas 9",
    "SMA Kelas 10",
    "SMA Kelas 11",
    "SMA Kelas 12",
];

const SD_SUBJECTS: &[&str] = &[
    "Matematika",
    "IPA (Sains)",
    "IPS (Sejarah, Geografi)",
    "Bahasa Indonesia",
    "Bahasa Inggris",
    "Pendidikan Pancasila (PPKn)",
    "Lainnya",
];

const SMP_SUBJECTS: &[&str] = &[
    "Matematika",
    "IPA Terpadu (Fisika, Biologi)",
    "IPS Terpadu (Sejarah, Geografi, Ekonomi)",
    "Bahasa Indonesia",
    "Bahasa Inggris",
    "Pendidikan Pancasila (PPKn)",
    "Informatika",
    "Seni Budaya",
    "Lainnya",
];

const SMA_SUBJECTS: &[&str] = &[
    "Matematika (Wajib)",
    "Matematika (Peminatan)",
    "Fisika",
    "Kimia",
    "Biologi",
    "Geografi",
    "Sejarah",
    "Sosiologi",
    "Ekonomi",
    "Bahasa Indonesia",
    "Bahasa Inggris",
    "Informatika",
    "Lainnya",
];

/// Icon names the prompt generator is allowed to pick from.
pub const ICONS: &[&str] = &["Book", "FlaskConical", "History", "Landmark", "Sparkles"];

/// The subjects offered for a class level, keyed by its level group
/// (`"SD Kelas 3"` -> the SD table). `None` for an unknown level.
pub fn subjects_for_level(class_level: &str) -> Option<&'static [&'static str]> {
    match class_level.split(' ').next() {
        Some("SD") => Some(SD_SUBJECTS),
        Some("SMP") => Some(SMP_SUBJECTS),
        Some("SMA") => Some(SMA_SUBJECTS),
        _ => None,
    }
}

pub fn is_valid_class_level(class_level: &str) -> bool {
    CLASS_LEVELS.contains(&class_level)
}

pub fn is_valid_subject(class_level: &str, subject: &str) -> bool {
    subjects_for_level(class_level)
        .map(|subjects| subjects.contains(&subject))
        .unwrap_or(false)
}

pub fn is_known_icon(icon: &str) -> bool {
    ICONS.contains(&icon)
}

/// Static fallback prompts, shown when the generator is unavailable or
/// exhausts its retries.
pub fn default_example_prompts() -> Vec<ExamplePrompt> {
    [
        (
            "Book",
            "Buatkan soal esai",
            "Buatkan soal esai tentang sejarah proklamasi kemerdekaan Indonesia.",
        ),
        (
            "FlaskConical",
            "Jelaskan konsep sulit",
            "Jelaskan konsep relativitas dengan bahasa yang mudah dipahami.",
        ),
        (
            "Landmark",
            "Beri ide proyek",
            "Beri saya 3 ide proyek tentang keragaman budaya di Indonesia.",
        ),
        (
            "History",
            "Buat ringkasan",
            "Ringkas bab 5 buku paket Sejarah tentang pendudukan Jepang.",
        ),
    ]
    .into_iter()
    .map(|(icon, title, prompt)| ExamplePrompt {
        icon: icon.to_string(),
        title: title.to_string(),
        prompt: prompt.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_level_has_a_subject_table() {
        for level in CLASS_LEVELS {
            assert!(subjects_for_level(level).is_some(), "no subjects for {level}");
        }
    }

    #[test]
    fn subject_validation_is_scoped_to_the_level_group() {
        assert!(is_valid_subject("SMA Kelas 10", "Fisika"));
        assert!(!is_valid_subject("SD Kelas 3", "Fisika"));
        assert!(is_valid_subject("SD Kelas 3", "IPA (Sains)"));
        assert!(!is_valid_subject("Universitas", "Fisika"));
    }

    #[test]
    fn unknown_class_level_is_rejected() {
        assert!(is_valid_class_level("SMA Kelas 12"));
        assert!(!is_valid_class_level("SMA Kelas 13"));
        assert!(!is_valid_class_level(""));
    }

    #[test]
    fn default_prompts_use_known_icons() {
        let prompts = default_example_prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts.iter().all(|p| is_known_icon(&p.icon)));
    }
}
