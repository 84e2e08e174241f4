//! Presentation orderings: latest first, by category, and by performer with an
//! alphabet index. Every sort here is stable, so ties keep table order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::record::{Row, Table};

/// Label of the alphabet-index bucket for names without a Latin initial.
pub const CATCH_ALL_LABEL: &str = "#";

/// Category buckets in display order; anything else lands in `Other`.
pub const CATEGORY_BUCKETS: [&str; 5] = ["W", "T", "F", "Q", "V"];
pub const OTHER_BUCKET: &str = "Other";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Latest,
    ByCategory,
    ByPerformer,
}

/// A titled group of rows with a jump-target anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub label: String,
    pub anchor: String,
    pub rows: Vec<Row>,
}

/// Converts a performer name into a phonetic romanization used only for ordering.
pub trait Transliterator: Send + Sync {
    fn romanize(&self, name: &str) -> String;
}

/// Sort key for performer ordering. Latin-initial names rank before every
/// transliterated name regardless of spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    script: u8,
    text: String,
}

impl SortKey {
    pub fn for_name(name: &str, transliterator: &dyn Transliterator) -> Self {
        let name = name.trim();
        if name.chars().next().is_some_and(is_latin_letter) {
            Self {
                script: 0,
                text: fold(name),
            }
        } else {
            Self {
                script: 1,
                text: fold(&transliterator.romanize(name)),
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Uppercase initial for the alphabet index, or [`CATCH_ALL_LABEL`].
    pub fn index_label(&self) -> String {
        match self.text.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase().to_string(),
            _ => CATCH_ALL_LABEL.to_string(),
        }
    }
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || (('\u{00C0}'..='\u{024F}').contains(&c) && c.is_alphabetic())
}

/// Lowercase with accents dropped, so "Élodie" orders and indexes under "e".
fn fold(text: &str) -> String {
    text.to_lowercase().chars().map(base_letter).collect()
}

#[rustfmt::skip]
fn base_letter(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Arrange a (usually filtered) table for display.
pub fn arrange(table: &Table, mode: ViewMode, transliterator: &dyn Transliterator) -> Vec<Section> {
    match mode {
        ViewMode::Latest => vec![Section {
            label: "Latest".to_string(),
            anchor: "latest".to_string(),
            rows: latest(table),
        }],
        ViewMode::ByCategory => by_category(table),
        ViewMode::ByPerformer => alphabet_index(table, transliterator),
    }
}

/// Reverse table order; appends land at the end, so this is newest first.
pub fn latest(table: &Table) -> Vec<Row> {
    table.rows().iter().rev().cloned().collect()
}

/// One section per bucket in [`CATEGORY_BUCKETS`] order plus `Other`, each
/// sorted by performer. Empty buckets are kept so every anchor exists.
pub fn by_category(table: &Table) -> Vec<Section> {
    let mut buckets: Vec<Vec<Row>> = vec![Vec::new(); CATEGORY_BUCKETS.len() + 1];
    for row in table.rows() {
        let slot = CATEGORY_BUCKETS
            .iter()
            .position(|code| *code == row.record.category.trim())
            .unwrap_or(CATEGORY_BUCKETS.len());
        buckets[slot].push(row.clone());
    }

    CATEGORY_BUCKETS
        .iter()
        .copied()
        .chain(std::iter::once(OTHER_BUCKET))
        .zip(buckets)
        .map(|(label, mut rows)| {
            rows.sort_by(|a, b| a.record.performer.cmp(&b.record.performer));
            Section {
                label: label.to_string(),
                anchor: label.to_lowercase(),
                rows,
            }
        })
        .collect()
}

fn keyed_by_performer(table: &Table, transliterator: &dyn Transliterator) -> Vec<(SortKey, Row)> {
    let mut keyed: Vec<(SortKey, Row)> = table
        .rows()
        .iter()
        .map(|row| {
            (
                SortKey::for_name(&row.record.performer, transliterator),
                row.clone(),
            )
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed
}

/// Rows ordered by [`SortKey`].
pub fn by_performer(table: &Table, transliterator: &dyn Transliterator) -> Vec<Row> {
    keyed_by_performer(table, transliterator)
        .into_iter()
        .map(|(_, row)| row)
        .collect()
}

/// Performer order grouped by romanized initial; letters ascending, catch-all last.
pub fn alphabet_index(table: &Table, transliterator: &dyn Transliterator) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for (key, row) in keyed_by_performer(table, transliterator) {
        let label = key.index_label();
        match sections.iter_mut().find(|s| s.label == label) {
            Some(section) => section.rows.push(row),
            None => sections.push(Section {
                anchor: index_anchor(&label),
                label,
                rows: vec![row],
            }),
        }
    }
    sections.sort_by(|a, b| match (a.label == CATCH_ALL_LABEL, b.label == CATCH_ALL_LABEL) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.label.cmp(&b.label),
    });
    sections
}

fn index_anchor(label: &str) -> String {
    if label == CATCH_ALL_LABEL {
        "index-other".to_string()
    } else {
        format!("index-{}", label.to_lowercase())
    }
}

/// Dictionary romanization of kanji and kana through kakasi. Names it cannot
/// turn into a Latin initial go through [`KanaTransliterator`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct KakasiTransliterator;

impl Transliterator for KakasiTransliterator {
    fn romanize(&self, name: &str) -> String {
        let romaji = kakasi::convert(name).romaji;
        if romaji.trim_start().starts_with(|c: char| c.is_ascii_alphabetic()) {
            romaji.trim().to_string()
        } else {
            KanaTransliterator.romanize(name)
        }
    }
}

/// Hepburn-style romanization of hiragana and katakana. Other characters,
/// including kanji, pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KanaTransliterator;

impl Transliterator for KanaTransliterator {
    fn romanize(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() * 2);
        let mut geminate = false;

        for c in name.chars().map(katakana_to_hiragana) {
            match c {
                'っ' => geminate = true,
                'ー' => {
                    if let Some(vowel) = out.chars().last().filter(|v| "aeiou".contains(*v)) {
                        out.push(vowel);
                    }
                }
                'ゃ' | 'ゅ' | 'ょ' => {
                    let glide = match c {
                        'ゃ' => 'a',
                        'ゅ' => 'u',
                        _ => 'o',
                    };
                    if out.ends_with("shi") || out.ends_with("chi") || out.ends_with("ji") {
                        out.pop();
                        out.push(glide);
                    } else if out.ends_with('i') && out.len() > 1 {
                        out.pop();
                        out.push('y');
                        out.push(glide);
                    } else {
                        out.push('y');
                        out.push(glide);
                    }
                }
                'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' => {
                    let vowel = small_vowel(c);
                    if out.chars().last().is_some_and(|v| "aeiou".contains(v)) {
                        out.pop();
                    }
                    out.push(vowel);
                }
                _ => match kana_romaji(c) {
                    Some(romaji) => {
                        if geminate {
                            if romaji.starts_with("ch") {
                                out.push('t');
                            } else if let Some(first) =
                                romaji.chars().next().filter(|f| !"aeiou".contains(*f))
                            {
                                out.push(first);
                            }
                        }
                        out.push_str(romaji);
                    }
                    None => out.push(c),
                },
            }
            if c != 'っ' {
                geminate = false;
            }
        }
        out
    }
}

fn katakana_to_hiragana(c: char) -> char {
    match c {
        '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        _ => c,
    }
}

fn small_vowel(c: char) -> char {
    match c {
        'ぁ' => 'a',
        'ぃ' => 'i',
        'ぅ' => 'u',
        'ぇ' => 'e',
        _ => 'o',
    }
}

#[rustfmt::skip]
fn kana_romaji(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' => "a", 'い' => "i", 'う' => "u", 'え' => "e", 'お' => "o",
        'か' => "ka", 'き' => "ki", 'く' => "ku", 'け' => "ke", 'こ' => "ko",
        'が' => "ga", 'ぎ' => "gi", 'ぐ' => "gu", 'げ' => "ge", 'ご' => "go",
        'さ' => "sa", 'し' => "shi", 'す' => "su", 'せ' => "se", 'そ' => "so",
        'ざ' => "za", 'じ' => "ji", 'ず' => "zu", 'ぜ' => "ze", 'ぞ' => "zo",
        'た' => "ta", 'ち' => "chi", 'つ' => "tsu", 'て' => "te", 'と' => "to",
        'だ' => "da", 'ぢ' => "ji", 'づ' => "zu", 'で' => "de", 'ど' => "do",
        'な' => "na", 'に' => "ni", 'ぬ' => "nu", 'ね' => "ne", 'の' => "no",
        'は' => "ha", 'ひ' => "hi", 'ふ' => "fu", 'へ' => "he", 'ほ' => "ho",
        'ば' => "ba", 'び' => "bi", 'ぶ' => "bu", 'べ' => "be", 'ぼ' => "bo",
        'ぱ' => "pa", 'ぴ' => "pi", 'ぷ' => "pu", 'ぺ' => "pe", 'ぽ' => "po",
        'ま' => "ma", 'み' => "mi", 'む' => "mu", 'め' => "me", 'も' => "mo",
        'や' => "ya", 'ゆ' => "yu", 'よ' => "yo",
        'ら' => "ra", 'り' => "ri", 'る' => "ru", 'れ' => "re", 'ろ' => "ro",
        'わ' => "wa", 'ゐ' => "i", 'ゑ' => "e", 'を' => "o", 'ん' => "n",
        'ゔ' => "vu", 'ゎ' => "wa",
        _ => return None,
    };
    Some(romaji)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::{Record, DEFAULT_PLATFORM};

    /// Maps a few fixed names, standing in for a dictionary-backed romanizer.
    struct FixedTransliterator;

    impl Transliterator for FixedTransliterator {
        fn romanize(&self, name: &str) -> String {
            match name {
                "山田" => "yamada".to_string(),
                "佐藤" => "sato".to_string(),
                other => other.to_string(),
            }
        }
    }

    fn record(performer: &str, category: &str) -> Record {
        Record {
            performer: performer.to_string(),
            category: category.to_string(),
            image_url: String::new(),
            video_url: format!("https://youtu.be/{performer}"),
            memo: String::new(),
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.record.performer.as_str()).collect()
    }

    #[test]
    fn test_latest_reverses_table_order() {
        let table = Table::from_records(vec![record("A", "W"), record("B", "T"), record("C", "F")]);
        assert_eq!(names(&latest(&table)), ["C", "B", "A"]);
    }

    #[test]
    fn test_by_category_partitions_exactly() {
        let table = Table::from_records(vec![
            record("Zed", "W"),
            record("Amy", "S"),
            record("Bob", "W"),
            record("Cat", "V"),
            record("Dan", ""),
            record("Eve", "Q"),
        ]);
        let sections = by_category(&table);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["W", "T", "F", "Q", "V", "Other"]);
        assert_eq!(names(&sections[0].rows), ["Bob", "Zed"]);
        assert!(sections[1].rows.is_empty());
        assert_eq!(names(&sections[5].rows), ["Amy", "Dan"]);
        assert_eq!(sections[5].anchor, "other");

        let total: usize = sections.iter().map(|s| s.rows.len()).sum();
        assert_eq!(total, table.len());
    }

    #[test]
    fn test_latin_names_sort_before_transliterated() {
        let table = Table::from_records(vec![
            record("山田", "W"),
            record("bob", "W"),
            record("Alice", "W"),
            record("佐藤", "W"),
        ]);
        let sorted = by_performer(&table, &FixedTransliterator);
        assert_eq!(names(&sorted), ["Alice", "bob", "佐藤", "山田"]);
    }

    #[test]
    fn test_performer_sort_is_stable_and_idempotent() {
        let table = Table::from_records(vec![
            record("Bob", "W"),
            record("alice", "T"),
            record("Bob", "F"),
            record("Alice", "Q"),
        ]);
        let once = by_performer(&table, &KanaTransliterator);
        let categories: Vec<&str> = once.iter().map(|r| r.record.category.as_str()).collect();
        assert_eq!(categories, ["T", "Q", "W", "F"]);

        let twice = by_performer(&Table::from_rows(once.clone()), &KanaTransliterator);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_alphabet_index_catch_all_last() {
        let table = Table::from_records(vec![
            record("山田", "W"),
            record("Carl", "W"),
            record("漢字", "W"),
            record("Anna", "W"),
            record("123 Crew", "W"),
        ]);
        let sections = alphabet_index(&table, &FixedTransliterator);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["A", "C", "Y", "#"]);
        assert_eq!(names(&sections[3].rows), ["123 Crew", "漢字"]);
        assert_eq!(sections[2].anchor, "index-y");
        assert_eq!(sections[3].anchor, "index-other");
    }

    #[test]
    fn test_kana_romanization() {
        let t = KanaTransliterator;
        assert_eq!(t.romanize("さとう"), "satou");
        assert_eq!(t.romanize("キョウコ"), "kyouko");
        assert_eq!(t.romanize("しょうた"), "shouta");
        assert_eq!(t.romanize("まっちゃ"), "matcha");
        assert_eq!(t.romanize("がっこう"), "gakkou");
        assert_eq!(t.romanize("ダンサー"), "dansaa");
        assert_eq!(t.romanize("ファン"), "fan");
        assert_eq!(t.romanize("山田"), "山田");
    }

    #[test]
    fn test_kanji_names_index_under_romaji_initial() {
        let t = KakasiTransliterator;
        assert_eq!(SortKey::for_name("山田", &t).index_label(), "Y");
        assert_eq!(SortKey::for_name("佐藤", &t).index_label(), "S");
        assert_eq!(SortKey::for_name("さくら", &t).index_label(), "S");

        let table = Table::from_records(vec![
            record("山田", "W"),
            record("Bob", "W"),
            record("佐藤", "W"),
            record("123 Crew", "W"),
        ]);
        let sections = alphabet_index(&table, &t);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B", "S", "Y", "#"]);
        assert_eq!(names(&sections[2].rows), ["山田"]);
    }

    #[test]
    fn test_accented_initial_folds_to_base_letter() {
        let key = SortKey::for_name("Élodie", &KanaTransliterator);
        assert_eq!(key.text(), "elodie");
        assert_eq!(key.index_label(), "E");

        let table = Table::from_records(vec![
            record("Zoe", "W"),
            record("Élodie", "W"),
            record("Emma", "W"),
            record("Dan", "W"),
        ]);
        let sections = alphabet_index(&table, &KanaTransliterator);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["D", "E", "Z"]);
        assert_eq!(names(&sections[1].rows), ["Élodie", "Emma"]);
    }

    #[test]
    fn test_kana_names_index_under_romaji_initial() {
        let table = Table::from_records(vec![record("さくら", "W"), record("Bob", "W")]);
        let sections = arrange(&table, ViewMode::ByPerformer, &KanaTransliterator);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B", "S"]);
    }
}
