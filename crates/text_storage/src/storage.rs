use std::convert::Infallible;
use std::fmt;
use std::ops::{AddAssign, Range};
use std::str::FromStr;

use piece_tree::{GraphemeResolver, PieceTree, PieceTreeConfig};
use tracing::debug;

use crate::error::IndexError;
use crate::line::Line;

/// Mutable text addressed by UTF-16 code unit, with 1-based lines.
#[derive(Debug, Default, Clone)]
pub struct TextStorage {
    tree: PieceTree,
}

impl TextStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(text: &str, config: PieceTreeConfig) -> Self {
        Self::from_tree(PieceTree::with_config(&encode(text), config))
    }

    pub(crate) fn from_tree(tree: PieceTree) -> Self {
        Self { tree }
    }

    /// Underlying piece tree, for code-unit level access.
    pub fn tree(&self) -> &PieceTree {
        &self.tree
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of lines; an empty storage has one.
    pub fn line_count(&self) -> usize {
        self.tree.line_count()
    }

    pub fn string(&self) -> String {
        String::from_utf16_lossy(&self.tree.text())
    }

    /// Insert `text` at code unit `position`.
    ///
    /// With `respect_composed_character` the text goes before the grapheme
    /// cluster that `position` falls in. Returns the range the text occupies;
    /// its end is where the code unit formerly at the insertion point moved.
    pub fn insert(
        &mut self,
        text: &str,
        position: usize,
        respect_composed_character: bool,
    ) -> Result<Range<usize>, IndexError> {
        self.check_position(position)?;
        let units = encode(text);
        let inserted = if respect_composed_character {
            self.tree.insert_with(&GraphemeResolver, position, &units)
        } else {
            self.tree.insert(position, &units)
        };
        Ok(inserted..inserted + units.len())
    }

    /// Append `text` at the end.
    pub fn append(&mut self, text: &str) {
        let end = self.len();
        self.tree.insert(end, &encode(text));
    }

    /// Delete `range`, widened to whole grapheme clusters. Returns the range removed.
    /// An empty range is returned as is, wherever it points.
    pub fn delete(&mut self, range: Range<usize>) -> Result<Range<usize>, IndexError> {
        if range.is_empty() {
            return Ok(range);
        }
        self.check_range(&range)?;
        Ok(self.tree.remove(range.start, range.len()))
    }

    /// Code unit at `position`.
    pub fn code_unit(&self, position: usize) -> Result<u16, IndexError> {
        self.check_index(position)?;
        Ok(self.tree.code_unit_at(position))
    }

    /// Grapheme cluster covering `position`, with its code unit range.
    pub fn character(&self, position: usize) -> Result<(String, Range<usize>), IndexError> {
        self.check_index(position)?;
        let (units, range) = self.tree.composed_sequence_at(position);
        Ok((String::from_utf16_lossy(&units), range))
    }

    /// Content of 1-based line `line_index`.
    pub fn line_content(&self, line_index: usize) -> Result<Line, IndexError> {
        self.check_line(line_index)?;
        Ok(Line::from_content(
            line_index,
            self.tree.line_content(line_index),
        ))
    }

    /// Content of the line holding code unit `position`.
    pub fn line_content_at(&self, position: usize) -> Result<Line, IndexError> {
        let line_index = self.line_index(position)?;
        self.line_content(line_index)
    }

    /// 1-based line holding code unit `position`; the end of the text maps to the last line.
    pub fn line_index(&self, position: usize) -> Result<usize, IndexError> {
        self.check_position(position)?;
        Ok(self.tree.line_index_at(position))
    }

    /// All lines in order.
    pub fn lines(&self) -> Vec<Line> {
        (1..=self.line_count())
            .map(|index| Line::from_content(index, self.tree.line_content(index)))
            .collect()
    }

    /// Visit every line that `range` touches, until `visit` returns `false`.
    /// An empty range visits nothing.
    pub fn enumerate_lines<F>(
        &self,
        range: Range<usize>,
        reverse: bool,
        mut visit: F,
    ) -> Result<(), IndexError>
    where
        F: FnMut(&Line) -> bool,
    {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let first = self.tree.line_index_at(range.start);
        let last = self.tree.line_index_at(range.end - 1);
        let mut each = |index: usize| {
            let line = Line::from_content(index, self.tree.line_content(index));
            visit(&line)
        };
        if reverse {
            for index in (first..=last).rev() {
                if !each(index) {
                    break;
                }
            }
        } else {
            for index in first..=last {
                if !each(index) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Visit the composed characters that intersect `range`, with their code
    /// unit ranges, until `visit` returns `false`.
    pub fn enumerate_characters<F>(
        &self,
        range: Range<usize>,
        mut visit: F,
    ) -> Result<(), IndexError>
    where
        F: FnMut(&str, Range<usize>) -> bool,
    {
        self.check_range(&range)?;
        self.tree.enumerate_composed_sequences(range, |units, cluster| {
            visit(&String::from_utf16_lossy(units), cluster)
        });
        Ok(())
    }

    /// Record the current text as an undo point.
    pub fn commit_state(&mut self) {
        self.tree.commit();
    }

    pub fn undo(&mut self) -> bool {
        self.tree.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.tree.redo()
    }

    fn check_index(&self, index: usize) -> Result<(), IndexError> {
        let len = self.len();
        if index >= len {
            return Err(rejected(IndexError::CodeUnitIndexOutOfRange { index, len }));
        }
        Ok(())
    }

    fn check_position(&self, index: usize) -> Result<(), IndexError> {
        let len = self.len();
        if index > len {
            return Err(rejected(IndexError::CodeUnitIndexOutOfRange { index, len }));
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), IndexError> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(rejected(IndexError::CodeUnitRangeOutOfRange {
                range: range.clone(),
                len,
            }));
        }
        Ok(())
    }

    fn check_line(&self, line: usize) -> Result<(), IndexError> {
        let line_count = self.line_count();
        if line < 1 || line > line_count {
            return Err(rejected(IndexError::LineIndexOutOfRange { line, line_count }));
        }
        Ok(())
    }
}

fn encode(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

fn rejected(error: IndexError) -> IndexError {
    debug!(%error, "rejected text storage call");
    error
}

impl FromStr for TextStorage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tree(PieceTree::new(&encode(s))))
    }
}

impl From<&str> for TextStorage {
    fn from(text: &str) -> Self {
        Self::from_tree(PieceTree::new(&encode(text)))
    }
}

impl AddAssign<&str> for TextStorage {
    fn add_assign(&mut self, text: &str) {
        self.append(text);
    }
}

impl fmt::Display for TextStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_tree::LineTerminator;
    use unicode_segmentation::UnicodeSegmentation;

    const TEST_STRINGS: &[&str] = &[
        "",
        "\n",
        "\r\n",
        "\n\n\n\r\n",
        "\r\n\n\n\n",
        "🌏Hello,World!\n🌏Hell♪o,W🐥orld!\n🌏Hello🐥,World!\n🌏Hello,World!\n",
        "🌏Hello,World!\n🌏Hello,Wo🐥rld²!\n🌏²Hello,W\rorld!\n🌏Hello,World!\r\n\r",
        "🌏🇺🇸AHello,Woاَلْعَرَبِيَّةُ\u{200e}rld!²\n🌏BHello,✔️World!你好🇺🇸²世🐥界\n🌏CHello,World!\n🌏Hello,World!",
        "🌏Hello,World!\r\n🌏Heاَلْعَرَبِيَّةُ\u{200e}llo,🇺🇸World!\n🌏Hello,Woᠮᠣᠩᠭᠣᠯ ᠪᠢᠴᠢᠭ\u{180c}rld!\r\n🌏Hello,World!🇺🇸",
    ];

    const INSERTIONS: &[&str] = &[
        "√", "A", "\r你", "你好\r", "🌏", "🇺🇸\n", "\nABC\r\n", "\n", "\r\n", "\r\n\r\n", "\n\n\n",
        "\n\n", "\n\r\n", "\r",
    ];

    fn storage(text: &str) -> TextStorage {
        text.parse().unwrap()
    }

    // Grapheme clusters of `text` as UTF-16 ranges.
    fn clusters(text: &str) -> Vec<(String, Range<usize>)> {
        let mut start = 0;
        text.graphemes(true)
            .map(|g| {
                let end = start + g.encode_utf16().count();
                let cluster = (g.to_string(), start..end);
                start = end;
                cluster
            })
            .collect()
    }

    // Lines split on `\n`, a `\r` right before the `\n` dropped.
    fn expected_lines(text: &str) -> Vec<String> {
        let parts: Vec<&str> = text.split('\n').collect();
        let last = parts.len() - 1;
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if i < last {
                    part.strip_suffix('\r').unwrap_or(part).to_string()
                } else {
                    part.to_string()
                }
            })
            .collect()
    }

    fn assert_line_breaks(storage: &TextStorage) {
        for line in storage.lines() {
            match line.terminator {
                LineTerminator::Crlf => {
                    assert_eq!(storage.code_unit(line.range.end), Ok(0x0D), "{line}");
                    assert_eq!(storage.code_unit(line.range.end + 1), Ok(0x0A), "{line}");
                }
                LineTerminator::Lf => {
                    assert_eq!(storage.code_unit(line.range.end), Ok(0x0A), "{line}");
                }
                LineTerminator::None => assert_eq!(line.range.end, storage.len()),
            }
        }
    }

    fn assert_line_contents(storage: &TextStorage) {
        let expected = expected_lines(&storage.string());
        let lines: Vec<String> = storage.lines().into_iter().map(|line| line.text).collect();
        assert_eq!(lines, expected);
        for (i, text) in expected.iter().enumerate() {
            assert_eq!(&storage.line_content(i + 1).unwrap().text, text);
        }
    }

    #[test]
    fn string_and_length() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            assert_eq!(storage.len(), text.encode_utf16().count());
            assert_eq!(storage.string(), *text);
            assert_eq!(storage.to_string(), *text);
        }
    }

    #[test]
    fn code_units_match_source() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            for (i, unit) in text.encode_utf16().enumerate() {
                assert_eq!(storage.code_unit(i), Ok(unit));
            }
        }
    }

    #[test]
    fn characters_cover_whole_clusters() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            for (cluster, range) in clusters(text) {
                for i in range.clone() {
                    assert_eq!(
                        storage.character(i),
                        Ok((cluster.clone(), range.clone())),
                        "{text:?} at {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn line_counts_and_contents() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            assert_eq!(storage.line_count(), storage.lines().len());
            assert_eq!(storage.line_count(), text.matches('\n').count() + 1);
            assert_line_contents(&storage);
            assert_line_breaks(&storage);
        }
    }

    #[test]
    fn line_ranges_hold_no_terminators() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            let units: Vec<u16> = text.encode_utf16().collect();
            for line in storage.lines() {
                for i in line.range.clone() {
                    assert_eq!(storage.code_unit(i), Ok(units[i]));
                    let (character, _) = storage.character(i).unwrap();
                    assert_ne!(character, "\r\n");
                    assert_ne!(character, "\n");
                }
            }
        }
    }

    #[test]
    fn ascii_insertions_return_inserted_range() {
        let content = "ABCDEFGHIJKLMNOPQRST";
        let mut storage = storage(content);
        let pairs = [
            (0, "1"),
            (2, "2"),
            (5, "3"),
            (0, "A"),
            (0, "A\n"),
            (2, "ABC\r\n"),
            (5, "ABC\r"),
            (content.len(), "A\r\nABCSD\n"),
            (0, "ABCDEFGHIJKLM\r\nNOPQRS\nTUVWXYZ\r\n"),
        ];
        for (at, text) in pairs {
            let len = text.encode_utf16().count();
            assert_eq!(storage.insert(text, at, true), Ok(at..at + len));
        }
    }

    #[test]
    fn insertions_land_on_cluster_starts() {
        for text in TEST_STRINGS {
            let len = text.encode_utf16().count();
            for insertion in INSERTIONS {
                let insertion_len = insertion.encode_utf16().count();
                for at in 0..=len {
                    let mut storage = storage(text);
                    for _ in 0..3 {
                        let expected_start = match storage.character(at) {
                            Ok((_, range)) => range.start,
                            Err(_) => at,
                        };
                        let inserted = storage.insert(insertion, at, true).unwrap();
                        assert_eq!(inserted, expected_start..expected_start + insertion_len);
                    }
                    storage.tree().check_invariants().unwrap();
                    assert_line_breaks(&storage);
                    assert_line_contents(&storage);
                }
            }
        }
    }

    #[test]
    fn deletions_widen_to_cluster_edges() {
        for text in TEST_STRINGS {
            let len = text.encode_utf16().count();
            for i in 0..len {
                for j in i + 1..=len {
                    let mut storage = storage(text);
                    let first = storage.character(i).unwrap().1;
                    let last = storage.character(j - 1).unwrap().1;
                    let removed = storage.delete(i..j).unwrap();
                    assert_eq!(removed, first.start..last.end, "{text:?} {i}..{j}");

                    let mut expected: Vec<u16> = text.encode_utf16().collect();
                    expected.drain(removed);
                    assert_eq!(storage.tree().text(), expected);
                }
            }
        }
    }

    #[test]
    fn zero_length_delete_is_accepted() {
        let mut storage = storage("abc");
        assert_eq!(storage.delete(1..1), Ok(1..1));
        assert_eq!(storage.delete(5..5), Ok(5..5));
        assert_eq!(storage.string(), "abc");
    }

    #[test]
    fn out_of_range_arguments_are_rejected() {
        let mut storage = storage("ab\ncd");
        assert_eq!(
            storage.code_unit(5),
            Err(IndexError::CodeUnitIndexOutOfRange { index: 5, len: 5 })
        );
        assert!(storage.character(9).is_err());
        assert_eq!(
            storage.insert("x", 6, false),
            Err(IndexError::CodeUnitIndexOutOfRange { index: 6, len: 5 })
        );
        assert_eq!(
            storage.delete(3..7),
            Err(IndexError::CodeUnitRangeOutOfRange { range: 3..7, len: 5 })
        );
        assert_eq!(
            storage.line_content(0),
            Err(IndexError::LineIndexOutOfRange { line: 0, line_count: 2 })
        );
        assert_eq!(
            storage.line_content(3),
            Err(IndexError::LineIndexOutOfRange { line: 3, line_count: 2 })
        );
        assert_eq!(
            storage.enumerate_lines(4..6, false, |_| true),
            Err(IndexError::CodeUnitRangeOutOfRange { range: 4..6, len: 5 })
        );
        assert_eq!(
            storage.enumerate_characters(2..9, |_, _| true),
            Err(IndexError::CodeUnitRangeOutOfRange { range: 2..9, len: 5 })
        );
        assert_eq!(storage.string(), "ab\ncd");
        assert_eq!(
            IndexError::CodeUnitIndexOutOfRange { index: 5, len: 5 }.to_string(),
            "code unit index 5 is out of bounds for length 5"
        );
    }

    #[test]
    fn mixed_line_breaks() {
        let mut storage = storage("a\r\nb\nc");
        assert_eq!(storage.len(), 6);
        assert_eq!(storage.line_count(), 3);
        let first = storage.line_content(1).unwrap();
        assert_eq!(first.text, "a");
        assert_eq!(first.terminator, LineTerminator::Crlf);
        assert_eq!(first.range, 0..1);
        assert_eq!(storage.line_index(4), Ok(2));
        assert_eq!(storage.line_content_at(6).unwrap().text, "c");

        assert_eq!(storage.insert("\n", 2, false), Ok(1..2));
        assert_eq!(storage.line_count(), 4);
        assert_eq!(storage.string(), "a\n\r\nb\nc");
    }

    #[test]
    fn enumerate_lines_both_ways() {
        // Lines start at 0, 4, 9 and 15.
        let storage = storage("one\ntwo\r\nthree\nfour");
        let mut seen = Vec::new();
        storage
            .enumerate_lines(5..storage.len(), false, |line| {
                seen.push(line.text.clone());
                true
            })
            .unwrap();
        assert_eq!(seen, ["two", "three", "four"]);

        let mut seen = Vec::new();
        storage
            .enumerate_lines(0..storage.len(), true, |line| {
                seen.push(line.index);
                line.index > 3
            })
            .unwrap();
        assert_eq!(seen, [4, 3]);

        // The last unit of the range decides the last line.
        let mut seen = Vec::new();
        storage
            .enumerate_lines(3..9, false, |line| {
                seen.push(line.index);
                true
            })
            .unwrap();
        assert_eq!(seen, [1, 2]);

        storage
            .enumerate_lines(4..4, false, |_| panic!("empty range visits nothing"))
            .unwrap();
    }

    #[test]
    fn enumerate_characters_matches_clusters() {
        for text in TEST_STRINGS {
            let storage = storage(text);
            let mut seen = Vec::new();
            storage
                .enumerate_characters(0..storage.len(), |character, range| {
                    seen.push((character.to_string(), range));
                    true
                })
                .unwrap();
            assert_eq!(seen, clusters(text), "{text:?}");
        }

        let storage = storage("a🇺🇸b");
        let mut seen = Vec::new();
        storage
            .enumerate_characters(2..4, |character, range| {
                seen.push((character.to_string(), range));
                false
            })
            .unwrap();
        assert_eq!(seen, [("🇺🇸".to_string(), 1..5)]);
    }

    #[test]
    fn add_assign_appends() {
        let mut storage = storage("line\r");
        storage += "\nnext";
        storage += "";
        assert_eq!(storage.string(), "line\r\nnext");
        assert_eq!(storage.line_content(1).unwrap().terminator, LineTerminator::Crlf);
    }

    #[test]
    fn copies_are_independent() {
        let mut original = storage("shared text");
        let mut copy = original.clone();
        original.delete(0..7).unwrap();
        copy.insert("more ", 7, false).unwrap();
        assert_eq!(original.string(), "text");
        assert_eq!(copy.string(), "shared more text");
        copy.tree().check_invariants().unwrap();
    }

    #[test]
    fn append_and_undo() {
        let mut storage = TextStorage::new();
        assert!(storage.is_empty());
        assert!(!storage.undo());

        storage.commit_state();
        storage.append("hello\r");
        storage.append("\nworld");
        assert_eq!(storage.line_count(), 2);
        assert_eq!(storage.line_content(1).unwrap().terminator, LineTerminator::Crlf);

        assert!(storage.undo());
        assert_eq!(storage.string(), "");
        assert!(storage.redo());
        assert_eq!(storage.string(), "hello\r\nworld");
        assert!(!storage.redo());
    }
}
