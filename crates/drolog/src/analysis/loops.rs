//! Loop-point heuristics.
//!
//! Five independent read-only analyses over a song's decoded
//! instructions, each suggesting where a looping tune repeats so a
//! trim point can be chosen by hand. All of them compare decoded
//! [`Instruction`] values structurally and none of them fails on
//! degenerate input; an empty stream simply reports no match.

use std::fmt;

use crate::dro::{Instruction, Song};

/// A region of interest within the instruction stream.
///
/// `start`/`end` are inclusive logical indices; both are `None` while a
/// region is still being grown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub length: usize,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(v: Option<usize>) -> String {
            match v {
                Some(v) => v.to_string(),
                None => "None".to_string(),
            }
        }
        write!(
            f,
            "Match(start={}, end={}, length={})",
            opt(self.start),
            opt(self.end),
            self.length
        )
    }
}

/// The outcome of one heuristic.
///
/// `sections` carries the structured loop pair (earlier section,
/// end-of-stream counterpart) for the heuristics that produce one; the
/// block and sequence analyses report through `text` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub title: &'static str,
    pub text: String,
    pub sections: Option<(Region, Region)>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.title, self.text)
    }
}

/// Runs all five loop heuristics over a song.
#[derive(Debug, Default)]
pub struct LoopAnalyzer;

impl LoopAnalyzer {
    pub fn new() -> Self {
        LoopAnalyzer
    }

    /// Number of heuristics `analyze` runs.
    pub fn num_analyses(&self) -> usize {
        5
    }

    /// Run every heuristic and return their reports in a fixed order.
    pub fn analyze(&self, song: &Song) -> [AnalysisReport; 5] {
        let data: Vec<Instruction> = song.stream.iter().collect();
        [
            earliest_end_match(&data),
            earliest_end_delay_and_note_match(&data),
            latest_start_match(&data),
            longest_instruction_blocks(&data),
            halved_sequence_match(&data),
        ]
    }
}

/// Backward mirror search shared by the first two heuristics.
///
/// Walks from the second-to-last element toward the front, growing a
/// match while the current element equals the element at a mirror
/// cursor counting down from the end. A match closes on the first
/// mismatch or on reaching index 0; the longest closed match wins, with
/// ties going to the smaller start index. `original_indexes` maps
/// filtered positions back to stream indices for reporting.
fn backward_search(
    data: &[Instruction],
    original_indexes: &[usize],
) -> (String, Option<(Region, Region)>) {
    let mut curr: Option<Region> = None;
    let mut end_match = Region::default();
    let mut longest = Region::default();
    let mut match_ended = false;

    if !data.is_empty() {
        let end_index = data.len() - 1;
        let mut later_index = end_index;
        for i in (0..end_index).rev() {
            if data[i] == data[later_index] {
                if later_index == end_index {
                    curr = Some(Region {
                        start: Some(i),
                        end: Some(i),
                        length: 0,
                    });
                }
                if let Some(m) = curr.as_mut() {
                    m.length += 1;
                    m.start = Some(i);
                }
                if i == 0 {
                    match_ended = true;
                }
            } else if curr.is_some() {
                match_ended = true;
            }

            if match_ended {
                if let Some(m) = curr.take() {
                    if m.length > longest.length
                        || (m.length == longest.length && m.start < longest.start)
                    {
                        longest = m;
                        // The mirror cursor moved once per matched
                        // element, so the tail region spans exactly
                        // m.length elements ending at end_index.
                        end_match = Region {
                            start: Some(end_index + 1 - m.length),
                            end: Some(end_index),
                            length: m.length,
                        };
                    }
                }
                later_index = end_index;
                match_ended = false;
            }

            if curr.is_some() {
                later_index -= 1;
            }
        }
    }

    let mut text = String::from("My conclusions:\n");
    match (longest.start, longest.end, end_match.start, end_match.end) {
        (Some(ls), Some(le), Some(es), Some(ee)) if longest.length > 0 => {
            let longest = Region {
                start: Some(original_indexes[ls]),
                end: Some(original_indexes[le]),
                length: original_indexes[le] - original_indexes[ls] + 1,
            };
            let end_match = Region {
                start: Some(original_indexes[es]),
                end: Some(original_indexes[ee]),
                length: original_indexes[ee] - original_indexes[es] + 1,
            };
            text.push_str(&format!(
                "Loop section 1: start={}, end={}, length={}.\n",
                original_indexes[ls], original_indexes[le], longest.length
            ));
            text.push_str(&format!(
                "Loop section 2: start={}, end={}, length={}.\n",
                original_indexes[es], original_indexes[ee], end_match.length
            ));
            (text, Some((longest, end_match)))
        }
        _ => {
            text.push_str("No match found. I'm sorry.\n");
            (text, None)
        }
    }
}

/// Earliest sequence matching the tail of the song.
fn earliest_end_match(data: &[Instruction]) -> AnalysisReport {
    let original_indexes: Vec<usize> = (0..data.len()).collect();
    let (text, sections) = backward_search(data, &original_indexes);
    AnalysisReport {
        title: "Earliest match to end",
        text,
        sections,
    }
}

/// Same backward search, restricted to delays of at least 2 ms and
/// key-on/off register writes. Looped passages often differ in minor
/// register data while the rhythm matches exactly.
fn earliest_end_delay_and_note_match(data: &[Instruction]) -> AnalysisReport {
    let mut filtered = Vec::new();
    let mut original_indexes = Vec::new();
    for (i, inst) in data.iter().enumerate() {
        let keep = match inst {
            Instruction::Delay { milliseconds } => *milliseconds >= 2,
            _ => inst.is_key_on_off(),
        };
        if keep {
            filtered.push(*inst);
            original_indexes.push(i);
        }
    }
    let (text, sections) = backward_search(&filtered, &original_indexes);
    AnalysisReport {
        title: "Earliest match to end (delays and note on/off only)",
        text,
        sections,
    }
}

/// Latest sequence matching the head of the song, anchored at the
/// first delay after the first key-on/off write.
fn latest_start_match(data: &[Instruction]) -> AnalysisReport {
    let title = "Latest match to start";

    let mut note_on_found = false;
    let mut start_pos = 0;
    for (i, inst) in data.iter().enumerate() {
        match inst {
            Instruction::Delay { .. } => {
                if note_on_found {
                    start_pos = i;
                    break;
                }
            }
            Instruction::BankSwitch { .. } => {}
            Instruction::Register { .. } => {
                if inst.is_key_on_off() {
                    note_on_found = true;
                }
            }
        }
    }
    if start_pos == 0 {
        return AnalysisReport {
            title,
            text: "Forward search couldn't find a place to start.\n".to_string(),
            sections: None,
        };
    }

    // Mirror of the backward search, growing matches forward; ties go
    // to the larger start index.
    let mut early_index = start_pos;
    let mut curr: Option<Region> = None;
    let mut longest = Region::default();
    let mut start_match = Region::default();
    let mut match_ended = false;
    for i in (start_pos + 1)..data.len() {
        if data[early_index] == data[i] {
            if early_index == start_pos {
                curr = Some(Region {
                    start: Some(i),
                    end: Some(i),
                    length: 0,
                });
            }
            if let Some(m) = curr.as_mut() {
                m.length += 1;
                m.end = Some(i);
            }
            if i == data.len() - 1 {
                match_ended = true;
            }
        } else if curr.is_some() {
            match_ended = true;
        }

        if match_ended {
            if let Some(m) = curr.take() {
                if m.length > longest.length
                    || (m.length == longest.length && m.start > longest.start)
                {
                    longest = m;
                    start_match = Region {
                        start: Some(start_pos),
                        end: Some(early_index - 1),
                        length: m.length,
                    };
                }
            }
            early_index = start_pos;
            match_ended = false;
        }

        if curr.is_some() {
            early_index += 1;
        }
    }

    let mut text = String::from("My conclusions:\n");
    if longest.start.is_none() || longest.end.is_none() || longest.length == 0 {
        text.push_str("No match found. I'm sorry.\n");
        return AnalysisReport {
            title,
            text,
            sections: None,
        };
    }
    text.push_str(&format!(
        "Loop section 1: start={}, end={}, length={}.\n",
        start_match.start.unwrap_or(0),
        start_match.end.unwrap_or(0),
        start_match.length
    ));
    text.push_str(&format!(
        "Loop section 2: start={}, end={}, length={}.\n",
        longest.start.unwrap_or(0),
        longest.end.unwrap_or(0),
        longest.length
    ));
    AnalysisReport {
        title,
        text,
        sections: Some((start_match, longest)),
    }
}

/// The longest runs of consecutive non-delay instructions.
///
/// Runs of at least 10 instructions bounded by delays or stream edges.
/// When the longest run starts at index 0 it is the register-init
/// block and gets skipped. The survivors are reported twice, by size
/// and then by position.
fn longest_instruction_blocks(data: &[Instruction]) -> AnalysisReport {
    const NOTABLE_THRESHOLD: usize = 10;

    let mut sections: Vec<Region> = Vec::new();
    let mut curr = Region::default();
    for (i, inst) in data.iter().enumerate() {
        if !inst.is_delay() {
            if curr.start.is_none() {
                curr.start = Some(i);
            }
            curr.length += 1;
        } else {
            curr.end = Some(i.saturating_sub(1));
            if curr.length >= NOTABLE_THRESHOLD {
                sections.push(curr);
            }
            curr = Region::default();
        }
    }
    if curr.start.is_some() && curr.end.is_none() {
        curr.end = Some(data.len() - 1);
        if curr.length >= NOTABLE_THRESHOLD {
            sections.push(curr);
        }
    }

    sections.sort_by(|a, b| b.length.cmp(&a.length));
    let num_to_display = sections.len().min(15);
    let mut interesting: Vec<Region> = if sections.len() > 1 && sections[0].start == Some(0) {
        // The run at index 0 is initialization, not music.
        sections[1..(num_to_display + 1).min(sections.len())].to_vec()
    } else {
        sections[0..num_to_display].to_vec()
    };

    let by_size = interesting
        .iter()
        .map(Region::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    interesting.sort_by(|a, b| b.start.cmp(&a.start));
    let by_position = interesting
        .iter()
        .map(Region::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    AnalysisReport {
        title: "Longest instruction blocks",
        text: format!(
            "Interesting sections (by size):\n{}\n\nInteresting sections (by position):\n{}",
            by_size, by_position
        ),
        sections: None,
    }
}

/// Longest contiguous block common to the two halves of the song.
///
/// A long match across the halves is a strong sign the song loops and
/// roughly where. The matched block starting with a key-on/off gets a
/// caveat: every loop iteration carries the note-off that the very
/// first pass lacks, so an earlier block may be the better trim point.
fn halved_sequence_match(data: &[Instruction]) -> AnalysisReport {
    let half = data.len() / 2;
    let (first, second) = data.split_at(half);
    let (best_i, best_j, best_len) = longest_common_block(first, second);

    let mut text = format!(
        "Result of analysis:\n longest block = {},\n start first half = {},\n start second half = {}\n",
        best_len,
        best_i,
        best_j + half
    );
    if !data.is_empty() && data[best_i].is_key_on_off() {
        text.push_str(
            "Note: The first instruction in the matched block was a key on/off. \
             There may be a more appropriate block earlier in the song.\n",
        );
    }
    for (i, inst) in data.iter().enumerate() {
        if inst.is_delay() {
            text.push_str(&format!("First delay at pos = {}\n", i));
            break;
        }
    }
    AnalysisReport {
        title: "Halved sequence match",
        text,
        sections: None,
    }
}

/// Longest contiguous matching block between `a` and `b`.
///
/// Returns `(start in a, start in b, length)`; ties go to the earliest
/// start in `a`, then the earliest in `b`.
fn longest_common_block(a: &[Instruction], b: &[Instruction]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut run_lengths = vec![0usize; b.len()];
    for i in 0..a.len() {
        let mut next = vec![0usize; b.len()];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let k = if j > 0 { run_lengths[j - 1] + 1 } else { 1 };
                next[j] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        run_lengths = next;
    }
    best
}
