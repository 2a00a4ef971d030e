//! Word-level diff markup for a single line pair.
//!
//! Alignment uses a longest-common-subsequence walk over whitespace-split
//! words with a fixed tie-break, so the same input pair always produces
//! byte-identical markup.

/// Marker opening a deleted run.
pub const DELETE_OPEN: &str = "[-";
/// Marker closing a deleted run.
pub const DELETE_CLOSE: &str = "-]";
/// Marker opening an inserted run.
pub const INSERT_OPEN: &str = "{+";
/// Marker closing an inserted run.
pub const INSERT_CLOSE: &str = "+}";

/// The three renderings of one line pair's word diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// Unified view: common words plain, deleted runs in `[-...-]`,
    /// inserted runs in `{+...+}`, in document order.
    pub merged: String,
    /// The old side: common words plus deleted runs.
    pub old_side: String,
    /// The new side: common words plus inserted runs.
    pub new_side: String,
}

#[derive(Debug, PartialEq)]
enum Run {
    Common(Vec<String>),
    Delete(Vec<String>),
    Insert(Vec<String>),
}

/// Computes the word-level diff of two lines.
#[must_use]
pub fn diff_words(old_line: &str, new_line: &str) -> LineDiff {
    let old_words: Vec<&str> = old_line.split_whitespace().collect();
    let new_words: Vec<&str> = new_line.split_whitespace().collect();
    let runs = align(&old_words, &new_words);

    let mut merged = Vec::new();
    let mut old_side = Vec::new();
    let mut new_side = Vec::new();
    for run in &runs {
        match run {
            Run::Common(words) => {
                let text = words.join(" ");
                merged.push(text.clone());
                old_side.push(text.clone());
                new_side.push(text);
            }
            Run::Delete(words) => {
                let text = format!("{DELETE_OPEN}{}{DELETE_CLOSE}", words.join(" "));
                merged.push(text.clone());
                old_side.push(text);
            }
            Run::Insert(words) => {
                let text = format!("{INSERT_OPEN}{}{INSERT_CLOSE}", words.join(" "));
                merged.push(text.clone());
                new_side.push(text);
            }
        }
    }

    LineDiff {
        merged: merged.join(" "),
        old_side: old_side.join(" "),
        new_side: new_side.join(" "),
    }
}

fn align(old_words: &[&str], new_words: &[&str]) -> Vec<Run> {
    let n = old_words.len();
    let m = new_words.len();

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_words[i] == new_words[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut runs: Vec<Run> = Vec::new();
    let push = |runs: &mut Vec<Run>, next: Run| match (runs.last_mut(), next) {
        (Some(Run::Common(words)), Run::Common(more)) => words.extend(more),
        (Some(Run::Delete(words)), Run::Delete(more)) => words.extend(more),
        (Some(Run::Insert(words)), Run::Insert(more)) => words.extend(more),
        (_, other) => runs.push(other),
    };

    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old_words[i] == new_words[j] {
            push(&mut runs, Run::Common(vec![old_words[i].to_string()]));
            i += 1;
            j += 1;
        } else if i < n && (j == m || lcs[i + 1][j] >= lcs[i][j + 1]) {
            // Deletions before insertions at a divergence point.
            push(&mut runs, Run::Delete(vec![old_words[i].to_string()]));
            i += 1;
        } else {
            push(&mut runs, Run::Insert(vec![new_words[j].to_string()]));
            j += 1;
        }
    }

    runs
}
