use std::cmp::Ordering;

use crate::model::LogLine;

/// Appends the unseen suffix of `batch` to `held` and returns how many lines
/// were added.
///
/// The suffix starts at the first line newer than the held tail, or at the
/// tail's timestamp with a message not already held under that timestamp.
/// Everything from there on is appended as fetched. Re-merging a batch that
/// is already held is a no-op.
pub fn merge_log_lines(held: &mut Vec<LogLine>, batch: Vec<LogLine>) -> usize {
    let start = match held.last() {
        None => 0,
        Some(last) => {
            let tail_run: Vec<&str> = held
                .iter()
                .rev()
                .take_while(|h| h.cmp_timestamp(last) == Ordering::Equal)
                .map(|h| h.message.as_str())
                .collect();
            let found = batch.iter().position(|line| match line.cmp_timestamp(last) {
                Ordering::Greater => true,
                Ordering::Equal => !tail_run.contains(&line.message.as_str()),
                Ordering::Less => false,
            });
            match found {
                Some(idx) => idx,
                None => return 0,
            }
        }
    };

    let appended = batch.len() - start;
    held.extend(batch.into_iter().skip(start));
    appended
}
