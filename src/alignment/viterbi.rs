/// Best CTC path of `tokens` through `log_probs`
///
/// `log_probs` is frame-major (`[frame][vocab]`) log-softmax output and
/// `tokens` the blank-interleaved target. Returns one `(state, frame)` pair
/// per frame, ending on the last label or the trailing blank. Empty input
/// yields an empty path.
#[must_use]
pub fn forced_align(log_probs: &[Vec<f32>], tokens: &[usize]) -> Vec<(usize, usize)> {
    let t_len = log_probs.len();
    let s_len = tokens.len();
    if t_len == 0 || s_len == 0 {
        return Vec::new();
    }

    let mut prev = vec![f32::NEG_INFINITY; s_len];
    let mut curr = vec![f32::NEG_INFINITY; s_len];
    let mut backpointers = vec![0u8; t_len * s_len];

    prev[0] = log_probs[0][tokens[0]];
    if s_len > 1 {
        prev[1] = log_probs[0][tokens[1]];
    }

    let mut prev_start = 0;
    let mut prev_end = usize::from(s_len > 1);
    let final_floor = s_len.saturating_sub(2);

    for (t, row) in log_probs.iter().enumerate().skip(1) {
        // States that can still reach the end, and that are reachable from the start
        let remaining = t_len - 1 - t;
        let curr_start = final_floor.saturating_sub(2 * remaining);
        let curr_end = (2 * t + 1).min(s_len - 1);

        curr.fill(f32::NEG_INFINITY);
        let offset = t * s_len;
        for s in curr_start..=curr_end {
            let (best, step) = best_transition(&prev, s, prev_start, prev_end, tokens);
            curr[s] = best + row[tokens[s]];
            backpointers[offset + s] = step;
        }

        std::mem::swap(&mut prev, &mut curr);
        prev_start = curr_start;
        prev_end = curr_end;
    }

    let mut s = s_len - 1;
    if s_len >= 2 && prev[s_len - 2] > prev[s_len - 1] {
        s = s_len - 2;
    }

    let mut path = Vec::with_capacity(t_len);
    path.push((s, t_len - 1));
    for t in (1..t_len).rev() {
        s -= usize::from(backpointers[t * s_len + s]).min(s);
        path.push((s, t - 1));
    }
    path.reverse();
    path
}

#[inline]
fn best_transition(
    prev: &[f32],
    s: usize,
    prev_start: usize,
    prev_end: usize,
    tokens: &[usize],
) -> (f32, u8) {
    let live = |p: usize| p >= prev_start && p <= prev_end;
    let mut best = f32::NEG_INFINITY;
    let mut step = 0;

    if live(s) {
        best = prev[s];
    }

    if s >= 1 && live(s - 1) && prev[s - 1] > best {
        best = prev[s - 1];
        step = 1;
    }

    // Skipping a blank is only allowed between distinct labels
    if s >= 2 && tokens[s] != tokens[s - 2] && live(s - 2) && prev[s - 2] > best {
        best = prev[s - 2];
        step = 2;
    }

    (best, step)
}

/// Row-wise log-softmax over frame logits
#[must_use]
pub fn log_softmax_rows(logits: &[f32], vocab_size: usize) -> Vec<Vec<f32>> {
    if vocab_size == 0 {
        return Vec::new();
    }
    logits
        .chunks_exact(vocab_size)
        .map(|row| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let log_sum = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln() + max;
            row.iter().map(|&v| v - log_sum).collect()
        })
        .collect()
}
