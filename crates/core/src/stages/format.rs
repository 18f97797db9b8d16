//! Pure helpers used by the transcribe/summarize stages: caption
//! de-duplication and the `[HH:MM:SS]`/`[MM:SS]` timestamp rendering used in
//! the text handed to the summarizer (§4.3).

use digest_adapters::RawSegment;

/// Largest `k` such that the last `k` chars of `prev` equal the first `k`
/// chars of `next`.
fn overlap_len(prev: &str, next: &str) -> usize {
    let prev_chars: Vec<char> = prev.chars().collect();
    let next_chars: Vec<char> = next.chars().collect();
    let max_k = prev_chars.len().min(next_chars.len());
    for k in (0..=max_k).rev() {
        if prev_chars[prev_chars.len() - k..] == next_chars[..k] {
            return k;
        }
    }
    0
}

/// Trims the overlap YouTube's auto-captions leave between consecutive
/// subtitle lines; drops a segment entirely if the next one fully subsumes
/// it (§4.3 "Caption de-duplication").
pub fn dedupe_caption_segments(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut result: Vec<RawSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(prev) = result.last_mut() {
            let k = overlap_len(&prev.text, &seg.text);
            let prev_len = prev.text.chars().count();
            if k > 0 && k == prev_len {
                result.pop();
            } else if k > 0 {
                let chars: Vec<char> = prev.text.chars().collect();
                prev.text = chars[..chars.len() - k].iter().collect();
            }
        }
        result.push(seg);
    }
    result
}

fn format_clock(seconds: f64, use_hours: bool) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if use_hours {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Renders a segment's time range as `[HH:MM:SS-HH:MM:SS]` once the range
/// reaches the one-hour mark, else `[MM:SS-MM:SS]` (§4.3).
pub fn format_segment_range(start: f64, end: f64) -> String {
    let use_hours = end >= 3600.0;
    format!(
        "[{}-{}]",
        format_clock(start, use_hours),
        format_clock(end, use_hours)
    )
}

/// Groups segments into chunks of roughly `char_budget` characters of
/// rendered `[start-end]: text` lines, estimating 4 chars/token (§4.3).
pub fn chunk_segments_for_summary(segments: &[RawSegment], char_budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in segments {
        let line = format!(
            "{}: {}\n",
            format_segment_range(segment.start, segment.end),
            segment.text
        );
        if !current.is_empty() && current.len() + line.len() > char_budget {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(&line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
