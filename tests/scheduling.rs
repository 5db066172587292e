//! Scheduling properties of the playback timeline and source set.

use voicepipe::audio::{SourceSet, Timeline};

#[test]
fn three_contiguous_chunks_span_their_total_duration() {
    // 0.1s + 0.1s + 0.1s queued with no delay: three non-overlapping
    // back-to-back segments covering 0.3s.
    let mut tl = Timeline::new();
    let starts: Vec<f64> = (0..3).map(|_| tl.schedule(0.0, 0.1)).collect();

    for window in starts.windows(2) {
        assert!((window[1] - window[0] - 0.1).abs() < 1e-9, "gap or overlap");
    }
    assert!((tl.next_start() - 0.3).abs() < 1e-9);
}

#[test]
fn fast_producer_never_overlaps_chunks() {
    let mut tl = Timeline::new();
    let first = tl.schedule(0.01, 0.25);
    let mut prev_end = first + 0.25;
    // Later calls arrive while the previous chunk is still playing.
    for d in [0.1, 0.6, 0.05] {
        let start = tl.schedule(0.02, d);
        assert!((start - prev_end).abs() < 1e-9, "gap or overlap while ahead");
        prev_end = start + d;
    }
}

#[test]
fn stalled_producer_resumes_at_clock_time() {
    let mut tl = Timeline::new();
    // First chunk plays out fully by t=0.5.
    tl.schedule(0.0, 0.5);
    // Producer stalls for two seconds; the next chunk must start now,
    // not at the stale horizon.
    let start = tl.schedule(2.5, 0.1);
    assert_eq!(start, 2.5);
    // And the chunk after it queues gapless again.
    assert_eq!(tl.schedule(2.55, 0.1), 2.6);
}

#[test]
fn interruption_resets_schedule_and_empties_sources() {
    let mut tl = Timeline::new();
    let mut sources = SourceSet::new();

    for _ in 0..5 {
        tl.schedule(0.0, 1.0);
        sources.register();
    }
    assert_eq!(sources.len(), 5);

    // Hard stop.
    sources.clear();
    tl.reset();

    assert!(sources.is_empty());
    // The next chunk schedules at (approximately) the current clock
    // time, not at any previously computed offset.
    let start = tl.schedule(1.234, 0.1);
    assert_eq!(start, 1.234);
}

#[test]
fn double_stop_is_idempotent() {
    let mut tl = Timeline::new();
    let mut sources = SourceSet::new();
    tl.schedule(0.0, 1.0);
    sources.register();

    sources.clear();
    tl.reset();
    sources.clear();
    tl.reset();

    assert!(sources.is_empty());
    assert_eq!(tl.next_start(), 0.0);
}
