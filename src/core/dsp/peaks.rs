// src/core/dsp/peaks.rs
//
// Local-maximum extraction with non-maximum suppression. This is the
// de-duplication step that keeps one broad spectral lobe from registering
// as a pile of separate events.

/// A qualifying spectral peak: bin index and its height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub height: f64,
}

/// Find local maxima above `height_threshold`, at least `min_separation`
/// indices apart.
///
/// A local maximum is a sample strictly greater than both neighbors; a
/// flat plateau counts once, at its middle index. When two qualifying
/// peaks are closer than `min_separation`, only the higher survives, and
/// on an exact height tie the earlier index wins.
///
/// NOTE: in this engine `min_separation` is a count of spectrum *bin*
/// indices derived from `min_event_separation_seconds * sample_rate`. That
/// conflates a time-domain duration with a frequency-bin distance, and
/// with the default settings it collapses each band to at most one peak
/// per buffer. Deliberate; changing it would change detection counts.
pub fn find_peaks(values: &[f64], height_threshold: f64, min_separation: usize) -> Vec<Peak> {
    let mut candidates = local_maxima(values);
    candidates.retain(|p| p.height > height_threshold);

    if candidates.len() < 2 {
        return candidates;
    }

    // Highest first; ties resolved toward the earlier index
    let mut by_height: Vec<Peak> = candidates.clone();
    by_height.sort_by(|a, b| {
        b.height
            .partial_cmp(&a.height)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let separation = min_separation.max(1);
    let mut kept: Vec<Peak> = Vec::with_capacity(by_height.len());
    for peak in by_height {
        let crowded = kept
            .iter()
            .any(|k| peak.index.abs_diff(k.index) < separation);
        if !crowded {
            kept.push(peak);
        }
    }

    kept.sort_by_key(|p| p.index);
    kept
}

/// All strict local maxima, plateaus collapsed to their middle index.
fn local_maxima(values: &[f64]) -> Vec<Peak> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if values[i] > values[i - 1] {
            // Walk across any plateau
            let mut right = i;
            while right < n - 1 && values[right + 1] == values[i] {
                right += 1;
            }
            if right < n - 1 && values[right + 1] < values[i] {
                peaks.push(Peak {
                    index: (i + right) / 2,
                    height: values[i],
                });
            }
            i = right + 1;
        } else {
            i += 1;
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_peak_found() {
        let values = vec![0.0, 1.0, 5.0, 1.0, 0.0];
        let peaks = find_peaks(&values, 0.0, 1);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert_eq!(peaks[0].height, 5.0);
    }

    #[test]
    fn threshold_filters_low_peaks() {
        let values = vec![0.0, 2.0, 0.0, 8.0, 0.0];
        let peaks = find_peaks(&values, 5.0, 1);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn plateau_counts_once_at_its_middle() {
        let values = vec![0.0, 3.0, 3.0, 3.0, 0.0];
        let peaks = find_peaks(&values, 0.0, 1);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
    }

    #[test]
    fn edges_are_never_peaks() {
        let values = vec![9.0, 1.0, 1.0, 9.0];
        assert!(find_peaks(&values, 0.0, 1).is_empty());
    }

    #[test]
    fn close_peaks_keep_only_the_higher() {
        let values = vec![0.0, 4.0, 0.0, 6.0, 0.0];
        let peaks = find_peaks(&values, 0.0, 3);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn exact_ties_keep_the_earlier_index() {
        let values = vec![0.0, 5.0, 0.0, 5.0, 0.0];
        let peaks = find_peaks(&values, 0.0, 4);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
    }

    #[test]
    fn never_returns_peaks_closer_than_separation() {
        // Noisy sawtooth with many local maxima
        let values: Vec<f64> = (0..200)
            .map(|i| ((i * 7919) % 13) as f64 + ((i % 3) as f64) * 0.5)
            .collect();
        for separation in [1usize, 5, 20] {
            let peaks = find_peaks(&values, 0.0, separation);
            for pair in peaks.windows(2) {
                assert!(pair[1].index - pair[0].index >= separation);
            }
        }
    }

    #[test]
    fn distant_equal_peaks_both_survive() {
        let values = vec![0.0, 5.0, 0.0, 0.0, 0.0, 5.0, 0.0];
        let peaks = find_peaks(&values, 0.0, 3);
        assert_eq!(peaks.len(), 2);
    }
}
