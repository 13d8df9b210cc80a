use super::Peak;

/// Keeps the raw peaks whose forward window `[p, p + window]` holds exactly one
/// derivative peak. None means an amplitude blip without a matching slope, more
/// than one is ambiguous. Duplicate derivative positions count separately.
///
/// `derivative` must be ordered by index.
pub fn reconcile(raw: &[Peak], derivative: &[Peak], window: usize) -> Vec<Peak> {
    debug_assert!(derivative.windows(2).all(|w| w[0].index <= w[1].index));
    raw.iter()
        .filter(|peak| {
            let start = derivative.partition_point(|d| d.index < peak.index);
            let end = derivative.partition_point(|d| d.index <= peak.index + window);
            end - start == 1
        })
        .copied()
        .collect()
}
