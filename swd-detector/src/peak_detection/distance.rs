use super::Peak;
use std::cmp::Ordering;

/// Thins index-ordered candidate peaks so that no two survivors are closer than
/// `min_distance`. Candidates are visited tallest first (earliest first on ties)
/// and each survivor removes every remaining candidate within reach.
pub(super) fn select_by_distance(candidates: Vec<Peak>, min_distance: usize) -> Vec<Peak> {
    if min_distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut priority: Vec<usize> = (0..candidates.len()).collect();
    priority.sort_by(|&a, &b| {
        candidates[b]
            .value
            .partial_cmp(&candidates[a].value)
            .unwrap_or(Ordering::Equal)
            .then(candidates[a].index.cmp(&candidates[b].index))
    });

    let mut keep = vec![true; candidates.len()];
    for position in priority {
        if !keep[position] {
            continue;
        }
        let centre = candidates[position].index;
        for earlier in (0..position).rev() {
            if centre - candidates[earlier].index >= min_distance {
                break;
            }
            keep[earlier] = false;
        }
        for later in position + 1..candidates.len() {
            if candidates[later].index - centre >= min_distance {
                break;
            }
            keep[later] = false;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(peak, keep)| keep.then_some(peak))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(points: &[(usize, f64)]) -> Vec<Peak> {
        points
            .iter()
            .map(|&(index, value)| Peak { index, value })
            .collect()
    }

    #[test]
    fn unit_distance_keeps_everything() {
        let input = peaks(&[(1, 1.0), (2, 2.0), (3, 1.0)]);
        assert_eq!(select_by_distance(input.clone(), 1), input);
    }

    #[test]
    fn suppressed_peak_does_not_suppress() {
        // 5 removes 3, so 3 cannot remove 1 even though they are close
        let input = peaks(&[(0, 2.0), (3, 3.0), (5, 5.0)]);
        assert_eq!(
            select_by_distance(input, 4),
            peaks(&[(0, 2.0), (5, 5.0)])
        );
    }

    #[test]
    fn exact_distance_is_allowed() {
        let input = peaks(&[(0, 2.0), (4, 3.0)]);
        assert_eq!(select_by_distance(input.clone(), 4), input);
    }
}
