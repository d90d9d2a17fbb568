use log::debug;

use crate::mine::fragment::Pattern;

/// Keep the `k` highest-scoring patterns under a caller-supplied scoring
/// function (information gain, support, whatever the pipeline wants). A
/// post-filter over the already-mined set, orthogonal to the search itself;
/// the sort is stable, so ties keep their discovery order and the first
/// pattern found wins.
pub fn select_top_k<F>(mut patterns: Vec<Pattern>, k: usize, score: F) -> Vec<Pattern>
where
    F: Fn(&Pattern) -> f64,
{
    let total = patterns.len();
    patterns.sort_by(|a, b| {
        score(b)
            .partial_cmp(&score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    patterns.truncate(k);
    debug!("top-k selection kept {} of {} patterns", patterns.len(), total);
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::DfsCode;
    use crate::mine::fragment::Fragment;

    fn pattern(root_type: u32, support: usize) -> Pattern {
        let mut p = Pattern::from_fragment(&Fragment::new(DfsCode::root(root_type), Vec::new(), 0));
        p.support = support;
        p
    }

    #[test]
    fn keeps_highest_scores() {
        let mined = vec![pattern(0, 3), pattern(1, 9), pattern(2, 5)];
        let kept = select_top_k(mined, 2, |p| p.support as f64);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].support, 9);
        assert_eq!(kept[1].support, 5);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let mined = vec![pattern(0, 4), pattern(1, 4), pattern(2, 4)];
        let kept = select_top_k(mined, 2, |p| p.support as f64);
        assert_eq!(kept[0].code.root_type, 0);
        assert_eq!(kept[1].code.root_type, 1);
    }

    #[test]
    fn k_larger_than_set_keeps_all() {
        let mined = vec![pattern(0, 1)];
        assert_eq!(select_top_k(mined, 10, |p| p.support as f64).len(), 1);
    }
}
