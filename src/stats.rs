// src/stats.rs

/// Mean of the present values; `None` when nothing is present.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (total, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
    (count > 0).then(|| total / count as f64)
}

/// Sum of the present values; `None` when nothing is present.
pub fn sum(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Pearson correlation coefficient of paired samples.
///
/// `None` with fewer than two pairs or when either side has zero variance.
/// The result is clamped to `[-1, 1]` to absorb rounding error.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    let r = cov / (vx.sqrt() * vy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// The `n` items with the largest key, largest first. Ties keep input order.
pub fn nlargest<T: Clone>(items: &[T], n: usize, key: impl Fn(&T) -> f64) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
    sorted.truncate(n);
    sorted
}

/// The `n` items with the smallest key, smallest first. Ties keep input order.
pub fn nsmallest<T: Clone>(items: &[T], n: usize, key: impl Fn(&T) -> f64) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| key(a).total_cmp(&key(b)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sum_skip_missing() {
        assert_eq!(mean(vec![Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(sum(vec![Some(1.0), None, Some(3.0)]), Some(4.0));
        assert_eq!(mean(vec![None, None]), None);
        assert_eq!(sum(Vec::<Option<f64>>::new()), None);
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let up = [2.0, 4.0, 6.0, 8.0];
        let down = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&xs, &up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &down).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_is_symmetric_and_bounded() {
        let a = [3.1, 0.4, 7.7, 2.2, 5.0, 9.9];
        let b = [1.0, 4.0, 2.5, 8.1, 0.3, 6.6];
        let ab = pearson(&a, &b).unwrap();
        let ba = pearson(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[], &[]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn test_rankings_disjoint_with_twenty_values() {
        let items: Vec<(usize, f64)> = (0..27).map(|i| (i, ((i * 7) % 27) as f64)).collect();
        let top = nlargest(&items, 10, |x| x.1);
        let bottom = nsmallest(&items, 10, |x| x.1);
        assert_eq!(top.len(), 10);
        assert_eq!(bottom.len(), 10);
        assert!(top.iter().all(|t| !bottom.iter().any(|b| b.0 == t.0)));
        assert!(top[9].1 >= bottom[9].1);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(bottom.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_ties_keep_first() {
        let items = vec![("a", 1.0), ("b", 2.0), ("c", 2.0)];
        let top = nlargest(&items, 1, |x| x.1);
        assert_eq!(top[0].0, "b");
    }
}
