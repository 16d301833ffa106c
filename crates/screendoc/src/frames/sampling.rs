/// Picks at most `max` items spread evenly over `items`, keeping order.
pub fn sample_evenly<T: Clone>(items: &[T], max: usize) -> Vec<T> {
    if items.len() <= max {
        return items.to_vec();
    }
    if max == 0 {
        return Vec::new();
    }

    let step = items.len() as f64 / max as f64;
    (0..max)
        .map(|i| items[((i as f64 * step) as usize).min(items.len() - 1)].clone())
        .collect()
}
