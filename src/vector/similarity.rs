/// Scales a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(vector: &[f32]) -> Vec<f64> {
    let norm = vector.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm < 1e-12 {
        return vector.iter().map(|x| *x as f64).collect();
    }
    vector.iter().map(|x| *x as f64 / norm).collect()
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Component-wise mean of a set of equal-length vectors.
pub fn centroid<'a, I>(vectors: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = vectors.into_iter();
    let mut sum = iter.next()?.to_vec();
    let mut count = 1usize;
    for vector in iter {
        for (acc, value) in sum.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
        count += 1;
    }
    Some(sum.into_iter().map(|v| v / count as f64).collect())
}
