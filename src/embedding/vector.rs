// Dense vector helpers shared by concept averaging, ranking and the
// nearest-neighbor index.
//
// Everything here works on plain `&[f64]` slices. Dimensionality is never
// assumed: callers decide what a valid dimension is and these helpers treat
// mismatched input as "no signal" rather than panicking.

/// Element-wise mean of a set of equally sized vectors.
///
/// Returns `None` for an empty set. Vectors are assumed to share the length
/// of the first one; extra trailing components on later vectors are ignored
/// and missing ones count as zero.
pub fn mean<V: AsRef<[f64]>>(vectors: &[V]) -> Option<Vec<f64>> {
    let first = vectors.first()?.as_ref();
    let n = vectors.len() as f64;
    let mut sum = vec![0.0_f64; first.len()];

    for v in vectors {
        for (acc, &val) in sum.iter_mut().zip(v.as_ref()) {
            *acc += val;
        }
    }

    for val in &mut sum {
        *val /= n;
    }

    Some(sum)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Cosine similarity between two vectors, in [-1.0, 1.0].
///
/// Empty, mismatched or zero-norm input yields 0.0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = norm(a) * norm(b);
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot(a, b) / denom).clamp(-1.0, 1.0)
    }
}

/// Angular distance `sqrt(2 - 2 cos)`, in [0.0, 2.0].
///
/// A zero-norm vector has no direction, so it sits at distance sqrt(2) from
/// everything (including another zero vector).
pub fn angular_distance(a: &[f64], b: &[f64]) -> f64 {
    let pp = dot(a, a);
    let qq = dot(b, b);
    let ppqq = pp * qq;
    let d = if ppqq > 0.0 {
        2.0 - 2.0 * dot(a, b) / ppqq.sqrt()
    } else {
        2.0
    };
    d.max(0.0).sqrt()
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f64]) {
    let n = norm(v);
    if n > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}
