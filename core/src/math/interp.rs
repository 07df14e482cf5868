use ndarray::ArrayView2;

/// Fills every unfilled sample by linear interpolation between the nearest
/// filled neighbours. Samples outside the first/last filled index take the
/// edge value. Nothing changes when no sample is filled.
pub fn fill_gaps(values: &mut [f64], filled: &[bool]) {
    let anchors: Vec<usize> = filled
        .iter()
        .take(values.len())
        .enumerate()
        .filter_map(|(i, &is_filled)| is_filled.then_some(i))
        .collect();
    let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
        return;
    };

    let head = values[first];
    for value in values[..first].iter_mut() {
        *value = head;
    }
    let tail = values[last];
    for value in values[last + 1..].iter_mut() {
        *value = tail;
    }
    for pair in anchors.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo < 2 {
            continue;
        }
        let (v_lo, v_hi) = (values[lo], values[hi]);
        let span = (hi - lo) as f64;
        for i in lo + 1..hi {
            values[i] = v_lo + (v_hi - v_lo) * (i - lo) as f64 / span;
        }
    }
}

/// Bilinear sample of `image` at fractional (row, col).
///
/// Coordinates up to one pixel outside the raster are clamped onto its edge;
/// anything further out is NaN.
pub fn bilinear(image: ArrayView2<u8>, row: f64, col: f64) -> f32 {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 || !row.is_finite() || !col.is_finite() {
        return f32::NAN;
    }
    let max_row = (rows - 1) as f64;
    let max_col = (cols - 1) as f64;
    if row < -1.0 || col < -1.0 || row > max_row + 1.0 || col > max_col + 1.0 {
        return f32::NAN;
    }
    let row = row.clamp(0.0, max_row);
    let col = col.clamp(0.0, max_col);

    let r1 = row.floor() as usize;
    let c1 = col.floor() as usize;
    let r2 = (r1 + 1).min(rows - 1);
    let c2 = (c1 + 1).min(cols - 1);
    let dr = row - r1 as f64;
    let dc = col - c1 as f64;

    let v11 = image[[r1, c1]] as f64;
    let v12 = image[[r1, c2]] as f64;
    let v21 = image[[r2, c1]] as f64;
    let v22 = image[[r2, c2]] as f64;

    let value = v11 * (1.0 - dr) * (1.0 - dc)
        + v12 * (1.0 - dr) * dc
        + v21 * dr * (1.0 - dc)
        + v22 * dr * dc;
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fills_interior_gaps_linearly() {
        let mut values = vec![0.0, 0.0, 0.0, 6.0, 0.0, 10.0];
        let filled = [true, false, false, true, false, true];
        fill_gaps(&mut values, &filled);
        assert_eq!(values, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn edges_take_nearest_filled_value() {
        let mut values = vec![0.0, 3.0, 0.0, 0.0];
        fill_gaps(&mut values, &[false, true, false, false]);
        assert_eq!(values, vec![3.0, 3.0, 3.0, 3.0]);

        let mut untouched = vec![1.0, 2.0];
        fill_gaps(&mut untouched, &[false, false]);
        assert_eq!(untouched, vec![1.0, 2.0]);
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let image = array![[0u8, 100], [100, 200]];
        assert_eq!(bilinear(image.view(), 0.0, 0.0), 0.0);
        assert_eq!(bilinear(image.view(), 0.5, 0.5), 100.0);
        assert_eq!(bilinear(image.view(), 1.5, 1.0), 200.0);
        assert!(bilinear(image.view(), 3.5, 0.0).is_nan());
    }
}
