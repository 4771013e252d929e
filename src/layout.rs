//! Shape/strides/order and the ravel/unravel index arithmetic.
//!
//! Grounded on `core.hpp`'s `storage_order`, `compute_strides`, and
//! `unravel_index`: strides are in elements, computed with the
//! single-pass accumulator the original uses (`total *= shape[i]` after
//! assigning each stride), not the naive per-axis product-of-products
//! loop it also offers as a (slower) alternative.

/// Linear storage order. `RowMajor` is C order; `ColMajor` is Fortran
/// order (`fortran_order: True` in a header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    RowMajor,
    ColMajor,
}

impl Order {
    pub fn is_fortran(&self) -> bool {
        matches!(self, Order::ColMajor)
    }

    pub fn from_fortran_order(fortran_order: bool) -> Self {
        if fortran_order {
            Order::ColMajor
        } else {
            Order::RowMajor
        }
    }
}

/// Computes element strides for `shape` under `order`, via the
/// single-pass running-total accumulator.
pub fn compute_strides(shape: &[usize], order: Order) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    let mut total: usize = 1;
    match order {
        Order::RowMajor => {
            for i in (0..shape.len()).rev() {
                strides[i] = total;
                total *= shape[i];
            }
        }
        Order::ColMajor => {
            for i in 0..shape.len() {
                strides[i] = total;
                total *= shape[i];
            }
        }
    }
    strides
}

/// Total number of elements described by `shape` (the product of all
/// axis lengths; `1` for a zero-rank scalar shape).
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Converts a flat index into a coordinate tuple for the given shape and
/// order.
pub fn unravel_index(mut flat: usize, shape: &[usize], order: Order) -> Vec<usize> {
    let n = shape.len();
    let mut indices = vec![0usize; n];
    match order {
        Order::RowMajor => {
            for i in (0..n).rev() {
                indices[i] = flat % shape[i];
                flat /= shape[i];
            }
        }
        Order::ColMajor => {
            for i in 0..n {
                indices[i] = flat % shape[i];
                flat /= shape[i];
            }
        }
    }
    indices
}

/// Converts a coordinate tuple back to a flat index, i.e. the dot
/// product of `index` and the strides for `shape`/`order`.
///
/// Panics if `index` and `shape` differ in rank, or if any coordinate is
/// out of bounds — this is a programmer contract, not a recoverable
/// error (spec §7).
pub fn ravel_index(index: &[usize], shape: &[usize], order: Order) -> usize {
    assert_eq!(index.len(), shape.len(), "index rank does not match shape rank");
    for (i, (&idx, &len)) in index.iter().zip(shape.iter()).enumerate() {
        assert!(idx < len, "index {} out of range for axis {} of length {}", idx, i, len);
    }
    let strides = compute_strides(shape, order);
    index.iter().zip(strides.iter()).map(|(&i, &s)| i * s).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_strides_are_trailing_products() {
        let strides = compute_strides(&[2, 3, 4], Order::RowMajor);
        assert_eq!(strides, vec![12, 4, 1]);
    }

    #[test]
    fn col_major_strides_are_leading_products() {
        let strides = compute_strides(&[2, 3, 4], Order::ColMajor);
        assert_eq!(strides, vec![1, 2, 6]);
    }

    #[test]
    fn ravel_unravel_round_trip_row_major() {
        let shape = vec![2, 3, 5];
        for k in 0..element_count(&shape) {
            let idx = unravel_index(k, &shape, Order::RowMajor);
            assert_eq!(ravel_index(&idx, &shape, Order::RowMajor), k);
        }
    }

    #[test]
    fn ravel_unravel_round_trip_col_major() {
        let shape = vec![4, 2, 3];
        for k in 0..element_count(&shape) {
            let idx = unravel_index(k, &shape, Order::ColMajor);
            assert_eq!(ravel_index(&idx, &shape, Order::ColMajor), k);
        }
    }

    #[test]
    #[should_panic]
    fn ravel_index_panics_on_out_of_range() {
        ravel_index(&[5, 0], &[2, 3], Order::RowMajor);
    }

    #[test]
    fn scalar_shape_has_one_element() {
        assert_eq!(element_count(&[]), 1);
    }
}
