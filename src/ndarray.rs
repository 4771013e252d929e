//! The typed array container: dtype + shape + order + strides over a
//! [`Store`], with construction, indexing, apply/map/transform, reshape,
//! assign, and release.
//!
//! Grounded on `ndarray.hpp`'s ndarray type and spec §4.9's lifecycle
//! state machine. Moves transfer the store (`release`-and-empty the
//! source is not automatic in Rust — ordinary move semantics already
//! give us that for free, so there's no explicit "moved-from" state to
//! track beyond `Store` itself going out of scope).

use crate::dtype::Dtype;
use crate::layout::{self, Order};
use crate::storage::Store;

/// An in-memory N-dimensional array: a dtype tree, a shape, a storage
/// order, and a backing store. Construction either comes from the codec
/// (on load) or from a caller supplying shape + dtype directly.
pub struct NdArray {
    dtype: Dtype,
    shape: Vec<usize>,
    order: Order,
    strides: Vec<usize>,
    store: Option<Store>,
}

impl NdArray {
    /// The `[empty]` state of the lifecycle: no store, no shape.
    pub fn empty() -> Self {
        NdArray { dtype: Dtype::int64(), shape: Vec::new(), order: Order::RowMajor, strides: Vec::new(), store: None }
    }

    /// `[empty] -- construct(shape, dtype) --> [owned]`: allocates a
    /// zeroed owned-vector store sized for `shape`/`dtype`.
    pub fn construct(dtype: Dtype, shape: Vec<usize>, order: Order) -> Self {
        let item_size = dtype.item_size as usize;
        let len = layout::element_count(&shape) * item_size;
        let strides = layout::compute_strides(&shape, order);
        NdArray { dtype, shape, order, strides, store: Some(Store::Owned(vec![0u8; len])) }
    }

    /// `[empty] -- assign(dtype, shape, store, order) --> [bound]`:
    /// installs an existing store (e.g. the codec's mmap region or raw
    /// payload bytes) without copying, and recomputes strides.
    pub fn assign(&mut self, dtype: Dtype, shape: Vec<usize>, order: Order, store: Store) {
        self.strides = layout::compute_strides(&shape, order);
        self.dtype = dtype;
        self.shape = shape;
        self.order = order;
        self.store = Some(store);
    }

    /// `[owned|bound] -- release() --> [empty]`. Idempotent: calling it
    /// on an already-empty array is a no-op.
    pub fn release(&mut self) {
        self.store = None;
        self.shape.clear();
        self.strides.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_none()
    }

    pub fn dtype(&self) -> &Dtype {
        &self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn item_size(&self) -> usize {
        self.dtype.item_size as usize
    }

    pub fn len(&self) -> usize {
        layout::element_count(&self.shape)
    }

    /// Total byte length of the payload, regardless of which store
    /// variant backs it.
    pub fn data_size(&self) -> usize {
        self.store.as_ref().map(Store::data_size).unwrap_or(0)
    }

    pub fn data(&self) -> &[u8] {
        self.store.as_ref().map(Store::data).unwrap_or(&[])
    }

    fn store(&self) -> &Store {
        self.store.as_ref().expect("operation on an empty ndarray")
    }

    fn store_mut(&mut self) -> &mut Store {
        self.store.as_mut().expect("operation on an empty ndarray")
    }

    /// Byte offset of the element at `index` within the payload. Panics
    /// on rank mismatch or out-of-range coordinates (a programmer
    /// contract violation, per spec §7).
    pub fn byte_offset(&self, index: &[usize]) -> usize {
        layout::ravel_index(index, &self.shape, self.order) * self.item_size()
    }

    /// Raw bytes of a single element at `index`.
    pub fn item_bytes(&self, index: &[usize]) -> &[u8] {
        let offset = self.byte_offset(index);
        let size = self.item_size();
        &self.data()[offset..offset + size]
    }

    /// Typed access to the element at `index`, reinterpreting its raw
    /// bytes as `T`. Panics if `size_of::<T>()` doesn't match this
    /// array's `item_size` — a `T`/dtype mismatch is a caller contract
    /// violation, not a recoverable error.
    pub fn value<T: Copy>(&self, index: &[usize]) -> T {
        assert_eq!(std::mem::size_of::<T>(), self.item_size(), "T size does not match item_size");
        let bytes = self.item_bytes(index);
        unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) }
    }

    /// Writes a typed value into the element at `index`. Panics under
    /// the same conditions as [`NdArray::value`], plus if the store is
    /// read-only (mmap-backed).
    pub fn set_value<T: Copy>(&mut self, index: &[usize], value: T) {
        assert_eq!(std::mem::size_of::<T>(), self.item_size(), "T size does not match item_size");
        let offset = self.byte_offset(index);
        let size = self.item_size();
        let bytes = &mut self.store_mut().data_mut()[offset..offset + size];
        unsafe { std::ptr::write_unaligned(bytes.as_mut_ptr() as *mut T, value) };
    }

    /// Applies `f` to every element's raw bytes in ascending flat-index
    /// order, in place. Used for e.g. the S2 scenario's `apply(bswap)`.
    pub fn apply(&mut self, mut f: impl FnMut(&mut [u8])) {
        let item_size = self.item_size();
        if self.is_read_only() {
            panic!("cannot apply a mutating transform to a read-only array");
        }
        for chunk in self.store_mut().data_mut().chunks_exact_mut(item_size) {
            f(chunk);
        }
    }

    /// Maps every element's raw bytes into a new owned array with the
    /// same dtype/shape/order, leaving `self` untouched.
    pub fn map(&self, mut f: impl FnMut(&[u8]) -> Vec<u8>) -> NdArray {
        let item_size = self.item_size();
        let mut out = Vec::with_capacity(self.data_size());
        for chunk in self.data().chunks_exact(item_size) {
            let mapped = f(chunk);
            assert_eq!(mapped.len(), item_size, "map callback changed the element width");
            out.extend_from_slice(&mapped);
        }
        NdArray {
            dtype: self.dtype.clone(),
            shape: self.shape.clone(),
            order: self.order,
            strides: self.strides.clone(),
            store: Some(Store::Owned(out)),
        }
    }

    /// Reinterprets the shape in place without moving data, as long as
    /// the element count is unchanged. Panics otherwise — reshaping to
    /// an incompatible element count is a programmer error.
    pub fn reshape(&mut self, new_shape: Vec<usize>) {
        assert_eq!(
            layout::element_count(&new_shape),
            self.len(),
            "reshape must preserve the total element count"
        );
        self.strides = layout::compute_strides(&new_shape, self.order);
        self.shape = new_shape;
    }

    pub fn is_read_only(&self) -> bool {
        self.store().is_read_only()
    }
}
