//! A reduction slot for many concurrent producers.
//!
//! Producers [`push`][Accumulator::push] partial results from any thread. The
//! first push to find the result slot free takes it; pushes that find it busy
//! park their value on an overflow buffer instead of waiting. The final value
//! is obtained after all producers finish by [`drain`][Accumulator::drain],
//! which folds the buffer into the slot. The combining operation must
//! therefore be commutative and associative; the order in which partials are
//! combined is unspecified.
//!
//! ```
//! use hodensity::accumulator::Accumulator;
//!
//! let acc: Accumulator<u64> = Accumulator::new();
//! std::thread::scope(|s| {
//!     for k in 1..=8_u64 {
//!         let acc = &acc;
//!         s.spawn(move || acc.push(k));
//!     }
//! });
//! assert_eq!(acc.sum(0), 36);
//! ```

use std::{
    fmt,
    ops::AddAssign,
    sync::{
        Mutex,
        PoisonError,
        TryLockError,
        atomic::{ AtomicUsize, Ordering },
    },
};

/// Combine `value` into `acc` by addition.
pub fn add_assign<T>(acc: &mut T, value: T)
where T: for<'a> AddAssign<&'a T>
{
    *acc += &value;
}

/// Commutative reduction slot with a non-blocking fast path.
///
/// `op` folds a new value into the running result. `Accumulator` is `Sync`
/// whenever `T: Send` and `F: Sync` and is meant to be shared by reference
/// between the workers of a parallel loop.
pub struct Accumulator<T, F = fn(&mut T, T)> {
    op: F,
    result: Mutex<Option<T>>,
    buffer: Mutex<Vec<T>>,
    buffered: AtomicUsize,
}

impl<T, F> fmt::Debug for Accumulator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}

impl<T> Default for Accumulator<T>
where T: for<'a> AddAssign<&'a T>
{
    fn default() -> Self { Self::new() }
}

impl<T> Accumulator<T>
where T: for<'a> AddAssign<&'a T>
{
    /// Create a new, empty accumulator combining values by addition.
    pub fn new() -> Self { Self::from_parts(None, add_assign::<T>) }
}

impl<T, F> Accumulator<T, F>
where F: Fn(&mut T, T)
{
    /// Create a new accumulator whose result starts at `identity` and is
    /// combined with every pushed value by `op`.
    ///
    /// `op` must be commutative and associative with `identity` as its
    /// neutral element.
    ///
    /// ```
    /// use hodensity::accumulator::Accumulator;
    ///
    /// let acc = Accumulator::with_op(1_u64, |acc: &mut u64, x: u64| *acc *= x);
    /// (1..=5).for_each(|k| acc.push(k));
    /// assert_eq!(acc.drain(), Some(120));
    /// ```
    pub fn with_op(identity: T, op: F) -> Self {
        Self::from_parts(Some(identity), op)
    }

    fn from_parts(init: Option<T>, op: F) -> Self {
        Self {
            op,
            result: Mutex::new(init),
            buffer: Mutex::new(Vec::new()),
            buffered: AtomicUsize::new(0),
        }
    }

    fn combine(&self, slot: &mut Option<T>, value: T) {
        match slot {
            Some(acc) => { (self.op)(acc, value); },
            None => { *slot = Some(value); },
        }
    }

    /// Add a partial result.
    ///
    /// Never blocks on the result slot: if another producer holds it, `value`
    /// is parked on the overflow buffer.
    pub fn push(&self, value: T) {
        match self.result.try_lock() {
            Ok(mut slot) => { self.combine(&mut slot, value); },
            Err(TryLockError::Poisoned(poisoned)) => {
                self.combine(&mut poisoned.into_inner(), value);
            },
            Err(TryLockError::WouldBlock) => {
                self.buffer.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(value);
                self.buffered.fetch_add(1, Ordering::Relaxed);
            },
        }
    }

    /// Consume `self`, folding the overflow buffer into the result slot.
    ///
    /// Returns the identity for an accumulator made by
    /// [`with_op`][Self::with_op] that saw no values, and `None` for an empty
    /// one made by [`new`][Accumulator::new].
    pub fn drain(self) -> Option<T> {
        let (mut result, buffer) = self.take();
        buffer.into_iter().for_each(|partial| self.combine(&mut result, partial));
        result
    }

    /// Like [`drain`][Self::drain], but returning `identity` if there is no
    /// result.
    pub fn sum(self, identity: T) -> T { self.drain().unwrap_or(identity) }
}

impl<T, F> Accumulator<T, F> {
    /// Number of partials that found the result slot busy and were parked.
    pub fn buffered(&self) -> usize { self.buffered.load(Ordering::Relaxed) }

    // take everything out, tolerating poisoned locks: a panicking producer
    // cannot leave either container half-written
    fn take(&self) -> (Option<T>, Vec<T>) {
        let result
            = self.result.lock().unwrap_or_else(PoisonError::into_inner).take();
        let buffer
            = std::mem::take(
                &mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        (result, buffer)
    }

    /// Consume `self`, returning every value that was pushed without combining
    /// them, in unspecified order.
    pub fn into_partials(self) -> Vec<T> {
        let (result, mut buffer) = self.take();
        buffer.extend(result);
        buffer
    }
}
