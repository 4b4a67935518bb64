//! Growable fixed-block pool holding cached kernels.

/// Slots are added `grow` at a time up to `max`; released slots are reused
/// before the pool grows again.
#[derive(Clone, Debug)]
pub struct BlockPool<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    initial: usize,
    grow: usize,
    max: usize,
}

impl<T> BlockPool<T> {
    pub fn new(initial: usize, grow: usize, max: usize) -> Self {
        let initial = initial.min(max);
        let mut pool = Self {
            slots: Vec::new(),
            free: Vec::new(),
            initial,
            grow,
            max,
        };
        pool.extend(initial);
        pool
    }

    fn extend(&mut self, count: usize) {
        let start = self.slots.len();
        self.slots.extend((0..count).map(|_| None));
        self.free.extend((start..start + count).rev());
    }

    /// A free slot, growing the pool if allowed. `None` when saturated.
    pub fn allocate(&mut self) -> Option<usize> {
        if self.free.is_empty() {
            let room = self.max.saturating_sub(self.slots.len());
            if room == 0 {
                return None;
            }
            self.extend(self.grow.min(room));
        }
        self.free.pop()
    }

    pub fn store(&mut self, slot: usize, value: T) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Some(value);
        }
    }

    pub fn release(&mut self, slot: usize) -> Option<T> {
        let value = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        Some(value)
    }

    /// Return an allocated slot that was never stored to.
    pub fn unreserve(&mut self, slot: usize) {
        if matches!(self.slots.get(slot), Some(None)) && !self.free.contains(&slot) {
            self.free.push(slot);
        }
    }

    /// Drop vacant slots at the end of the pool, never going below the
    /// initial size. Returns the number of slots dropped.
    pub fn release_additional(&mut self) -> usize {
        let before = self.slots.len();
        while self.slots.len() > self.initial && matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|&slot| slot < len);
        before - len
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Occupied slots with their index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Slots allocated so far.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
