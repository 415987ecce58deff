use crate::{Error, Result};

/// Collects the results of asynchronously loaded attachments.
///
/// Attachments may complete in any order. Each index completes once; the
/// batch finishes exactly once, when every index has reported, and yields
/// the successful items in attachment order.
#[derive(Debug)]
pub struct AttachmentBatch<T> {
    slots: Vec<Slot<T>>,
    remaining: usize,
}

#[derive(Debug)]
enum Slot<T> {
    Pending,
    Done(Option<T>),
}

impl<T> AttachmentBatch<T> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Slot::Pending).collect(),
            remaining: len,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Records the outcome of attachment `index`; `None` marks an item that
    /// failed to load. Returns the collected items once the last pending
    /// attachment reports.
    pub fn complete(&mut self, index: usize, item: Option<T>) -> Result<Option<Vec<T>>> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            Error::InvalidArgs(format!("attachment {index} is out of range for {len}"))
        })?;
        if matches!(slot, Slot::Done(_)) {
            return Err(Error::InvalidArgs(format!(
                "attachment {index} completed twice"
            )));
        }
        *slot = Slot::Done(item);
        self.remaining -= 1;

        if self.remaining > 0 {
            return Ok(None);
        }
        let items = self
            .slots
            .iter_mut()
            .filter_map(|slot| match std::mem::replace(slot, Slot::Done(None)) {
                Slot::Done(item) => item,
                Slot::Pending => None,
            })
            .collect();
        Ok(Some(items))
    }
}
