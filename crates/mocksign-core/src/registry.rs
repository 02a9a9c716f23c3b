//! Per-page bookkeeping of placed signatures.

use crate::signature::Signature;
use crate::types::{ComposeError, PlacementId, Point};

/// A signature anchored on a page.
///
/// `anchor` is in page space with a bottom-left origin and names the
/// signature's top-left corner.
#[derive(Debug, Clone)]
pub struct PlacedSignature {
    pub signature: Signature,
    pub anchor: Point,
}

impl PlacedSignature {
    #[must_use]
    pub const fn new(signature: Signature, anchor: Point) -> Self {
        Self { signature, anchor }
    }
}

/// One insertion-ordered list of placements per page.
///
/// A [`PlacementId`] is live on at most one page at a time. Ids minted by
/// [`insert`](Self::insert) are never reused for the registry's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    pages: Vec<Vec<(PlacementId, PlacedSignature)>>,
    next_id: u64,
}

impl SignatureRegistry {
    /// An empty registry for a document of `page_count` pages.
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self {
            pages: vec![Vec::new(); page_count],
            next_id: 0,
        }
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of placements across all pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Vec::is_empty)
    }

    const fn check_page(&self, page: usize) -> Result<(), ComposeError> {
        if page < self.pages.len() {
            Ok(())
        } else {
            Err(ComposeError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })
        }
    }

    /// Page on which `id` is live.
    #[must_use]
    pub fn page_of(&self, id: PlacementId) -> Option<usize> {
        self.pages
            .iter()
            .position(|entries| entries.iter().any(|(live, _)| *live == id))
    }

    #[must_use]
    pub fn get(&self, id: PlacementId) -> Option<&PlacedSignature> {
        self.pages
            .iter()
            .flatten()
            .find_map(|(live, placed)| (*live == id).then_some(placed))
    }

    /// Place a signature under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page,
    /// [`ComposeError::DuplicateId`] if `id` is live on any page and
    /// [`ComposeError::ReservedId`] for `u64::MAX`.
    pub fn place(
        &mut self,
        page: usize,
        id: PlacementId,
        placed: PlacedSignature,
    ) -> Result<(), ComposeError> {
        self.check_page(page)?;
        let Some(after) = id.0.checked_add(1) else {
            return Err(ComposeError::ReservedId { id });
        };
        if let Some(live_page) = self.page_of(id) {
            return Err(ComposeError::DuplicateId {
                id,
                page: live_page,
            });
        }
        self.next_id = self.next_id.max(after);
        self.pages[page].push((id, placed));
        Ok(())
    }

    /// Place a signature under a freshly minted id.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page.
    pub fn insert(&mut self, page: usize, placed: PlacedSignature) -> Result<PlacementId, ComposeError> {
        self.check_page(page)?;
        let id = PlacementId(self.next_id);
        self.place(page, id, placed)?;
        Ok(id)
    }

    /// Remove `id` from whichever page holds it.
    ///
    /// # Errors
    ///
    /// [`ComposeError::NotFound`] if no page holds `id`.
    pub fn delete(&mut self, id: PlacementId) -> Result<(usize, PlacedSignature), ComposeError> {
        for (page, entries) in self.pages.iter_mut().enumerate() {
            if let Some(pos) = entries.iter().position(|(live, _)| *live == id) {
                let (_, placed) = entries.remove(pos);
                return Ok((page, placed));
            }
        }
        Err(ComposeError::NotFound { id })
    }

    /// Placements on `page` with their ids, in insertion order.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page.
    pub fn entries(&self, page: usize) -> Result<&[(PlacementId, PlacedSignature)], ComposeError> {
        self.check_page(page)?;
        Ok(&self.pages[page])
    }

    /// Placements on `page` in insertion order; later entries draw on top.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page.
    pub fn list(&self, page: usize) -> Result<Vec<&PlacedSignature>, ComposeError> {
        Ok(self.entries(page)?.iter().map(|(_, placed)| placed).collect())
    }

    /// Ids on `page` in insertion order.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page.
    pub fn ids(&self, page: usize) -> Result<Vec<PlacementId>, ComposeError> {
        Ok(self.entries(page)?.iter().map(|(id, _)| *id).collect())
    }

    /// Empty `page`, handing its placements back in insertion order.
    ///
    /// # Errors
    ///
    /// [`ComposeError::PageOutOfRange`] for a bad page.
    pub fn clear(&mut self, page: usize) -> Result<Vec<PlacedSignature>, ComposeError> {
        self.check_page(page)?;
        Ok(std::mem::take(&mut self.pages[page])
            .into_iter()
            .map(|(_, placed)| placed)
            .collect())
    }
}
