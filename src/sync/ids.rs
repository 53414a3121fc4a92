use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{WishlistId, WishlistItem},
};

/// Synthesizes local ids from the wall clock in milliseconds
///
/// Ids are strictly increasing even when the clock stalls or goes backwards,
/// and never collide with local ids already seen in the cache.
#[derive(Debug, Default)]
pub(crate) struct LocalIdGenerator {
    last: i64,
}

impl LocalIdGenerator {
    /// Raises the floor above every local id in `items`
    pub fn observe<'a>(&mut self, items: impl IntoIterator<Item = &'a WishlistItem>) {
        for item in items {
            if let WishlistId::Local(id) = item.id {
                self.last = self.last.max(id);
            }
        }
    }

    /// Fails instead of wrapping when a cached id sits at the top of the range
    pub fn next_id(&mut self) -> AppResult<WishlistId> {
        let floor = self
            .last
            .checked_add(1)
            .ok_or_else(|| AppError::Internal("local id space exhausted".to_string()))?;
        self.last = Utc::now().timestamp_millis().max(floor);
        Ok(WishlistId::Local(self.last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWishlistItem;

    fn local_value(id: WishlistId) -> i64 {
        match id {
            WishlistId::Local(v) => v,
            WishlistId::Server(_) => panic!("expected a local id"),
        }
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut ids = LocalIdGenerator::default();
        let values: Vec<i64> = (0..100).map(|_| local_value(ids.next_id().unwrap())).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_observed_ids_raise_the_floor() {
        let far_future = Utc::now().timestamp_millis() + 1_000_000;
        let cached = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(far_future));
        let server = NewWishlistItem::new(7, "Show B").into_item(WishlistId::Server(i64::MAX));

        let mut ids = LocalIdGenerator::default();
        ids.observe([&cached, &server]);

        assert_eq!(ids.next_id().unwrap(), WishlistId::Local(far_future + 1));
    }

    #[test]
    fn test_exhausted_id_space_is_an_error() {
        let cached = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(i64::MAX));

        let mut ids = LocalIdGenerator::default();
        ids.observe([&cached]);

        assert!(matches!(ids.next_id(), Err(AppError::Internal(_))));
    }
}
