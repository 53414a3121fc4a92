mod program;
mod sync;
mod wishlist;

pub use program::{ApiAvailability, ApiPlatform, ApiProgramDetail, Platform, PlatformId};
pub use sync::{
    AddOutcome, AuthState, MergeFailure, MergeReport, RemoveOutcome, SyncState, WishlistSnapshot,
};
pub use wishlist::{
    ApiAddToWishlist, ApiWishlistItem, NewWishlistItem, ProgramId, WishlistId, WishlistItem,
};
