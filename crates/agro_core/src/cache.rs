use std::collections::HashMap;

use crate::model::{Crop, CropId, Interest, UserProfile};

/// Sort orders for the "my interests" listing. `NewestFirst` is the backend
/// default and is omitted from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterestSort {
    #[default]
    NewestFirst,
    QuantityDesc,
    QuantityAsc,
    Status,
}

impl InterestSort {
    /// Value for the `sort` query parameter, `None` for the default order.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            InterestSort::NewestFirst => None,
            InterestSort::QuantityDesc => Some("quantity-desc"),
            InterestSort::QuantityAsc => Some("quantity-asc"),
            InterestSort::Status => Some("status"),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt-desc" | "newest" => Some(InterestSort::NewestFirst),
            "quantity-desc" => Some(InterestSort::QuantityDesc),
            "quantity-asc" => Some(InterestSort::QuantityAsc),
            "status" => Some(InterestSort::Status),
            _ => None,
        }
    }
}

/// Key of one cached server response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    CropDetail(CropId),
    CropList { search: Option<String> },
    MyPosts { owner_email: String },
    Latest,
    MyInterests { email: String, sort: InterestSort },
    Profile(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Crop(Crop),
    Crops(Vec<Crop>),
    Interests(Vec<Interest>),
    Profile(UserProfile),
}

/// Client-side response cache with single-writer-per-key semantics.
///
/// Every key carries a fetch epoch. A fetch effect is tagged with the epoch
/// current at dispatch time; by the time its completion arrives, a newer
/// fetch or a navigation away may have bumped the epoch, and the completion
/// is then discarded instead of overwriting fresher state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cache {
    entries: HashMap<CacheKey, CacheValue>,
    epochs: HashMap<CacheKey, u64>,
}

impl Cache {
    pub fn get(&self, key: &CacheKey) -> Option<&CacheValue> {
        self.entries.get(key)
    }

    /// Cached crop detail, if present.
    pub fn crop(&self, crop_id: &str) -> Option<&Crop> {
        match self.entries.get(&CacheKey::CropDetail(crop_id.to_string())) {
            Some(CacheValue::Crop(crop)) => Some(crop),
            _ => None,
        }
    }

    pub fn current_epoch(&self, key: &CacheKey) -> u64 {
        self.epochs.get(key).copied().unwrap_or(0)
    }

    /// Start a new fetch for `key`: supersedes any in-flight fetch and
    /// returns the epoch to tag the effect with.
    pub fn begin_fetch(&mut self, key: CacheKey) -> u64 {
        let epoch = self.epochs.entry(key).or_insert(0);
        *epoch += 1;
        *epoch
    }

    /// Abandon any in-flight fetch for `key` (navigation away). The stale
    /// completion, if it still arrives, will no longer match the epoch.
    pub fn abandon_fetch(&mut self, key: &CacheKey) {
        if let Some(epoch) = self.epochs.get_mut(key) {
            *epoch += 1;
        }
    }

    /// Commit a fetch result. Returns false (and writes nothing) when the
    /// fetch has been superseded.
    pub fn commit(&mut self, key: CacheKey, epoch: u64, value: CacheValue) -> bool {
        if self.current_epoch(&key) != epoch {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// Is `epoch` still the live fetch for `key`?
    pub fn is_current(&self, key: &CacheKey, epoch: u64) -> bool {
        self.current_epoch(key) == epoch
    }

    /// Direct write from a mutation's success handler, the single permitted
    /// writer outside of `commit`.
    pub fn write(&mut self, key: CacheKey, value: CacheValue) {
        self.entries.insert(key, value);
    }

    pub fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Invalidate every listing-shaped entry (browse, owner posts, latest) so
    /// quantity and interest-count changes propagate on the next fetch.
    pub fn invalidate_listings(&mut self) {
        self.entries.retain(|key, _| {
            !matches!(
                key,
                CacheKey::CropList { .. } | CacheKey::MyPosts { .. } | CacheKey::Latest
            )
        });
    }

    /// Invalidate browse and latest listings while keeping the owner's posts
    /// entry (used when that entry was just rewritten in place).
    pub fn invalidate_browse(&mut self) {
        self.entries
            .retain(|key, _| !matches!(key, CacheKey::CropList { .. } | CacheKey::Latest));
    }

    /// Replace one crop in the owner's cached posts list, if cached.
    pub fn replace_in_my_posts(&mut self, owner_email: &str, updated: &Crop) {
        let key = CacheKey::MyPosts {
            owner_email: owner_email.to_string(),
        };
        if let Some(CacheValue::Crops(crops)) = self.entries.get_mut(&key) {
            for crop in crops.iter_mut() {
                if crop.id == updated.id {
                    *crop = updated.clone();
                }
            }
        }
    }

    /// Drop one crop from the owner's cached posts list, if cached.
    pub fn remove_from_my_posts(&mut self, owner_email: &str, crop_id: &str) {
        let key = CacheKey::MyPosts {
            owner_email: owner_email.to_string(),
        };
        if let Some(CacheValue::Crops(crops)) = self.entries.get_mut(&key) {
            crops.retain(|crop| crop.id != crop_id);
        }
    }
}
