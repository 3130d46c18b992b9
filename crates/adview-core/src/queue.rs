use std::cmp::Ordering;

use crate::types::Ad;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Highest reward first.
    #[default]
    Reward,
    /// Unwatched ads (highest reward first), then watched ones.
    UnwatchedFirst,
}

/// Ordered ad list with a wrap-around "current ad" pointer.
#[derive(Clone, Debug, Default)]
pub struct AdQueue {
    ads: Vec<Ad>,
    selected: Option<usize>,
    order: SortOrder,
}

fn by_reward_desc(a: &Ad, b: &Ad) -> Ordering {
    b.reward_per_view.total_cmp(&a.reward_per_view)
}

impl AdQueue {
    pub fn new(ads: Vec<Ad>) -> Self {
        let mut queue = Self {
            ads,
            selected: None,
            order: SortOrder::Reward,
        };
        queue.sort_by_reward();
        queue
    }

    pub fn ads(&self) -> &[Ad] {
        &self.ads
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn sort_by_reward(&mut self) {
        self.resort(|ads| ads.sort_by(by_reward_desc));
        self.order = SortOrder::Reward;
    }

    pub fn sort_unwatched_first(&mut self, watched: &[String]) {
        self.resort(|ads| {
            ads.sort_by(|a, b| {
                let a_seen = watched.contains(&a.id);
                let b_seen = watched.contains(&b.id);
                a_seen.cmp(&b_seen).then_with(|| by_reward_desc(a, b))
            })
        });
        self.order = SortOrder::UnwatchedFirst;
    }

    /// Swap in a fresh list, keeping the selection if that ad is still present.
    pub fn replace_ads(&mut self, ads: Vec<Ad>, watched: &[String]) {
        let selected_id = self.current().map(|a| a.id.clone());
        self.ads = ads;
        self.selected = None;
        match self.order {
            SortOrder::Reward => self.sort_by_reward(),
            SortOrder::UnwatchedFirst => self.sort_unwatched_first(watched),
        }
        if let Some(id) = selected_id {
            self.select(&id);
        }
    }

    pub fn select(&mut self, ad_id: &str) -> Option<&Ad> {
        self.selected = self.ads.iter().position(|a| a.id == ad_id);
        self.current()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn index(&self) -> Option<usize> {
        self.selected
    }

    pub fn current(&self) -> Option<&Ad> {
        self.selected.and_then(|i| self.ads.get(i))
    }

    pub fn next(&mut self) -> Option<&Ad> {
        let len = self.ads.len();
        let i = self.selected?;
        if len == 0 {
            return None;
        }
        self.selected = Some((i + 1) % len);
        self.current()
    }

    pub fn previous(&mut self) -> Option<&Ad> {
        let len = self.ads.len();
        let i = self.selected?;
        if len == 0 {
            return None;
        }
        self.selected = Some((i + len - 1) % len);
        self.current()
    }

    /// Local mirror of the server view counter.
    pub fn set_view_count(&mut self, ad_id: &str, view_count: u64) -> bool {
        match self.ads.iter_mut().find(|a| a.id == ad_id) {
            Some(ad) => {
                ad.view_count = view_count;
                true
            }
            None => false,
        }
    }

    fn resort(&mut self, sort: impl FnOnce(&mut Vec<Ad>)) {
        let selected_id = self.current().map(|a| a.id.clone());
        sort(&mut self.ads);
        if let Some(id) = selected_id {
            self.selected = self.ads.iter().position(|a| a.id == id);
        }
    }
}
