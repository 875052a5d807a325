//! Player Directory
//!
//! Turn selection and roster queries. Selection changes bump the version;
//! lookups never mutate.

use serde::{Serialize, Deserialize};

use crate::core::rng::SeedStream;
use crate::grid::board::Board;
use crate::grid::error::{PickError, SelectError};
use crate::grid::users::UserSummary;

/// Page size used when a caller gives none.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// One page of unplayed users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleUsersPage {
    /// Matching users before paging.
    pub total: usize,
    /// The page.
    pub users: Vec<UserSummary>,
}

impl Board {
    /// Pick an unplayed user at random and make them the current player.
    pub fn pick_random_eligible_user(&mut self) -> Result<String, PickError> {
        let pool: Vec<&str> = self.users.eligible().map(|u| u.id.as_str()).collect();
        if pool.is_empty() {
            return Err(PickError::NoEligible);
        }
        let version = self.state.meta.version();
        let mut rng = SeedStream::AdminPick { version }.rng(self.state.meta.seed);
        let chosen = pool[rng.next_int(pool.len())].to_string();

        self.state.meta.current_player_id = Some(chosen.clone());
        self.state.meta.bump_version();
        Ok(chosen)
    }

    /// Set (`Some`) or clear (`None` or empty) the current player.
    pub fn set_current_player(&mut self, player_id: Option<&str>) -> Result<(), SelectError> {
        match player_id.filter(|p| !p.is_empty()) {
            Some(id) => {
                let user = self.users.get(id).ok_or(SelectError::NotEligible)?;
                if user.played {
                    return Err(SelectError::NotEligible);
                }
                self.state.meta.current_player_id = Some(id.to_string());
            }
            None => self.state.meta.current_player_id = None,
        }
        self.state.meta.bump_version();
        Ok(())
    }

    /// Current player, if one is selected.
    pub fn current_player(&self) -> Option<&str> {
        self.state.meta.current_player_id.as_deref()
    }

    /// Stable display identity for an opaque client id.
    ///
    /// Indexes the full roster, played or not. Never marks anything.
    /// `None` only when the roster is empty.
    pub fn assign_user_for_client(&self, client_id: &str) -> Option<UserSummary> {
        if self.users.is_empty() {
            return None;
        }
        let mut rng = SeedStream::Client(client_id).rng(self.state.meta.seed);
        self.users.at(rng.next_int(self.users.len())).map(UserSummary::from)
    }

    /// Unplayed users, optionally filtered by a case-insensitive substring
    /// of id or name, then paged.
    pub fn list_eligible_users(
        &self,
        offset: usize,
        limit: usize,
        query: Option<&str>,
    ) -> EligibleUsersPage {
        let needle = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
        let matching: Vec<UserSummary> = self
            .users
            .eligible()
            .filter(|u| match &needle {
                Some(q) => u.id.to_lowercase().contains(q) || u.name.to_lowercase().contains(q),
                None => true,
            })
            .map(UserSummary::from)
            .collect();

        EligibleUsersPage {
            total: matching.len(),
            users: matching.into_iter().skip(offset).take(limit).collect(),
        }
    }

    /// Known ids with their names, in request order. Unknown ids are dropped.
    pub fn resolve_users(&self, ids: &[String]) -> Vec<UserSummary> {
        ids.iter()
            .filter_map(|id| self.users.get(id))
            .map(UserSummary::from)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
