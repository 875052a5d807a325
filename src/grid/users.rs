//! User Pool
//!
//! Fixed-size roster of player identities generated from the board seed.
//! Names are cosmetic; ids are sequential (`u00001`, `u00002`, ...).

use std::collections::{HashMap, HashSet};
use serde::{Serialize, Deserialize};

use crate::core::rng::{DeterministicRng, SeedStream};

/// Player identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sequential id.
    pub id: String,
    /// Display name, unique within the roster.
    pub name: String,
    /// Has revealed a cell. Flips to true once and stays.
    pub played: bool,
}

/// `{id, name}` pair handed to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self { id: user.id.clone(), name: user.name.clone() }
    }
}

/// Sequential user id for a 1-based position.
pub fn user_id(position: usize) -> String {
    format!("u{position:05}")
}

const STARTS: [&str; 26] = [
    "Al", "Be", "Ca", "Da", "El", "Fi", "Ga", "Ha", "Il", "Jo", "Ka", "Li", "Mo",
    "Na", "Ol", "Pa", "Qi", "Ra", "Sa", "Ta", "Ul", "Vi", "Wi", "Xa", "Ya", "Za",
];
const MIDS: [&str; 20] = [
    "la", "ra", "na", "mi", "ri", "lo", "ta", "sa", "ne", "le",
    "no", "ro", "mo", "va", "do", "fi", "ki", "zu", "ya", "xo",
];
const ENDS: [&str; 11] = ["n", "r", "s", "l", "m", "t", "x", "y", "z", "k", "d"];
const VOWELS: [&str; 5] = ["a", "e", "i", "o", "u"];

fn pick<'a>(parts: &[&'a str], rng: &mut DeterministicRng) -> &'a str {
    parts[rng.next_int(parts.len())]
}

/// Syllable name: start, optional vowel, optional middle (30%), end.
fn make_name(rng: &mut DeterministicRng) -> String {
    let three_parts = rng.next_int(100) < 30;
    let first = pick(&STARTS, rng);
    let middle = if three_parts { pick(&MIDS, rng) } else { "" };
    let last = pick(&ENDS, rng);
    let vowel = if rng.next_int(100) < 50 { pick(&VOWELS, rng) } else { "" };
    format!("{first}{vowel}{middle}{last}")
}

/// Generate `count` users from `seed`.
///
/// Pure function of `(count, seed)`. Name collisions get a numeric suffix
/// instead of a re-roll, so the stream for later names is unaffected.
pub fn generate_users(count: usize, seed: i32) -> Vec<User> {
    let mut rng = SeedStream::UserNames.rng(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let mut name = make_name(&mut rng);
        let mut attempt = 1;
        while seen.contains(&name) {
            name = format!("{name}{attempt}");
            attempt += 1;
        }
        seen.insert(name.clone());
        users.push(User { id: user_id(i + 1), name, played: false });
    }
    users
}

// =============================================================================
// ROSTER
// =============================================================================

/// Ordered roster with id lookup.
///
/// Order is generation order and is what every "scan the user list"
/// operation walks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<User>", into = "Vec<User>")]
pub struct UserRoster {
    users: Vec<User>,
    index: HashMap<String, usize>,
}

impl From<Vec<User>> for UserRoster {
    fn from(users: Vec<User>) -> Self {
        let index = users.iter().enumerate().map(|(i, u)| (u.id.clone(), i)).collect();
        Self { users, index }
    }
}

impl From<UserRoster> for Vec<User> {
    fn from(roster: UserRoster) -> Self {
        roster.users
    }
}

impl UserRoster {
    /// Generate a roster.
    pub fn generate(count: usize, seed: i32) -> Self {
        generate_users(count, seed).into()
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Roster is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: &str) -> Option<&User> {
        self.index.get(id).map(|&i| &self.users[i])
    }

    /// User at a position in roster order.
    pub fn at(&self, position: usize) -> Option<&User> {
        self.users.get(position)
    }

    /// All users in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Users with `played == false`, in roster order.
    pub fn eligible(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|u| !u.played)
    }

    /// Set `played` for a user. Returns false for unknown ids.
    pub(crate) fn mark_played(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.users[i].played = true;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
