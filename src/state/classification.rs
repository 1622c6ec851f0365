//! Diagnostic classification sets for URLs the crawl did not harvest
//!
//! The three sets are disjoint. Recording a URL under one class takes it out
//! of the other two, and a URL that is later harvested successfully is
//! dropped from all of them. They feed the run report and the `--stats` view
//! and persist across runs. Errored in particular does not stop a later run
//! from retrying a URL; repeat fetches within one run are suppressed by the
//! crawl driver instead.
use std::collections::BTreeSet;
use std::fmt;

/// Why a raw URL ended up in a classification set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlClass {
    /// Host is not in the configured site scope
    NonScope,

    /// HEAD probe failed or returned a non-success status
    Unfetchable,

    /// Rendering, extraction or download failed
    Errored,
}

impl UrlClass {
    pub const ALL: [UrlClass; 3] = [Self::NonScope, Self::Unfetchable, Self::Errored];

    /// Converts to the string stored in the checkpoint database
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NonScope => "non_scope",
            Self::Unfetchable => "unfetchable",
            Self::Errored => "errored",
        }
    }

    /// Parses a class from its database string
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "non_scope" => Some(Self::NonScope),
            "unfetchable" => Some(Self::Unfetchable),
            "errored" => Some(Self::Errored),
            _ => None,
        }
    }
}

impl fmt::Display for UrlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// NonScope, Unfetchable and Errored sets of raw URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationSets {
    non_scope: BTreeSet<String>,
    unfetchable: BTreeSet<String>,
    errored: BTreeSet<String>,
}

impl ClassificationSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL under `class`, moving it out of any other set
    ///
    /// Returns true if the URL was not already in `class`.
    pub fn insert(&mut self, class: UrlClass, url: impl Into<String>) -> bool {
        let url = url.into();
        for other in UrlClass::ALL.into_iter().filter(|c| *c != class) {
            self.set_mut(other).remove(&url);
        }
        self.set_mut(class).insert(url)
    }

    /// Drops a URL from every set, returning the class it was in
    pub fn remove(&mut self, url: &str) -> Option<UrlClass> {
        UrlClass::ALL
            .into_iter()
            .find(|class| self.set_mut(*class).remove(url))
    }

    /// Class a URL is currently recorded under
    pub fn class_of(&self, url: &str) -> Option<UrlClass> {
        UrlClass::ALL.into_iter().find(|class| self.contains(*class, url))
    }

    pub fn contains(&self, class: UrlClass, url: &str) -> bool {
        self.get(class).contains(url)
    }

    pub fn get(&self, class: UrlClass) -> &BTreeSet<String> {
        match class {
            UrlClass::NonScope => &self.non_scope,
            UrlClass::Unfetchable => &self.unfetchable,
            UrlClass::Errored => &self.errored,
        }
    }

    /// Iterates every `(class, url)` pair
    pub fn iter(&self) -> impl Iterator<Item = (UrlClass, &str)> {
        UrlClass::ALL
            .into_iter()
            .flat_map(move |class| self.get(class).iter().map(move |url| (class, url.as_str())))
    }

    pub fn len(&self, class: UrlClass) -> usize {
        self.get(class).len()
    }

    fn set_mut(&mut self, class: UrlClass) -> &mut BTreeSet<String> {
        match class {
            UrlClass::NonScope => &mut self.non_scope,
            UrlClass::Unfetchable => &mut self.unfetchable,
            UrlClass::Errored => &mut self.errored,
        }
    }
}
