//! Filename filtering by textual suffix.

/// Decides which remote files are downloaded.
///
/// A filter is an ordered set of suffixes. A name matches when it ends with
/// any of them; the comparison is case-sensitive and purely textual, so a
/// file uploaded as `movie.tif.jpg` matches `.jpg` as well as `.tif.jpg`.
/// An empty filter accepts every name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    suffixes: Vec<String>,
}

impl Filter {
    /// Creates a filter from a collection of suffixes.
    ///
    /// Empty strings are dropped and duplicates are collapsed, keeping the
    /// first occurrence.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        filter.extend(suffixes);
        filter
    }

    /// Creates a filter that accepts every name.
    #[must_use]
    pub const fn accept_all() -> Self {
        Self {
            suffixes: Vec::new(),
        }
    }

    /// Parses a comma separated list such as `".mrc, .tif"`.
    #[must_use]
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim))
    }

    /// Returns `true` if this filter accepts every name.
    #[must_use]
    pub fn is_accept_all(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Returns the configured suffixes in insertion order.
    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Returns `true` if `name` should be downloaded.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.is_accept_all() || self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

impl<S: Into<String>> Extend<S> for Filter {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for suffix in iter {
            let suffix = suffix.into();
            if !suffix.is_empty() && !self.suffixes.contains(&suffix) {
                self.suffixes.push(suffix);
            }
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_accept_all() {
            f.write_str("*")
        } else {
            f.write_str(&self.suffixes.join(","))
        }
    }
}
