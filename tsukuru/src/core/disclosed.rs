//! Append-only record of paths already shown to the model.

/// Paths disclosed within one session, in disclosure order.
///
/// The set only grows. Disclosing a path twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisclosedFileSet {
    paths: Vec<String>,
}

impl DisclosedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Add `paths`, returning only those that were not already disclosed.
    ///
    /// Duplicates within `paths` itself are collapsed as well.
    pub fn disclose<I, S>(&mut self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for path in paths {
            let path = path.into();
            if self.contains(&path) {
                continue;
            }
            self.paths.push(path.clone());
            added.push(path);
        }
        added
    }

    /// Paths in `universe` that have not been disclosed yet, order preserved.
    pub fn remaining<'a>(&self, universe: &'a [String]) -> Vec<&'a str> {
        universe
            .iter()
            .map(String::as_str)
            .filter(|path| !self.contains(path))
            .collect()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
