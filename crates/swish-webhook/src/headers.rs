use std::collections::HashMap;

/// Case-insensitive header name to value mapping, as handed over by the HTTP layer.
///
/// Multi-valued headers are expected to be collapsed by the caller; if the same name
/// is inserted twice the first value is kept.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    entries: HashMap<String, String>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .entry(name.as_ref().to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Value of the first name in `names` that is present and not blank.
    ///
    /// The returned value is untouched: no trimming, no re-casing.
    pub fn first_non_blank<'a, I>(&self, names: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .filter_map(|name| self.get(name))
            .find(|value| !value.trim().is_empty())
    }

    /// Value of the first name in `names` that is present at all, blank or not.
    pub fn first_present<'a, I>(&self, names: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .find_map(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WebhookHeaders
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
