//! Multi-valued string maps for query strings and form bodies.

use std::collections::BTreeMap;

/// Ordered map from field name to every value submitted for it.
///
/// Keys are kept sorted so that [`Values::encode`] is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    inner: BTreeMap<String, Vec<String>>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` data.
    pub fn parse(input: &[u8]) -> Self {
        let mut values = Self::new();
        for (key, value) in url::form_urlencoded::parse(input) {
            values.append(key.into_owned(), value.into_owned());
        }
        values
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Add a value after any existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values for `key`.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.inner.insert(key.into(), values);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.inner.remove(key)
    }

    /// Append every value of `other`.
    pub fn extend(&mut self, other: Values) {
        for (key, values) in other.inner {
            self.inner.entry(key).or_default().extend(values);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Encode as `application/x-www-form-urlencoded`, sorted by key.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.inner {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (key, value) in iter {
            values.append(key, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_get() {
        let values = Values::parse(b"name=Alice&tag=a&tag=b&empty=");
        assert_eq!(values.get("name"), Some("Alice"));
        assert_eq!(values.get_all("tag"), ["a".to_string(), "b".to_string()]);
        assert_eq!(values.get("empty"), Some(""));
        assert!(values.get("missing").is_none());
        assert!(values.get_all("missing").is_empty());
    }

    #[test]
    fn parse_decodes_escapes() {
        let values = Values::parse(b"q=hello+world&path=%2Fa%2Fb");
        assert_eq!(values.get("q"), Some("hello world"));
        assert_eq!(values.get("path"), Some("/a/b"));
    }

    #[test]
    fn encode_is_sorted() {
        let values: Values = [("z", "1"), ("a", "x y"), ("a", "2")].into_iter().collect();
        assert_eq!(values.encode(), "a=x+y&a=2&z=1");
    }

    #[test]
    fn extend_appends() {
        let mut values = Values::parse(b"a=1");
        values.extend(Values::parse(b"a=2&b=3"));
        assert_eq!(values.get_all("a").len(), 2);
        assert_eq!(values.get("b"), Some("3"));
    }
}
