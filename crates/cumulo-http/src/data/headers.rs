/// Ordered header collection.
///
/// Names keep the casing they were inserted with and entries keep insertion
/// order. Repeated names accumulate instead of overwriting, so multi-valued
/// headers survive a round trip; [`Headers::set`] is the explicit
/// replace operation. Lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self { Self::default() }

    /// Append a header, keeping any existing values for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Parse one raw `Name: value` line and append it.
    ///
    /// The name is everything before the first colon. Leading spaces and tabs
    /// are stripped from the value, which ends at the first carriage return.
    /// Lines without a colon are skipped and `false` is returned.
    pub fn add_line(&mut self, line: &str) -> bool {
        let Some((name, rest)) = line.split_once(':') else {
            return false;
        };
        let value = rest.trim_start_matches([' ', '\t']);
        let value = match value.find(['\r', '\n']) {
            Some(end) => &value[..end],
            None => value,
        };
        self.add(name, value);
        true
    }

    /// Replace every value of `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Remove every value stored under `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter { self.entries.into_iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_line_strips_whitespace_and_carriage_return() {
        let mut headers = Headers::new();
        assert!(headers.add_line("Content-Length: \t 42\r\n"));
        assert_eq!(headers.get("content-length"), Some("42"));
    }

    #[test]
    fn test_add_line_splits_on_first_colon() {
        let mut headers = Headers::new();
        assert!(headers.add_line("Location: https://example.com:443/a\r"));
        assert_eq!(headers.get("Location"), Some("https://example.com:443/a"));
    }

    #[test]
    fn test_add_line_without_colon_is_skipped() {
        let mut headers = Headers::new();
        headers.add("x-ms-version", "2021-08-06");
        let before = headers.clone();

        assert!(!headers.add_line("not a header line\r\n"));
        assert!(!headers.add_line(""));
        assert_eq!(headers, before);
    }

    #[test]
    fn test_add_line_empty_value() {
        let mut headers = Headers::new();
        assert!(headers.add_line("x-ms-meta-empty:\r\n"));
        assert_eq!(headers.get("x-ms-meta-empty"), Some(""));
    }

    #[test]
    fn test_duplicates_accumulate_in_order() {
        let mut headers = Headers::new();
        headers.add("Set-Cookie", "a=1");
        headers.add("set-cookie", "b=2");

        assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
        assert_eq!(headers.get_all("Set-Cookie").collect::<Vec<_>>(), ["a=1", "b=2"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut headers: Headers = [("x-ms-date", "old"), ("X-Ms-Date", "older")].into_iter().collect();
        headers.set("x-ms-date", "new");

        assert_eq!(headers.get_all("x-ms-date").collect::<Vec<_>>(), ["new"]);
    }

    #[test]
    fn test_remove_reports_count() {
        let mut headers: Headers = [("a", "1"), ("A", "2"), ("b", "3")].into_iter().collect();
        assert_eq!(headers.remove("a"), 2);
        assert!(!headers.contains("a"));
        assert!(headers.contains("B"));
    }

    #[test]
    fn test_iter_preserves_insertion_casing() {
        let headers: Headers = [("Content-Type", "text/plain")].into_iter().collect();
        assert_eq!(headers.iter().collect::<Vec<_>>(), [("Content-Type", "text/plain")]);
    }
}
