use serde::Serialize;

/// Ordered key/value parameter set for a single remote request.
///
/// Keys keep insertion order; pushing an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters every service call starts from: `f=json`.
    pub fn json() -> Self {
        Self::new().with("f", "json")
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// Appends `other`, replacing values of keys already present.
    pub fn extend(&mut self, other: RequestParams) {
        for (key, value) in other.pairs {
            self.push(&key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parses a parameter that carries embedded JSON.
    pub fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        self.get(key).and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_replace() {
        let params = RequestParams::json()
            .with("gdbVersion", "ADMIN.Edits")
            .with("async", false)
            .with("f", "pjson");

        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["f", "gdbVersion", "async"]);
        assert_eq!(params.get("f"), Some("pjson"));
        assert_eq!(params.get("async"), Some("false"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_embedded_json() {
        let params = RequestParams::new().with("parcelFeatures", r#"[{"id":"{A}","layerId":"4"}]"#);
        let parsed = params.get_json("parcelFeatures").unwrap();
        assert_eq!(parsed[0]["layerId"], "4");
        assert!(params.get_json("missing").is_none());
    }

    #[test]
    fn test_extend_appends_and_replaces() {
        let mut base = RequestParams::json().with("record", "{R}");
        base.extend(RequestParams::new().with("async", false).with("f", "pjson"));

        let keys: Vec<&str> = base.keys().collect();
        assert_eq!(keys, vec!["f", "record", "async"]);
        assert_eq!(base.get("f"), Some("pjson"));
    }
}
