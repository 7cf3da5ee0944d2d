use marquee_types::Validator;
use url::form_urlencoded;

/// Decoded query string, first occurrence of a key wins.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        QueryParams { pairs }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn read_string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => default.to_string(),
        }
    }

    /// Comma separated list, no trimming of items.
    pub fn read_csv(&self, key: &str, default: Vec<String>) -> Vec<String> {
        match self.get(key) {
            Some(v) if !v.is_empty() => v.split(',').map(str::to_string).collect(),
            _ => default,
        }
    }

    /// Records "must be an integer" in `v` and returns `default` if value cannot be parsed.
    pub fn read_int(&self, key: &str, default: i64, v: &mut Validator) -> i64 {
        match self.get(key) {
            Some(s) if !s.is_empty() => match s.parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    v.add_error(key, "must be an integer");
                    default
                }
            },
            _ => default,
        }
    }
}
